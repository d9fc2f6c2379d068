//! Error types for presentation ingestion.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, rasterizing or storing presentations.
///
/// The `Display` text of the parse-facing variants is shown to users as-is,
/// so those messages are fixed sentences.
#[derive(Error, Debug)]
pub enum Error {
    /// Upload exceeds the accepted size; checked before any parsing.
    #[error("File is too large. Maximum size is 25MB.")]
    FileTooLarge { size: usize, limit: usize },

    /// The buffer could not be opened as a zip container.
    #[error("Invalid or corrupted PPTX file.")]
    CorruptArchive(String),

    /// Neither relationship-based nor filename-based ordering found a slide.
    #[error("No slides found in this presentation.")]
    NoSlidesFound,

    /// One slide could not be walked. Recovered into a warning by the parser.
    #[error("Slide {slide} could not be read: {reason}")]
    SlideRead { slide: usize, reason: String },

    /// Malformed XML inside a package part.
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// A conversion binary could not be found on disk or on `PATH`.
    #[error("{tool} is not installed or could not be found")]
    ExternalToolMissing { tool: String },

    /// A conversion binary ran but reported failure.
    #[error("{tool} exited with {status}: {output}")]
    ExternalToolFailed {
        tool: String,
        status: String,
        output: String,
    },

    /// A conversion stage exceeded its time bound and was killed.
    #[error("{tool} timed out after {seconds}s")]
    ExternalToolTimeout { tool: String, seconds: u64 },

    /// A tool exited cleanly but the expected output is absent.
    #[error("No output produced: {0}")]
    NoOutputProduced(String),

    /// The persistent storage mount failed a write probe.
    #[error("Storage at {path} is not writable: {reason}")]
    StorageNotWritable { path: String, reason: String },

    /// Owner identifiers become directory names, so they are restricted.
    #[error("Invalid owner id: {0:?}")]
    InvalidOwnerId(String),

    /// The raster worker queue is at capacity.
    #[error("Raster queue is full")]
    QueueFull,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or process I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the external conversion tooling.
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            Error::ExternalToolMissing { .. }
                | Error::ExternalToolFailed { .. }
                | Error::ExternalToolTimeout { .. }
                | Error::NoOutputProduced(_)
        )
    }
}
