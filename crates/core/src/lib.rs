//! Core domain types, error taxonomy, text normalization and storage
//! configuration for presentation ingestion.

pub mod builder;
pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use builder::{classify_slide, SlideModelBuilder};
pub use config::{validate_owner_id, Config, StorageLayout};
pub use error::{Error, Result};
pub use text::normalize_run;
pub use types::{ArtifactClass, OrderedPartRef, ParseOutcome, ParsedSlide, RasterJobResult};
