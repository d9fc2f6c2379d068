//! Zip container loader with a normalized file table.
//!
//! Archive writers disagree on path casing and on `/` versus `\`, so every
//! lookup goes through [`normalize_part_name`] before it touches the archive.

use deck_core::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Largest upload accepted, checked before the zip reader sees the buffer.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Largest decompressed size read from a single part.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

const UTF8_BOM: &str = "\u{FEFF}";

/// An opened presentation package.
pub struct Container<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    /// Normalized key -> raw entry name.
    entries: HashMap<String, String>,
}

impl<'a> Container<'a> {
    /// Open an uploaded buffer as a zip container.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(Error::FileTooLarge {
                size: bytes.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::CorruptArchive(format!("Failed to open ZIP: {}", e)))?;

        // Sorted so that colliding names resolve the same way on every run
        let mut raw_names: Vec<&str> = archive.file_names().collect();
        raw_names.sort_unstable();

        let mut entries = HashMap::with_capacity(raw_names.len());
        for raw in raw_names {
            let key = normalize_part_name(raw);
            if key.is_empty() || key.ends_with('/') {
                continue;
            }
            entries.entry(key).or_insert_with(|| raw.to_string());
        }

        log::debug!("Opened package with {} entries", entries.len());

        Ok(Self { archive, entries })
    }

    /// Whether the package has a part at `path` (any casing or separator).
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_part_name(path))
    }

    /// All normalized part keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of file entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a part as text. `Ok(None)` when the part does not exist.
    ///
    /// Invalid UTF-8 is replaced rather than rejected and a leading BOM is
    /// stripped.
    pub fn read_text(&mut self, path: &str) -> Result<Option<String>> {
        let Some(raw) = self.entries.get(&normalize_part_name(path)).cloned() else {
            return Ok(None);
        };

        let file = self
            .archive
            .by_name(&raw)
            .map_err(|e| Error::CorruptArchive(format!("File not found in archive '{}': {}", raw, e)))?;

        let mut bytes = Vec::new();
        file.take(MAX_PART_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| Error::CorruptArchive(format!("Failed to read '{}': {}", raw, e)))?;

        if bytes.len() as u64 > MAX_PART_BYTES {
            return Err(Error::CorruptArchive(format!(
                "'{}' expands beyond {} bytes",
                raw, MAX_PART_BYTES
            )));
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("'{}' is not valid UTF-8; decoding lossily", raw);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Ok(Some(match text.strip_prefix(UTF8_BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }))
    }
}

/// Normalize an archive path for lookups: `\` becomes `/`, leading slashes
/// are dropped and the result is lowercased.
pub fn normalize_part_name(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_lowercase()
}
