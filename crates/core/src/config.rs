//! Environment-driven configuration and the on-disk storage layout.

use crate::error::{Error, Result};
use crate::types::ArtifactClass;
use std::path::{Component, Path, PathBuf};

/// Base storage mount path.
pub const STORAGE_PATH_ENV: &str = "DECK_STORAGE_PATH";
/// Set to `production` to select the production fallback mount.
pub const ENVIRONMENT_ENV: &str = "DECK_ENV";
/// Override for the office-to-PDF converter binary.
pub const SOFFICE_PATH_ENV: &str = "DECK_SOFFICE_PATH";
/// Override for the PDF rasterizer binary.
pub const PDFTOPPM_PATH_ENV: &str = "DECK_PDFTOPPM_PATH";

/// Mount used outside production when none is configured.
pub const DEV_STORAGE_PATH: &str = "./.data/storage";
/// Mount used in production when none is configured.
pub const PRODUCTION_STORAGE_PATH: &str = "/data/storage";

/// Default converter binaries, resolved on `PATH`.
pub const DEFAULT_SOFFICE_BIN: &str = "soffice";
pub const DEFAULT_PDFTOPPM_BIN: &str = "pdftoppm";

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the persistent storage mount.
    pub storage_root: PathBuf,
    /// Whether `DECK_ENV=production`.
    pub production: bool,
    /// Office-to-PDF converter program.
    pub soffice_bin: PathBuf,
    /// PDF rasterizer program.
    pub pdftoppm_bin: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = get(ENVIRONMENT_ENV)
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let storage_root = match get(STORAGE_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None if production => {
                log::warn!(
                    "{} is not set; using default production mount {}",
                    STORAGE_PATH_ENV,
                    PRODUCTION_STORAGE_PATH
                );
                PathBuf::from(PRODUCTION_STORAGE_PATH)
            }
            None => {
                log::warn!(
                    "{} is not set; using local development storage at {}",
                    STORAGE_PATH_ENV,
                    DEV_STORAGE_PATH
                );
                PathBuf::from(DEV_STORAGE_PATH)
            }
        };

        Self {
            storage_root,
            production,
            soffice_bin: get(SOFFICE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOFFICE_BIN)),
            pdftoppm_bin: get(PDFTOPPM_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PDFTOPPM_BIN)),
        }
    }

    /// Storage layout rooted at the configured mount.
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.storage_root)
    }
}

/// Deterministic on-disk layout: `{root}/{artifact-class}/{owner_id}/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact of one class.
    pub fn class_dir(&self, class: ArtifactClass) -> PathBuf {
        self.root.join(class.dir_name())
    }

    /// Per-owner directory of raster PNGs.
    pub fn image_dir(&self, owner_id: &str) -> Result<PathBuf> {
        validate_owner_id(owner_id)?;
        Ok(self.class_dir(ArtifactClass::SlideImages).join(owner_id))
    }

    /// Stored original upload for an owner.
    pub fn presentation_path(&self, owner_id: &str, file_name: &str) -> Result<PathBuf> {
        validate_owner_id(owner_id)?;
        let file_name = single_component(file_name)?;
        Ok(self
            .class_dir(ArtifactClass::Presentations)
            .join(owner_id)
            .join(file_name))
    }

    /// Narration audio for one slide (0-based index) of an owner.
    pub fn narration_path(&self, owner_id: &str, slide_index: usize) -> Result<PathBuf> {
        validate_owner_id(owner_id)?;
        Ok(self
            .class_dir(ArtifactClass::Narration)
            .join(owner_id)
            .join(format!("{}.mp3", slide_index + 1)))
    }

    /// Mount-relative, `/`-separated form of a path under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

/// Owner ids become directory names, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_owner_id(owner_id: &str) -> Result<()> {
    let valid = !owner_id.is_empty()
        && owner_id.len() <= 128
        && owner_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidOwnerId(owner_id.to_string()))
    }
}

fn single_component(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(Error::Config(format!("invalid file name: {:?}", name))),
    }
}
