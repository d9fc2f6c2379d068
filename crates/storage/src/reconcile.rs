//! Orphaned artifact reconciliation.
//!
//! Three artifact classes live under the storage mount. The slide-image
//! cache is fully regenerable and always wiped. Stored presentations and
//! narration audio are diffed against the paths an external store still
//! references, and anything unreferenced is deleted.

use deck_core::{ArtifactClass, Result, StorageLayout};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

/// Authoritative sets of mount-relative paths that must be kept.
///
/// Called immediately before each sweep. Paths look like
/// `presentations/{owner}/{file}` and `narration/{owner}/{n}.mp3`.
pub trait ReferenceSource {
    fn presentation_paths(&self) -> Result<Vec<String>>;
    fn narration_paths(&self) -> Result<Vec<String>>;
}

/// In-memory reference sets.
#[derive(Debug, Clone, Default)]
pub struct StaticReferences {
    pub presentations: Vec<String>,
    pub narration: Vec<String>,
}

impl StaticReferences {
    pub fn new<P, N>(presentations: P, narration: N) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            presentations: presentations.into_iter().map(Into::into).collect(),
            narration: narration.into_iter().map(Into::into).collect(),
        }
    }
}

impl ReferenceSource for StaticReferences {
    fn presentation_paths(&self) -> Result<Vec<String>> {
        Ok(self.presentations.clone())
    }

    fn narration_paths(&self) -> Result<Vec<String>> {
        Ok(self.narration.clone())
    }
}

/// One file or directory the sweep could not handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileFailure {
    pub path: String,
    pub message: String,
}

/// Outcome of a sweep. Failures are collected rather than aborting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub cache_files_deleted: usize,
    pub orphaned_stored_deleted: usize,
    pub orphaned_audio_deleted: usize,
    pub errors: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Sweeps the storage mount.
#[derive(Debug, Clone)]
pub struct Reconciler {
    layout: StorageLayout,
}

impl Reconciler {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Wipe the image cache and delete unreferenced originals and audio.
    ///
    /// Both reference sets are loaded before anything is touched; if the
    /// source fails, nothing is deleted and the error is returned.
    pub fn sweep(&self, source: &dyn ReferenceSource) -> Result<ReconcileReport> {
        let presentations = reference_set(source.presentation_paths()?);
        let narration = reference_set(source.narration_paths()?);
        log::info!(
            "Reconciling {} with {} presentation and {} narration references",
            self.layout.root().display(),
            presentations.len(),
            narration.len()
        );

        let mut report = ReconcileReport::default();
        report.cache_files_deleted = self.wipe_class(ArtifactClass::SlideImages, &mut report.errors);
        report.orphaned_stored_deleted =
            self.delete_orphans(ArtifactClass::Presentations, &presentations, &mut report.errors);
        report.orphaned_audio_deleted =
            self.delete_orphans(ArtifactClass::Narration, &narration, &mut report.errors);

        log::info!(
            "Reconcile finished: {} cache files, {} originals, {} audio files deleted, {} errors",
            report.cache_files_deleted,
            report.orphaned_stored_deleted,
            report.orphaned_audio_deleted,
            report.errors.len()
        );
        Ok(report)
    }

    /// Delete every cached slide image.
    pub fn wipe_image_cache(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        report.cache_files_deleted = self.wipe_class(ArtifactClass::SlideImages, &mut report.errors);
        report
    }

    fn wipe_class(&self, class: ArtifactClass, errors: &mut Vec<ReconcileFailure>) -> usize {
        let dir = self.layout.class_dir(class);
        let mut deleted = 0;

        for entry in WalkDir::new(&dir).min_depth(1).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if !is_not_found(&e) {
                        errors.push(walk_failure(&dir, &e));
                    }
                    continue;
                }
            };

            let result = if entry.file_type().is_dir() {
                fs::remove_dir(entry.path())
            } else {
                fs::remove_file(entry.path()).map(|()| deleted += 1)
            };
            if let Err(e) = result {
                errors.push(failure(entry.path(), &e));
            }
        }

        log::debug!("Wiped {} files from {}", deleted, dir.display());
        deleted
    }

    fn delete_orphans(
        &self,
        class: ArtifactClass,
        keep: &HashSet<String>,
        errors: &mut Vec<ReconcileFailure>,
    ) -> usize {
        let dir = self.layout.class_dir(class);
        let mut deleted = 0;

        for entry in WalkDir::new(&dir).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if !is_not_found(&e) {
                        errors.push(walk_failure(&dir, &e));
                    }
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let Some(relative) = self.layout.relative(entry.path()) else {
                continue;
            };
            if keep.contains(&relative) {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    log::debug!("Deleted orphan {}", relative);
                    deleted += 1;
                }
                Err(e) => errors.push(failure(entry.path(), &e)),
            }
        }

        prune_empty_dirs(&dir);
        deleted
    }
}

/// Remove owner directories left empty, keeping the class directory itself.
fn prune_empty_dirs(dir: &Path) {
    let empty_dirs = WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir());

    for entry in empty_dirs {
        let is_empty = fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            if let Err(e) = fs::remove_dir(entry.path()) {
                log::debug!("Could not prune {}: {}", entry.path().display(), e);
            }
        }
    }
}

/// Normalized reference paths: `/`-separated, no leading `/` or `./`.
fn reference_set(paths: Vec<String>) -> HashSet<String> {
    paths
        .iter()
        .map(|path| normalize_reference(path))
        .filter(|path| !path.is_empty())
        .collect()
}

fn normalize_reference(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error()
        .map(|io| io.kind() == ErrorKind::NotFound)
        .unwrap_or(false)
}

fn walk_failure(dir: &Path, e: &walkdir::Error) -> ReconcileFailure {
    let path = e.path().unwrap_or(dir);
    ReconcileFailure {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn failure(path: &Path, e: &std::io::Error) -> ReconcileFailure {
    log::warn!("Failed to delete {}: {}", path.display(), e);
    ReconcileFailure {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
