use deck_core::{ArtifactClass, Error, Result, StorageLayout};
use deck_storage::{Reconciler, ReferenceSource, StaticReferences};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"data").unwrap();
}

fn seeded_mount() -> (TempDir, StorageLayout) {
    let dir = TempDir::new().unwrap();
    let layout = StorageLayout::new(dir.path());

    for owner in ["deck_a", "deck_b", "deck_c"] {
        touch(&layout.presentation_path(owner, "original.pptx").unwrap());
        for index in 0..2 {
            touch(&layout.narration_path(owner, index).unwrap());
            touch(&layout.image_dir(owner).unwrap().join(format!("{}.png", index + 1)));
        }
    }
    (dir, layout)
}

fn all_references() -> StaticReferences {
    StaticReferences::new(
        [
            "presentations/deck_a/original.pptx",
            "presentations/deck_b/original.pptx",
            "presentations/deck_c/original.pptx",
        ],
        [
            "narration/deck_a/1.mp3",
            "narration/deck_a/2.mp3",
            "narration/deck_b/1.mp3",
            "narration/deck_b/2.mp3",
            "narration/deck_c/1.mp3",
            "narration/deck_c/2.mp3",
        ],
    )
}

#[test]
fn deletes_exactly_the_one_orphaned_original() {
    let (_dir, layout) = seeded_mount();
    let mut references = all_references();
    references
        .presentations
        .retain(|path| !path.contains("deck_b"));

    let report = Reconciler::new(layout.clone()).sweep(&references).unwrap();

    assert_eq!(report.orphaned_stored_deleted, 1);
    assert_eq!(report.orphaned_audio_deleted, 0);
    assert!(report.is_clean());

    assert!(layout.presentation_path("deck_a", "original.pptx").unwrap().is_file());
    assert!(layout.presentation_path("deck_c", "original.pptx").unwrap().is_file());
    assert!(!layout.presentation_path("deck_b", "original.pptx").unwrap().exists());
    // The emptied owner directory is pruned, the class directory stays
    assert!(!layout.class_dir(ArtifactClass::Presentations).join("deck_b").exists());
    assert!(layout.class_dir(ArtifactClass::Presentations).is_dir());
}

#[test]
fn image_cache_is_always_wiped() {
    let (_dir, layout) = seeded_mount();
    let report = Reconciler::new(layout.clone()).sweep(&all_references()).unwrap();

    assert_eq!(report.cache_files_deleted, 6);
    assert_eq!(report.orphaned_stored_deleted, 0);
    assert!(!layout.image_dir("deck_a").unwrap().exists());
    assert!(layout.class_dir(ArtifactClass::SlideImages).is_dir());
}

#[test]
fn audio_is_diffed_against_its_own_references() {
    let (_dir, layout) = seeded_mount();
    let mut references = all_references();
    references.narration.retain(|path| path != "narration/deck_c/2.mp3");
    // A stray file nobody references
    touch(&layout.class_dir(ArtifactClass::Narration).join("deck_z").join("1.mp3"));

    let report = Reconciler::new(layout.clone()).sweep(&references).unwrap();

    assert_eq!(report.orphaned_audio_deleted, 2);
    assert_eq!(report.orphaned_stored_deleted, 0);
    assert!(layout.narration_path("deck_c", 0).unwrap().is_file());
    assert!(!layout.narration_path("deck_c", 1).unwrap().exists());
}

#[test]
fn reference_paths_are_normalized() {
    let (_dir, layout) = seeded_mount();
    let references = StaticReferences::new(
        [
            "/presentations/deck_a/original.pptx",
            "presentations\\deck_b\\original.pptx",
            "./presentations/deck_c/original.pptx",
        ],
        all_references().narration,
    );

    let report = Reconciler::new(layout).sweep(&references).unwrap();
    assert_eq!(report.orphaned_stored_deleted, 0);
}

#[test]
fn empty_mount_is_a_clean_no_op() {
    let dir = TempDir::new().unwrap();
    let reconciler = Reconciler::new(StorageLayout::new(dir.path().join("missing")));

    let report = reconciler.sweep(&StaticReferences::default()).unwrap();
    assert_eq!(report.cache_files_deleted, 0);
    assert_eq!(report.orphaned_stored_deleted, 0);
    assert!(report.is_clean());
}

struct BrokenSource;

impl ReferenceSource for BrokenSource {
    fn presentation_paths(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn narration_paths(&self) -> Result<Vec<String>> {
        Err(Error::Config("reference store unavailable".into()))
    }
}

#[test]
fn failing_source_aborts_before_any_deletion() {
    let (_dir, layout) = seeded_mount();

    let result = Reconciler::new(layout.clone()).sweep(&BrokenSource);
    assert!(result.is_err());

    assert!(layout.presentation_path("deck_a", "original.pptx").unwrap().is_file());
    assert!(layout.image_dir("deck_a").unwrap().join("1.png").is_file());
}

#[test]
fn wipe_image_cache_leaves_other_classes_alone() {
    let (_dir, layout) = seeded_mount();
    let report = Reconciler::new(layout.clone()).wipe_image_cache();

    assert_eq!(report.cache_files_deleted, 6);
    assert_eq!(report.orphaned_stored_deleted, 0);
    assert!(layout.narration_path("deck_a", 0).unwrap().is_file());
}

#[test]
fn report_json_uses_camel_case() {
    let (_dir, layout) = seeded_mount();
    let report = Reconciler::new(layout).sweep(&all_references()).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"orphanedStoredDeleted\":0"));
    assert!(json.contains("\"cacheFilesDeleted\":6"));
}
