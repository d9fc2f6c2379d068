//! On-disk cache of rendered slide images.
//!
//! Layout is `{root}/{owner_id}/{index + 1}.png`: callers use 0-based slide
//! indices, files are 1-based. There is no separate index; existence and
//! count come from the filesystem itself.

use deck_core::{validate_owner_id, ArtifactClass, Result, StorageLayout};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Deterministic raster artifact store.
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    /// Cache rooted directly at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache at the slide-image class directory of a storage layout.
    pub fn from_layout(layout: &StorageLayout) -> Self {
        Self::new(layout.class_dir(ArtifactClass::SlideImages))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one owner's images.
    pub fn owner_dir(&self, owner_id: &str) -> Result<PathBuf> {
        validate_owner_id(owner_id)?;
        Ok(self.root.join(owner_id))
    }

    /// Path of the image for a 0-based slide index.
    pub fn image_path(&self, owner_id: &str, index: usize) -> Result<PathBuf> {
        Ok(self.owner_dir(owner_id)?.join(file_name(index + 1)))
    }

    /// Whether the image for a 0-based slide index is on disk.
    pub fn exists(&self, owner_id: &str, index: usize) -> bool {
        self.image_path(owner_id, index)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Highest image number present for an owner; 0 when none.
    ///
    /// This is the largest `N` among `N.png` files, not the number of files,
    /// so a gap is reported as if the missing images existed. Treat it as
    /// "highest contiguous-looking numeral", not a guaranteed gapless count.
    pub fn count(&self, owner_id: &str) -> Result<usize> {
        let dir = self.owner_dir(owner_id)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut highest = 0;
        for entry in entries {
            let entry = entry?;
            if let Some(number) = entry.file_name().to_str().and_then(image_number) {
                highest = highest.max(number);
            }
        }
        Ok(highest)
    }

    /// Bytes of the image for a 0-based slide index, if present.
    pub fn read(&self, owner_id: &str, index: usize) -> Result<Option<Vec<u8>>> {
        let path = self.image_path(owner_id, index)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy rendered pages in as `1.png..N.png` and drop higher-numbered
    /// leftovers from an earlier, longer render. Returns `N`.
    ///
    /// Each file is copied under a temporary name and renamed into place, so
    /// readers never observe a half-written image. Concurrent stores for the
    /// same owner are last-writer-wins per file.
    pub fn store(&self, owner_id: &str, pages: &[PathBuf]) -> Result<usize> {
        let dir = self.owner_dir(owner_id)?;
        fs::create_dir_all(&dir)?;

        for (i, page) in pages.iter().enumerate() {
            let number = i + 1;
            let staging = dir.join(format!(".{}.png.partial", number));
            fs::copy(page, &staging)?;
            fs::rename(&staging, dir.join(file_name(number)))?;
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let stale = entry
                .file_name()
                .to_str()
                .and_then(image_number)
                .map(|number| number > pages.len())
                .unwrap_or(false);
            if stale {
                log::debug!("Removing stale image {}", entry.path().display());
                fs::remove_file(entry.path())?;
            }
        }

        log::info!("Stored {} slide images for {}", pages.len(), owner_id);
        Ok(pages.len())
    }

    /// Delete every image of an owner. Returns whether anything was removed.
    pub fn remove(&self, owner_id: &str) -> Result<bool> {
        let dir = self.owner_dir(owner_id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn file_name(number: usize) -> String {
    format!("{}.png", number)
}

/// `N` from an `N.png` file name.
fn image_number(name: &str) -> Option<usize> {
    let digits = name.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, ImageCache) {
        let dir = TempDir::new().unwrap();
        let cache = ImageCache::new(dir.path().join("slide-images"));
        (dir, cache)
    }

    fn touch(cache: &ImageCache, owner: &str, names: &[&str]) {
        let dir = cache.owner_dir(owner).unwrap();
        fs::create_dir_all(&dir).unwrap();
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_image_number() {
        assert_eq!(image_number("1.png"), Some(1));
        assert_eq!(image_number("12.png"), Some(12));
        assert_eq!(image_number("+1.png"), None);
        assert_eq!(image_number("page-1.png"), None);
        assert_eq!(image_number(".png"), None);
        assert_eq!(image_number("3.jpg"), None);
    }

    #[test]
    fn test_paths_are_one_based() {
        let cache = ImageCache::new("/mnt/volume/slide-images");
        assert_eq!(
            cache.image_path("deck_7", 0).unwrap(),
            PathBuf::from("/mnt/volume/slide-images/deck_7/1.png")
        );
    }

    #[test]
    fn test_from_layout() {
        let layout = StorageLayout::new("/mnt/volume");
        assert_eq!(
            ImageCache::from_layout(&layout).root(),
            Path::new("/mnt/volume/slide-images")
        );
    }

    #[test]
    fn test_empty_cache() {
        let (_dir, cache) = cache();
        assert_eq!(cache.count("deck").unwrap(), 0);
        assert!(!cache.exists("deck", 0));
        assert_eq!(cache.read("deck", 0).unwrap(), None);
    }

    #[test]
    fn test_count_reports_highest_numeral() {
        let (_dir, cache) = cache();
        touch(&cache, "deck", &["1.png", "2.png", "5.png", "notes.txt", ".3.png.partial"]);

        assert_eq!(cache.count("deck").unwrap(), 5);
        assert!(cache.exists("deck", 1));
        assert!(!cache.exists("deck", 2));
        assert!(cache.exists("deck", 4));
    }

    #[test]
    fn test_store_and_prune() {
        let (dir, cache) = cache();
        touch(&cache, "deck", &["1.png", "2.png", "3.png", "4.png"]);

        let pages: Vec<PathBuf> = (1..=2)
            .map(|i| {
                let page = dir.path().join(format!("page-{}.png", i));
                fs::write(&page, format!("page {}", i)).unwrap();
                page
            })
            .collect();

        assert_eq!(cache.store("deck", &pages).unwrap(), 2);
        assert_eq!(cache.count("deck").unwrap(), 2);
        assert_eq!(cache.read("deck", 1).unwrap().unwrap(), b"page 2");
        assert!(!cache.exists("deck", 2));
    }

    #[test]
    fn test_remove() {
        let (_dir, cache) = cache();
        touch(&cache, "deck", &["1.png"]);
        assert!(cache.remove("deck").unwrap());
        assert!(!cache.remove("deck").unwrap());
        assert_eq!(cache.count("deck").unwrap(), 0);
    }

    #[test]
    fn test_invalid_owner_is_rejected() {
        let (_dir, cache) = cache();
        assert!(cache.count("../deck").is_err());
        assert!(!cache.exists("../deck", 0));
    }
}
