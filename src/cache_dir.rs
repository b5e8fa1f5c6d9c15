use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// On-disk extraction cache. Covers live at the root, each opened comic
/// gets its own subdirectory. The whole tree is removed when the value
/// is dropped.
#[derive(Debug)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("comicReaderCache")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    pub fn comic_dir(&self, stem: &str) -> PathBuf {
        self.root.join(stem)
    }

    pub fn cover_path(&self, stem: &str, ext: &str) -> PathBuf {
        if ext.is_empty() {
            self.root.join(format!("{stem}_Cover"))
        } else {
            self.root.join(format!("{stem}_Cover.{ext}"))
        }
    }

    pub fn remove_comic(&self, stem: &str) -> io::Result<()> {
        remove_tree(&self.comic_dir(stem))
    }

    pub fn cleanup(&self) -> io::Result<()> {
        remove_tree(&self.root)?;
        log::info!("Removed cache directory {}", self.root.display());
        Ok(())
    }
}

impl Drop for CacheDir {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("Failed to remove {}: {}", self.root.display(), e);
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let cache = CacheDir::new(&root);
        assert_eq!(cache.comic_dir("Vol 1"), root.join("Vol 1"));
        assert_eq!(cache.cover_path("Vol 1", "jpg"), root.join("Vol 1_Cover.jpg"));
        assert_eq!(cache.cover_path("x", ""), root.join("x_Cover"));
    }

    #[test]
    fn removes_comic_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::new(dir.path().join("cache"));
        cache.create().unwrap();

        let comic = cache.comic_dir("a");
        fs::create_dir_all(comic.join("sub")).unwrap();
        fs::write(comic.join("sub/1.png"), b"x").unwrap();
        cache.remove_comic("a").unwrap();
        assert!(!comic.exists());
        assert!(cache.root().exists());

        cache.remove_comic("never-opened").unwrap();
    }

    #[test]
    fn drop_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        {
            let cache = CacheDir::new(&root);
            cache.create().unwrap();
            fs::write(cache.cover_path("a", "png"), b"x").unwrap();
        }
        assert!(!root.exists());
    }
}
