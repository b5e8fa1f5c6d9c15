//! A single comic archive.
//!
//! Scanning only extracts the cover, so a whole library can be listed
//! cheaply; `load` extracts every page into the comic's own cache
//! directory and `unload` removes it again.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::{Archive, ArchiveEntry, ArchiveError};
use crate::cache_dir::CacheDir;
use crate::cancel::CancellationToken;
use crate::files::natural_cmp;
use crate::thumbnail::save_thumbnail;

#[derive(Debug, Error)]
pub enum ComicError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("cache directory {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{path} contains no images")]
    NoImages { path: PathBuf },
    #[error("unable to write cover {path}: {source}")]
    Thumbnail { path: PathBuf, source: image::ImageError },
    #[error("opening {name} was cancelled")]
    Cancelled { name: String },
}

#[derive(Debug, Clone)]
pub struct Comic {
    path: PathBuf,
    name: String,
    page_count: usize,
    cover: PathBuf,
    pages: Vec<PathBuf>,
}

fn natural_entry_order(a: &ArchiveEntry, b: &ArchiveEntry) -> std::cmp::Ordering {
    natural_cmp(&a.path.to_string_lossy(), &b.path.to_string_lossy())
}

impl Comic {
    /// Count the pages of an archive and write its cover thumbnail.
    pub fn scan(path: &Path, cache: &CacheDir, thumb_dim: u32) -> Result<Self, ComicError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let mut archive = Archive::open(path)?;
        let images = archive.image_entries()?;
        let Some(first) = images.iter().min_by(|a, b| natural_entry_order(a, b)) else {
            return Err(ComicError::NoImages { path: path.to_path_buf() });
        };

        let ext = first
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cover = cache.cover_path(&name, &ext);
        archive.extract(first, &cover)?;
        save_thumbnail(&cover, &cover, thumb_dim)
            .map_err(|source| ComicError::Thumbnail { path: cover.clone(), source })?;

        log::info!("Scanned {}: {} pages", path.display(), images.len());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            page_count: images.len(),
            cover,
            pages: Vec::new(),
        })
    }

    /// Extract every page. `progress` receives (done, total) after each one.
    /// Cancelling `token` stops before the next page and removes what was
    /// extracted so far.
    pub fn load(
        &mut self,
        cache: &CacheDir,
        token: &CancellationToken,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<(), ComicError> {
        self.unload(cache)?;

        let mut archive = Archive::open(&self.path)?;
        let mut images = archive.image_entries()?;
        if images.is_empty() {
            return Err(ComicError::NoImages { path: self.path.clone() });
        }
        images.sort_by(natural_entry_order);

        let dir = cache.comic_dir(&self.name);
        let total = images.len();
        let mut pages = Vec::with_capacity(total);
        for (i, entry) in images.iter().enumerate() {
            if token.is_cancelled() {
                log::info!("Cancelled opening {} after {} of {} pages", self.name, i, total);
                self.unload(cache)?;
                return Err(ComicError::Cancelled { name: self.name.clone() });
            }
            let dest = dir.join(&entry.path);
            archive.extract(entry, &dest)?;
            pages.push(dest);
            progress(i + 1, total);
        }

        log::info!("Opened {} ({} pages) into {}", self.name, total, dir.display());
        self.page_count = total;
        self.pages = pages;
        Ok(())
    }

    pub fn unload(&mut self, cache: &CacheDir) -> Result<(), ComicError> {
        self.pages.clear();
        cache.remove_comic(&self.name).map_err(|source| ComicError::Io {
            path: cache.comic_dir(&self.name),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.page_count
    }

    pub fn is_empty(&self) -> bool {
        self.page_count == 0
    }

    pub fn cover(&self) -> &Path {
        &self.cover
    }

    /// Extracted page files in reading order; empty until loaded.
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn is_loaded(&self) -> bool {
        !self.pages.is_empty()
    }
}
