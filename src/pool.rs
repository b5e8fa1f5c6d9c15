//! Decoded-bitmap pool with a memory budget.
//!
//! Paths are registered up front; pixels are decoded on first use and
//! released again when the LRU bookkeeping in [`EvictionCache`] decides the
//! page has gone unused for longest and the pool is over budget.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::files::is_image_file;
use crate::lru::EvictionCache;
use crate::viewport::Size;

/// Decoded pixels are kept as packed RGB.
pub const BYTES_PER_PIXEL: u64 = 3;

pub const DEFAULT_MAX_BYTES: u64 = 200 * 1024 * 1024;
pub const DEFAULT_MIN_RESIDENT: usize = 3;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("image index {index} out of range (pool holds {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("{path} has no pixels")]
    EmptyImage { path: PathBuf },
    #[error("{path} is not an image file")]
    NotAnImage { path: PathBuf },
}

#[derive(Debug)]
pub struct DecodedImage {
    pub rgb_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
}

impl DecodedImage {
    /// Estimated memory cost; decoder overhead is ignored.
    pub fn weight(&self) -> u64 {
        self.width as u64 * self.height as u64 * BYTES_PER_PIXEL
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// The codec: turn a file into pixels.
pub trait Decode {
    fn decode(&self, path: &Path) -> Result<DecodedImage, PoolError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl Decode for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, PoolError> {
        let file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let img = image::open(path).map_err(|e| PoolError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(DecodedImage { rgb_bytes: rgb.into_raw(), width, height, file_size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_bytes: u64,
    pub min_resident: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_BYTES, min_resident: DEFAULT_MIN_RESIDENT }
    }
}

struct Entry {
    path: PathBuf,
    image: Option<Arc<DecodedImage>>,
}

pub struct ImagePool<D = ImageDecoder> {
    decoder: D,
    entries: Vec<Entry>,
    lru: EvictionCache<usize, u64>,
}

impl ImagePool<ImageDecoder> {
    pub fn new(config: PoolConfig) -> Self {
        Self::with_decoder(config, ImageDecoder)
    }
}

impl<D: Decode> ImagePool<D> {
    pub fn with_decoder(config: PoolConfig, decoder: D) -> Self {
        Self {
            decoder,
            entries: Vec::new(),
            lru: EvictionCache::new(config.max_bytes, config.min_resident),
        }
    }

    /// Register a path at the next index. Nothing is decoded yet.
    pub fn add_image(&mut self, path: impl Into<PathBuf>) -> Result<usize, PoolError> {
        let path = path.into();
        if !is_image_file(&path) {
            return Err(PoolError::NotAnImage { path });
        }
        self.entries.push(Entry { path, image: None });
        Ok(self.entries.len() - 1)
    }

    /// Observe evictions, e.g. to drop anything derived from a bitmap.
    pub fn add_eviction_hook(&mut self, hook: impl FnMut(&usize) + Send + 'static) {
        self.lru.add_eviction_hook(hook);
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self, index: usize) -> Result<&Path, PoolError> {
        Ok(&self.entry(index)?.path)
    }

    /// Natural pixel dimensions; decodes the image if it is not resident.
    pub fn size(&mut self, index: usize) -> Result<Size, PoolError> {
        Ok(self.load(index)?.size())
    }

    /// Decoded pixels; decodes the image if it is not resident.
    pub fn bitmap(&mut self, index: usize) -> Result<Arc<DecodedImage>, PoolError> {
        self.load(index)
    }

    pub fn is_resident(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.image.is_some())
    }

    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| e.image.is_some()).count()
    }

    pub fn resident_bytes(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|e| e.image.as_ref())
            .map(|img| img.weight())
            .sum()
    }

    /// Path to decode if `index` is not resident. A resident image only has
    /// its recency refreshed.
    pub fn pending_path(&mut self, index: usize) -> Result<Option<PathBuf>, PoolError> {
        let entry = self.entry(index)?;
        match &entry.image {
            Some(image) => {
                let weight = image.weight();
                self.hit(index, weight);
                Ok(None)
            }
            None => Ok(Some(entry.path.clone())),
        }
    }

    /// Make a decoded image resident at `index`, possibly evicting others.
    ///
    /// The returned handle stays valid even if `index` itself is evicted
    /// straight away.
    pub fn install(&mut self, index: usize, decoded: DecodedImage) -> Result<Arc<DecodedImage>, PoolError> {
        let entry = self.entry(index)?;
        if decoded.width == 0 || decoded.height == 0 {
            return Err(PoolError::EmptyImage { path: entry.path.clone() });
        }
        if let Some(existing) = &entry.image {
            let existing = Arc::clone(existing);
            self.hit(index, existing.weight());
            return Ok(existing);
        }
        let image = Arc::new(decoded);
        let weight = image.weight();
        self.entries[index].image = Some(Arc::clone(&image));
        self.hit(index, weight);
        Ok(image)
    }

    fn load(&mut self, index: usize) -> Result<Arc<DecodedImage>, PoolError> {
        if let Some(image) = self.entry(index)?.image.clone() {
            self.hit(index, image.weight());
            return Ok(image);
        }
        let path = self.entries[index].path.clone();
        log::debug!("decoding page {} from {}", index, path.display());
        let decoded = self.decoder.decode(&path)?;
        self.install(index, decoded)
    }

    fn unload(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.image = None;
        }
    }

    fn hit(&mut self, index: usize, weight: u64) {
        for evicted in self.lru.hit(index, weight) {
            log::debug!("evicting page {}", evicted);
            self.unload(evicted);
        }
    }

    fn entry(&self, index: usize) -> Result<&Entry, PoolError> {
        self.entries.get(index).ok_or(PoolError::OutOfRange { index, len: self.entries.len() })
    }
}
