//! A CBZ/CBR comic reader: a cover gallery and a page reader over a
//! memory-bounded pool of decoded pages.

pub mod archive;
pub mod cache_dir;
pub mod cancel;
pub mod cli;
pub mod comic;
pub mod files;
pub mod fuzzy;
pub mod gallery;
pub mod gesture;
pub mod loader;
pub mod lru;
pub mod navigator;
pub mod pool;
pub mod thumbnail;
pub mod ui;
pub mod viewport;
