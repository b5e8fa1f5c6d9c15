use std::path::PathBuf;

use clap::Parser;

use crate::cache_dir::CacheDir;
use crate::pool::{PoolConfig, DEFAULT_MAX_BYTES, DEFAULT_MIN_RESIDENT};

pub const HELP_KEYS: &str = "\
Key Bindings:
  Gallery
    Left / Right      : Previous / next comic
    a-z               : Jump to next comic starting with that letter
    Enter             : Open comic (Esc while extracting cancels)
    Esc               : Quit
  Reader
    Left / Right      : Previous / next view (or page, see 's')
    PageUp / PageDown : Previous / next page
    Home / End        : First / last page
    0-9, Enter        : Go to the typed page number (Backspace edits)
    s                 : Switch between view steps and page turns
    Esc               : Clear a typed page number, else back to gallery
    Wheel             : Zoom at cursor
    Double click      : Cycle zoom (width / height / 1:1)
    Drag              : Pan
";

#[derive(Parser)]
#[command(name = "comic-reader", about = "A CBZ/CBR comic reader", after_help = HELP_KEYS)]
pub struct Cli {
    /// Comic archives or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Memory budget for decoded pages (e.g. 200MB, 1GB). Default: 200MB, at most 10% of RAM.
    #[arg(short, long)]
    pub memory: Option<String>,

    /// Pages always kept decoded, whatever the memory budget
    #[arg(long, default_value_t = DEFAULT_MIN_RESIDENT)]
    pub min_resident: usize,

    /// Longest side of gallery cover thumbnails in pixels
    #[arg(long, default_value_t = 720)]
    pub thumb_dim: u32,

    /// Directory for extracted pages and covers (removed on exit)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Background page decode threads
    #[arg(short, long, default_value_t = 2)]
    pub workers: usize,
}

/// Everything the reader needs from the command line, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub comics: Vec<PathBuf>,
    pub pool: PoolConfig,
    pub thumb_dim: u32,
    pub cache_root: PathBuf,
    pub workers: usize,
}

impl Cli {
    pub fn into_config(self, comics: Vec<PathBuf>) -> Result<ReaderConfig, String> {
        let max_bytes = match &self.memory {
            Some(s) => parse_memory_budget(s)?,
            None => default_memory_budget(),
        };
        Ok(ReaderConfig {
            comics,
            pool: PoolConfig { max_bytes, min_resident: self.min_resident },
            thumb_dim: self.thumb_dim.max(1),
            cache_root: self.cache_dir.unwrap_or_else(CacheDir::default_root),
            workers: self.workers.max(1),
        })
    }
}

/// Parse sizes like `512MB`, `1.5GB` or a bare number of megabytes.
pub fn parse_memory_budget(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num, unit) = if let Some(num) = s.strip_suffix("GB") {
        (num, 1024u64 * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix("MB") {
        (num, 1024u64 * 1024)
    } else {
        (s.as_str(), 1024u64 * 1024)
    };
    let value: f64 = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid memory budget {s:?}, expected e.g. 512MB or 2GB"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("memory budget must be positive, got {s:?}"));
    }
    Ok((value * unit as f64) as u64)
}

pub fn default_memory_budget() -> u64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    capped_budget(sys.total_memory())
}

fn capped_budget(total_memory: u64) -> u64 {
    match total_memory / 10 {
        0 => DEFAULT_MAX_BYTES,
        tenth => tenth.min(DEFAULT_MAX_BYTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!(parse_memory_budget("512MB"), Ok(512 * 1024 * 1024));
        assert_eq!(parse_memory_budget(" 2gb "), Ok(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_memory_budget("1.5GB"), Ok(3 * 512 * 1024 * 1024));
        assert_eq!(parse_memory_budget("64"), Ok(64 * 1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_memory_budget("lots").is_err());
        assert!(parse_memory_budget("0MB").is_err());
        assert!(parse_memory_budget("-3GB").is_err());
    }

    #[test]
    fn default_budget_is_capped() {
        assert_eq!(capped_budget(64 * 1024 * 1024 * 1024), DEFAULT_MAX_BYTES);
        assert_eq!(capped_budget(1000 * 1024 * 1024), 100 * 1024 * 1024);
        assert_eq!(capped_budget(0), DEFAULT_MAX_BYTES);
    }

    #[test]
    fn cli_resolves_into_config() {
        let cli = Cli::try_parse_from([
            "comic-reader",
            "--memory",
            "300MB",
            "--min-resident",
            "5",
            "--cache-dir",
            "/tmp/x",
            "library",
        ])
        .unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("library")]);

        let config = cli.into_config(vec![PathBuf::from("library/a.cbz")]).unwrap();
        assert_eq!(config.pool, PoolConfig { max_bytes: 300 * 1024 * 1024, min_resident: 5 });
        assert_eq!(config.cache_root, PathBuf::from("/tmp/x"));
        assert_eq!(config.thumb_dim, 720);
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn paths_are_required() {
        assert!(Cli::try_parse_from(["comic-reader"]).is_err());
    }
}
