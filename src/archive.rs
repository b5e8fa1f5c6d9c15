//! Reading comic archives.
//!
//! CBZ files are zip containers. CBR files are usually RAR, but many are
//! zip containers with the wrong extension, so the backend is chosen from
//! the file's first bytes rather than its name.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::files::is_image_file;

const RAR_MAGIC: &[u8; 6] = b"Rar!\x1a\x07";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unable to open archive {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("{path} is not a supported archive: {reason}")]
    Format { path: PathBuf, reason: String },
    #[error("unable to read {entry} from {archive}: {reason}")]
    Entry { archive: PathBuf, entry: PathBuf, reason: String },
    #[error("unable to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in archive order, counting skipped entries too.
    pub index: usize,
    /// Relative path inside the archive, guaranteed not to escape it.
    pub path: PathBuf,
    pub size: u64,
    pub is_file: bool,
}

enum Backend {
    Zip(ZipArchive<BufReader<File>>),
    /// unrar works on paths, so every operation reopens the file.
    Rar,
}

pub struct Archive {
    path: PathBuf,
    backend: Backend,
}

fn entry_error(archive: &Path, entry: &Path, reason: impl Display) -> ArchiveError {
    ArchiveError::Entry { archive: archive.to_path_buf(), entry: entry.to_path_buf(), reason: reason.to_string() }
}

fn starts_with_rar_magic(file: &mut File) -> io::Result<bool> {
    let mut magic = [0u8; 6];
    let found = match file.read_exact(&mut magic) {
        Ok(()) => &magic == RAR_MAGIC,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };
    file.rewind()?;
    Ok(found)
}

/// `path` made relative with only normal components, or `None` if it is
/// absolute or climbs out with `..`.
fn enclosed(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let open_error = |source| ArchiveError::Open { path: path.to_path_buf(), source };
        let format_error = |reason: String| ArchiveError::Format { path: path.to_path_buf(), reason };

        let mut file = File::open(path).map_err(open_error)?;
        let backend = if starts_with_rar_magic(&mut file).map_err(open_error)? {
            drop(file);
            unrar::Archive::new(path)
                .open_for_listing()
                .map_err(|e| format_error(e.to_string()))?;
            Backend::Rar
        } else {
            let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| format_error(e.to_string()))?;
            Backend::Zip(zip)
        };
        Ok(Self { path: path.to_path_buf(), backend })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_rar(&self) -> bool {
        matches!(self.backend, Backend::Rar)
    }

    /// Every entry with a safe relative name, in archive order.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        match &mut self.backend {
            Backend::Zip(zip) => zip_entries(&self.path, zip),
            Backend::Rar => rar_entries(&self.path),
        }
    }

    /// Regular files that look like images.
    pub fn image_entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.is_file && is_image_file(&e.path))
            .collect())
    }

    /// Write an entry's content to `dest`, creating parent directories.
    /// A partially written file is removed on failure.
    pub fn extract(&mut self, entry: &ArchiveEntry, dest: &Path) -> Result<u64, ArchiveError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Write { path: parent.to_path_buf(), source })?;
        }
        let out = File::create(dest).map_err(|source| ArchiveError::Write { path: dest.to_path_buf(), source })?;
        let mut out = BufWriter::new(out);

        let copied = match &mut self.backend {
            Backend::Zip(zip) => match zip.by_index(entry.index) {
                Ok(mut file) => io::copy(&mut file, &mut out).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            },
            Backend::Rar => read_rar_entry(&self.path, entry.index)
                .and_then(|bytes| io::copy(&mut bytes.as_slice(), &mut out).map_err(|e| e.to_string())),
        }
        .and_then(|n| out.flush().map(|_| n).map_err(|e| e.to_string()));

        match copied {
            Ok(n) => Ok(n),
            Err(reason) => {
                drop(out);
                let _ = fs::remove_file(dest);
                Err(entry_error(&self.path, &entry.path, reason))
            }
        }
    }
}

fn zip_entries(path: &Path, zip: &mut ZipArchive<BufReader<File>>) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let file = zip
            .by_index(index)
            .map_err(|e| entry_error(path, Path::new(&format!("#{index}")), e))?;
        let Some(name) = file.enclosed_name().map(|p| p.to_path_buf()) else {
            log::warn!("Skipping unsafe entry {:?} in {}", file.name(), path.display());
            continue;
        };
        entries.push(ArchiveEntry { index, path: name, size: file.size(), is_file: file.is_file() });
    }
    Ok(entries)
}

fn rar_entries(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let listing = unrar::Archive::new(path)
        .open_for_listing()
        .map_err(|e| ArchiveError::Format { path: path.to_path_buf(), reason: e.to_string() })?;
    let mut entries = Vec::new();
    for (index, header) in listing.enumerate() {
        let header = header.map_err(|e| entry_error(path, Path::new(&format!("#{index}")), e))?;
        let Some(name) = enclosed(&header.filename) else {
            log::warn!("Skipping unsafe entry {:?} in {}", header.filename, path.display());
            continue;
        };
        entries.push(ArchiveEntry { index, path: name, size: header.unpacked_size, is_file: header.is_file() });
    }
    Ok(entries)
}

/// Walk the headers up to entry `index` and read it into memory.
fn read_rar_entry(path: &Path, index: usize) -> Result<Vec<u8>, String> {
    let mut archive = unrar::Archive::new(path).open_for_processing().map_err(|e| e.to_string())?;
    let mut current = 0;
    while let Some(header) = archive.read_header().map_err(|e| e.to_string())? {
        if current == index {
            let (bytes, _) = header.read().map_err(|e| e.to_string())?;
            return Ok(bytes);
        }
        archive = header.skip().map_err(|e| e.to_string())?;
        current += 1;
    }
    Err(format!("no entry #{index}"))
}
