use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tga", "tiff", "tif", "webp", "ico", "pnm", "pbm",
    "pgm", "ppm", "pam", "dds", "hdr", "exr", "ff", "qoi",
];

const COMIC_EXTENSIONS: &[&str] = &["cbz", "cbr", "zip"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_comic_file(path: &Path) -> bool {
    has_extension(path, COMIC_EXTENSIONS)
}

/// Gather comic archives from files and directories, in argument order,
/// each directory's contents in natural order.
pub fn collect_comics(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut comics = Vec::new();
    for path in paths {
        if path.is_dir() {
            scan_dir(path, recursive, &mut comics);
        } else if path.is_file() && is_comic_file(path) {
            comics.push(path.clone());
        } else {
            log::warn!("Skipping {}: not a comic archive", path.display());
        }
    }
    comics
}

fn scan_dir(dir: &Path, recursive: bool, dest: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        log::warn!("Cannot read directory {}", dir.display());
        return;
    };
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() && is_comic_file(&p) {
            files.push(p);
        } else if recursive && p.is_dir() {
            subdirs.push(p);
        }
    }

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    if !files.is_empty() {
        log::info!("Found {} comics in {}", files.len(), dir.display());
    }
    dest.extend(files);

    if recursive {
        subdirs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        for sub in subdirs {
            scan_dir(&sub, true, dest);
        }
    }
}

/// Human ordering: digit runs compare by value ("page2" < "page10"),
/// letters case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(a, b)
}
