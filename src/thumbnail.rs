use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageResult};

/// Target dimensions for an image whose longest side must not exceed
/// `max_dim`, or `None` when it already fits.
pub fn fit_within(width: u32, height: u32, max_dim: u32) -> Option<(u32, u32)> {
    let max_axis = width.max(height);
    if max_dim == 0 || max_axis < max_dim {
        return None;
    }
    let scale = max_dim as f64 / max_axis as f64;
    let next_width = (width as f64 * scale).round().max(1.0) as u32;
    let next_height = (height as f64 * scale).round().max(1.0) as u32;
    Some((next_width, next_height))
}

/// Write a copy of `src` to `dest` whose longest side is at most `max_dim`.
/// `src` and `dest` may be the same file.
pub fn save_thumbnail(src: &Path, dest: &Path, max_dim: u32) -> ImageResult<()> {
    let img = image::open(src)?;
    let (width, height) = img.dimensions();

    let Some((w, h)) = fit_within(width, height, max_dim) else {
        if src != dest {
            fs::copy(src, dest)?;
        }
        return Ok(());
    };

    log::debug!("Thumbnail {}: {}x{} -> {}x{}", src.display(), width, height, w, h);
    let resized = img.resize_exact(w, h, FilterType::Lanczos3);
    DynamicImage::ImageRgb8(resized.to_rgb8()).save(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_within(2000, 1000, 720), Some((720, 360)));
        assert_eq!(fit_within(1000, 3000, 720), Some((240, 720)));
        assert_eq!(fit_within(720, 100, 720), Some((720, 100)));
        assert_eq!(fit_within(719, 100, 720), None);
        assert_eq!(fit_within(5000, 1, 720), Some((720, 1)));
    }

    #[test]
    fn large_image_is_rescaled_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        image::RgbImage::new(400, 200).save(&path).unwrap();

        save_thumbnail(&path, &path, 100).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (100, 50));
    }

    #[test]
    fn small_image_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("small.png");
        let dest = dir.path().join("thumb.png");
        image::RgbImage::new(30, 40).save(&src).unwrap();

        save_thumbnail(&src, &dest, 100).unwrap();
        assert_eq!(fs::read(&src).unwrap(), fs::read(&dest).unwrap());
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.png");
        fs::write(&src, b"not a png").unwrap();
        assert!(save_thumbnail(&src, &src, 100).is_err());
    }
}
