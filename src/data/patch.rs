// ============================================================
// Layer 4 — Patch Decoding
// ============================================================
// Decodes an image file into a square RGB patch stored as a
// CHW u8 buffer [3 * size * size]. Patches stay u8 in memory
// and are scaled to [0, 1] floats only when a batch is built.

use anyhow::{Context, Result};
use image::{imageops::FilterType, ImageReader, RgbImage};
use std::path::Path;

pub const CHANNELS: usize = 3;

/// Load `path`, resize to `size` x `size` and return it as CHW bytes.
pub fn load_patch(path: &Path, size: usize) -> Result<Vec<u8>> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Cannot open image '{}'", path.display()))?
        .decode()
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?
        .resize_exact(size as u32, size as u32, FilterType::Triangle)
        .to_rgb8();

    Ok(to_chw(&img))
}

/// Reorder interleaved RGB pixels into planar CHW layout.
pub fn to_chw(img: &RgbImage) -> Vec<u8> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let plane = w * h;
    let mut out = vec![0u8; CHANNELS * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let idx = y as usize * w + x as usize;
        for c in 0..CHANNELS {
            out[c * plane + idx] = pixel[c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_to_chw_layout() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([1, 2, 3]));
        img.put_pixel(1, 0, Rgb([4, 5, 6]));
        assert_eq!(to_chw(&img), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_load_patch_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        RgbImage::from_pixel(10, 6, Rgb([255, 0, 0])).save(&path).unwrap();

        let patch = load_patch(&path, 4).unwrap();
        assert_eq!(patch.len(), CHANNELS * 4 * 4);
        assert!(patch[..16].iter().all(|&v| v == 255));
        assert!(patch[16..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_patch(&dir.path().join("missing.png"), 4).is_err());
    }
}
