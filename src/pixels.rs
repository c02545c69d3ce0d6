use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::imageops::FilterType;

/// Square premultiplied BGRA image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconPixels {
    pub size: u32,
    pub bgra: Vec<u8>,
}

impl IconPixels {
    pub fn new(size: u32, bgra: Vec<u8>) -> Result<Self> {
        ensure!(
            bgra.len() == (size as usize) * (size as usize) * 4,
            "pixel buffer of {} bytes does not match {size}x{size}",
            bgra.len()
        );
        Ok(Self { size, bgra })
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.bgra.chunks_exact(4).all(|p| p[3] == 0)
    }
}

/// Decodes an image file and scales it to `size` x `size`.
pub fn load_png(path: &Path, size: u32) -> Result<IconPixels> {
    let img = image::open(path).with_context(|| format!("decode {}", path.display()))?;
    let mut rgba = img.to_rgba8();
    if rgba.width() != size || rgba.height() != size {
        rgba = image::imageops::resize(&rgba, size, size, FilterType::Lanczos3);
    }
    IconPixels::new(size, rgba_to_premultiplied_bgra(rgba.as_raw()))
}

/// Legacy icons drawn into a 32-bit surface leave alpha at zero. When no
/// pixel carries alpha, every non-black pixel is made opaque.
pub fn fill_missing_alpha(bgra: &mut [u8]) {
    if bgra.chunks_exact(4).any(|p| p[3] != 0) {
        return;
    }
    for p in bgra.chunks_exact_mut(4) {
        if p[0] != 0 || p[1] != 0 || p[2] != 0 {
            p[3] = 255;
        }
    }
}

pub fn rgba_to_premultiplied_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        let a = px[3] as u16;
        let mul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
        out.extend_from_slice(&[mul(px[2]), mul(px[1]), mul(px[0]), px[3]]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiplies_and_swaps_channels() {
        let out = rgba_to_premultiplied_bgra(&[255, 128, 0, 255, 200, 100, 50, 0, 255, 255, 255, 128]);
        assert_eq!(out, vec![0, 128, 255, 255, 0, 0, 0, 0, 128, 128, 128, 128]);
    }

    #[test]
    fn fills_alpha_only_when_absent() {
        let mut legacy = vec![10, 20, 30, 0, 0, 0, 0, 0];
        fill_missing_alpha(&mut legacy);
        assert_eq!(legacy, vec![10, 20, 30, 255, 0, 0, 0, 0]);
        let mut modern = vec![10, 20, 30, 0, 5, 5, 5, 40];
        fill_missing_alpha(&mut modern);
        assert_eq!(modern, vec![10, 20, 30, 0, 5, 5, 5, 40]);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(IconPixels::new(2, vec![0; 15]).is_err());
        assert!(IconPixels::new(2, vec![0; 16]).unwrap().is_blank());
    }

    #[test]
    fn loads_and_scales_png() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("logo.png");
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();
        let px = load_png(&path, 16).unwrap();
        assert_eq!(px.size, 16);
        assert_eq!(px.bgra.len(), 16 * 16 * 4);
        assert_eq!(px.bgra[3], 255);
        assert!(px.bgra[0].abs_diff(30) <= 1 && px.bgra[2].abs_diff(10) <= 1);
    }
}
