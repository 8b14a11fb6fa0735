use anyhow::{Context, Result};
use std::path::Path;

/// Decoded image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA8
}

impl TextureData {
    /// Single-colour image, used for fallbacks and fixtures
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self { width, height, data }
    }
}

/// Decodes an image file to RGBA8
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    let img = image::open(path).with_context(|| format!("Failed to load texture: {}", path.display()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!("Loaded texture {}: {}x{}", path.display(), width, height);

    Ok(TextureData {
        width,
        height,
        data: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_fills_every_pixel() {
        let image = TextureData::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(image.data.len(), 3 * 2 * 4);
        assert!(image.data.chunks(4).all(|px| px == [1, 2, 3, 4]));
    }

    fn temp_png(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bump-bench-{}-{}.png", name, std::process::id()))
    }

    #[test]
    fn decodes_rgba_png() {
        let pixels = vec![
            255, 0, 0, 255, 0, 255, 0, 128, //
            0, 0, 255, 0, 10, 20, 30, 40, //
            1, 2, 3, 4, 5, 6, 7, 8,
        ];
        let path = temp_png("rgba");
        image::RgbaImage::from_raw(2, 3, pixels.clone())
            .unwrap()
            .save(&path)
            .unwrap();

        let texture = load_texture(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.data, pixels);
    }

    #[test]
    fn rgb_png_gains_opaque_alpha() {
        let path = temp_png("rgb");
        image::RgbImage::from_raw(1, 2, vec![128, 128, 255, 64, 32, 16])
            .unwrap()
            .save(&path)
            .unwrap();

        let texture = load_texture(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((texture.width, texture.height), (1, 2));
        assert_eq!(texture.data, vec![128, 128, 255, 255, 64, 32, 16, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_texture("does/not/exist.png").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.png"));
    }
}
