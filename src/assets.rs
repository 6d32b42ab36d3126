use crate::error::{Error, Result};
use ash::vk;
use std::path::{Path, PathBuf};

/// Read-only view over the directory the samples load their assets from.
#[derive(Clone, Debug)]
pub struct AssetManager {
    root: PathBuf,
}

impl AssetManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn open(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        std::fs::read(&path).map_err(|source| Error::Asset { path, source })
    }
}

/// Decoded texture, always tightly packed RGBA8.
pub struct Texture {
    pub pixels: Vec<u8>,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
}

impl Texture {
    pub fn load(assets: &AssetManager, name: &str) -> Result<Texture> {
        let bytes = assets.open(name)?;
        let texture = Texture::decode(&bytes)?;
        log::debug!(
            "Decoded {} ({}x{})",
            name,
            texture.extent.width,
            texture.extent.height
        );
        Ok(texture)
    }

    pub fn decode(bytes: &[u8]) -> Result<Texture> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let extent = vk::Extent3D {
            width: image.width(),
            height: image.height(),
            depth: 1,
        };

        Ok(Texture {
            pixels: image.into_raw(),
            format: vk::Format::R8G8B8A8_UNORM,
            extent,
        })
    }

    pub fn row_pitch(&self) -> usize {
        self.extent.width as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(image: &image::RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decode_expands_rgb_to_rgba() {
        let image = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let texture = Texture::decode(&encode_png(&image)).unwrap();

        assert_eq!(texture.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(texture.extent.width, 3);
        assert_eq!(texture.extent.height, 2);
        assert_eq!(texture.extent.depth, 1);
        assert_eq!(texture.row_pitch(), 12);
        assert_eq!(texture.pixels.len(), 3 * 2 * 4);
        assert_eq!(&texture.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            Texture::decode(b"definitely not a png"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn missing_asset_reports_path() {
        let assets = AssetManager::new(std::env::temp_dir().join("vk_samples_missing_assets"));
        match assets.open("vulkan.png") {
            Err(Error::Asset { path, .. }) => assert!(path.ends_with("vulkan.png")),
            other => panic!("unexpected result: {:?}", other.map(|bytes| bytes.len())),
        }
    }

    #[test]
    fn bundled_texture_loads() {
        let assets = AssetManager::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"));
        let texture = Texture::load(&assets, "vulkan.png").unwrap();
        assert_eq!(
            texture.pixels.len(),
            texture.row_pitch() * texture.extent.height as usize
        );
    }
}
