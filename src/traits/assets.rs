use anyhow::Result;

use crate::loaders::texture::TextureData;
use crate::model::Model;

/// Source of scene data files, addressed by paths relative to a data root
pub trait AssetProvider {
    /// Load and decode a 3D model
    fn load_model(&self, path: &str) -> Result<Model>;

    /// Read shader source text
    fn load_shader(&self, path: &str) -> Result<String>;

    /// Load and decode an image to RGBA8
    fn load_texture(&self, path: &str) -> Result<TextureData>;
}
