use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::loaders::{load_gltf_model, load_texture, TextureData};
use crate::model::Model;
use crate::traits::assets::AssetProvider;

/// Assets read from a data directory on disk
#[derive(Debug, Clone)]
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetProvider for FileAssets {
    fn load_model(&self, path: &str) -> Result<Model> {
        load_gltf_model(self.resolve(path))
    }

    fn load_shader(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read shader: {}", full.display()))
    }

    fn load_texture(&self, path: &str) -> Result<TextureData> {
        load_texture(self.resolve(path))
    }
}

/// Assets held in memory, keyed by the same relative paths
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    models: HashMap<String, Model>,
    shaders: HashMap<String, String>,
    textures: HashMap<String, TextureData>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, path: &str, model: Model) -> Self {
        self.models.insert(path.to_string(), model);
        self
    }

    pub fn with_shader(mut self, path: &str, source: &str) -> Self {
        self.shaders.insert(path.to_string(), source.to_string());
        self
    }

    pub fn with_texture(mut self, path: &str, texture: TextureData) -> Self {
        self.textures.insert(path.to_string(), texture);
        self
    }
}

impl AssetProvider for MemoryAssets {
    fn load_model(&self, path: &str) -> Result<Model> {
        self.models
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No model registered at {}", path))
    }

    fn load_shader(&self, path: &str) -> Result<String> {
        self.shaders
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No shader registered at {}", path))
    }

    fn load_texture(&self, path: &str) -> Result<TextureData> {
        self.textures
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No texture registered at {}", path))
    }
}
