pub mod gltf;
pub mod texture;

pub use self::gltf::load_gltf_model;
pub use texture::{load_texture, TextureData};
