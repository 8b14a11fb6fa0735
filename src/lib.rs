pub mod cli;
pub mod config;
pub mod core;
pub mod loaders;
pub mod mesh;
pub mod model;
pub mod scenes;
pub mod shader;
pub mod traits;

pub use scenes::{BumpRender, BumpScene};
