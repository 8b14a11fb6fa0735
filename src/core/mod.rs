pub mod assets;
pub mod benchmark;
pub mod canvas;
pub mod clock;
pub mod gpu_context;
pub mod null_device;
pub mod options;
pub mod reflect;
pub mod scene_base;
pub mod wgpu_device;
