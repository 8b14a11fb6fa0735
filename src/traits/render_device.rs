use glam::{Mat4, Vec3, Vec4};

use crate::core::reflect::ShaderError;
use crate::loaders::texture::TextureData;

/// Linked shader program owned by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Vertex buffer owned by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Texture object name. Zero is never allocated, so a default handle is
/// always safe to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const NONE: TextureHandle = TextureHandle(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Parameters for creating a texture from image data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    /// Number of mip levels to generate; 0 means the base level only
    pub mipmaps: u32,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            mipmaps: 0,
        }
    }
}

/// Value loaded into a named program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Size in bytes of the value as laid out in a uniform block
    pub fn byte_len(&self) -> usize {
        match self {
            UniformValue::Int(_) | UniformValue::Float(_) => 4,
            UniformValue::Vec3(_) => 12,
            UniformValue::Vec4(_) => 16,
            UniformValue::Mat4(_) => 64,
        }
    }

    /// Little-endian bytes in column-major order
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Int(v) => v.to_le_bytes().to_vec(),
            UniformValue::Float(v) => v.to_le_bytes().to_vec(),
            UniformValue::Vec3(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            UniformValue::Vec4(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        }
    }
}

/// One attribute inside an interleaved vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location the attribute feeds
    pub location: u32,
    /// Number of f32 components
    pub components: u32,
    /// Byte offset inside one vertex
    pub offset: u32,
}

/// Interleaved vertex layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// GL-style graphics device the scenes render through
///
/// Programs are addressed by name-based uniform and attribute lookups, the
/// active program is implicit state, and textures are bound to numbered units.
pub trait RenderDevice {
    /// Compile both stages and link them into a program
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError>;

    /// Release a program; unknown ids are ignored
    fn delete_program(&mut self, program: ProgramId);

    /// Input location of a vertex attribute, None if the program has no such input
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    /// Make a program active, or deactivate with None
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Load a uniform value into a program. Unknown names are ignored.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    /// Upload interleaved vertex data
    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId;

    /// Release a vertex buffer; unknown ids are ignored
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Upload a texture; never returns TextureHandle::NONE
    fn create_texture(&mut self, image: &TextureData, params: TextureParams) -> TextureHandle;

    /// Attach a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Release a texture; NONE and unknown handles are ignored
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Draw a non-indexed triangle list with the active program
    fn draw_arrays(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32);

    /// Clear the render target for a new frame
    fn begin_frame(&mut self);

    /// Finish all work for the current frame
    fn end_frame(&mut self);
}
