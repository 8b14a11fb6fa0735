use std::cell::RefCell;
use std::collections::HashMap;

use crate::core::reflect::{ProgramReflection, ShaderError};
use crate::loaders::texture::TextureData;
use crate::traits::render_device::{
    BufferId, ProgramId, RenderDevice, TextureHandle, TextureParams, UniformValue, VertexLayout,
};

/// A call made against a [`NullDevice`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceOp {
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    AttributeLookup { program: ProgramId, name: String },
    UseProgram(Option<ProgramId>),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    CreateBuffer { buffer: BufferId, floats: usize },
    DeleteBuffer(BufferId),
    CreateTexture { texture: TextureHandle, width: u32, height: u32, params: TextureParams },
    BindTexture { unit: u32, texture: TextureHandle },
    DeleteTexture(TextureHandle),
    Draw { buffer: BufferId, program: Option<ProgramId>, layout: VertexLayout, vertex_count: u32 },
    BeginFrame,
    EndFrame,
}

/// Device that renders nothing
///
/// Programs are still parsed and linked so name lookups behave like a real
/// device. Every call is optionally recorded for inspection.
#[derive(Debug, Default)]
pub struct NullDevice {
    record: bool,
    ops: RefCell<Vec<DeviceOp>>,
    programs: HashMap<ProgramId, ProgramReflection>,
    uniforms: HashMap<(ProgramId, String), UniformValue>,
    buffers: HashMap<BufferId, usize>,
    textures: HashMap<TextureHandle, TextureParams>,
    units: HashMap<u32, TextureHandle>,
    active: Option<ProgramId>,
    next_id: u32,
    frames: u64,
    draws: u64,
}

impl NullDevice {
    /// Recording device, for inspecting what a scene asked for
    pub fn new() -> Self {
        Self {
            record: true,
            ..Default::default()
        }
    }

    /// Device that only keeps counters, for long unattended runs
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<DeviceOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&mut self) {
        self.ops.borrow_mut().clear();
    }

    /// Last value loaded into a uniform the program actually declares
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.uniforms.get(&(program, name.to_string())).copied()
    }

    pub fn program(&self, program: ProgramId) -> Option<&ProgramReflection> {
        self.programs.get(&program)
    }

    pub fn active_program(&self) -> Option<ProgramId> {
        self.active
    }

    pub fn bound_texture(&self, unit: u32) -> TextureHandle {
        self.units.get(&unit).copied().unwrap_or_default()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn push(&self, op: DeviceOp) {
        if self.record {
            self.ops.borrow_mut().push(op);
        }
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for NullDevice {
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        let reflection = ProgramReflection::link(vertex_source, fragment_source)?;
        let program = ProgramId(self.allocate());
        self.programs.insert(program, reflection);
        self.push(DeviceOp::CreateProgram(program));
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            self.uniforms.retain(|(owner, _), _| *owner != program);
            if self.active == Some(program) {
                self.active = None;
            }
            self.push(DeviceOp::DeleteProgram(program));
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.push(DeviceOp::AttributeLookup {
            program,
            name: name.to_string(),
        });
        self.programs
            .get(&program)?
            .attributes
            .get(name)
            .map(|attribute| attribute.location)
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.active = program.filter(|p| self.programs.contains_key(p));
        self.push(DeviceOp::UseProgram(program));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        self.push(DeviceOp::SetUniform {
            program,
            name: name.to_string(),
            value,
        });

        let Some(reflection) = self.programs.get(&program) else {
            return;
        };
        let declared = reflection
            .uniforms
            .as_ref()
            .is_some_and(|block| block.fields.contains_key(name))
            || reflection.textures.contains_key(name);
        if declared {
            self.uniforms.insert((program, name.to_string()), value);
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId {
        let buffer = BufferId(self.allocate());
        self.buffers.insert(buffer, data.len());
        self.push(DeviceOp::CreateBuffer {
            buffer,
            floats: data.len(),
        });
        buffer
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            self.push(DeviceOp::DeleteBuffer(buffer));
        }
    }

    fn create_texture(&mut self, image: &TextureData, params: TextureParams) -> TextureHandle {
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture, params);
        self.push(DeviceOp::CreateTexture {
            texture,
            width: image.width,
            height: image.height,
            params,
        });
        texture
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.units.insert(unit, texture);
        self.push(DeviceOp::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if !texture.is_valid() {
            return;
        }
        if self.textures.remove(&texture).is_some() {
            self.units.retain(|_, bound| *bound != texture);
            self.push(DeviceOp::DeleteTexture(texture));
        }
    }

    fn draw_arrays(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32) {
        self.draws += 1;
        self.push(DeviceOp::Draw {
            buffer,
            program: self.active,
            layout: layout.clone(),
            vertex_count,
        });
    }

    fn begin_frame(&mut self) {
        self.push(DeviceOp::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.push(DeviceOp::EndFrame);
    }
}
