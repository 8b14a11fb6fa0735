use std::collections::{HashMap, HashSet};

use wgpu::util::DeviceExt;

use crate::core::gpu_context::GpuContext;
use crate::core::reflect::{ProgramReflection, ShaderError, ShaderStage};
use crate::loaders::texture::TextureData;
use crate::traits::render_device::{
    BufferId, ProgramId, RenderDevice, TextureFilter, TextureHandle, TextureParams, UniformValue,
    VertexLayout,
};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Value a shader input reads when the mesh supplies no data for it
const DEFAULT_ATTRIBUTE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// What sampling a texture unit with nothing bound returns
const UNBOUND_TEXEL: [u8; 4] = [0, 0, 0, 255];

struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    uses_defaults: bool,
}

struct GpuProgram {
    reflection: ProgramReflection,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    /// CPU copy of the uniform block, flushed before every draw
    uniform_data: Vec<u8>,
    uniform_buffer: Option<wgpu::Buffer>,
    sampler_units: HashMap<String, u32>,
    pipelines: HashMap<VertexLayout, CachedPipeline>,
}

struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Offscreen renderer implementing the GL-style device on top of wgpu
///
/// Draws go to a private colour + depth target. Each draw is submitted
/// immediately so uniform values loaded between draws take effect in order.
pub struct WgpuDevice {
    gpu: GpuContext,
    width: u32,
    height: u32,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    programs: HashMap<ProgramId, GpuProgram>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureHandle, GpuTexture>,
    units: HashMap<u32, TextureHandle>,
    unbound: GpuTexture,
    defaults_buffer: wgpu::Buffer,
    active: Option<ProgramId>,
    next_id: u32,
}

impl WgpuDevice {
    pub fn new(gpu: GpuContext, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let color_view = create_target(gpu.device(), width, height, COLOR_FORMAT, "Color Target");
        let depth_view = create_target(gpu.device(), width, height, DEPTH_FORMAT, "Depth Target");

        let unbound = upload_texture(
            &gpu,
            &TextureData::solid(1, 1, UNBOUND_TEXEL),
            TextureParams::default(),
        );

        let defaults_buffer = gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Default Attribute Buffer"),
                contents: bytemuck::cast_slice(&DEFAULT_ATTRIBUTE),
                usage: wgpu::BufferUsages::VERTEX,
            });

        log::info!("Offscreen target {}x{} on {}", width, height, gpu.adapter_name());

        Self {
            gpu,
            width,
            height,
            color_view,
            depth_view,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            units: HashMap::new(),
            unbound,
            defaults_buffer,
            active: None,
            next_id: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for WgpuDevice {
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, ShaderError> {
        let reflection = ProgramReflection::link(vertex_source, fragment_source)?;
        let device = self.gpu.device();

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Stage"),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Stage"),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let mut entries = Vec::new();
        if let Some(block) = &reflection.uniforms {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for slot in reflection.textures.values() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot.texture_binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            if let Some(binding) = slot.sampler_binding {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Program Bind Group Layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_size = reflection.uniforms.as_ref().map_or(0, |block| block.size as usize);
        let uniform_buffer = (uniform_size > 0).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Program Uniforms"),
                size: uniform_size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let program = ProgramId(self.allocate());
        log::debug!(
            "program {:?}: {} attributes, {} uniform bytes, {} textures",
            program,
            reflection.attributes.len(),
            uniform_size,
            reflection.textures.len()
        );

        self.programs.insert(
            program,
            GpuProgram {
                reflection,
                vertex_module,
                fragment_module,
                bind_group_layout,
                pipeline_layout,
                uniform_data: vec![0; uniform_size],
                uniform_buffer,
                sampler_units: HashMap::new(),
                pipelines: HashMap::new(),
            },
        );
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() && self.active == Some(program) {
            self.active = None;
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs
            .get(&program)?
            .reflection
            .attributes
            .get(name)
            .map(|attribute| attribute.location)
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.active = program.filter(|p| self.programs.contains_key(p));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        let Some(program) = self.programs.get_mut(&program) else {
            log::warn!("uniform `{}` loaded into unknown program {:?}", name, program);
            return;
        };

        if program.reflection.textures.contains_key(name) {
            match value {
                UniformValue::Int(unit) if unit >= 0 => {
                    program.sampler_units.insert(name.to_string(), unit as u32);
                }
                other => log::warn!("texture `{}` needs a unit index, got {:?}", name, other),
            }
            return;
        }

        let field = program
            .reflection
            .uniforms
            .as_ref()
            .and_then(|block| block.fields.get(name))
            .copied();

        match field {
            Some(field) if value.byte_len() <= field.size as usize => {
                let bytes = value.to_bytes();
                let start = field.offset as usize;
                program.uniform_data[start..start + bytes.len()].copy_from_slice(&bytes);
            }
            Some(field) => log::warn!(
                "uniform `{}` holds {} bytes, value needs {}",
                name,
                field.size,
                value.byte_len()
            ),
            None => log::debug!("ignoring uniform `{}` not used by the program", name),
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> BufferId {
        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = BufferId(self.allocate());
        self.buffers.insert(id, buffer);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn create_texture(&mut self, image: &TextureData, params: TextureParams) -> TextureHandle {
        let texture = upload_texture(&self.gpu, image, params);
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, texture);
        handle
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if texture.is_valid() {
            self.units.insert(unit, texture);
        } else {
            self.units.remove(&unit);
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.units.retain(|_, bound| *bound != texture);
        }
    }

    fn draw_arrays(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32) {
        let Some(program_id) = self.active else {
            log::warn!("draw with no active program");
            return;
        };
        let (Some(program), Some(vertex_buffer)) =
            (self.programs.get_mut(&program_id), self.buffers.get(&buffer))
        else {
            log::warn!("draw with unknown program {:?} or buffer {:?}", program_id, buffer);
            return;
        };

        if !program.pipelines.contains_key(layout) {
            match build_pipeline(&self.gpu, program, layout) {
                Some(cached) => {
                    program.pipelines.insert(layout.clone(), cached);
                }
                None => return,
            }
        }
        let Some(cached) = program.pipelines.get(layout) else {
            return;
        };

        if let Some(uniform_buffer) = &program.uniform_buffer {
            self.gpu.queue().write_buffer(uniform_buffer, 0, &program.uniform_data);
        }

        let mut entries = Vec::new();
        if let (Some(block), Some(uniform_buffer)) =
            (&program.reflection.uniforms, &program.uniform_buffer)
        {
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: uniform_buffer.as_entire_binding(),
            });
        }
        for (name, slot) in &program.reflection.textures {
            // Samplers read unit 0 until told otherwise
            let unit = program.sampler_units.get(name).copied().unwrap_or(0);
            let texture = self
                .units
                .get(&unit)
                .and_then(|handle| self.textures.get(handle))
                .unwrap_or(&self.unbound);
            entries.push(wgpu::BindGroupEntry {
                binding: slot.texture_binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            if let Some(binding) = slot.sampler_binding {
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                });
            }
        }

        let device = self.gpu.device();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Draw Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Draw Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&cached.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            if cached.uses_defaults {
                pass.set_vertex_buffer(1, self.defaults_buffer.slice(..));
            }
            pass.draw(0..vertex_count, 0..1);
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn begin_frame(&mut self) {
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn end_frame(&mut self) {
        self.gpu.wait_idle();
    }
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn filter_mode(filter: TextureFilter) -> wgpu::FilterMode {
    match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Upload an image with `params.mipmaps` extra levels built by box filtering
fn upload_texture(gpu: &GpuContext, image: &TextureData, params: TextureParams) -> GpuTexture {
    let mut levels = vec![image.clone()];
    for _ in 0..params.mipmaps {
        match levels.last().and_then(downsample) {
            Some(next) => levels.push(next),
            None => break,
        }
    }

    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Texture"),
        size: wgpu::Extent3d {
            width: image.width.max(1),
            height: image.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, data) in levels.iter().enumerate() {
        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
        );
    }

    let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Scene Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: filter_mode(params.mag_filter),
        min_filter: filter_mode(params.min_filter),
        mipmap_filter: if levels.len() > 1 {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        },
        ..Default::default()
    });

    GpuTexture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        sampler,
    }
}

/// Half-size image averaging 2x2 blocks; None once 1x1 is reached
fn downsample(image: &TextureData) -> Option<TextureData> {
    if image.width <= 1 && image.height <= 1 {
        return None;
    }
    let width = (image.width / 2).max(1);
    let height = (image.height / 2).max(1);
    let mut data = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        for x in 0..width {
            for channel in 0..4 {
                let mut sum = 0u32;
                let mut count = 0u32;
                for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let px = (x * 2 + sx).min(image.width - 1);
                    let py = (y * 2 + sy).min(image.height - 1);
                    sum += image.data[((py * image.width + px) * 4 + channel) as usize] as u32;
                    count += 1;
                }
                data.push((sum / count) as u8);
            }
        }
    }

    Some(TextureData { width, height, data })
}

/// Pipeline for a program fed by one interleaved buffer layout
///
/// Shader inputs the layout does not cover read DEFAULT_ATTRIBUTE from a
/// one-element instance buffer.
fn build_pipeline(gpu: &GpuContext, program: &GpuProgram, layout: &VertexLayout) -> Option<CachedPipeline> {
    let provided: HashSet<u32> = layout.attributes.iter().map(|a| a.location).collect();

    let mesh_attributes: Vec<wgpu::VertexAttribute> = layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: float_format(a.components),
            offset: a.offset as u64,
            shader_location: a.location,
        })
        .collect();

    let default_attributes: Vec<wgpu::VertexAttribute> = program
        .reflection
        .attributes
        .values()
        .filter(|info| !provided.contains(&info.location))
        .map(|info| wgpu::VertexAttribute {
            format: float_format(info.components),
            offset: 0,
            shader_location: info.location,
        })
        .collect();

    let mut buffers = vec![wgpu::VertexBufferLayout {
        array_stride: layout.stride as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &mesh_attributes,
    }];
    if !default_attributes.is_empty() {
        buffers.push(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of_val(&DEFAULT_ATTRIBUTE) as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &default_attributes,
        });
    }

    let device = gpu.device();
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Scene Pipeline"),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.vertex_module,
            entry_point: Some(crate::core::reflect::VERTEX_ENTRY),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment_module,
            entry_point: Some(crate::core::reflect::FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        let error = ShaderError::new(ShaderStage::Link, error.to_string());
        log::error!("pipeline creation failed: {}", error);
        return None;
    }

    Some(CachedPipeline {
        pipeline,
        uses_defaults: !default_attributes.is_empty(),
    })
}
