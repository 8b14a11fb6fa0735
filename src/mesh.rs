use thiserror::Error;

use crate::model::AttribSpec;
use crate::traits::render_device::{BufferId, RenderDevice, VertexAttribute, VertexLayout};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("mesh has {attributes} attributes but {locations} locations were given")]
    LayoutMismatch { attributes: usize, locations: usize },
}

/// Interleaved vertex data plus the GPU buffer built from it
#[derive(Debug, Default)]
pub struct Mesh {
    format: Vec<AttribSpec>,
    vertex_size: usize,
    vertices: Vec<f32>,
    attrib_locations: Vec<u32>,
    vbo: Option<BufferId>,
}

impl Mesh {
    pub fn new(format: Vec<AttribSpec>) -> Self {
        let vertex_size = format.iter().map(|&(_, components)| components).sum();
        Self {
            format,
            vertex_size,
            ..Default::default()
        }
    }

    pub fn format(&self) -> &[AttribSpec] {
        &self.format
    }

    /// Floats per vertex
    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    pub fn vertex_count(&self) -> usize {
        if self.vertex_size == 0 {
            0
        } else {
            self.vertices.len() / self.vertex_size
        }
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn attrib_locations(&self) -> &[u32] {
        &self.attrib_locations
    }

    pub fn vbo(&self) -> Option<BufferId> {
        self.vbo
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Append one vertex; `data` must hold exactly `vertex_size` floats
    pub fn push_vertex(&mut self, data: &[f32]) {
        debug_assert_eq!(data.len(), self.vertex_size);
        self.vertices.extend_from_slice(data);
    }

    /// Shader input locations, one per format entry and in format order
    pub fn set_attrib_locations(&mut self, locations: Vec<u32>) -> Result<(), MeshError> {
        if locations.len() != self.format.len() {
            return Err(MeshError::LayoutMismatch {
                attributes: self.format.len(),
                locations: locations.len(),
            });
        }
        self.attrib_locations = locations;
        Ok(())
    }

    /// Interleaved layout combining the format with the bound locations
    pub fn layout(&self) -> VertexLayout {
        let mut offset = 0;
        let attributes = self
            .format
            .iter()
            .zip(&self.attrib_locations)
            .map(|(&(_, components), &location)| {
                let attribute = VertexAttribute {
                    location,
                    components: components as u32,
                    offset,
                };
                offset += (components * std::mem::size_of::<f32>()) as u32;
                attribute
            })
            .collect();

        VertexLayout {
            stride: (self.vertex_size * std::mem::size_of::<f32>()) as u32,
            attributes,
        }
    }

    /// Upload the vertex data, replacing any previous buffer
    pub fn build_vbo(&mut self, device: &mut dyn RenderDevice) {
        if let Some(old) = self.vbo.take() {
            device.delete_buffer(old);
        }
        self.vbo = Some(device.create_vertex_buffer(&self.vertices));
        log::debug!(
            "built vertex buffer: {} vertices, {} floats each",
            self.vertex_count(),
            self.vertex_size
        );
    }

    /// Draw the uploaded buffer with the active program
    pub fn render_vbo(&self, device: &mut dyn RenderDevice) {
        match self.vbo {
            Some(vbo) if !self.vertices.is_empty() => {
                device.draw_arrays(vbo, &self.layout(), self.vertex_count() as u32);
            }
            _ => {}
        }
    }

    /// Release the buffer and drop all vertex data; safe to repeat
    pub fn reset(&mut self, device: &mut dyn RenderDevice) {
        if let Some(vbo) = self.vbo.take() {
            device.delete_buffer(vbo);
        }
        self.vertices.clear();
        self.attrib_locations.clear();
    }
}
