use glam::{Vec2, Vec3};

use crate::mesh::Mesh;

/// Per-vertex attribute a mesh can be built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    Position,
    Normal,
    Texcoord,
}

impl AttribType {
    /// Name of the matching vertex shader input
    pub fn attribute_name(&self) -> &'static str {
        match self {
            AttribType::Position => "position",
            AttribType::Normal => "normal",
            AttribType::Texcoord => "texcoord",
        }
    }

    /// Components available for this attribute in a model vertex
    pub fn max_components(&self) -> usize {
        match self {
            AttribType::Position | AttribType::Normal => 3,
            AttribType::Texcoord => 2,
        }
    }
}

/// Ordered attribute request: kind and component count
pub type AttribSpec = (AttribType, usize);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub texcoord: Vec2,
}

impl ModelVertex {
    pub fn new(position: Vec3, texcoord: Vec2) -> Self {
        Self {
            position,
            normal: Vec3::ZERO,
            texcoord,
        }
    }

    fn attribute(&self, kind: AttribType) -> [f32; 3] {
        match kind {
            AttribType::Position => self.position.to_array(),
            AttribType::Normal => self.normal.to_array(),
            AttribType::Texcoord => [self.texcoord.x, self.texcoord.y, 0.0],
        }
    }
}

/// Named group of vertices and triangles inside a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelObject {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub faces: Vec<[u32; 3]>,
}

/// CPU-side model geometry as loaded from an asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub objects: Vec<ModelObject>,
}

impl Model {
    pub fn new(objects: Vec<ModelObject>) -> Self {
        Self { objects }
    }

    pub fn vertex_count(&self) -> usize {
        self.objects.iter().map(|o| o.vertices.len()).sum()
    }

    pub fn face_count(&self) -> usize {
        self.objects.iter().map(|o| o.faces.len()).sum()
    }

    /// Smooth vertex normals: the normalized sum of the unit normals of
    /// every face sharing the vertex
    pub fn calculate_normals(&mut self) {
        for object in &mut self.objects {
            for vertex in &mut object.vertices {
                vertex.normal = Vec3::ZERO;
            }

            for face in &object.faces {
                let [a, b, c] = face.map(|i| i as usize);
                let (Some(va), Some(vb), Some(vc)) = (
                    object.vertices.get(a),
                    object.vertices.get(b),
                    object.vertices.get(c),
                ) else {
                    continue;
                };

                let n = (vb.position - va.position)
                    .cross(vc.position - va.position)
                    .normalize_or_zero();

                for i in [a, b, c] {
                    object.vertices[i].normal += n;
                }
            }

            for vertex in &mut object.vertices {
                vertex.normal = vertex.normal.normalize_or_zero();
            }
        }
    }

    /// Expand faces into a non-indexed triangle list holding the requested
    /// attributes in the requested order
    pub fn convert_to_mesh(&self, attribs: &[AttribSpec]) -> Mesh {
        let format: Vec<AttribSpec> = attribs
            .iter()
            .map(|&(kind, components)| (kind, components.min(kind.max_components())))
            .collect();

        let mut mesh = Mesh::new(format.clone());
        let mut vertex = Vec::with_capacity(mesh.vertex_size());

        for object in &self.objects {
            for face in &object.faces {
                let corners = face.iter().filter_map(|&i| object.vertices.get(i as usize));
                if corners.clone().count() != 3 {
                    log::warn!("skipping face {:?} of `{}` with out of range index", face, object.name);
                    continue;
                }

                for corner in corners {
                    vertex.clear();
                    for &(kind, components) in &format {
                        vertex.extend_from_slice(&corner.attribute(kind)[..components]);
                    }
                    mesh.push_vertex(&vertex);
                }
            }
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Model {
        // Two triangles in the z = 0 plane, wound counter-clockwise
        let vertices = vec![
            ModelVertex::new(Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0)),
            ModelVertex::new(Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
            ModelVertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::new(1.0, 1.0)),
            ModelVertex::new(Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 1.0)),
        ];
        Model::new(vec![ModelObject {
            name: "quad".to_string(),
            vertices,
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }])
    }

    #[test]
    fn flat_surface_gets_face_normal() {
        let mut model = quad();
        model.calculate_normals();

        for vertex in &model.objects[0].vertices {
            assert!((vertex.normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn shared_vertices_average_adjacent_faces() {
        // Two faces folded along the x axis at a right angle
        let vertices = vec![
            ModelVertex::new(Vec3::new(0.0, 0.0, 0.0), Vec2::ZERO),
            ModelVertex::new(Vec3::new(1.0, 0.0, 0.0), Vec2::ZERO),
            ModelVertex::new(Vec3::new(0.0, 1.0, 0.0), Vec2::ZERO),
            ModelVertex::new(Vec3::new(0.0, 0.0, 1.0), Vec2::ZERO),
        ];
        let mut model = Model::new(vec![ModelObject {
            name: "fold".to_string(),
            vertices,
            faces: vec![[0, 1, 2], [0, 3, 1]],
        }]);
        model.calculate_normals();

        let shared = model.objects[0].vertices[0].normal;
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((shared - expected).length() < 1e-6);
        assert!((shared.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_faces_contribute_nothing() {
        let vertices = vec![
            ModelVertex::new(Vec3::ZERO, Vec2::ZERO),
            ModelVertex::new(Vec3::X, Vec2::ZERO),
            ModelVertex::new(Vec3::X * 2.0, Vec2::ZERO),
        ];
        let mut model = Model::new(vec![ModelObject {
            name: "line".to_string(),
            vertices,
            faces: vec![[0, 1, 2]],
        }]);
        model.calculate_normals();

        assert!(model.objects[0].vertices.iter().all(|v| v.normal == Vec3::ZERO));
    }

    #[test]
    fn mesh_follows_requested_attribute_order() {
        let mut model = quad();
        model.calculate_normals();

        let mesh = model.convert_to_mesh(&[
            (AttribType::Position, 3),
            (AttribType::Normal, 3),
            (AttribType::Texcoord, 2),
        ]);

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.vertex_size(), 8);

        // Third corner of the first face: position (1,1,0), normal +z, uv (1,1)
        let third = &mesh.vertices()[16..24];
        assert_eq!(third, &[1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn mesh_without_texcoords_is_position_normal_only() {
        let mesh = quad().convert_to_mesh(&[(AttribType::Position, 3), (AttribType::Normal, 3)]);

        assert_eq!(mesh.vertex_size(), 6);
        assert_eq!(mesh.vertices().len(), 6 * 6);
    }

    #[test]
    fn out_of_range_faces_are_skipped() {
        let mut model = quad();
        model.objects[0].faces.push([0, 1, 9]);

        let mesh = model.convert_to_mesh(&[(AttribType::Position, 3)]);
        assert_eq!(mesh.vertex_count(), 6);
    }
}
