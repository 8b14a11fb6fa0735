use anyhow::{bail, Context, Result};
use glam::{Mat4, Vec2, Vec3};
use std::path::Path;

use crate::model::{Model, ModelObject, ModelVertex};

/// Loads a glTF (or glb) file into a model, one object per mesh primitive
///
/// Node transforms are baked into the vertex positions. Normals stored in the
/// file are ignored; callers recompute them with `Model::calculate_normals`.
pub fn load_gltf_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    log::info!("Loading glTF model: {:?}", path);

    let (gltf, buffers, _images) =
        gltf::import(path).context(format!("Failed to load glTF file: {:?}", path))?;

    log::debug!(
        "glTF loaded: {} scenes, {} nodes, {} meshes",
        gltf.scenes().count(),
        gltf.nodes().count(),
        gltf.meshes().count()
    );

    let mut objects = Vec::new();

    for scene in gltf.scenes() {
        for node in scene.nodes() {
            process_node(&node, &buffers, &Mat4::IDENTITY, &mut objects)?;
        }
    }

    if objects.is_empty() {
        bail!("No triangle geometry found in glTF file: {:?}", path);
    }

    let model = Model::new(objects);
    log::info!(
        "Extracted {} vertices and {} faces from {:?}",
        model.vertex_count(),
        model.face_count(),
        path
    );
    Ok(model)
}

/// Recursively processes glTF nodes
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: &Mat4,
    objects: &mut Vec<ModelObject>,
) -> Result<()> {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, buffers, &global_transform, objects)?;
    }

    for child in node.children() {
        process_node(&child, buffers, &global_transform, objects)?;
    }

    Ok(())
}

/// Converts every triangle primitive of a mesh into a model object
fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    transform: &Mat4,
    objects: &mut Vec<ModelObject>,
) -> Result<()> {
    let mesh_name = mesh.name().unwrap_or("unnamed");

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive {} of mesh `{}`",
                primitive.mode(),
                primitive.index(),
                mesh_name
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .context("Mesh primitive has no positions")?
            .map(|pos| transform.transform_point3(Vec3::from_array(pos)))
            .collect();

        let texcoords: Vec<Vec2> = match reader.read_tex_coords(0) {
            Some(uvs) => uvs.into_f32().map(Vec2::from_array).collect(),
            None => vec![Vec2::ZERO; positions.len()],
        };

        let vertices = positions
            .iter()
            .zip(texcoords.iter().chain(std::iter::repeat(&Vec2::ZERO)))
            .map(|(&position, &texcoord)| ModelVertex::new(position, texcoord))
            .collect::<Vec<_>>();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let faces = indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();

        objects.push(ModelObject {
            name: format!("{}#{}", mesh_name, primitive.index()),
            vertices,
            faces,
        });
    }

    Ok(())
}
