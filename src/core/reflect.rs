use std::collections::BTreeMap;
use std::fmt;

use naga::{AddressSpace, Binding, Handle, Module, Type, TypeInner};
use thiserror::Error;

/// Vertex stage entry point every program must export
pub const VERTEX_ENTRY: &str = "vs_main";
/// Fragment stage entry point every program must export
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Suffix pairing a sampler binding with the texture of the same base name
const SAMPLER_SUFFIX: &str = "Sampler";

/// Where program creation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Link => "link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage: {message}")]
pub struct ShaderError {
    pub stage: ShaderStage,
    pub message: String,
}

impl ShaderError {
    pub fn new(stage: ShaderStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    pub location: u32,
    pub components: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub offset: u32,
    pub size: u32,
}

/// The single uniform buffer a program reads, keyed by member name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub binding: u32,
    pub size: u32,
    pub fields: BTreeMap<String, UniformField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub texture_binding: u32,
    pub sampler_binding: Option<u32>,
}

/// Name-addressable interface of a linked program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    pub attributes: BTreeMap<String, AttributeInfo>,
    pub uniforms: Option<UniformBlock>,
    pub textures: BTreeMap<String, TextureSlot>,
}

impl ProgramReflection {
    /// Parse, validate and link a vertex and fragment stage
    pub fn link(vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        let vertex = StageInterface::parse(vertex_source, ShaderStage::Vertex)?;
        let fragment = StageInterface::parse(fragment_source, ShaderStage::Fragment)?;

        for (location, (name, components)) in &fragment.inputs {
            match vertex.outputs.get(location) {
                Some((_, produced)) if produced == components => {}
                Some((produced_name, produced)) => {
                    return Err(ShaderError::new(
                        ShaderStage::Link,
                        format!(
                            "fragment input `{}` at location {} expects {} components but vertex output `{}` has {}",
                            name, location, components, produced_name, produced
                        ),
                    ));
                }
                None => {
                    return Err(ShaderError::new(
                        ShaderStage::Link,
                        format!(
                            "fragment input `{}` at location {} is not written by the vertex stage",
                            name, location
                        ),
                    ));
                }
            }
        }

        let uniforms = merge_uniforms(vertex.uniforms, fragment.uniforms)?;

        let attributes = vertex
            .inputs
            .into_iter()
            .map(|(location, (name, components))| (name, AttributeInfo { location, components }))
            .collect();

        let mut samplers = vertex.samplers;
        samplers.extend(fragment.samplers);
        let mut texture_bindings = vertex.textures;
        texture_bindings.extend(fragment.textures);

        for name in samplers.keys() {
            let paired = name
                .strip_suffix(SAMPLER_SUFFIX)
                .is_some_and(|texture| texture_bindings.contains_key(texture));
            if !paired {
                return Err(ShaderError::new(
                    ShaderStage::Link,
                    format!("sampler `{}` has no matching texture", name),
                ));
            }
        }

        let textures = texture_bindings
            .into_iter()
            .map(|(name, texture_binding)| {
                let sampler_binding = samplers.get(&format!("{}{}", name, SAMPLER_SUFFIX)).copied();
                (name, TextureSlot { texture_binding, sampler_binding })
            })
            .collect();

        Ok(Self {
            attributes,
            uniforms,
            textures,
        })
    }
}

/// Inputs, outputs and resources of one entry point
#[derive(Debug, Default)]
struct StageInterface {
    inputs: BTreeMap<u32, (String, u32)>,
    outputs: BTreeMap<u32, (String, u32)>,
    uniforms: Option<UniformBlock>,
    textures: BTreeMap<String, u32>,
    samplers: BTreeMap<String, u32>,
}

impl StageInterface {
    fn parse(source: &str, stage: ShaderStage) -> Result<Self, ShaderError> {
        let (entry_name, naga_stage) = match stage {
            ShaderStage::Vertex => (VERTEX_ENTRY, naga::ShaderStage::Vertex),
            _ => (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
        };

        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| ShaderError::new(stage, e.emit_to_string(source)))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| ShaderError::new(stage, e.emit_to_string(source)))?;

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga_stage && ep.name == entry_name)
            .ok_or_else(|| ShaderError::new(stage, format!("missing entry point `{}`", entry_name)))?;

        let mut interface = StageInterface::default();

        for argument in &entry.function.arguments {
            collect_locations(
                &module,
                argument.name.as_deref(),
                argument.ty,
                argument.binding.as_ref(),
                &mut interface.inputs,
            );
        }
        if let Some(result) = &entry.function.result {
            collect_locations(&module, None, result.ty, result.binding.as_ref(), &mut interface.outputs);
        }

        for (_, variable) in module.global_variables.iter() {
            let Some(binding) = &variable.binding else {
                continue;
            };
            if binding.group != 0 {
                return Err(ShaderError::new(
                    stage,
                    format!("only bind group 0 is supported, found group {}", binding.group),
                ));
            }
            let name = variable.name.clone().unwrap_or_default();

            match (variable.space, &module.types[variable.ty].inner) {
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    let fields = members
                        .iter()
                        .filter_map(|member| {
                            let name = member.name.clone()?;
                            let size = module.types[member.ty].inner.size(module.to_ctx());
                            Some((name, UniformField { offset: member.offset, size }))
                        })
                        .collect();
                    if interface.uniforms.is_some() {
                        return Err(ShaderError::new(stage, "more than one uniform block declared"));
                    }
                    interface.uniforms = Some(UniformBlock {
                        binding: binding.binding,
                        size: *span,
                        fields,
                    });
                }
                (AddressSpace::Handle, TypeInner::Image { .. }) => {
                    interface.textures.insert(name, binding.binding);
                }
                (AddressSpace::Handle, TypeInner::Sampler { .. }) => {
                    interface.samplers.insert(name, binding.binding);
                }
                _ => {
                    return Err(ShaderError::new(
                        stage,
                        format!("unsupported resource `{}` at binding {}", name, binding.binding),
                    ));
                }
            }
        }

        Ok(interface)
    }
}

fn collect_locations(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, (String, u32)>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            let components = match &module.types[ty].inner {
                TypeInner::Scalar(_) => 1,
                TypeInner::Vector { size, .. } => *size as u32,
                _ => 0,
            };
            out.insert(*location, (name.unwrap_or_default().to_string(), components));
        }
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.name.as_deref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn merge_uniforms(
    vertex: Option<UniformBlock>,
    fragment: Option<UniformBlock>,
) -> Result<Option<UniformBlock>, ShaderError> {
    match (vertex, fragment) {
        (Some(mut merged), Some(other)) => {
            if merged.binding != other.binding {
                return Err(ShaderError::new(
                    ShaderStage::Link,
                    format!(
                        "uniform block bound at {} in the vertex stage and {} in the fragment stage",
                        merged.binding, other.binding
                    ),
                ));
            }
            for (name, field) in other.fields {
                match merged.fields.get(&name) {
                    Some(existing) if *existing != field => {
                        return Err(ShaderError::new(
                            ShaderStage::Link,
                            format!("uniform `{}` is laid out differently across stages", name),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        merged.fields.insert(name, field);
                    }
                }
            }
            merged.size = merged.size.max(other.size);
            Ok(Some(merged))
        }
        (vertex, fragment) => Ok(vertex.or(fragment)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = include_str!("../../data/shaders/light-advanced.vert.wgsl");
    const FRAGMENT: &str = include_str!("../../data/shaders/light-advanced.frag.wgsl");
    const NORMAL_MAP: &str = include_str!("../../data/shaders/light-advanced-normal-map.frag.wgsl");

    #[test]
    fn links_plain_program() {
        let program = ProgramReflection::link(VERTEX, FRAGMENT).unwrap();

        assert_eq!(program.attributes["position"], AttributeInfo { location: 0, components: 3 });
        assert_eq!(program.attributes["normal"], AttributeInfo { location: 1, components: 3 });
        assert_eq!(program.attributes["texcoord"], AttributeInfo { location: 2, components: 2 });
        assert!(program.textures.is_empty());

        let uniforms = program.uniforms.unwrap();
        assert_eq!(uniforms.binding, 0);
        assert_eq!(uniforms.fields["ModelViewProjectionMatrix"], UniformField { offset: 0, size: 64 });
        assert_eq!(uniforms.fields["NormalMatrix"], UniformField { offset: 64, size: 64 });
        assert_eq!(uniforms.fields["LightSourcePosition"], UniformField { offset: 128, size: 16 });
        assert_eq!(uniforms.fields["LightSourceHalfVector"], UniformField { offset: 144, size: 12 });
        assert_eq!(uniforms.size, 160);
    }

    #[test]
    fn pairs_normal_map_with_its_sampler() {
        let program = ProgramReflection::link(VERTEX, NORMAL_MAP).unwrap();

        assert_eq!(
            program.textures["NormalMap"],
            TextureSlot { texture_binding: 1, sampler_binding: Some(2) }
        );
    }

    #[test]
    fn reports_parse_errors_per_stage() {
        let err = ProgramReflection::link("fn broken(", FRAGMENT).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);

        let err = ProgramReflection::link(VERTEX, "fn broken(").unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
    }

    #[test]
    fn rejects_unwritten_fragment_inputs() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(5) tint: vec4<f32>) -> @location(0) vec4<f32> {
                return tint;
            }
        "#;

        let err = ProgramReflection::link(VERTEX, fragment).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Link);
        assert!(err.message.contains("location 5"));
    }

    #[test]
    fn requires_named_entry_points() {
        let fragment = r#"
            @fragment
            fn main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;

        let err = ProgramReflection::link(VERTEX, fragment).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert!(err.message.contains(FRAGMENT_ENTRY));
    }
}
