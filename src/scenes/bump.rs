use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Vec3, Vec4};

use crate::core::canvas::Canvas;
use crate::core::options::SceneOption;
use crate::core::scene_base::SceneBase;
use crate::mesh::Mesh;
use crate::model::{AttribSpec, AttribType};
use crate::shader::ShaderProgram;
use crate::traits::render_device::{RenderDevice, TextureFilter, TextureHandle, TextureParams, UniformValue};
use crate::traits::scene::{Scene, SceneContext, SetupError, ValidationResult};

pub const BUMP_RENDER_OPTION: &str = "bump-render";

const MODEL_LOW: &str = "models/asteroid-low.glb";
const MODEL_HIGH: &str = "models/asteroid-high.glb";
const VERTEX_SHADER: &str = "shaders/light-advanced.vert.wgsl";
const FRAGMENT_SHADER: &str = "shaders/light-advanced.frag.wgsl";
const FRAGMENT_SHADER_NORMAL_MAP: &str = "shaders/light-advanced-normal-map.frag.wgsl";
const NORMAL_MAP_TEXTURE: &str = "textures/asteroid-normal-map.png";

/// Degrees per second around the Y axis
const ROTATION_SPEED: f64 = 36.0;
const LIGHT_POSITION: Vec4 = Vec4::new(20.0, 20.0, 10.0, 1.0);
const MODEL_DISTANCE: f32 = 3.5;
const NORMAL_MAP_UNIT: u32 = 0;

/// How the asteroid's surface detail is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BumpRender {
    /// Low-poly model, plain per-vertex normals
    Off,
    /// Low-poly model, normals read from a normal map
    Normals,
    /// High-poly model, plain per-vertex normals
    HighPoly,
}

impl BumpRender {
    pub const ALL: [BumpRender; 3] = [BumpRender::Off, BumpRender::Normals, BumpRender::HighPoly];

    pub fn as_str(&self) -> &'static str {
        match self {
            BumpRender::Off => "off",
            BumpRender::Normals => "normals",
            BumpRender::HighPoly => "high-poly",
        }
    }
}

impl fmt::Display for BumpRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpRender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BumpRender::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown bump render mode `{}`", s))
    }
}

/// Everything a mode needs loaded, as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPlan {
    pub model: &'static str,
    /// Mesh layout; also the order attribute locations are bound in
    pub attributes: Vec<AttribSpec>,
    pub vertex_shader: &'static str,
    pub fragment_shader: &'static str,
    pub normal_map: Option<&'static str>,
}

impl SetupPlan {
    /// Shader inputs to look up, in binding order
    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.attributes.iter().map(|(kind, _)| kind.attribute_name()).collect()
    }
}

pub fn plan_for(mode: BumpRender) -> SetupPlan {
    let position_normal = vec![(AttribType::Position, 3), (AttribType::Normal, 3)];

    match mode {
        BumpRender::Off => SetupPlan {
            model: MODEL_LOW,
            attributes: position_normal,
            vertex_shader: VERTEX_SHADER,
            fragment_shader: FRAGMENT_SHADER,
            normal_map: None,
        },
        BumpRender::Normals => SetupPlan {
            model: MODEL_LOW,
            attributes: [position_normal, vec![(AttribType::Texcoord, 2)]].concat(),
            vertex_shader: VERTEX_SHADER,
            fragment_shader: FRAGMENT_SHADER_NORMAL_MAP,
            normal_map: Some(NORMAL_MAP_TEXTURE),
        },
        BumpRender::HighPoly => SetupPlan {
            model: MODEL_HIGH,
            attributes: position_normal,
            vertex_shader: VERTEX_SHADER,
            fragment_shader: FRAGMENT_SHADER,
            normal_map: None,
        },
    }
}

/// Blinn half vector between the light direction and a viewer looking down -Z
pub fn half_vector(light_position: Vec4) -> Vec3 {
    (light_position.truncate().normalize() + Vec3::Z).normalize()
}

/// Rotating asteroid lit with a bump-mapping model
pub struct BumpScene {
    base: SceneBase,
    mesh: Mesh,
    program: ShaderProgram,
    texture: TextureHandle,
    rotation: f64,
    rotation_speed: f64,
}

impl BumpScene {
    pub fn new() -> Self {
        let mut base = SceneBase::new("bump");
        base.options_mut().register(SceneOption::new(
            BUMP_RENDER_OPTION,
            BumpRender::Off.as_str(),
            "How to render bumps",
            &BumpRender::ALL.map(|mode| mode.as_str()),
        ));

        Self {
            base,
            mesh: Mesh::default(),
            program: ShaderProgram::new(),
            texture: TextureHandle::NONE,
            rotation: 0.0,
            rotation_speed: ROTATION_SPEED,
        }
    }

    /// Selected mode, read from the option
    pub fn mode(&self) -> Result<BumpRender, SetupError> {
        let value = self.base.options().value(BUMP_RENDER_OPTION).unwrap_or_default();
        value
            .parse()
            .map_err(|_| SetupError::InvalidOption(BUMP_RENDER_OPTION.to_string(), value.to_string()))
    }

    /// Accumulated rotation in degrees; never wrapped
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    pub fn current_frame(&self) -> u64 {
        self.base.current_frame()
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Model-view transform for the current rotation
    pub fn model_view(&self) -> Mat4 {
        // Wrap before narrowing so long runs keep full angular precision
        let angle = self.rotation.rem_euclid(360.0).to_radians() as f32;
        Mat4::from_translation(Vec3::new(0.0, 0.0, -MODEL_DISTANCE)) * Mat4::from_rotation_y(angle)
    }

    fn build_geometry(&mut self, ctx: &mut SceneContext<'_>, plan: &SetupPlan) -> Result<(), SetupError> {
        let mut model = ctx.assets.load_model(plan.model).map_err(|e| {
            log::error!("{:#}", e);
            SetupError::ModelLoadFailed(plan.model.to_string())
        })?;

        model.calculate_normals();
        self.mesh = model.convert_to_mesh(&plan.attributes);
        log::debug!(
            "converted {} ({} faces) to {} vertices",
            plan.model,
            model.face_count(),
            self.mesh.vertex_count()
        );
        Ok(())
    }

    fn build_program(&mut self, ctx: &mut SceneContext<'_>, plan: &SetupPlan) -> Result<(), SetupError> {
        let load_source = |path: &'static str| {
            ctx.assets.load_shader(path).map_err(|e| {
                log::error!("{:#}", e);
                SetupError::ShaderSourceMissing(path.to_string())
            })
        };
        let vertex_source = load_source(plan.vertex_shader)?;
        let fragment_source = load_source(plan.fragment_shader)?;

        self.program
            .link(ctx.device, &vertex_source, &fragment_source)
            .map_err(|e| SetupError::ShaderLinkFailed(e.stage, e.message))?;

        let device: &dyn RenderDevice = &*ctx.device;
        let locations = plan
            .attribute_names()
            .into_iter()
            .map(|name| {
                self.program
                    .attribute_location(device, name)
                    .ok_or_else(|| SetupError::MissingAttribute(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.mesh.set_attrib_locations(locations)?;
        Ok(())
    }

    fn load_normal_map(&mut self, ctx: &mut SceneContext<'_>, path: &str) -> Result<(), SetupError> {
        let image = ctx.assets.load_texture(path).map_err(|e| {
            log::error!("{:#}", e);
            SetupError::TextureLoadFailed(path.to_string())
        })?;

        self.texture = ctx.device.create_texture(
            &image,
            TextureParams {
                min_filter: TextureFilter::Nearest,
                mag_filter: TextureFilter::Nearest,
                mipmaps: 0,
            },
        );
        ctx.device.bind_texture(NORMAL_MAP_UNIT, self.texture);
        Ok(())
    }
}

impl Default for BumpScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for BumpScene {
    fn base(&self) -> &SceneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneBase {
        &mut self.base
    }

    fn load(&mut self) -> anyhow::Result<()> {
        self.rotation_speed = ROTATION_SPEED;
        self.base.stop();
        Ok(())
    }

    fn unload(&mut self) {}

    fn setup(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), SetupError> {
        self.base.setup()?;

        // A repeated setup replaces the previous run's geometry and texture
        self.mesh.reset(ctx.device);
        ctx.device.delete_texture(self.texture);
        self.texture = TextureHandle::NONE;

        let mode = self.mode()?;
        let plan = plan_for(mode);
        log::info!("[{}] setting up {} mode from {}", self.base.name(), mode, plan.model);

        self.build_geometry(ctx, &plan)?;
        self.build_program(ctx, &plan)?;
        if let Some(normal_map) = plan.normal_map {
            self.load_normal_map(ctx, normal_map)?;
        }

        self.mesh.build_vbo(ctx.device);

        self.program.start(ctx.device);
        self.program.set_uniform(
            ctx.device,
            "LightSourcePosition",
            UniformValue::Vec4(LIGHT_POSITION),
        );
        self.program.set_uniform(
            ctx.device,
            "LightSourceHalfVector",
            UniformValue::Vec3(half_vector(LIGHT_POSITION)),
        );
        self.program.set_uniform(
            ctx.device,
            "NormalMap",
            UniformValue::Int(NORMAL_MAP_UNIT as i32),
        );

        self.rotation = 0.0;
        self.base.start(ctx.canvas.timestamp());
        Ok(())
    }

    fn teardown(&mut self, ctx: &mut SceneContext<'_>) {
        self.mesh.reset(ctx.device);

        self.program.stop(ctx.device);
        self.program.release(ctx.device);

        ctx.device.delete_texture(self.texture);
        self.texture = TextureHandle::NONE;

        self.base.teardown();
    }

    fn update(&mut self, canvas: &Canvas) {
        let dt = self.base.update(canvas.timestamp());
        self.rotation += self.rotation_speed * dt;
    }

    fn draw(&self, ctx: &mut SceneContext<'_>) {
        let model_view = self.model_view();
        let model_view_proj = ctx.canvas.projection() * model_view;

        self.program.set_uniform(
            ctx.device,
            "ModelViewProjectionMatrix",
            UniformValue::Mat4(model_view_proj),
        );

        // Normals transform with the inverse transpose of the model view
        let normal_matrix = model_view.inverse().transpose();
        self.program
            .set_uniform(ctx.device, "NormalMatrix", UniformValue::Mat4(normal_matrix));

        self.mesh.render_vbo(ctx.device);
    }

    fn validate(&self, _ctx: &mut SceneContext<'_>) -> ValidationResult {
        ValidationResult::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_round_trip() {
        for mode in BumpRender::ALL {
            assert_eq!(mode.as_str().parse::<BumpRender>(), Ok(mode));
        }
        assert!("bumpy".parse::<BumpRender>().is_err());
    }

    #[test]
    fn plans_differ_only_where_modes_do() {
        let off = plan_for(BumpRender::Off);
        let normals = plan_for(BumpRender::Normals);
        let high = plan_for(BumpRender::HighPoly);

        assert_eq!(off.model, MODEL_LOW);
        assert_eq!(normals.model, MODEL_LOW);
        assert_eq!(high.model, MODEL_HIGH);

        assert_eq!(off.vertex_shader, normals.vertex_shader);
        assert_eq!(off.vertex_shader, high.vertex_shader);
        assert_eq!(off.fragment_shader, high.fragment_shader);
        assert_ne!(off.fragment_shader, normals.fragment_shader);

        assert_eq!(off.normal_map, None);
        assert_eq!(high.normal_map, None);
        assert_eq!(normals.normal_map, Some(NORMAL_MAP_TEXTURE));
    }

    #[test]
    fn attribute_order_is_position_normal_texcoord() {
        assert_eq!(plan_for(BumpRender::Off).attribute_names(), vec!["position", "normal"]);
        assert_eq!(plan_for(BumpRender::HighPoly).attribute_names(), vec!["position", "normal"]);
        assert_eq!(
            plan_for(BumpRender::Normals).attribute_names(),
            vec!["position", "normal", "texcoord"]
        );
        assert_eq!(
            plan_for(BumpRender::Normals).attributes,
            vec![(AttribType::Position, 3), (AttribType::Normal, 3), (AttribType::Texcoord, 2)]
        );
    }

    #[test]
    fn half_vector_bisects_light_and_view() {
        let h = half_vector(LIGHT_POSITION);
        let expected = (Vec3::new(20.0, 20.0, 10.0) / 30.0 + Vec3::Z).normalize();

        assert!((h - expected).length() < 1e-6);
        assert!((h.length() - 1.0).abs() < 1e-6);

        let light = LIGHT_POSITION.truncate().normalize();
        assert!((h.dot(light) - h.dot(Vec3::Z)).abs() < 1e-6);
    }

    #[test]
    fn default_mode_is_off() {
        let scene = BumpScene::new();
        assert_eq!(scene.mode(), Ok(BumpRender::Off));
        assert_eq!(scene.texture(), TextureHandle::NONE);
    }

    #[test]
    fn new_scene_spins_without_load() {
        let scene = BumpScene::new();
        assert_eq!(scene.rotation_speed(), ROTATION_SPEED);
        assert_eq!(scene.rotation(), 0.0);
    }

    #[test]
    fn model_view_wraps_large_angles() {
        let mut scene = BumpScene::new();
        scene.rotation = 90.0;
        let quarter = scene.model_view();

        scene.rotation = 90.0 + 360.0 * 1000.0;
        let wrapped = scene.model_view();

        assert!(quarter.abs_diff_eq(wrapped, 1e-5));
        let forward = quarter.transform_vector3(Vec3::X);
        assert!((forward - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
