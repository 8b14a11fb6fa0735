use thiserror::Error;

use crate::core::canvas::Canvas;
use crate::core::options::{OptionError, SceneOptions};
use crate::core::reflect::ShaderStage;
use crate::core::scene_base::SceneBase;
use crate::mesh::MeshError;
use crate::traits::assets::AssetProvider;
use crate::traits::render_device::RenderDevice;

/// Outcome of a scene's rendering self-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationResult {
    Success,
    Failure,
    Unknown,
}

/// Why a scene could not be prepared for a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("failed to load model {0}")]
    ModelLoadFailed(String),
    #[error("failed to read shader {0}")]
    ShaderSourceMissing(String),
    #[error("failed to build shader program ({0}): {1}")]
    ShaderLinkFailed(ShaderStage, String),
    #[error("program has no vertex attribute `{0}`")]
    MissingAttribute(String),
    #[error("failed to load texture {0}")]
    TextureLoadFailed(String),
    #[error("invalid value `{1}` for option `{0}`")]
    InvalidOption(String, String),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Collaborators a scene renders with during a run
pub struct SceneContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    pub assets: &'a dyn AssetProvider,
    pub canvas: &'a Canvas,
}

/// Benchmark workload with a fixed lifecycle:
/// load, then per run setup, update/draw while running, teardown; finally unload
pub trait Scene {
    fn base(&self) -> &SceneBase;

    fn base_mut(&mut self) -> &mut SceneBase;

    /// Prepare scene-wide defaults; no GPU work happens here
    fn load(&mut self) -> anyhow::Result<()>;

    fn unload(&mut self);

    /// Create the GPU resources for one run and start its clock
    fn setup(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), SetupError>;

    /// Release everything setup created; safe after a failed setup or mid-run
    fn teardown(&mut self, ctx: &mut SceneContext<'_>);

    /// Advance animation and timing state for one frame
    fn update(&mut self, canvas: &Canvas);

    /// Render the current state
    fn draw(&self, ctx: &mut SceneContext<'_>);

    fn validate(&self, _ctx: &mut SceneContext<'_>) -> ValidationResult {
        ValidationResult::Unknown
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn running(&self) -> bool {
        self.base().running()
    }

    fn average_fps(&self) -> f64 {
        self.base().average_fps()
    }

    fn options(&self) -> &SceneOptions {
        self.base().options()
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        self.base_mut().options_mut().set(name, value)
    }

    fn reset_options(&mut self) {
        self.base_mut().options_mut().reset()
    }

    fn info_string(&self) -> String {
        self.base().info_string()
    }
}
