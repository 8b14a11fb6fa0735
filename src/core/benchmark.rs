use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::options::OptionError;
use crate::traits::scene::{Scene, SceneContext, SetupError, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BenchmarkError {
    #[error("benchmark description is empty")]
    Empty,
    #[error("malformed option `{0}` (expected name=value)")]
    MalformedOption(String),
    #[error("benchmark is for scene `{expected}`, got `{found}`")]
    SceneMismatch { expected: String, found: String },
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),
}

/// One scene run with a set of option overrides
///
/// The string form is `scene:name=value:name=value`, e.g.
/// `bump:bump-render=normals:duration=2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Benchmark {
    scene_name: String,
    options: Vec<(String, String)>,
}

impl Benchmark {
    pub fn new(scene_name: &str) -> Self {
        Self {
            scene_name: scene_name.to_string(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.options.push((name.to_string(), value.to_string()));
        self
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Run the scene until it stops by itself
    pub fn run(
        &self,
        scene: &mut dyn Scene,
        ctx: &mut SceneContext<'_>,
    ) -> Result<RunReport, BenchmarkError> {
        self.run_with(scene, ctx, |_| {})
    }

    /// Like `run`, calling `after_frame` with the frame count after each frame
    pub fn run_with<F>(
        &self,
        scene: &mut dyn Scene,
        ctx: &mut SceneContext<'_>,
        mut after_frame: F,
    ) -> Result<RunReport, BenchmarkError>
    where
        F: FnMut(u64),
    {
        if scene.name() != self.scene_name {
            return Err(BenchmarkError::SceneMismatch {
                expected: self.scene_name.clone(),
                found: scene.name().to_string(),
            });
        }

        scene.reset_options();
        for (name, value) in &self.options {
            scene.set_option(name, value)?;
        }

        let info = scene.info_string();
        log::info!("{} starting", info);

        if let Err(e) = scene.setup(ctx) {
            log::error!("{} setup failed: {}", info, e);
            scene.teardown(ctx);
            return Err(e.into());
        }

        let mut frames = 0;
        while scene.running() {
            ctx.device.begin_frame();
            scene.update(ctx.canvas);
            scene.draw(ctx);
            ctx.device.end_frame();

            frames += 1;
            after_frame(frames);
        }

        let validation = scene.validate(ctx);
        let base = scene.base();
        let report = RunReport {
            benchmark: info,
            frames: base.current_frame(),
            elapsed_secs: base.elapsed(),
            average_fps: base.average_fps(),
            validation,
            finished_at: Utc::now(),
        };

        scene.teardown(ctx);
        log::info!("{}", report.summary_line());
        Ok(report)
    }
}

impl FromStr for Benchmark {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let scene_name = parts.next().unwrap_or_default().trim();
        if scene_name.is_empty() {
            return Err(BenchmarkError::Empty);
        }

        let mut benchmark = Benchmark::new(scene_name);
        for part in parts.filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((name, value)) if !name.trim().is_empty() => {
                    benchmark = benchmark.with_option(name.trim(), value.trim());
                }
                _ => return Err(BenchmarkError::MalformedOption(part.to_string())),
            }
        }
        Ok(benchmark)
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scene_name)?;
        for (name, value) in &self.options {
            write!(f, ":{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Outcome of one completed benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub benchmark: String,
    pub frames: u64,
    pub elapsed_secs: f64,
    pub average_fps: f64,
    pub validation: ValidationResult,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Milliseconds per frame at the average rate; 0 when nothing was measured
    pub fn frame_time_ms(&self) -> f64 {
        if self.average_fps > 0.0 {
            1000.0 / self.average_fps
        } else {
            0.0
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: FPS: {:.0} FrameTime: {:.3} ms",
            self.benchmark,
            self.average_fps,
            self.frame_time_ms()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scene_and_ordered_options() {
        let bench: Benchmark = "bump:bump-render=normals:duration=2.0".parse().unwrap();
        assert_eq!(bench.scene_name(), "bump");
        assert_eq!(
            bench.options(),
            &[
                ("bump-render".to_string(), "normals".to_string()),
                ("duration".to_string(), "2.0".to_string()),
            ]
        );
        assert_eq!(bench.to_string(), "bump:bump-render=normals:duration=2.0");
    }

    #[test]
    fn bare_scene_name_has_no_overrides() {
        let bench: Benchmark = "bump".parse().unwrap();
        assert!(bench.options().is_empty());
    }

    #[test]
    fn rejects_malformed_descriptions() {
        assert_eq!("".parse::<Benchmark>(), Err(BenchmarkError::Empty));
        assert_eq!(
            "bump:bump-render".parse::<Benchmark>(),
            Err(BenchmarkError::MalformedOption("bump-render".into()))
        );
        assert!(matches!(
            "bump:=off".parse::<Benchmark>(),
            Err(BenchmarkError::MalformedOption(_))
        ));
    }

    #[test]
    fn report_serializes_with_lowercase_validation() {
        let report = RunReport {
            benchmark: "[bump] <default>".into(),
            frames: 600,
            elapsed_secs: 10.0,
            average_fps: 60.0,
            validation: ValidationResult::Unknown,
            finished_at: Utc::now(),
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["validation"], "unknown");
        assert_eq!(json["frames"], 600);
        assert!((report.frame_time_ms() - 16.667).abs() < 0.001);
        assert!(report.summary_line().starts_with("[bump] <default>: FPS: 60"));
    }
}
