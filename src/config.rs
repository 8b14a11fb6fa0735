use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::core::benchmark::{Benchmark, BenchmarkError};
use crate::core::scene_base::DURATION_OPTION;
use crate::scenes::bump::BUMP_RENDER_OPTION;

/// Environment variable naming the data directory when no path is configured
pub const DATA_PATH_ENV: &str = "BUMP_BENCH_DATA";
const DEFAULT_DATA_PATH: &str = "data";
const DEFAULT_SCENE: &str = "bump";

/// Run configuration: JSON file values overlaid by command-line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub data_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub bump_render: Option<String>,
    pub duration: Option<f64>,
    pub benchmarks: Vec<String>,
    pub dry_run: bool,
    pub json: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            width: 800,
            height: 600,
            bump_render: None,
            duration: None,
            benchmarks: Vec::new(),
            dry_run: false,
            json: false,
        }
    }
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Config file named by `--config` (if any) with the other flags applied on top
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.data_path {
            self.data_path = Some(path.clone());
        }
        if let Some(width) = cli.width {
            self.width = width;
        }
        if let Some(height) = cli.height {
            self.height = height;
        }
        if let Some(mode) = &cli.bump_render {
            self.bump_render = Some(mode.clone());
        }
        if let Some(duration) = cli.duration {
            self.duration = Some(duration);
        }
        if !cli.benchmarks.is_empty() {
            self.benchmarks = cli.benchmarks.clone();
        }
        self.dry_run |= cli.dry_run;
        self.json |= cli.json;
    }

    /// Configured path, else `$BUMP_BENCH_DATA`, else `data`
    pub fn data_root(&self) -> PathBuf {
        self.data_root_with(std::env::var(DATA_PATH_ENV).ok())
    }

    fn data_root_with(&self, env: Option<String>) -> PathBuf {
        if let Some(path) = &self.data_path {
            return path.clone();
        }
        match env {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_DATA_PATH),
        }
    }

    /// Benchmarks to run in order
    ///
    /// `bump_render` and `duration` act as defaults that each listed
    /// benchmark may override. With nothing listed a single `bump` run is used.
    pub fn benchmarks(&self) -> Result<Vec<Benchmark>, BenchmarkError> {
        let listed = if self.benchmarks.is_empty() {
            vec![DEFAULT_SCENE.to_string()]
        } else {
            self.benchmarks.clone()
        };

        listed
            .iter()
            .map(|description| {
                let parsed: Benchmark = description.parse()?;
                let mut bench = Benchmark::new(parsed.scene_name());
                if let Some(mode) = &self.bump_render {
                    bench = bench.with_option(BUMP_RENDER_OPTION, mode);
                }
                if let Some(duration) = self.duration {
                    bench = bench.with_option(DURATION_OPTION, &duration.to_string());
                }
                for (name, value) in parsed.options() {
                    bench = bench.with_option(name, value);
                }
                Ok(bench)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_file_values() {
        let mut config: BenchConfig =
            serde_json::from_str(r#"{"width": 1024, "height": 768, "bump_render": "off"}"#).unwrap();
        let cli = Cli::parse_from(["bump-bench", "--width", "320", "--bump-render", "normals"]);
        config.apply_cli(&cli);

        assert_eq!((config.width, config.height), (320, 768));
        assert_eq!(config.bump_render.as_deref(), Some("normals"));
    }

    #[test]
    fn data_root_precedence() {
        let mut config = BenchConfig::default();
        assert_eq!(config.data_root_with(None), PathBuf::from("data"));
        assert_eq!(config.data_root_with(Some(String::new())), PathBuf::from("data"));
        assert_eq!(config.data_root_with(Some("/env".into())), PathBuf::from("/env"));

        config.data_path = Some(PathBuf::from("/flag"));
        assert_eq!(config.data_root_with(Some("/env".into())), PathBuf::from("/flag"));
    }

    #[test]
    fn default_benchmark_carries_global_options() {
        let config = BenchConfig {
            bump_render: Some("high-poly".into()),
            duration: Some(2.0),
            ..Default::default()
        };

        let benches = config.benchmarks().unwrap();
        assert_eq!(benches.len(), 1);
        assert_eq!(benches[0].to_string(), "bump:bump-render=high-poly:duration=2");
    }

    #[test]
    fn listed_benchmarks_override_globals() {
        let config = BenchConfig {
            duration: Some(5.0),
            benchmarks: vec!["bump:duration=1.5".into(), "bump:bump-render=normals".into()],
            ..Default::default()
        };

        let benches = config.benchmarks().unwrap();
        assert_eq!(benches[0].to_string(), "bump:duration=5:duration=1.5");
        assert_eq!(benches[1].to_string(), "bump:duration=5:bump-render=normals");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = BenchConfig::load(Path::new("/nonexistent/bump-bench.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
