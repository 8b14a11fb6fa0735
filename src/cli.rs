// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "bump-bench")]
#[command(about = "Bump mapping GPU benchmark", long_about = None)]
pub struct Cli {
    /// Bump rendering mode: off, normals or high-poly
    #[arg(long = "bump-render")]
    pub bump_render: Option<String>,

    /// Seconds each benchmark runs for
    #[arg(long)]
    pub duration: Option<f64>,

    /// Directory holding models/, shaders/ and textures/
    #[arg(long = "data-path")]
    pub data_path: Option<PathBuf>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Benchmark description such as `bump:bump-render=normals:duration=2.0`; repeatable
    #[arg(short = 'b', long = "benchmark")]
    pub benchmarks: Vec<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Drive the scenes without a GPU
    #[arg(long = "dry-run", default_value = "false")]
    pub dry_run: bool,

    /// Print reports as JSON instead of summary lines
    #[arg(long, default_value = "false")]
    pub json: bool,
}
