use anyhow::{Context, Result};
use clap::Parser;

use bump_bench::cli::Cli;
use bump_bench::config::BenchConfig;
use bump_bench::core::assets::FileAssets;
use bump_bench::core::canvas::Canvas;
use bump_bench::core::clock::MonotonicClock;
use bump_bench::core::gpu_context::GpuContext;
use bump_bench::core::null_device::NullDevice;
use bump_bench::core::wgpu_device::WgpuDevice;
use bump_bench::scenes::BumpScene;
use bump_bench::traits::render_device::RenderDevice;
use bump_bench::traits::scene::{Scene, SceneContext};

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = BenchConfig::from_cli(&cli)?;
    let benchmarks = config.benchmarks().context("Invalid benchmark description")?;

    let assets = FileAssets::new(config.data_root());
    log::info!("Loading data from {}", assets.root().display());

    let canvas = Canvas::new(config.width, config.height, Box::new(MonotonicClock::new()));

    let mut device: Box<dyn RenderDevice> = if config.dry_run {
        log::info!("Dry run: no GPU work will be submitted");
        Box::new(NullDevice::silent())
    } else {
        let gpu = pollster::block_on(GpuContext::new())
            .map_err(|e| anyhow::anyhow!("GPU initialisation failed: {}", e))?;
        Box::new(WgpuDevice::new(gpu, canvas.width(), canvas.height()))
    };

    let mut scene = BumpScene::new();
    scene.load().context("Failed to load bump scene")?;

    let mut reports = Vec::new();
    let mut failures = 0;
    for bench in &benchmarks {
        let mut ctx = SceneContext {
            device: device.as_mut(),
            assets: &assets,
            canvas: &canvas,
        };

        match bench.run(&mut scene, &mut ctx) {
            Ok(report) => {
                if !config.json {
                    println!("{}", report.summary_line());
                }
                reports.push(report);
            }
            Err(e) => {
                log::error!("{}: {}", bench, e);
                failures += 1;
            }
        }
    }

    scene.unload();

    if config.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} benchmarks failed", failures, benchmarks.len());
    }
    Ok(())
}
