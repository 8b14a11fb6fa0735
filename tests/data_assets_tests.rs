use bump_bench::core::assets::FileAssets;
use bump_bench::core::benchmark::Benchmark;
use bump_bench::core::canvas::Canvas;
use bump_bench::core::clock::ManualClock;
use bump_bench::core::null_device::{DeviceOp, NullDevice};
use bump_bench::scenes::{plan_for, BumpRender, BumpScene};
use bump_bench::traits::assets::AssetProvider;
use bump_bench::traits::scene::{Scene, SceneContext};

const DATA_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

/// 60 Hz frame step in microseconds
const FRAME_US: u64 = 16_667;

/// Three vertices per face of the shipped asteroids
fn expected_vertices(mode: BumpRender) -> u32 {
    match mode {
        BumpRender::HighPoly => 61_440,
        BumpRender::Off | BumpRender::Normals => 960,
    }
}

fn drawn_vertices(device: &NullDevice) -> Vec<u32> {
    device
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            DeviceOp::Draw { vertex_count, .. } => Some(vertex_count),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Shipped data directory
// ============================================================================

#[test]
fn test_every_mode_runs_from_the_data_directory() {
    let assets = FileAssets::new(DATA_ROOT);

    for mode in BumpRender::ALL {
        let clock = ManualClock::new();
        let canvas = Canvas::new(800, 600, Box::new(clock.clone()));
        let mut device = NullDevice::new();
        let mut scene = BumpScene::new();
        scene.load().unwrap();

        let bench = Benchmark::new("bump")
            .with_option("bump-render", mode.as_str())
            .with_option("duration", "0.1");
        let mut ctx = SceneContext {
            device: &mut device,
            assets: &assets,
            canvas: &canvas,
        };
        let report = bench
            .run_with(&mut scene, &mut ctx, |_| clock.advance_us(FRAME_US))
            .unwrap_or_else(|e| panic!("{} failed: {}", mode, e));

        assert!(report.frames > 0, "{}", mode);
        assert!(report.average_fps > 0.0, "{}", mode);
        assert_eq!(drawn_vertices(&device), vec![expected_vertices(mode); report.frames as usize]);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.live_textures(), 0);
    }
}

#[test]
fn test_high_poly_model_is_more_detailed() {
    let assets = FileAssets::new(DATA_ROOT);

    let low = assets.load_model(plan_for(BumpRender::Off).model).unwrap();
    let high = assets.load_model(plan_for(BumpRender::HighPoly).model).unwrap();

    assert!(low.face_count() > 0);
    assert!(high.face_count() > low.face_count() * 4);
}

#[test]
fn test_normal_map_is_uploaded_at_full_size() {
    let assets = FileAssets::new(DATA_ROOT);
    let normal_map = assets
        .load_texture(plan_for(BumpRender::Normals).normal_map.unwrap())
        .unwrap();

    let clock = ManualClock::new();
    let canvas = Canvas::new(800, 600, Box::new(clock));
    let mut device = NullDevice::new();
    let mut scene = BumpScene::new();
    scene.set_option("bump-render", "normals").unwrap();
    scene
        .setup(&mut SceneContext {
            device: &mut device,
            assets: &assets,
            canvas: &canvas,
        })
        .unwrap();

    let uploaded = device.ops().into_iter().find_map(|op| match op {
        DeviceOp::CreateTexture { width, height, .. } => Some((width, height)),
        _ => None,
    });
    assert_eq!(uploaded, Some((normal_map.width, normal_map.height)));
    assert_eq!(normal_map.data.len(), (normal_map.width * normal_map.height * 4) as usize);
}
