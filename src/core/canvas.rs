use glam::Mat4;

use crate::traits::clock::TimeSource;

const FOV_Y_DEGREES: f32 = 60.0;
const Z_NEAR: f32 = 1.0;
const Z_FAR: f32 = 1024.0;

/// Render target description shared by all scenes: size, projection and
/// the timestamp source scenes measure themselves with
pub struct Canvas {
    width: u32,
    height: u32,
    projection: Mat4,
    clock: Box<dyn TimeSource>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, clock: Box<dyn TimeSource>) -> Self {
        let mut canvas = Self {
            width: 0,
            height: 0,
            projection: Mat4::IDENTITY,
            clock,
        };
        canvas.resize(width, height);
        canvas
    }

    /// Change the target size and recompute the projection
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.projection = Mat4::perspective_rh(
            FOV_Y_DEGREES.to_radians(),
            self.aspect(),
            Z_NEAR,
            Z_FAR,
        );
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn timestamp_us(&self) -> u64 {
        self.clock.timestamp_us()
    }

    /// Current time in seconds
    pub fn timestamp(&self) -> f64 {
        self.clock.timestamp()
    }
}
