use crate::core::options::{SceneOption, SceneOptions};
use crate::traits::scene::SetupError;

pub const DURATION_OPTION: &str = "duration";
const DEFAULT_DURATION: &str = "10.0";

/// State every scene shares: name, options and run timing
#[derive(Debug, Clone)]
pub struct SceneBase {
    name: String,
    options: SceneOptions,
    running: bool,
    start_time: f64,
    last_update_time: f64,
    current_frame: u64,
    average_fps: f64,
    duration: f64,
}

impl SceneBase {
    pub fn new(name: &str) -> Self {
        let mut options = SceneOptions::new();
        options.register(SceneOption::new(
            DURATION_OPTION,
            DEFAULT_DURATION,
            "The duration of each benchmark in seconds",
            &[],
        ));

        Self {
            name: name.to_string(),
            options,
            running: false,
            start_time: 0.0,
            last_update_time: 0.0,
            current_frame: 0,
            average_fps: 0.0,
            duration: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SceneOptions {
        &mut self.options
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn average_fps(&self) -> f64 {
        self.average_fps
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    /// Seconds between the run start and the latest update
    pub fn elapsed(&self) -> f64 {
        self.last_update_time - self.start_time
    }

    /// Read the run length and clear the previous run's counters
    pub fn setup(&mut self) -> Result<(), SetupError> {
        let raw = self.options.value(DURATION_OPTION).unwrap_or(DEFAULT_DURATION);
        self.duration = match raw.trim().parse::<f64>() {
            Ok(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                return Err(SetupError::InvalidOption(
                    DURATION_OPTION.to_string(),
                    raw.to_string(),
                ))
            }
        };

        self.running = false;
        self.current_frame = 0;
        self.average_fps = 0.0;
        Ok(())
    }

    /// Anchor the run clock at `now` (seconds) and mark the scene running
    pub fn start(&mut self, now: f64) {
        self.current_frame = 0;
        self.running = true;
        self.start_time = now;
        self.last_update_time = now;
    }

    /// Frame bookkeeping; returns the seconds since the previous update
    ///
    /// The first update at or past the configured duration records the
    /// average frame rate and stops the run. Later updates leave it as is.
    pub fn update(&mut self, now: f64) -> f64 {
        let dt = now - self.last_update_time;
        let elapsed = now - self.start_time;

        self.last_update_time = now;

        if self.running && elapsed >= self.duration {
            self.average_fps = if elapsed > 0.0 {
                self.current_frame as f64 / elapsed
            } else {
                0.0
            };
            self.running = false;
            log::info!(
                "[{}] finished after {} frames in {:.3}s ({:.2} FPS)",
                self.name,
                self.current_frame,
                elapsed,
                self.average_fps
            );
        }

        self.current_frame += 1;
        dt
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn teardown(&mut self) {
        self.running = false;
    }

    /// `[name] opt=value:opt=value` for explicitly set options
    pub fn info_string(&self) -> String {
        let set: Vec<String> = self
            .options
            .iter()
            .filter(|o| o.set)
            .map(|o| format!("{}={}", o.name, o.value))
            .collect();

        if set.is_empty() {
            format!("[{}] <default>", self.name)
        } else {
            format!("[{}] {}", self.name, set.join(":"))
        }
    }
}
