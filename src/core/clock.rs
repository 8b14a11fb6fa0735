use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::traits::clock::TimeSource;

/// Wall clock backed by `Instant`, counting from its creation
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn timestamp_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by whole microseconds
    pub fn advance_us(&self, delta_us: u64) {
        self.now_us.set(self.now_us.get() + delta_us);
    }

    /// Move time forward by seconds, rounded to the nearest microsecond
    pub fn advance_secs(&self, delta: f64) {
        self.advance_us((delta.max(0.0) * 1_000_000.0).round() as u64);
    }
}

impl TimeSource for ManualClock {
    fn timestamp_us(&self) -> u64 {
        self.now_us.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn monotonic_clock_measures_elapsed() {
        let clock = MonotonicClock::new();
        let start = clock.timestamp();

        thread::sleep(Duration::from_millis(10));
        let delta = clock.timestamp() - start;

        // Should be roughly 10ms = 0.01s
        assert!(delta >= 0.009 && delta <= 0.5);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();

        clock.advance_secs(0.25);
        assert_eq!(view.timestamp_us(), 250_000);
        assert_eq!(view.timestamp(), 0.25);
    }

    #[test]
    fn manual_clock_ignores_negative_steps() {
        let clock = ManualClock::new();
        clock.advance_us(10);
        clock.advance_secs(-1.0);
        assert_eq!(clock.timestamp_us(), 10);
    }
}
