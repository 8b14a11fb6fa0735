/// Monotonic timestamp source
pub trait TimeSource {
    /// Microseconds since an arbitrary fixed origin, never decreasing
    fn timestamp_us(&self) -> u64;

    /// Timestamp in seconds
    fn timestamp(&self) -> f64 {
        self.timestamp_us() as f64 / 1_000_000.0
    }
}
