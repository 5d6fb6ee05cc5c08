//! Host-side timing settings for a match

use std::time::Duration;

/// Tick pacing and self-check switches. None of these affect simulation
/// results except `tick_rate`, which sets the fixed delta every peer must share.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Longest wall-clock gap fed to the accumulator in one frame
    pub max_delta: Duration,
    /// A tick slower than this is logged
    pub cpu_budget: Duration,
    /// Step every tick twice from the same snapshot and compare hashes
    pub verify_determinism: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_delta: Duration::from_millis(100),
            cpu_budget: Duration::from_millis(4),
            verify_determinism: false,
        }
    }
}

impl RuntimeConfig {
    /// Time per tick, inverse of the tick rate.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}
