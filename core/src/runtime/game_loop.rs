//! Fixed timestep accumulator
//!
//! Converts wall-clock frame times into a whole number of simulation ticks
//! plus an interpolation factor for rendering between the last two states.

use std::time::{Duration, Instant};

use super::RuntimeConfig;

/// Accumulates elapsed time and releases it one tick at a time.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_duration: Duration,
    max_delta: Duration,
    cpu_budget: Duration,
    accumulator: Duration,
    last_update: Option<Instant>,
}

impl FixedTimestep {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            tick_duration: config.tick_duration(),
            max_delta: config.max_delta,
            cpu_budget: config.cpu_budget,
            accumulator: Duration::ZERO,
            last_update: None,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Forget accumulated time, e.g. after a load or while a session synchronizes.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last_update = None;
    }

    /// Add the time elapsed since the previous call, scaled by `time_scale`.
    ///
    /// The first call counts as exactly one tick. Deltas are clamped to
    /// `max_delta` so a long stall cannot trigger a catch-up spiral.
    pub fn accumulate(&mut self, now: Instant, time_scale: f32) {
        let delta = match self.last_update {
            Some(last) => now.saturating_duration_since(last).min(self.max_delta),
            None => self.tick_duration,
        };
        self.last_update = Some(now);
        self.accumulator += delta.mul_f32(time_scale.max(0.0));
    }

    /// Interpolation factor between the last two ticks.
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.tick_duration.as_secs_f32()
    }

    /// Run `tick` once per whole tick accumulated so far.
    ///
    /// Returns the number of ticks executed and the interpolation factor.
    /// Stops at the first error, leaving the failed tick's time accumulated.
    pub fn run<E>(
        &mut self,
        mut tick: impl FnMut() -> Result<(), E>,
    ) -> Result<(u32, f32), E> {
        let mut ticks = 0u32;
        while self.accumulator >= self.tick_duration {
            let tick_start = Instant::now();
            tick()?;
            self.accumulator -= self.tick_duration;
            ticks += 1;

            let tick_time = tick_start.elapsed();
            if tick_time > self.cpu_budget {
                tracing::warn!(
                    "Tick took {:?}, exceeds budget of {:?}",
                    tick_time,
                    self.cpu_budget
                );
            }
        }
        Ok((ticks, self.alpha()))
    }

    /// Accumulate the elapsed time and run every tick that became due.
    pub fn frame<E>(
        &mut self,
        now: Instant,
        time_scale: f32,
        tick: impl FnMut() -> Result<(), E>,
    ) -> Result<(u32, f32), E> {
        self.accumulate(now, time_scale);
        self.run(tick)
    }
}
