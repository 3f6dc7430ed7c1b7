//! Tick pacing for the headless driver.

use web_time::{Duration, Instant};

/// Smoothing factor for the FPS moving average (share of the newest sample).
const FPS_SMOOTHING: f32 = 0.05;

/// Tick pacing with FPS calculation and optional rate limiting.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Minimum tick duration (zero = unlimited)
    min_tick: Duration,
    /// Last tick timestamp
    last_tick: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
}

impl FrameTiming {
    /// Timer targeting `target_fps` ticks per second (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: f32, now: Instant) -> Self {
        let min_tick = if target_fps > 0.0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };
        Self {
            min_tick,
            last_tick: now,
            smoothed_fps: target_fps.max(1.0),
        }
    }

    /// Whether enough time has passed since the last tick.
    #[must_use]
    pub fn should_tick(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_tick) >= self.min_tick
    }

    /// Time left before the next tick is due.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        self.min_tick
            .saturating_sub(now.saturating_duration_since(self.last_tick))
    }

    /// Record a finished tick.
    pub fn end_tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        let tick_time = elapsed.as_secs_f32();
        if tick_time > 0.0 {
            self.smoothed_fps = self.smoothed_fps * (1.0 - FPS_SMOOTHING)
                + FPS_SMOOTHING / tick_time;
        }
    }

    /// Current FPS (smoothed).
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paces_to_target() {
        let start = Instant::now();
        let timing = FrameTiming::new(10.0, start);
        assert!(!timing.should_tick(start + Duration::from_millis(50)));
        assert!(timing.should_tick(start + Duration::from_millis(100)));
        let wait = timing.until_next(start + Duration::from_millis(40));
        assert!(wait > Duration::from_millis(59) && wait <= Duration::from_millis(60));
    }

    #[test]
    fn unlimited_always_ticks() {
        let start = Instant::now();
        let timing = FrameTiming::new(0.0, start);
        assert!(timing.should_tick(start));
        assert_eq!(timing.until_next(start), Duration::ZERO);
    }

    #[test]
    fn fps_moves_toward_measured_rate() {
        let start = Instant::now();
        let mut timing = FrameTiming::new(30.0, start);
        let mut now = start;
        for _ in 0..200 {
            now += Duration::from_millis(10);
            timing.end_tick(now);
        }
        assert!((timing.fps() - 100.0).abs() < 1.0);
    }
}
