//! Wall-clock frame sequencer for pre-loaded trajectories.
//!
//! The player only tracks an index; the store it indexes clamps lookups, so
//! the index is allowed to point past the frames that exist.

use web_time::{Duration, Instant};

use crate::options::PlaybackOptions;

/// Lowest accepted playback rate.
const MIN_FPS: f32 = 0.1;

/// Auto-advancing frame index with configurable speed.
#[derive(Debug, Clone)]
pub struct TrajectoryPlayer {
    current_frame: usize,
    last_advance: Instant,
    frame_duration: Duration,
    playing: bool,
    looping: bool,
}

impl TrajectoryPlayer {
    /// Player at frame 0, started at `now`.
    #[must_use]
    pub fn new(options: &PlaybackOptions, now: Instant) -> Self {
        Self {
            current_frame: 0,
            last_advance: now,
            frame_duration: frame_duration(options.fps),
            playing: true,
            looping: options.looping,
        }
    }

    /// Advance by however many whole frame durations have elapsed since the
    /// last step. Returns `true` if the index changed.
    ///
    /// `frame_count` is the number of frames currently available; with
    /// looping off the player stops on the last one.
    pub fn tick(&mut self, now: Instant, frame_count: usize) -> bool {
        if !self.playing || frame_count == 0 {
            return false;
        }

        let elapsed = now.saturating_duration_since(self.last_advance);
        let steps = (elapsed.as_nanos() / self.frame_duration.as_nanos().max(1))
            as usize;
        if steps == 0 {
            return false;
        }
        self.last_advance += self.frame_duration * steps as u32;

        let previous = self.current_frame;
        let next = self.current_frame.saturating_add(steps);
        if next < frame_count {
            self.current_frame = next;
        } else if self.looping {
            self.current_frame = next % frame_count;
        } else {
            self.current_frame = frame_count - 1;
            self.playing = false;
        }
        self.current_frame != previous
    }

    /// Toggle between playing and paused states.
    pub fn toggle_playback(&mut self, now: Instant) {
        self.playing = !self.playing;
        if self.playing {
            // Reset advance timer so we don't immediately skip frames
            self.last_advance = now;
        }
    }

    /// Jump to `frame`.
    pub fn seek(&mut self, frame: usize) {
        self.current_frame = frame;
    }

    /// Set playback speed in frames per second (clamped to >= 0.1).
    pub fn set_fps(&mut self, fps: f32) {
        self.frame_duration = frame_duration(fps);
    }

    /// Enable or disable looping at the end of the trajectory.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Index of the current frame.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Whether the player is currently advancing frames.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

fn frame_duration(fps: f32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(MIN_FPS)))
}
