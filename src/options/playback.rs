use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame sequencing for pre-loaded and streamed trajectories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Playback", inline)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Frames advanced per second of wall-clock time.
    #[schemars(title = "Frame Rate", range(min = 0.1, max = 240.0), extend("step" = 1.0))]
    pub fps: f32,
    /// Wrap to the first frame after the last.
    #[schemars(title = "Loop")]
    pub looping: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            fps: 30.0,
            looping: true,
        }
    }
}
