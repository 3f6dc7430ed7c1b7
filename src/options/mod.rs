//! Centralized runtime options with TOML file support.
//!
//! Engine scale and capacity, playback rate, recentering, stream and framing
//! settings live here. Options serialize to/from TOML so a viewer can ship
//! presets next to its trajectories.

mod engine;
mod framing;
mod playback;
mod recenter;
mod stream;

use std::path::Path;

pub use engine::EngineOptions;
pub use framing::FramingOptions;
pub use playback::PlaybackOptions;
pub use recenter::RecenterOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use stream::StreamOptions;

use crate::error::TrajviewError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[playback]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Instance scale, capacity and coloring.
    pub engine: EngineOptions,
    /// Frame sequencing.
    pub playback: PlaybackOptions,
    /// Aggregate centroid pinning.
    pub recenter: RecenterOptions,
    /// Live stream connection.
    pub stream: StreamOptions,
    /// View framing derived from periodic boxes.
    pub framing: FramingOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::Io`] if the file cannot be read,
    /// [`TrajviewError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, TrajviewError> {
        let content =
            std::fs::read_to_string(path).map_err(TrajviewError::Io)?;
        toml::from_str(&content)
            .map_err(|e| TrajviewError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`TrajviewError::OptionsParse`] on serialization failure,
    /// [`TrajviewError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), TrajviewError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrajviewError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(TrajviewError::Io)?;
        }
        std::fs::write(path, content).map_err(TrajviewError::Io)
    }
}
