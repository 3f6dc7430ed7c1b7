use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pinning of the aggregate centroid to a world-space anchor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Recenter", inline)]
#[serde(default)]
pub struct RecenterOptions {
    /// Keep the centroid of all displayed atoms at `anchor`.
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    /// World-space anchor point.
    #[schemars(skip)]
    pub anchor: [f32; 3],
}

impl Default for RecenterOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            anchor: [0.0, 0.0, 0.0],
        }
    }
}
