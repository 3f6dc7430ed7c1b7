use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Camera parameters used when deriving a view from a periodic box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Framing", inline)]
#[serde(default)]
pub struct FramingOptions {
    /// Vertical field of view in degrees.
    #[schemars(title = "Field of View", range(min = 20.0, max = 90.0), extend("step" = 1.0))]
    pub fovy: f32,
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self { fovy: 50.0 }
    }
}
