use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Instance scale, capacity and coloring for the transform engine.
///
/// One scale applies to every atom and one radius to every bond; per-atom
/// radii are not supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Engine", inline)]
#[serde(default)]
pub struct EngineOptions {
    /// Uniform scale of every atom sphere.
    #[schemars(title = "Atom Scale", range(min = 0.005, max = 0.5), extend("step" = 0.005))]
    pub atom_scale: f32,
    /// Radius of every bond cylinder.
    #[schemars(title = "Bond Radius", range(min = 0.001, max = 0.25), extend("step" = 0.001))]
    pub bond_radius: f32,
    /// Maximum atom instances per trajectory.
    #[schemars(skip)]
    pub atom_limit: usize,
    /// Maximum bond instances per trajectory.
    #[schemars(skip)]
    pub bond_limit: usize,
    /// Weight of the element reference color against the index hue.
    #[schemars(title = "Element Tint", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub element_blend: f32,
    /// Half-width of the random hue offset sampled per atom at load.
    #[schemars(title = "Hue Jitter", range(min = 0.0, max = 0.5), extend("step" = 0.01))]
    pub hue_jitter: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            atom_scale: 0.035,
            bond_radius: 0.0175,
            atom_limit: 2048,
            bond_limit: 2048,
            element_blend: 0.65,
            hue_jitter: 0.05,
        }
    }
}
