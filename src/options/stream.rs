use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Live stream connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Stream", inline)]
#[serde(default)]
pub struct StreamOptions {
    /// Socket read timeout between checks for outgoing messages and close
    /// requests, in milliseconds.
    #[schemars(skip)]
    pub poll_interval_ms: u64,
    /// Bound on the TCP connect and on the WebSocket upgrade, in
    /// milliseconds.
    #[schemars(skip)]
    pub connect_timeout_ms: u64,
    /// Live events applied per render tick; the rest wait for the next one.
    #[schemars(skip)]
    pub max_events_per_tick: usize,
    /// Frames kept from a live stream; older frames are released.
    #[schemars(title = "Frame History", range(min = 1, max = 100_000))]
    pub frame_history: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            connect_timeout_ms: 5000,
            max_events_per_tick: 256,
            frame_history: 1024,
        }
    }
}
