//! Small helpers shared by the binary and embedders.

pub mod frame_timing;
