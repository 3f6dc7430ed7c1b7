// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Core of a molecular-dynamics trajectory viewer.
//!
//! Trajectories arrive either as whole documents (loaded off-thread by
//! [`ingest::FrameIngestPipeline`]) or as partial updates over a WebSocket
//! ([`live::LiveFrameChannel`]). Both carry typed arrays as base64 text
//! ([`codec`]). Each displayed trajectory is held in a
//! [`trajectory::TrajectoryStore`] and turned into per-instance sphere and
//! cylinder transforms by an [`engine::TransformEngine`], ready for an
//! instanced renderer to upload.
//!
//! # Key entry points
//!
//! - [`session::Session`] - owns everything and runs one render tick at a
//!   time
//! - [`engine::TransformEngine`] - atom/bond matrices and colors
//! - [`recenter::AggregateRecenter`] - keeps the combined centroid anchored
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Background work runs on named OS threads that hand results back over
//! `std::sync::mpsc` channels; the render tick only ever polls them. Buffers
//! move with the message, so no two contexts hold the same frame.

pub mod codec;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod live;
pub mod options;
pub mod playback;
pub mod recenter;
pub mod session;
pub mod trajectory;
pub mod util;

pub use error::TrajviewError;
