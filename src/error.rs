//! Crate-level error types.
//!
//! Codec, topology and capacity errors are local to the component that hits
//! them: the update is dropped, the failure is logged, and the previous state
//! stays on screen. Transport errors end the current connection only.

use std::fmt;

/// Failure decoding a base64 field into a typed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The text is not valid standard base64.
    InvalidText(String),
    /// The decoded byte length is not a multiple of the element width.
    MisalignedLength {
        /// Decoded byte count.
        len: usize,
        /// Width in bytes of the target element type.
        width: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidText(msg) => write!(f, "invalid base64 text: {msg}"),
            Self::MisalignedLength { len, width } => write!(
                f,
                "decoded length {len} is not a multiple of element width \
                 {width}"
            ),
        }
    }
}

impl std::error::Error for CodecError {}

/// A topology or frame that violates the structural invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A bond references an atom index outside `[0, atom_count)`.
    BondOutOfRange {
        /// Position of the offending bond in the bond list.
        bond: usize,
        /// The out-of-range atom index.
        index: u32,
        /// Number of atoms in the topology.
        atom_count: usize,
    },
    /// A bond connects an atom to itself.
    SelfBond {
        /// Position of the offending bond in the bond list.
        bond: usize,
        /// The atom index used for both ends.
        index: u32,
    },
    /// The flattened bond index list has an odd length.
    OddBondIndexCount(usize),
    /// A frame's float count is not `3 * atom_count`.
    FrameLength {
        /// Expected float count.
        expected: usize,
        /// Actual float count.
        actual: usize,
    },
    /// A trajectory document carried no frames.
    NoFrames,
    /// A lattice box did not hold exactly nine floats.
    CellLength(usize),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BondOutOfRange {
                bond,
                index,
                atom_count,
            } => write!(
                f,
                "bond {bond} references atom {index} but topology has \
                 {atom_count} atoms"
            ),
            Self::SelfBond { bond, index } => {
                write!(f, "bond {bond} connects atom {index} to itself")
            }
            Self::OddBondIndexCount(n) => {
                write!(f, "bond index list has odd length {n}")
            }
            Self::FrameLength { expected, actual } => write!(
                f,
                "frame has {actual} coordinates, expected {expected}"
            ),
            Self::NoFrames => write!(f, "trajectory has no frames"),
            Self::CellLength(n) => {
                write!(f, "periodic box has {n} values, expected 9")
            }
        }
    }
}

impl std::error::Error for TopologyError {}

/// Which instance buffer a capacity check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    /// Atom sphere instances.
    Atom,
    /// Bond cylinder instances.
    Bond,
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom => f.write_str("atom"),
            Self::Bond => f.write_str("bond"),
        }
    }
}

/// Errors produced by the trajview crate.
#[derive(Debug)]
pub enum TrajviewError {
    /// Malformed or misaligned encoded field.
    Codec(CodecError),
    /// Structurally invalid topology or frame.
    Topology(TopologyError),
    /// More atoms or bonds than the engine was configured to hold.
    CapacityExceeded {
        /// Buffer that overflowed.
        kind: InstanceKind,
        /// Requested instance count.
        requested: usize,
        /// Configured limit.
        limit: usize,
    },
    /// Connection refused, dropped or otherwise failed.
    Transport(String),
    /// JSON document could not be parsed.
    Json(String),
    /// Remote document could not be fetched.
    Fetch(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for TrajviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Topology(e) => write!(f, "topology error: {e}"),
            Self::CapacityExceeded {
                kind,
                requested,
                limit,
            } => write!(
                f,
                "capacity exceeded: {requested} {kind} instances requested, \
                 limit is {limit}"
            ),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Fetch(msg) => write!(f, "fetch error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for TrajviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Topology(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for TrajviewError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<TopologyError> for TrajviewError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<std::io::Error> for TrajviewError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TrajviewError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<tungstenite::Error> for TrajviewError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
