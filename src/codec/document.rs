//! JSON wire shapes for trajectory documents and live deltas.
//!
//! ```text
//! { "topology": { "elements": <b64 u8>, "bonds": <b64 u32 pairs> },
//!   "positions": [ <b64 f32 xyz>, ... ] }
//! ```
//!
//! Live messages carry any subset of `topology`, `positions` and `box`
//! (nine row-major lattice floats).

use serde::{Deserialize, Serialize};

use super::{decode_f32, decode_u32, decode_u8, encode_f32, encode_u32, encode_u8};
use crate::error::TrajviewError;
use crate::live::FrameDelta;
use crate::trajectory::{Frame, PeriodicCell, Topology, Trajectory};

/// Encoded topology fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyDocument {
    /// Base64 of one `u8` atomic number per atom.
    pub elements: String,
    /// Base64 of little-endian `u32` bond indices, two per bond.
    pub bonds: String,
}

impl TopologyDocument {
    /// Encode a topology.
    #[must_use]
    pub fn encode(topology: &Topology) -> Self {
        Self {
            elements: encode_u8(topology.elements()),
            bonds: encode_u32(&topology.flat_bonds()),
        }
    }

    /// Decode and validate.
    ///
    /// # Errors
    ///
    /// Codec errors for either field, topology errors for bad bonds.
    pub fn decode(&self) -> Result<Topology, TrajviewError> {
        let elements = decode_u8(&self.elements)?;
        let bonds = decode_u32(&self.bonds)?;
        Ok(Topology::from_flat_bonds(elements, &bonds)?)
    }
}

/// A complete pre-recorded trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryDocument {
    /// Shared topology.
    pub topology: TopologyDocument,
    /// One encoded coordinate array per frame.
    pub positions: Vec<String>,
}

impl TrajectoryDocument {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::Json`] for malformed JSON or a missing field.
    pub fn from_json(text: &str) -> Result<Self, TrajviewError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TrajviewError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode a trajectory for storage or transport.
    #[must_use]
    pub fn encode(trajectory: &Trajectory) -> Self {
        Self {
            topology: TopologyDocument::encode(trajectory.topology()),
            positions: trajectory
                .frames()
                .iter()
                .map(|f| encode_f32(f.coords()))
                .collect(),
        }
    }

    /// Decode every field and validate the result as a whole.
    ///
    /// # Errors
    ///
    /// Any codec or topology error rejects the entire document.
    pub fn decode(&self) -> Result<Trajectory, TrajviewError> {
        let topology = self.topology.decode()?;
        let frames = self
            .positions
            .iter()
            .map(|p| decode_f32(p).map(Frame::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Trajectory::new(topology, frames)?)
    }
}

/// A live update. Absent fields mean "unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaMessage {
    /// Replacement topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologyDocument>,
    /// New coordinates for the current topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<String>,
    /// Nine row-major lattice floats.
    #[serde(
        default,
        rename = "box",
        skip_serializing_if = "Option::is_none"
    )]
    pub cell: Option<String>,
}

impl DeltaMessage {
    /// Parse a JSON message.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::Json`] for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, TrajviewError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, TrajviewError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode a delta for sending.
    #[must_use]
    pub fn encode(delta: &FrameDelta) -> Self {
        Self {
            topology: delta.topology.as_ref().map(TopologyDocument::encode),
            positions: delta.positions.as_ref().map(|f| encode_f32(f.coords())),
            cell: delta.cell.as_ref().map(|c| encode_f32(&c.to_row_major())),
        }
    }

    /// Decode every present field.
    ///
    /// The message is atomic: if any field fails, nothing is returned, so a
    /// consumer never applies half a delta.
    ///
    /// # Errors
    ///
    /// The first codec or topology error encountered.
    pub fn decode(&self) -> Result<FrameDelta, TrajviewError> {
        let topology = self
            .topology
            .as_ref()
            .map(TopologyDocument::decode)
            .transpose()?;
        let positions = self
            .positions
            .as_deref()
            .map(decode_f32)
            .transpose()?
            .map(Frame::new);
        let cell = match self.cell.as_deref() {
            Some(text) => Some(PeriodicCell::from_row_major(&decode_f32(text)?)?),
            None => None,
        };
        Ok(FrameDelta {
            topology,
            positions,
            cell,
        })
    }
}

/// Client-side shared-state edit pushed upstream over the live connection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateChange {
    /// Keys to insert or overwrite.
    #[serde(default)]
    pub updates: serde_json::Map<String, serde_json::Value>,
    /// Keys to delete.
    #[serde(default)]
    pub removals: Vec<String>,
}

impl StateChange {
    /// Whether the change would do nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.removals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::error::{CodecError, TopologyError};

    fn water() -> Trajectory {
        let topology =
            Topology::new(vec![8, 1, 1], vec![[0, 1], [0, 2]]).unwrap();
        let frames = vec![
            Frame::new(vec![0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.1, 0.0]),
            Frame::new(vec![0.0, 0.0, 0.1, 0.1, 0.0, 0.1, 0.0, 0.1, 0.1]),
        ];
        Trajectory::new(topology, frames).unwrap()
    }

    #[test]
    fn document_survives_json() {
        let traj = water();
        let json = TrajectoryDocument::encode(&traj).to_json().unwrap();
        let decoded = TrajectoryDocument::from_json(&json)
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded, traj);
    }

    #[test]
    fn mismatched_frame_rejects_document() {
        let mut doc = TrajectoryDocument::encode(&water());
        doc.positions.push(encode_f32(&[0.0; 6]));
        assert!(matches!(
            doc.decode(),
            Err(TrajviewError::Topology(TopologyError::FrameLength { .. }))
        ));
    }

    #[test]
    fn misaligned_bonds_reject_document() {
        let mut doc = TrajectoryDocument::encode(&water());
        doc.topology.bonds = encode(&[0, 0, 0, 0, 1]);
        assert!(matches!(
            doc.decode(),
            Err(TrajviewError::Codec(CodecError::MisalignedLength { .. }))
        ));
    }

    #[test]
    fn delta_omits_absent_fields() {
        let json = r#"{"positions":"AACAPwAAAEAAAEBA"}"#;
        let delta = DeltaMessage::from_json(json).unwrap().decode().unwrap();
        assert!(delta.topology.is_none());
        assert!(delta.cell.is_none());
        assert_eq!(delta.positions.unwrap().coords(), &[1.0, 2.0, 3.0]);

        let out = DeltaMessage::default().to_json().unwrap();
        assert_eq!(out, "{}");
    }

    #[test]
    fn delta_box_field() {
        let values = [1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0];
        let json = format!(r#"{{"box":"{}"}}"#, encode_f32(&values));
        let delta = DeltaMessage::from_json(&json).unwrap().decode().unwrap();
        assert!(delta.positions.is_none());
        assert_eq!(delta.cell.unwrap().to_row_major(), values);
    }

    #[test]
    fn bad_field_rejects_whole_delta() {
        let msg = DeltaMessage {
            topology: Some(TopologyDocument::encode(water().topology())),
            positions: Some(encode(&[1, 2, 3])),
            cell: None,
        };
        assert!(msg.decode().is_err());
    }

    #[test]
    fn state_change_fields_default() {
        let change: StateChange =
            serde_json::from_str(r#"{"updates":{"pose":1}}"#).unwrap();
        assert!(change.removals.is_empty());
        assert!(!change.is_empty());
    }
}
