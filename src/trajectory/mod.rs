//! In-memory trajectory model: topology, frames and the per-trajectory
//! store the render driver animates from.
//!
//! All coordinate data uses one canonical layout: flat `f32` buffers with a
//! stride of three (x, y, z interleaved per atom). Conversion from any wire
//! shape happens once, in [`crate::codec`].

pub mod cell;
pub mod store;

pub use cell::{PeriodicCell, ViewFraming};
use glam::Vec3;
pub use store::{FrameMode, TrajectoryStore};

use crate::error::TopologyError;

/// Element codes and bonds for one trajectory. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    elements: Vec<u8>,
    bonds: Vec<[u32; 2]>,
}

impl Topology {
    /// Build a topology, validating every bond against the atom count.
    ///
    /// # Errors
    ///
    /// [`TopologyError::BondOutOfRange`] if an index is `>= atom_count`,
    /// [`TopologyError::SelfBond`] if both ends are the same atom.
    pub fn new(
        elements: Vec<u8>,
        bonds: Vec<[u32; 2]>,
    ) -> Result<Self, TopologyError> {
        let atom_count = elements.len();
        for (bond, &[a, b]) in bonds.iter().enumerate() {
            for index in [a, b] {
                if index as usize >= atom_count {
                    return Err(TopologyError::BondOutOfRange {
                        bond,
                        index,
                        atom_count,
                    });
                }
            }
            if a == b {
                return Err(TopologyError::SelfBond { bond, index: a });
            }
        }
        Ok(Self { elements, bonds })
    }

    /// Build a topology from the flattened wire form (two indices per bond).
    ///
    /// # Errors
    ///
    /// [`TopologyError::OddBondIndexCount`] for a dangling index, plus
    /// everything [`Topology::new`] checks.
    pub fn from_flat_bonds(
        elements: Vec<u8>,
        flat_bonds: &[u32],
    ) -> Result<Self, TopologyError> {
        if flat_bonds.len() % 2 != 0 {
            return Err(TopologyError::OddBondIndexCount(flat_bonds.len()));
        }
        let bonds = flat_bonds.chunks_exact(2).map(|p| [p[0], p[1]]).collect();
        Self::new(elements, bonds)
    }

    /// Number of atoms.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of bonds.
    #[must_use]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Atomic number of every atom, in atom order.
    #[must_use]
    pub fn elements(&self) -> &[u8] {
        &self.elements
    }

    /// Bond index pairs.
    #[must_use]
    pub fn bonds(&self) -> &[[u32; 2]] {
        &self.bonds
    }

    /// Bonds flattened to the wire layout.
    #[must_use]
    pub fn flat_bonds(&self) -> Vec<u32> {
        self.bonds.iter().flatten().copied().collect()
    }

    /// Fail unless `coords` holds exactly one xyz triple per atom.
    ///
    /// # Errors
    ///
    /// [`TopologyError::FrameLength`] on mismatch.
    pub fn check_frame(&self, coords: &[f32]) -> Result<(), TopologyError> {
        let expected = self.atom_count() * 3;
        if coords.len() == expected {
            Ok(())
        } else {
            Err(TopologyError::FrameLength {
                expected,
                actual: coords.len(),
            })
        }
    }
}

/// One time step: flat interleaved xyz coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    coords: Vec<f32>,
}

impl Frame {
    /// Wrap a flat coordinate buffer.
    #[must_use]
    pub fn new(coords: Vec<f32>) -> Self {
        Self { coords }
    }

    /// Raw coordinates.
    #[must_use]
    pub fn coords(&self) -> &[f32] {
        &self.coords
    }

    /// Atom count implied by the buffer length.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.coords.len() / 3
    }

    /// Position of atom `index`, or `None` past the end.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<Vec3> {
        let start = index.checked_mul(3)?;
        self.coords
            .get(start..start + 3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }

    /// Give up the buffer.
    #[must_use]
    pub fn into_coords(self) -> Vec<f32> {
        self.coords
    }
}

impl From<Vec<f32>> for Frame {
    fn from(coords: Vec<f32>) -> Self {
        Self::new(coords)
    }
}

/// A topology plus a non-empty ordered sequence of matching frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    topology: Topology,
    frames: Vec<Frame>,
}

impl Trajectory {
    /// Validate and assemble a trajectory.
    ///
    /// # Errors
    ///
    /// [`TopologyError::NoFrames`] for an empty frame list,
    /// [`TopologyError::FrameLength`] if any frame has the wrong size.
    pub fn new(
        topology: Topology,
        frames: Vec<Frame>,
    ) -> Result<Self, TopologyError> {
        if frames.is_empty() {
            return Err(TopologyError::NoFrames);
        }
        for frame in &frames {
            topology.check_frame(frame.coords())?;
        }
        Ok(Self { topology, frames })
    }

    /// The shared topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Frames in animation order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Split into owned parts.
    #[must_use]
    pub fn into_parts(self) -> (Topology, Vec<Frame>) {
        (self.topology, self.frames)
    }
}
