//! Owned topology + frame sequence with clamped lookup.

use super::{Frame, PeriodicCell, Topology, Trajectory};
use crate::error::TopologyError;

/// How an incoming live frame is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    /// Push a new frame onto the end of the sequence.
    #[default]
    Append,
    /// Overwrite the newest frame (append if there is none).
    ReplaceLast,
}

/// One topology and its ordered frames.
///
/// The store is the sole owner of its buffers. Batch stores are built from a
/// complete [`Trajectory`]; live stores start from a topology alone and grow
/// as position deltas arrive.
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    topology: Topology,
    frames: Vec<Frame>,
    cell: Option<PeriodicCell>,
    /// Oldest frames are dropped beyond this many (live streams only).
    history_limit: Option<usize>,
}

impl TrajectoryStore {
    /// Store holding a topology and no frames yet.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            frames: Vec::new(),
            cell: None,
            history_limit: None,
        }
    }

    /// Take ownership of a validated trajectory.
    #[must_use]
    pub fn from_trajectory(trajectory: Trajectory) -> Self {
        let (topology, frames) = trajectory.into_parts();
        Self {
            topology,
            frames,
            cell: None,
            history_limit: None,
        }
    }

    /// Cap the number of retained frames (`None` keeps everything).
    #[must_use]
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit.map(|l| l.max(1));
        self.trim_history();
        self
    }

    /// Current topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Atom count of the current topology.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.topology.atom_count()
    }

    /// Number of frames held.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Clamp any requested index (negative or past the end) into range.
    ///
    /// Returns `None` only when the store holds no frames.
    #[must_use]
    pub fn clamp_index(&self, index: i64) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        Some(index.clamp(0, last as i64) as usize)
    }

    /// Frame at `index`, clamped to the available range.
    ///
    /// Never panics; an animation driver that races ahead of a live stream
    /// simply keeps seeing the newest frame.
    #[must_use]
    pub fn frame_at(&self, index: i64) -> Option<&Frame> {
        self.clamp_index(index).map(|i| &self.frames[i])
    }

    /// Newest frame, if any.
    #[must_use]
    pub fn latest_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Replace the topology wholesale.
    ///
    /// Frames whose atom count no longer matches are released; matching ones
    /// are kept so a re-sent identical topology does not blank the view.
    pub fn replace_topology(&mut self, topology: Topology) {
        self.topology = topology;
        let expected = self.topology.atom_count() * 3;
        self.frames.retain(|f| f.coords().len() == expected);
    }

    /// Commit a frame.
    ///
    /// # Errors
    ///
    /// [`TopologyError::FrameLength`] if the frame does not match the
    /// topology; the store is left unchanged.
    pub fn append_or_replace_frame(
        &mut self,
        frame: Frame,
        mode: FrameMode,
    ) -> Result<(), TopologyError> {
        self.topology.check_frame(frame.coords())?;
        match (mode, self.frames.last_mut()) {
            (FrameMode::ReplaceLast, Some(last)) => *last = frame,
            _ => {
                self.frames.push(frame);
                self.trim_history();
            }
        }
        Ok(())
    }

    /// Periodic cell, if one has been received.
    #[must_use]
    pub fn cell(&self) -> Option<&PeriodicCell> {
        self.cell.as_ref()
    }

    /// Replace the periodic cell.
    pub fn set_cell(&mut self, cell: PeriodicCell) {
        self.cell = Some(cell);
    }

    fn trim_history(&mut self) {
        if let Some(limit) = self.history_limit {
            if self.frames.len() > limit {
                let excess = self.frames.len() - limit;
                drop(self.frames.drain(..excess));
            }
        }
    }
}
