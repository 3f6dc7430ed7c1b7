//! Keeps the combined centroid of every displayed trajectory pinned to a
//! fixed anchor, so a drifting or diffusing system stays in view.

use glam::{DVec3, Vec3};

use crate::trajectory::TrajectoryStore;

/// Computes the translation that holds the aggregate centroid at `anchor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRecenter {
    anchor: Vec3,
}

impl Default for AggregateRecenter {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl AggregateRecenter {
    /// Recenter toward `anchor`.
    #[must_use]
    pub fn new(anchor: Vec3) -> Self {
        Self { anchor }
    }

    /// World-space anchor.
    #[must_use]
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Move the anchor.
    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    /// Unweighted centroid over the union of all atoms in `frames`.
    ///
    /// Each entry is one trajectory's flat xyz buffer; counts may differ.
    /// Trailing floats that do not form a whole triple are ignored. `None`
    /// when there are no atoms at all.
    #[must_use]
    pub fn centroid(frames: &[&[f32]]) -> Option<Vec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for coords in frames {
            for p in coords.chunks_exact(3) {
                sum += DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
                count += 1;
            }
        }
        (count > 0).then(|| (sum / count as f64).as_vec3())
    }

    /// Translation that moves the aggregate centroid onto the anchor.
    #[must_use]
    pub fn offset(&self, frames: &[&[f32]]) -> Option<Vec3> {
        Self::centroid(frames).map(|c| self.anchor - c)
    }

    /// [`offset`](Self::offset) for stores at their displayed frame
    /// indices. Indices are clamped per store, so a shorter trajectory
    /// holds its last frame; stores with no frames contribute nothing.
    #[must_use]
    pub fn offset_for_stores(
        &self,
        stores: &[(&TrajectoryStore, i64)],
    ) -> Option<Vec3> {
        let frames: Vec<&[f32]> = stores
            .iter()
            .filter_map(|(store, index)| store.frame_at(*index))
            .map(crate::trajectory::Frame::coords)
            .collect();
        self.offset(&frames)
    }
}
