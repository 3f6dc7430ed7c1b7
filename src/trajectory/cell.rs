//! Periodic simulation cell and the view framing derived from it.

use glam::Vec3;

use crate::error::TopologyError;

/// Padding applied to the fitted camera distance.
const FIT_PADDING: f32 = 1.5;

/// A periodic simulation box given by three lattice basis vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicCell {
    vectors: [Vec3; 3],
}

/// Camera framing that keeps a cell in view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFraming {
    /// Point the camera should orbit.
    pub center: Vec3,
    /// Bounding sphere radius around `center`.
    pub radius: f32,
    /// Eye distance that fits the sphere in the vertical field of view.
    pub distance: f32,
}

impl PeriodicCell {
    /// Cell from three basis vectors.
    #[must_use]
    pub fn new(vectors: [Vec3; 3]) -> Self {
        Self { vectors }
    }

    /// Cell from nine row-major floats (one basis vector per row).
    ///
    /// # Errors
    ///
    /// [`TopologyError::CellLength`] unless exactly nine values are given.
    pub fn from_row_major(values: &[f32]) -> Result<Self, TopologyError> {
        let &[ax, ay, az, bx, by, bz, cx, cy, cz] = values else {
            return Err(TopologyError::CellLength(values.len()));
        };
        Ok(Self::new([
            Vec3::new(ax, ay, az),
            Vec3::new(bx, by, bz),
            Vec3::new(cx, cy, cz),
        ]))
    }

    /// Basis vectors.
    #[must_use]
    pub fn vectors(&self) -> [Vec3; 3] {
        self.vectors
    }

    /// Row-major flat form, as sent on the wire.
    #[must_use]
    pub fn to_row_major(&self) -> [f32; 9] {
        let [a, b, c] = self.vectors;
        [a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z]
    }

    /// Axis-aligned extent: the length of each basis vector.
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        let [a, b, c] = self.vectors;
        Vec3::new(a.length(), b.length(), c.length())
    }

    /// Framing for a camera with vertical field of view `fovy_degrees`.
    #[must_use]
    pub fn framing(&self, fovy_degrees: f32) -> ViewFraming {
        let [a, b, c] = self.vectors;
        let center = (a + b + c) * 0.5;
        let radius = self.extents().length() * 0.5;
        let half_fov = (fovy_degrees.to_radians() * 0.5).max(f32::EPSILON);
        ViewFraming {
            center,
            radius,
            distance: radius / half_fov.tan() * FIT_PADDING,
        }
    }
}
