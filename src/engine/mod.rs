//! Instanced transform engine.
//!
//! Turns a topology plus flat atom coordinates into one
//! [`InstanceTransform`] per atom (sphere) and per bond (cylinder).
//! The bond primitive is a unit-radius, unit-length cylinder along local +Z,
//! centred on the origin; each bond stretches it to span its two atoms.
//!
//! [`TransformEngine::set_topology`] is the cold path (colors, counts).
//! [`TransformEngine::set_positions`] is the per-tick hot path: it touches
//! only matrices and reuses buffers sized once from the configured limits.

pub mod color;
mod instance;

use glam::{Mat3, Mat4, Quat, Vec3};
pub use instance::{instance_bytes, InstanceTransform};
use rand::Rng;

use crate::error::{InstanceKind, TrajviewError};
use crate::options::EngineOptions;
use crate::trajectory::Topology;

/// Primary look-at reference.
const WORLD_UP: Vec3 = Vec3::Y;

/// Reference used when the bond is collinear with [`WORLD_UP`].
const FALLBACK_UP: Vec3 = Vec3::Z;

/// Squared cross-product length below which two unit vectors count as
/// collinear.
const COLLINEAR_EPSILON: f32 = 1e-8;

/// Widest accepted hue jitter; half of the hue circle either way.
const MAX_HUE_JITTER: f32 = 0.5;

/// Working state reused across [`TransformEngine::set_positions`] calls.
///
/// Owned by a single engine; not shared between instances.
#[derive(Debug, Default)]
pub struct TransformScratch {
    /// Unpacked positions for the current frame.
    positions: Vec<Vec3>,
    /// Rotation + scale shared by every atom this tick.
    atom_matrix: Mat4,
}

impl TransformScratch {
    fn with_capacity(atoms: usize) -> Self {
        Self {
            positions: Vec::with_capacity(atoms),
            atom_matrix: Mat4::IDENTITY,
        }
    }
}

/// Computes per-instance transforms and colors for one trajectory.
pub struct TransformEngine {
    options: EngineOptions,
    bonds: Vec<[u32; 2]>,
    atom_colors: Vec<Vec3>,
    atoms: Vec<InstanceTransform>,
    bond_instances: Vec<InstanceTransform>,
    scratch: TransformScratch,
}

impl TransformEngine {
    /// Engine with buffers sized to the configured limits.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self {
            bonds: Vec::with_capacity(options.bond_limit),
            atom_colors: Vec::with_capacity(options.atom_limit),
            atoms: Vec::with_capacity(options.atom_limit),
            bond_instances: Vec::with_capacity(options.bond_limit),
            scratch: TransformScratch::with_capacity(options.atom_limit),
            options,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Number of live atom instances.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of live bond instances.
    #[must_use]
    pub fn bond_count(&self) -> usize {
        self.bond_instances.len()
    }

    /// Atom instances, one per atom in topology order.
    #[must_use]
    pub fn atom_instances(&self) -> &[InstanceTransform] {
        &self.atoms
    }

    /// Bond instances, one per bond in topology order.
    #[must_use]
    pub fn bond_instances(&self) -> &[InstanceTransform] {
        &self.bond_instances
    }

    /// Atom colors assigned at the last topology load.
    #[must_use]
    pub fn atom_colors(&self) -> &[Vec3] {
        &self.atom_colors
    }

    /// Load a topology, sampling color jitter from the thread RNG.
    ///
    /// # Errors
    ///
    /// [`TrajviewError::CapacityExceeded`] if the atom or bond count is over
    /// its limit; the previous topology stays in place.
    pub fn set_topology(
        &mut self,
        topology: &Topology,
    ) -> Result<(), TrajviewError> {
        self.set_topology_with_rng(topology, &mut rand::rng())
    }

    /// Load a topology with an explicit jitter source.
    ///
    /// Instances start hidden (zero extent) until the next
    /// [`set_positions`](Self::set_positions).
    ///
    /// # Errors
    ///
    /// See [`set_topology`](Self::set_topology).
    pub fn set_topology_with_rng<R: Rng + ?Sized>(
        &mut self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<(), TrajviewError> {
        self.check_capacity(InstanceKind::Atom, topology.atom_count())?;
        self.check_capacity(InstanceKind::Bond, topology.bond_count())?;

        let jitter = if self.options.hue_jitter.is_finite() {
            self.options.hue_jitter.abs().min(MAX_HUE_JITTER)
        } else {
            0.0
        };
        let blend = self.options.element_blend.clamp(0.0, 1.0);

        self.atom_colors.clear();
        self.atoms.clear();
        for (i, &element) in topology.elements().iter().enumerate() {
            let offset = if jitter > 0.0 {
                rng.random_range(-jitter..=jitter)
            } else {
                0.0
            };
            let color = color::atom_color(i, element, offset, blend);
            self.atom_colors.push(color);
            self.atoms.push(InstanceTransform::hidden(color));
        }

        self.bonds.clear();
        self.bonds.extend_from_slice(topology.bonds());
        self.bond_instances.clear();
        for &[a, b] in &self.bonds {
            let color = self.atom_colors[a as usize]
                .lerp(self.atom_colors[b as usize], 0.5);
            self.bond_instances.push(InstanceTransform::hidden(color));
        }

        log::debug!(
            "topology loaded: {} atoms, {} bonds",
            self.atoms.len(),
            self.bond_instances.len()
        );
        Ok(())
    }

    /// Load a topology and its first frame together.
    ///
    /// # Errors
    ///
    /// Capacity errors leave everything untouched; a frame-length error
    /// leaves the new topology loaded with hidden instances.
    pub fn set_data(
        &mut self,
        topology: &Topology,
        coords: &[f32],
    ) -> Result<(), TrajviewError> {
        self.set_topology(topology)?;
        self.set_positions(coords)
    }

    /// Recompute every transform from a flat xyz frame.
    ///
    /// Colors are untouched. Calling twice with the same frame yields
    /// identical output.
    ///
    /// # Errors
    ///
    /// [`TopologyError::FrameLength`](crate::error::TopologyError::FrameLength)
    /// if the frame does not hold one triple per loaded atom; the previous
    /// transforms are kept.
    pub fn set_positions(&mut self, coords: &[f32]) -> Result<(), TrajviewError> {
        let expected = self.atoms.len() * 3;
        if coords.len() != expected {
            return Err(crate::error::TopologyError::FrameLength {
                expected,
                actual: coords.len(),
            }
            .into());
        }

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.positions.extend(
            coords.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        scratch.atom_matrix =
            Mat4::from_scale(Vec3::splat(self.options.atom_scale));

        for (instance, &position) in
            self.atoms.iter_mut().zip(&scratch.positions)
        {
            let mut matrix = scratch.atom_matrix;
            matrix.w_axis = position.extend(1.0);
            instance.model = matrix.to_cols_array_2d();
        }

        let radius = self.options.bond_radius;
        for (instance, &[a, b]) in
            self.bond_instances.iter_mut().zip(&self.bonds)
        {
            let pos_a = scratch.positions[a as usize];
            let pos_b = scratch.positions[b as usize];
            instance.model =
                bond_matrix(pos_a, pos_b, radius).to_cols_array_2d();
        }

        Ok(())
    }

    fn check_capacity(
        &self,
        kind: InstanceKind,
        requested: usize,
    ) -> Result<(), TrajviewError> {
        let limit = match kind {
            InstanceKind::Atom => self.options.atom_limit,
            InstanceKind::Bond => self.options.bond_limit,
        };
        if requested > limit {
            return Err(TrajviewError::CapacityExceeded {
                kind,
                requested,
                limit,
            });
        }
        Ok(())
    }
}

/// Rotation taking local +Z onto `direction`.
///
/// Built as a look-at basis against [`WORLD_UP`], switching to
/// [`FALLBACK_UP`] when the two are collinear. A zero or non-finite
/// direction yields the identity.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Quat {
    let Some(z) = direction.try_normalize() else {
        return Quat::IDENTITY;
    };
    let mut x = WORLD_UP.cross(z);
    if x.length_squared() < COLLINEAR_EPSILON {
        x = FALLBACK_UP.cross(z);
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Model matrix for a cylinder of `radius` spanning `a` to `b`.
///
/// Coincident endpoints give a zero-length (but finite) transform.
#[must_use]
pub fn bond_matrix(a: Vec3, b: Vec3, radius: f32) -> Mat4 {
    let axis = a - b;
    let length = axis.length();
    Mat4::from_scale_rotation_translation(
        Vec3::new(radius, radius, length),
        look_rotation(axis),
        a.lerp(b, 0.5),
    )
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::TopologyError;

    fn options(bond_radius: f32) -> EngineOptions {
        EngineOptions {
            bond_radius,
            atom_limit: 8,
            bond_limit: 8,
            ..EngineOptions::default()
        }
    }

    fn pair() -> Topology {
        Topology::new(vec![6, 8], vec![[0, 1]]).unwrap()
    }

    fn is_finite(m: &InstanceTransform) -> bool {
        m.model.iter().flatten().all(|v| f32::is_finite(*v))
    }

    #[test]
    fn bond_spans_atoms() {
        let mut engine = TransformEngine::new(options(0.5));
        engine
            .set_data(&pair(), &[0.0, 0.0, 0.0, 0.0, 0.0, 2.0])
            .unwrap();

        let bond = engine.bond_instances()[0];
        assert!((bond.translation() - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
        assert!((bond.axis_extent(2) - 2.0).abs() < 1e-6);
        assert!((bond.axis_extent(0) - 0.5).abs() < 1e-6);
        assert!((bond.axis_extent(1) - 0.5).abs() < 1e-6);

        // Local +Z maps onto the bond axis, so its ends land on the atoms.
        let m = bond.matrix();
        let end_a = m.transform_point3(Vec3::new(0.0, 0.0, 0.5));
        let end_b = m.transform_point3(Vec3::new(0.0, 0.0, -0.5));
        assert!(end_a.distance(Vec3::ZERO) < 1e-5);
        assert!(end_b.distance(Vec3::new(0.0, 0.0, 2.0)) < 1e-5);
    }

    #[test]
    fn atoms_use_uniform_scale() {
        let mut engine = TransformEngine::new(options(0.1));
        engine
            .set_data(&pair(), &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0])
            .unwrap();
        let atom = engine.atom_instances()[0];
        assert_eq!(atom.translation(), Vec3::new(1.0, 2.0, 3.0));
        for axis in 0..3 {
            assert!((atom.axis_extent(axis) - 0.035).abs() < 1e-7);
        }
    }

    #[test]
    fn coincident_atoms_give_finite_zero_length_bond() {
        let mut engine = TransformEngine::new(options(0.5));
        engine
            .set_data(&pair(), &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0])
            .unwrap();
        let bond = engine.bond_instances()[0];
        assert!(is_finite(&bond));
        assert!(bond.axis_extent(2) < 1e-6);
        assert_eq!(bond.translation(), Vec3::ONE);
    }

    #[test]
    fn bond_parallel_to_up_is_finite() {
        let mut engine = TransformEngine::new(options(0.5));
        for coords in [
            [0.0, 0.0, 0.0, 0.0, 3.0, 0.0],
            [0.0, 3.0, 0.0, 0.0, 0.0, 0.0],
        ] {
            engine.set_data(&pair(), &coords).unwrap();
            let bond = engine.bond_instances()[0];
            assert!(is_finite(&bond));
            assert!((bond.axis_extent(2) - 3.0).abs() < 1e-5);
            let end = bond.matrix().transform_point3(Vec3::new(0.0, 0.0, 0.5));
            assert!(end.distance(Vec3::from_slice(&coords[..3])) < 1e-5);
        }
    }

    #[test]
    fn over_capacity_keeps_previous_topology() {
        let mut engine = TransformEngine::new(options(0.5));
        engine.set_topology(&pair()).unwrap();
        let colors = engine.atom_colors().to_vec();

        let big = Topology::new(vec![1; 9], vec![]).unwrap();
        let err = engine.set_topology(&big).unwrap_err();
        assert!(matches!(
            err,
            TrajviewError::CapacityExceeded {
                kind: InstanceKind::Atom,
                requested: 9,
                limit: 8
            }
        ));
        assert_eq!(engine.atom_count(), 2);
        assert_eq!(engine.bond_count(), 1);
        assert_eq!(engine.atom_colors(), colors.as_slice());

        let bonds: Vec<[u32; 2]> = (0..9).map(|i| [0, i % 2 + 1]).collect();
        let many_bonds = Topology::new(vec![1; 3], bonds).unwrap();
        assert!(matches!(
            engine.set_topology(&many_bonds),
            Err(TrajviewError::CapacityExceeded {
                kind: InstanceKind::Bond,
                ..
            })
        ));
        assert_eq!(engine.bond_count(), 1);
    }

    #[test]
    fn counts_shrink_and_grow() {
        let mut engine = TransformEngine::new(options(0.5));
        let chain =
            Topology::new(vec![6; 4], vec![[0, 1], [1, 2], [2, 3]]).unwrap();
        engine.set_topology(&chain).unwrap();
        assert_eq!((engine.atom_count(), engine.bond_count()), (4, 3));
        engine.set_topology(&pair()).unwrap();
        assert_eq!((engine.atom_count(), engine.bond_count()), (2, 1));
        engine.set_topology(&chain).unwrap();
        assert_eq!((engine.atom_count(), engine.bond_count()), (4, 3));
    }

    #[test]
    fn set_positions_is_idempotent() {
        let mut engine = TransformEngine::new(options(0.2));
        let frame = [0.3, -1.0, 2.0, 1.5, 0.25, -0.75];
        engine.set_data(&pair(), &frame).unwrap();
        let first_atoms = engine.atom_instances().to_vec();
        let first_bonds = engine.bond_instances().to_vec();
        engine.set_positions(&frame).unwrap();
        assert_eq!(engine.atom_instances(), first_atoms.as_slice());
        assert_eq!(engine.bond_instances(), first_bonds.as_slice());
    }

    #[test]
    fn wrong_frame_length_keeps_transforms() {
        let mut engine = TransformEngine::new(options(0.2));
        engine
            .set_data(&pair(), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0])
            .unwrap();
        let before = engine.atom_instances().to_vec();
        let err = engine.set_positions(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            TrajviewError::Topology(TopologyError::FrameLength {
                expected: 6,
                actual: 3
            })
        ));
        assert_eq!(engine.atom_instances(), before.as_slice());
    }

    #[test]
    fn colors_are_stable_across_frames() {
        let mut engine = TransformEngine::new(options(0.2));
        let mut rng = StdRng::seed_from_u64(7);
        engine.set_topology_with_rng(&pair(), &mut rng).unwrap();
        engine.set_positions(&[0.0; 6]).unwrap();
        let colors: Vec<_> =
            engine.atom_instances().iter().map(InstanceTransform::rgb).collect();
        engine.set_positions(&[1.0; 6]).unwrap();
        let again: Vec<_> =
            engine.atom_instances().iter().map(InstanceTransform::rgb).collect();
        assert_eq!(colors, again);

        let bond = engine.bond_instances()[0].rgb();
        let mid = colors[0].lerp(colors[1], 0.5);
        assert!((bond - mid).length() < 1e-6);
    }

    #[test]
    fn same_seed_gives_same_colors() {
        let mut a = TransformEngine::new(options(0.2));
        let mut b = TransformEngine::new(options(0.2));
        a.set_topology_with_rng(&pair(), &mut StdRng::seed_from_u64(1))
            .unwrap();
        b.set_topology_with_rng(&pair(), &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(a.atom_colors(), b.atom_colors());
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let opts = EngineOptions {
            hue_jitter: 0.0,
            ..options(0.2)
        };
        let mut engine = TransformEngine::new(opts);
        engine.set_topology(&pair()).unwrap();
        let expected = color::atom_color(1, 8, 0.0, 0.65);
        assert!((engine.atom_colors()[1] - expected).length() < 1e-6);
    }

    #[test]
    fn out_of_range_jitter_is_clamped() {
        for hue_jitter in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN, 1e38, -7.0] {
            let mut engine = TransformEngine::new(EngineOptions {
                hue_jitter,
                ..options(0.2)
            });
            engine
                .set_topology_with_rng(&pair(), &mut StdRng::seed_from_u64(3))
                .unwrap();
            assert_eq!(engine.atom_colors().len(), 2);
            assert!(engine.atom_colors().iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn look_rotation_maps_z_onto_direction() {
        for dir in [Vec3::X, Vec3::NEG_Y, Vec3::new(1.0, 2.0, -3.0)] {
            let q = look_rotation(dir);
            assert!((q * Vec3::Z - dir.normalize()).length() < 1e-5);
        }
        assert_eq!(look_rotation(Vec3::ZERO), Quat::IDENTITY);
    }
}
