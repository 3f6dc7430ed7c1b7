use glam::{Mat4, Vec3};

/// Per-instance data for one atom sphere or bond cylinder.
///
/// Layout matches a GPU instance buffer entry: a column-major model matrix
/// followed by an RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceTransform {
    /// Column-major model matrix (translation in column 3).
    pub model: [[f32; 4]; 4],
    /// RGB color, alpha in w.
    pub color: [f32; 4],
}

impl InstanceTransform {
    /// Zero-extent instance at the origin with the given color.
    #[must_use]
    pub fn hidden(color: Vec3) -> Self {
        Self {
            model: [[0.0; 4]; 4],
            color: color.extend(1.0).to_array(),
        }
    }

    /// Model matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// World-space translation.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        let [x, y, z, _] = self.model[3];
        Vec3::new(x, y, z)
    }

    /// Length of local axis `axis` (0 = x, 1 = y, 2 = z) after transform,
    /// i.e. the scale along that axis.
    #[must_use]
    pub fn axis_extent(&self, axis: usize) -> f32 {
        let [x, y, z, _] = self.model[axis.min(2)];
        Vec3::new(x, y, z).length()
    }

    /// RGB color.
    #[must_use]
    pub fn rgb(&self) -> Vec3 {
        let [r, g, b, _] = self.color;
        Vec3::new(r, g, b)
    }
}

/// View a slice of instances as raw bytes for upload.
#[must_use]
pub fn instance_bytes(instances: &[InstanceTransform]) -> &[u8] {
    bytemuck::cast_slice(instances)
}
