//! Per-atom display colors.
//!
//! Each atom gets a hue spread by its index (golden-ratio stepping so
//! neighbours differ), nudged by a small jitter sampled once at topology
//! load, then pulled toward its element's CPK color when the element is
//! known.

use glam::Vec3;

/// Golden-ratio conjugate; successive multiples are well spread on [0, 1).
const HUE_STEP: f32 = 0.618_034;

/// Saturation of the index hue.
const BASE_SATURATION: f32 = 0.75;

/// Lightness of the index hue.
const BASE_LIGHTNESS: f32 = 0.5;

/// CPK reference color for an atomic number, if it is one we tint.
#[must_use]
pub fn element_color(atomic_number: u8) -> Option<Vec3> {
    let rgb = match atomic_number {
        1 => [1.0, 1.0, 1.0],
        6 => [0.56, 0.56, 0.56],
        7 => [0.19, 0.31, 0.97],
        8 => [1.0, 0.05, 0.05],
        9 | 17 => [0.12, 0.94, 0.12],
        11 => [0.67, 0.36, 0.95],
        12 => [0.54, 1.0, 0.0],
        15 => [1.0, 0.5, 0.0],
        16 => [1.0, 1.0, 0.19],
        19 => [0.56, 0.25, 0.83],
        20 => [0.24, 1.0, 0.0],
        26 => [0.88, 0.4, 0.2],
        29 => [0.78, 0.5, 0.2],
        30 => [0.49, 0.5, 0.69],
        35 => [0.65, 0.16, 0.16],
        53 => [0.58, 0.0, 0.58],
        _ => return None,
    };
    Some(Vec3::from_array(rgb))
}

/// HSL to RGB, all components in `[0, 1]`; hue wraps.
#[must_use]
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Vec3 {
    let h = hue.rem_euclid(1.0);
    if saturation <= 0.0 {
        return Vec3::splat(lightness);
    }
    let q = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    Vec3::new(
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Hue assigned to atom `index` before jitter.
#[must_use]
pub fn index_hue(index: usize) -> f32 {
    ((index as f64 * f64::from(HUE_STEP)).fract()) as f32
}

/// Display color for one atom.
///
/// `jitter` is a hue offset sampled once per atom; `blend` is the weight
/// toward the element color (ignored for unknown elements).
#[must_use]
pub fn atom_color(index: usize, element: u8, jitter: f32, blend: f32) -> Vec3 {
    let base = hsl_to_rgb(
        index_hue(index) + jitter,
        BASE_SATURATION,
        BASE_LIGHTNESS,
    );
    element_color(element).map_or(base, |reference| base.lerp(reference, blend))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn hsl_primaries() {
        assert!(close(hsl_to_rgb(0.0, 1.0, 0.5), Vec3::X));
        assert!(close(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), Vec3::Y));
        assert!(close(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), Vec3::Z));
        assert!(close(hsl_to_rgb(0.3, 0.0, 0.25), Vec3::splat(0.25)));
    }

    #[test]
    fn unknown_element_keeps_hue() {
        let expected = hsl_to_rgb(index_hue(4), 0.75, 0.5);
        assert!(close(atom_color(4, 0, 0.0, 0.65), expected));
        assert!(close(atom_color(4, 118, 0.0, 0.65), expected));
    }

    #[test]
    fn known_element_blends_toward_reference() {
        let base = hsl_to_rgb(index_hue(7), 0.75, 0.5);
        let oxygen = element_color(8).unwrap();
        let blended = atom_color(7, 8, 0.0, 0.65);
        assert!(close(blended, base + (oxygen - base) * 0.65));
    }

    #[test]
    fn index_hues_are_spread() {
        assert_eq!(index_hue(0), 0.0);
        let h1 = index_hue(1);
        let h2 = index_hue(2);
        assert!((h1 - h2).abs() > 0.2);
        assert!((0.0..1.0).contains(&index_hue(123_456)));
    }
}
