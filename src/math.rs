//! Small vector helpers layered over `glam`.
//!
//! The simulation runs in 64-bit (`DVec3`); everything handed to the GPU is
//! 32-bit. Conversions between the two live here so the boundary stays in
//! one place.

use glam::{DVec3, Mat4, Vec3};

/// Convert spherical coordinates to cartesian, with `theta` measured from +Y
/// and `phi` sweeping around the Y axis starting at +X.
pub fn spherical_to_cartesian(r: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        r * theta.sin() * phi.cos(),
        r * theta.cos(),
        r * theta.sin() * phi.sin(),
    )
}

/// Narrow a simulation position to render precision
pub fn to_render(v: DVec3) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32)
}

/// Model matrix placing an origin-centered mesh at `position`
pub fn model_matrix(position: DVec3) -> Mat4 {
    Mat4::from_translation(to_render(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_spherical_poles_and_equator() {
        let north = spherical_to_cartesian(2.0, 0.0, 0.0);
        assert!((north - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);

        let east = spherical_to_cartesian(2.0, PI / 2.0, 0.0);
        assert!((east - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);

        let south = spherical_to_cartesian(1.0, PI, PI);
        assert!((south.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_model_matrix_translates() {
        let m = model_matrix(DVec3::new(-5000.0, 650.0, -350.0));
        let p = m.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(-5000.0, 650.0, -350.0));
    }
}
