use glam::Vec3;

use crate::math::spherical_to_cartesian;

/// Origin-centered UV sphere, stored as a flat triangle list (no indices).
///
/// Every quad between two stacks and two sectors becomes two triangles,
/// `v1-v2-v3` and `v2-v4-v3`, so the list always holds
/// `stacks * sectors * 6` positions.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub positions: Vec<Vec3>,
}

impl SphereMesh {
    pub fn new(radius: f32, stacks: usize, sectors: usize) -> Self {
        let mut positions = Vec::with_capacity(stacks * sectors * 6);
        let pi = std::f32::consts::PI;

        for i in 0..stacks {
            let theta1 = (i as f32 / stacks as f32) * pi;
            let theta2 = ((i + 1) as f32 / stacks as f32) * pi;

            for j in 0..sectors {
                let phi1 = (j as f32 / sectors as f32) * 2.0 * pi;
                let phi2 = ((j + 1) as f32 / sectors as f32) * 2.0 * pi;

                let v1 = spherical_to_cartesian(radius, theta1, phi1);
                let v2 = spherical_to_cartesian(radius, theta1, phi2);
                let v3 = spherical_to_cartesian(radius, theta2, phi1);
                let v4 = spherical_to_cartesian(radius, theta2, phi2);

                positions.extend_from_slice(&[v1, v2, v3]);
                positions.extend_from_slice(&[v2, v4, v3]);
            }
        }

        Self { positions }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Positions as a packed `[x, y, z, x, y, z, ...]` slice
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_count() {
        let mesh = SphereMesh::new(1.0, 10, 10);
        assert_eq!(mesh.vertex_count(), 600);
        assert_eq!(mesh.as_floats().len(), 1800);
    }

    #[test]
    fn test_all_vertices_on_surface() {
        let radius = 42.5;
        let mesh = SphereMesh::new(radius, 10, 10);
        for p in &mesh.positions {
            assert!((p.length() - radius).abs() < 1e-3, "vertex {p:?} off the sphere");
        }
    }

    #[test]
    fn test_zero_radius_collapses_to_origin() {
        let mesh = SphereMesh::new(0.0, 4, 4);
        assert!(mesh.positions.iter().all(|p| *p == Vec3::ZERO));
    }
}
