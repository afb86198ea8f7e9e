//! Ground lattice bent by the bodies above it.
//!
//! The base lattice is generated once and never mutated. Each frame a
//! deformed copy is produced whose `y` comes from Flamm's paraboloid
//! (`z = 2 * sqrt(r_s * (r - r_s))`) summed over every body, then pulled down
//! by the offset between the lattice and the bodies' center of mass.

use glam::{DVec3, Vec3};

use crate::math::to_render;
use crate::simulation::body::Body;
use crate::simulation::constants::{C, G, METERS_PER_UNIT};

/// The one lattice row the grid is built on
const LEVEL_STEP: f64 = 3.0;

/// Schwarzschild radius (m) of `mass` (kg)
pub fn schwarzschild_radius(mass: f64) -> f64 {
    2.0 * G * mass / (C * C)
}

/// Height of the embedding diagram at `distance_m` from a mass with
/// Schwarzschild radius `rs`. Inside `rs` the radicand is clamped to zero.
pub fn embedding_height(distance_m: f64, rs: f64) -> f64 {
    2.0 * (rs * (distance_m - rs)).max(0.0).sqrt()
}

/// Mass-weighted mean `y` of every body not held by the pointer, 0 when
/// nothing has weight
pub fn center_of_mass_y(bodies: &[Body]) -> f64 {
    let (weighted, total) = bodies
        .iter()
        .filter(|b| !b.is_initializing())
        .fold((0.0, 0.0), |(w, t), b| (w + b.mass() * b.position.y, t + b.mass()));

    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct GridField {
    size: f64,
    divisions: usize,
    base: Vec<DVec3>,
    base_max_y: f64,
    deformed: Vec<Vec3>,
}

impl GridField {
    pub fn new(size: f64, divisions: usize) -> Self {
        let base = Self::build_lattice(size, divisions);
        let base_max_y = base.iter().map(|v| v.y).fold(f64::NEG_INFINITY, f64::max);
        let deformed = base.iter().map(|v| to_render(*v)).collect();

        Self {
            size,
            divisions,
            base,
            base_max_y,
            deformed,
        }
    }

    /// `y` of the undeformed lattice
    pub fn base_level(size: f64, divisions: usize) -> f64 {
        let step = size / divisions as f64;
        -(size / 2.0) * 0.3 + LEVEL_STEP * step
    }

    /// Segment endpoints as consecutive pairs: first every X-directed segment
    /// row by row along Z, then every Z-directed segment column by column.
    fn build_lattice(size: f64, divisions: usize) -> Vec<DVec3> {
        let step = size / divisions as f64;
        let half = size / 2.0;
        let y = Self::base_level(size, divisions);
        let mut vertices = Vec::with_capacity(4 * (divisions + 1) * divisions);

        for z_step in 0..=divisions {
            let z = -half + z_step as f64 * step;
            for x_step in 0..divisions {
                let x_start = -half + x_step as f64 * step;
                vertices.push(DVec3::new(x_start, y, z));
                vertices.push(DVec3::new(x_start + step, y, z));
            }
        }

        for x_step in 0..=divisions {
            let x = -half + x_step as f64 * step;
            for z_step in 0..divisions {
                let z_start = -half + z_step as f64 * step;
                vertices.push(DVec3::new(x, y, z_start));
                vertices.push(DVec3::new(x, y, z_start + step));
            }
        }

        vertices
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn base(&self) -> &[DVec3] {
        &self.base
    }

    /// Highest `y` of the base lattice
    pub fn base_max_y(&self) -> f64 {
        self.base_max_y
    }

    /// Deformed endpoints from the last [`GridField::update`], as line pairs
    pub fn deformed(&self) -> &[Vec3] {
        &self.deformed
    }

    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.deformed)
    }

    pub fn segment_count(&self) -> usize {
        self.base.len() / 2
    }

    /// Accumulated bend at `vertex` over all bodies, held ones included
    pub fn displacement_at(vertex: DVec3, bodies: &[Body]) -> f64 {
        bodies
            .iter()
            .map(|body| {
                let distance_m = (body.position - vertex).length() * METERS_PER_UNIT;
                let rs = schwarzschild_radius(body.mass());
                2.0 * embedding_height(distance_m, rs)
            })
            .sum()
    }

    /// Recompute the deformed lattice from the base for the given bodies
    pub fn update(&mut self, bodies: &[Body]) {
        let com_y = center_of_mass_y(bodies);
        let shift = com_y - self.base_max_y;
        log::trace!("grid shift {shift:.3} (com y {com_y:.3}, base max y {:.3})", self.base_max_y);

        for (out, vertex) in self.deformed.iter_mut().zip(&self.base) {
            let dy = Self::displacement_at(*vertex, bodies);
            *out = to_render(DVec3::new(vertex.x, dy - shift.abs(), vertex.z));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn heavy(position: DVec3) -> Body {
        Body::new(position, DVec3::ZERO, 1.0e25, 5515.0, Vec4::ONE, false)
    }

    #[test]
    fn test_lattice_shape() {
        let grid = GridField::new(20000.0, 25);
        assert_eq!(grid.base().len(), 2 * 2 * 26 * 25);
        assert_eq!(grid.segment_count(), 1300);
        assert_eq!(GridField::base_level(20000.0, 25), -600.0);
        assert!(grid.base().iter().all(|v| v.y == -600.0));
        assert_eq!(grid.base_max_y(), -600.0);

        let min_x = grid.base().iter().map(|v| v.x).fold(f64::INFINITY, f64::min);
        let max_z = grid.base().iter().map(|v| v.z).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min_x, -10000.0);
        assert_eq!(max_z, 10000.0);
    }

    #[test]
    fn test_segments_are_axis_aligned() {
        let grid = GridField::new(1000.0, 4);
        for pair in grid.base().chunks(2) {
            let d = pair[1] - pair[0];
            let along_x = d.x == 250.0 && d.z == 0.0;
            let along_z = d.z == 250.0 && d.x == 0.0;
            assert!(along_x || along_z, "segment {pair:?}");
        }
    }

    #[test]
    fn test_empty_world_leaves_plane() {
        let mut grid = GridField::new(20000.0, 25);
        grid.update(&[]);
        assert!(grid.deformed().iter().all(|v| v.y == -600.0));
    }

    #[test]
    fn test_held_body_alone_uses_zero_reference() {
        let mut grid = GridField::new(2000.0, 5);
        assert_eq!(grid.size(), 2000.0);
        assert_eq!(grid.divisions(), 5);
        assert_eq!(grid.base_max_y(), 900.0);

        let mut held = Body::new(DVec3::ZERO, DVec3::ZERO, 1.0e22, 3344.0, Vec4::ONE, false);
        held.begin_hold();
        let bodies = vec![held];
        assert_eq!(center_of_mass_y(&bodies), 0.0);

        grid.update(&bodies);

        for (out, base) in grid.deformed().iter().zip(grid.base()) {
            let dy = GridField::displacement_at(*base, &bodies);
            let expected = (dy - 900.0) as f32;
            assert!((out.y - expected).abs() < 1e-2, "{} vs {expected}", out.y);
            assert!(out.y < 0.0);
        }
    }

    #[test]
    fn test_embedding_clamps_inside_horizon() {
        assert_eq!(embedding_height(0.5, 1.0), 0.0);
        assert_eq!(embedding_height(1.0, 1.0), 0.0);
        assert!((embedding_height(5.0, 1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_schwarzschild_radius_of_sun() {
        let rs = schwarzschild_radius(1.989e30);
        assert!((rs - 2954.0).abs() < 1.0);
    }

    #[test]
    fn test_symmetric_pair_shifts_down_by_base_level() {
        let mut grid = GridField::new(20000.0, 25);
        let bodies = vec![
            heavy(DVec3::new(0.0, 500.0, 0.0)),
            heavy(DVec3::new(0.0, -500.0, 0.0)),
        ];
        assert_eq!(center_of_mass_y(&bodies), 0.0);

        grid.update(&bodies);

        for (out, base) in grid.deformed().iter().zip(grid.base()) {
            let dy = GridField::displacement_at(*base, &bodies);
            let expected = (dy - 600.0) as f32;
            assert!((out.y - expected).abs() <= expected.abs() * 1e-6 + 1e-3);
            assert_eq!(out.x, base.x as f32);
            assert_eq!(out.z, base.z as f32);
        }
    }

    #[test]
    fn test_held_body_bends_but_does_not_weigh() {
        let mut held = heavy(DVec3::new(0.0, 5000.0, 0.0));
        held.begin_hold();
        let bodies = vec![heavy(DVec3::new(0.0, -600.0, 0.0)), held];

        let com = center_of_mass_y(&bodies);
        assert!((com + 600.0).abs() < 1e-9);
        let with = GridField::displacement_at(DVec3::new(100.0, -600.0, 0.0), &bodies);
        let without = GridField::displacement_at(DVec3::new(100.0, -600.0, 0.0), &bodies[..1]);
        assert!(with > without);
    }

    #[test]
    fn test_update_is_deterministic() {
        let mut grid = GridField::new(20000.0, 25);
        let bodies = vec![heavy(DVec3::new(1200.0, 0.0, -350.0))];
        grid.update(&bodies);
        let first = grid.deformed().to_vec();
        grid.update(&bodies);
        assert_eq!(first, grid.deformed());
    }
}
