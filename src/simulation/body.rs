use glam::{DVec3, Vec4};

use crate::core::bridge::MeshHandle;
use crate::mesh::SphereMesh;
use crate::simulation::constants::{
    COLLISION_DAMPING, SCALE_DURING_INIT, SIZE_RATIO, SPHERE_SECTORS, SPHERE_STACKS,
};

/// Lifecycle status of a body. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Seeded into the world, never held by the pointer
    AtRest,
    /// Held by the pointer at spawn; skipped by gravity and collision
    Initializing,
    /// Released into the simulation
    Launched,
}

/// Divisors turning the physical radius (m) into world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusScale {
    pub standard: f64,
    pub during_init: f64,
}

impl Default for RadiusScale {
    fn default() -> Self {
        Self {
            standard: SIZE_RATIO,
            during_init: SCALE_DURING_INIT,
        }
    }
}

/// Radius of a uniform sphere of `mass` and `density`, divided into world units
pub fn radius_for(mass: f64, density: f64, divisor: f64) -> f64 {
    ((3.0 * mass) / (4.0 * std::f64::consts::PI * density)).cbrt() / divisor
}

/// A point mass with a rendered sphere.
///
/// Position is in world units (kilometers for gravity), velocity in m/s,
/// mass in kg and density in kg/m^3.
#[derive(Debug, Clone)]
pub struct Body {
    pub position: DVec3,
    pub velocity: DVec3,
    pub color: Vec4,
    pub glow: bool,
    mass: f64,
    density: f64,
    radius: f64,
    state: BodyState,
    scale: RadiusScale,

    mesh: SphereMesh,
    /// Radius the current mesh was generated at
    mesh_radius: f64,
    /// Mesh changed since the last upload
    mesh_dirty: bool,
    handle: Option<MeshHandle>,
}

impl Body {
    pub fn new(
        position: DVec3,
        velocity: DVec3,
        mass: f64,
        density: f64,
        color: Vec4,
        glow: bool,
    ) -> Self {
        debug_assert!(mass > 0.0, "body mass must be positive");
        debug_assert!(density > 0.0, "body density must be positive");

        let scale = RadiusScale::default();
        let radius = radius_for(mass, density, scale.standard);
        let mut body = Self {
            position,
            velocity,
            color,
            glow,
            mass,
            density,
            radius,
            state: BodyState::AtRest,
            scale,
            mesh: SphereMesh { positions: Vec::new() },
            mesh_radius: 0.0,
            mesh_dirty: true,
            handle: None,
        };
        body.regenerate_mesh();
        body
    }

    /// Replace the radius divisors and rebuild geometry to match
    pub fn with_scale(mut self, scale: RadiusScale) -> Self {
        self.scale = scale;
        self.refresh_geometry();
        self
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn is_initializing(&self) -> bool {
        self.state == BodyState::Initializing
    }

    pub fn is_launched(&self) -> bool {
        self.state == BodyState::Launched
    }

    pub fn mesh(&self) -> &SphereMesh {
        &self.mesh
    }

    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    pub fn set_handle(&mut self, handle: Option<MeshHandle>) {
        self.handle = handle;
    }

    /// Divisor currently applied to the physical radius
    pub fn radius_divisor(&self) -> f64 {
        match self.state {
            BodyState::Initializing => self.scale.during_init,
            _ => self.scale.standard,
        }
    }

    /// Put the body under pointer control and shrink it to the hold scale
    pub fn begin_hold(&mut self) {
        self.state = BodyState::Initializing;
        self.refresh_geometry();
    }

    /// Release the body into the simulation at the standard scale
    pub fn launch(&mut self) {
        self.state = BodyState::Launched;
        self.refresh_geometry();
    }

    /// Multiply the mass by `factor` and refresh radius and mesh
    pub fn scale_mass(&mut self, factor: f64) {
        self.mass *= factor;
        self.refresh_geometry();
    }

    pub fn nudge(&mut self, offset: DVec3) {
        self.position += offset;
    }

    /// Advance the position by `v / divisor` and re-derive the radius.
    /// The divisor is a fixed per-step constant, not the frame time.
    pub fn update_position(&mut self, divisor: f64) {
        self.position += self.velocity / divisor;
        self.refresh_radius();
    }

    pub fn accelerate(&mut self, acceleration: DVec3, divisor: f64) {
        self.velocity += acceleration / divisor;
    }

    /// Velocity multiplier for this body against `other`: damped and flipped
    /// while the spheres overlap, unchanged otherwise.
    pub fn check_collision(&self, other: &Body) -> f64 {
        let distance = (other.position - self.position).length();
        if other.radius + self.radius > distance {
            COLLISION_DAMPING
        } else {
            1.0
        }
    }

    pub fn refresh_radius(&mut self) {
        self.radius = radius_for(self.mass, self.density, self.radius_divisor());
    }

    /// Re-derive the radius and rebuild the mesh if it no longer matches.
    /// Returns whether the mesh was regenerated.
    pub fn refresh_geometry(&mut self) -> bool {
        self.refresh_radius();
        if self.radius != self.mesh_radius {
            self.regenerate_mesh();
            true
        } else {
            false
        }
    }

    pub fn regenerate_mesh(&mut self) {
        self.mesh = SphereMesh::new(self.radius as f32, SPHERE_STACKS, SPHERE_SECTORS);
        self.mesh_radius = self.radius;
        self.mesh_dirty = true;
    }

    /// Returns true once after each mesh change, clearing the flag
    pub fn take_mesh_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.mesh_dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(position: DVec3, mass: f64) -> Body {
        Body::new(position, DVec3::ZERO, mass, 5515.0, Vec4::ONE, false)
    }

    #[test]
    fn test_radius_formula() {
        let b = body_at(DVec3::ZERO, 5.97219e22);
        let expected = ((3.0 * 5.97219e22) / (4.0 * std::f64::consts::PI * 5515.0)).cbrt() / 30000.0;
        assert!((b.radius() - expected).abs() < 1e-9);
        assert!(b.radius() > 0.0);
        assert_eq!(b.density(), 5515.0);
    }

    #[test]
    fn test_mesh_matches_radius() {
        let b = body_at(DVec3::ZERO, 1.0e22);
        let r = b.radius() as f32;
        for p in &b.mesh().positions {
            assert!((p.length() - r).abs() < 1e-3 * r.max(1.0));
        }
        assert_eq!(b.mesh().as_floats().len(), 1800);
    }

    #[test]
    fn test_update_position_uses_fixed_divisor() {
        let mut b = body_at(DVec3::new(1.0, 2.0, 3.0), 1.0e22);
        b.velocity = DVec3::new(94.0, -188.0, 0.0);
        b.update_position(94.0);
        assert_eq!(b.position, DVec3::new(2.0, 0.0, 3.0));
    }

    #[test]
    fn test_accelerate_uses_fixed_divisor() {
        let mut b = body_at(DVec3::ZERO, 1.0e22);
        b.accelerate(DVec3::new(96.0, 0.0, -192.0), 96.0);
        assert_eq!(b.velocity, DVec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn test_collision_factor() {
        let a = body_at(DVec3::ZERO, 1.0e22);
        let near = body_at(DVec3::new(a.radius() * 0.5, 0.0, 0.0), 1.0e22);
        let far = body_at(DVec3::new(1.0e6, 0.0, 0.0), 1.0e22);
        assert_eq!(a.check_collision(&near), -0.2);
        assert_eq!(a.check_collision(&far), 1.0);
    }

    #[test]
    fn test_hold_shrinks_and_launch_restores() {
        let mut b = body_at(DVec3::ZERO, 1.0e22);
        let standard = b.radius();
        b.take_mesh_dirty();

        b.begin_hold();
        assert!(b.is_initializing());
        assert!((b.radius() - standard * 30000.0 / 1.0e6).abs() < 1e-9);
        assert!(b.take_mesh_dirty());

        b.launch();
        assert!(b.is_launched());
        assert!((b.radius() - standard).abs() < 1e-9);
        let r = b.radius() as f32;
        assert!((b.mesh().positions[1].length() - r).abs() < 1e-3 * r);
    }

    #[test]
    fn test_scale_mass_refreshes_mesh() {
        let mut b = body_at(DVec3::ZERO, 1.0e22);
        b.take_mesh_dirty();
        let before = b.radius();
        b.scale_mass(1.2);
        assert!((b.mass() - 1.2e22).abs() < 1.0e7);
        assert!(b.radius() > before);
        assert!(b.take_mesh_dirty());
        assert!(!b.take_mesh_dirty());
    }
}
