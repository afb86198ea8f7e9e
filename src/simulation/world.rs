//! Ordered body collection and the per-frame integration step.
//!
//! Every body accumulates the pull of every other body on its own; pairs are
//! evaluated in both orders and Newton's third law is not used to halve the
//! work. Positions are only advanced after all velocities are settled, so the
//! forces of one step are computed from a single snapshot of positions.

use glam::DVec3;

use crate::simulation::body::Body;
use crate::simulation::constants::{G, METERS_PER_UNIT, POSITION_DIVISOR, VELOCITY_DIVISOR};

/// Fixed per-step divisors applied by [`World::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration {
    pub position_divisor: f64,
    pub velocity_divisor: f64,
}

impl Default for Integration {
    fn default() -> Self {
        Self {
            position_divisor: POSITION_DIVISOR,
            velocity_divisor: VELOCITY_DIVISOR,
        }
    }
}

/// Gravitational acceleration (m/s^2) exerted on a body at `from` by a mass
/// `source_mass` at `to`, or `None` when the two positions coincide.
pub fn gravity_pull(from: DVec3, to: DVec3, source_mass: f64) -> Option<DVec3> {
    let separation = to - from;
    let distance = separation.length();
    if distance == 0.0 {
        return None;
    }

    let distance_m = distance * METERS_PER_UNIT;
    let magnitude = G * source_mass / (distance_m * distance_m);
    Some(separation / distance * magnitude)
}

#[derive(Debug, Clone, Default)]
pub struct World {
    bodies: Vec<Body>,
    integration: Integration,
}

impl World {
    pub fn new(integration: Integration) -> Self {
        Self {
            bodies: Vec::new(),
            integration,
        }
    }

    pub fn add(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// The most recently added body, the one the pointer controls
    pub fn active(&self) -> Option<&Body> {
        self.bodies.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut Body> {
        self.bodies.last_mut()
    }

    pub fn integration(&self) -> Integration {
        self.integration
    }

    /// Advance one tick, or only refresh held bodies while paused
    pub fn tick(&mut self, paused: bool) {
        if !paused {
            self.step();
        }
        self.refresh_held();
    }

    /// One physics tick: gravity, collision damping, then positions.
    pub fn step(&mut self) {
        let n = self.bodies.len();
        let mut pulls = Vec::with_capacity(n);

        for i in 0..n {
            if self.bodies[i].is_initializing() {
                continue;
            }

            pulls.clear();
            let mut damping = 1.0;
            {
                let body = &self.bodies[i];
                for (j, other) in self.bodies.iter().enumerate() {
                    if j == i || other.is_initializing() {
                        continue;
                    }
                    let Some(pull) = gravity_pull(body.position, other.position, other.mass()) else {
                        continue;
                    };
                    pulls.push(pull);
                    // One factor per overlapping pair; several overlaps compound
                    damping *= body.check_collision(other);
                }
            }

            let divisor = self.integration.velocity_divisor;
            let body = &mut self.bodies[i];
            for pull in &pulls {
                body.accelerate(*pull, divisor);
            }
            body.velocity *= damping;
        }

        let divisor = self.integration.position_divisor;
        for body in &mut self.bodies {
            body.update_position(divisor);
        }
    }

    /// Re-derive radius and mesh of every held body whose mass moved
    pub fn refresh_held(&mut self) {
        for body in self.bodies.iter_mut().filter(|b| b.is_initializing()) {
            if body.refresh_geometry() {
                log::trace!("held body radius now {:.4}", body.radius());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn planet(position: DVec3, velocity: DVec3) -> Body {
        Body::new(position, velocity, 5.97219e22, 5515.0, Vec4::new(0.0, 1.0, 1.0, 1.0), false)
    }

    #[test]
    fn test_gravity_pull_direction_and_magnitude() {
        let a = gravity_pull(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0), 1.0e24).unwrap();
        let expected = G * 1.0e24 / (10_000.0f64 * 10_000.0);
        assert!((a.x - expected).abs() < expected * 1e-12);
        assert_eq!(a.y, 0.0);
        assert_eq!(a.z, 0.0);
        assert!(gravity_pull(DVec3::ONE, DVec3::ONE, 1.0e24).is_none());
    }

    #[test]
    fn test_step_moves_bodies() {
        let mut world = World::default();
        world.add(planet(DVec3::new(-5000.0, 650.0, -350.0), DVec3::new(0.0, 0.0, 1500.0)));
        world.add(planet(DVec3::new(5000.0, 650.0, -350.0), DVec3::new(0.0, 0.0, -1500.0)));

        world.step();

        let a = &world.bodies()[0];
        let b = &world.bodies()[1];
        assert!(a.velocity.x > 0.0, "left body pulled right");
        assert!(b.velocity.x < 0.0, "right body pulled left");
        assert!((a.position.z - (-350.0 + a.velocity.z / 94.0)).abs() < 1e-9);
    }

    #[test]
    fn test_held_bodies_are_ignored() {
        let mut world = World::default();
        world.add(planet(DVec3::new(-100.0, 0.0, 0.0), DVec3::ZERO));
        let mut held = planet(DVec3::new(100.0, 0.0, 0.0), DVec3::ZERO);
        held.begin_hold();
        world.add(held);

        world.step();

        for body in world.bodies() {
            assert_eq!(body.velocity, DVec3::ZERO);
        }
    }

    #[test]
    fn test_coincident_bodies_skip_each_other() {
        let mut world = World::default();
        world.add(planet(DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)));
        world.add(planet(DVec3::ZERO, DVec3::new(-1.0, 0.0, 0.0)));

        world.step();

        assert_eq!(world.bodies()[0].velocity, DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(world.bodies()[1].velocity, DVec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_overlap_damping_compounds() {
        let mut world = World::default();
        world.add(planet(DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)));
        world.add(planet(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO));
        world.add(planet(DVec3::new(-1.0, 0.0, 0.0), DVec3::ZERO));

        world.step();

        // The two pulls cancel on x; two overlaps give (-0.2)^2
        let v = world.bodies()[0].velocity;
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 10.0 * 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_tick_paused_keeps_state() {
        let mut world = World::default();
        world.add(planet(DVec3::new(-5000.0, 650.0, -350.0), DVec3::new(0.0, 0.0, 1500.0)));
        world.add(planet(DVec3::new(5000.0, 650.0, -350.0), DVec3::new(0.0, 0.0, -1500.0)));
        let before: Vec<_> = world.bodies().iter().map(|b| (b.position, b.velocity)).collect();

        for _ in 0..10 {
            world.tick(true);
        }

        let after: Vec<_> = world.bodies().iter().map(|b| (b.position, b.velocity)).collect();
        assert_eq!(before, after);
    }
}
