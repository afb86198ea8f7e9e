//! Spawn, charge and launch of the active body.
//!
//! The active body is always the last one in the [`World`]. A primary press
//! appends a new body held at the origin; while it is held the secondary
//! button grows its mass and the arrow keys nudge it; a primary release
//! hands it to the integrator.

use glam::{DVec3, Vec4};

use crate::input::Key;
use crate::simulation::body::{Body, BodyState, RadiusScale};
use crate::simulation::constants::{DEFAULT_DENSITY, MASS_BUMP, NUDGE_FRACTION, SPAWN_MASS};
use crate::simulation::world::World;

/// What the pointer is doing with the active body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    /// No body, or the last body was seeded rather than spawned
    Idle,
    Holding,
    Released,
}

impl HoldState {
    pub fn of(world: &World) -> Self {
        match world.active().map(Body::state) {
            Some(BodyState::Initializing) => HoldState::Holding,
            Some(BodyState::Launched) => HoldState::Released,
            Some(BodyState::AtRest) | None => HoldState::Idle,
        }
    }
}

/// Parameters for bodies created by the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSettings {
    pub mass: f64,
    pub density: f64,
    pub color: Vec4,
    /// Mass multiplier for each secondary press
    pub mass_bump: f64,
    /// Arrow-key step as a fraction of the radius
    pub nudge_fraction: f64,
    pub scale: RadiusScale,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            mass: SPAWN_MASS,
            density: DEFAULT_DENSITY,
            color: Vec4::new(1.0, 0.0, 0.0, 1.0),
            mass_bump: MASS_BUMP,
            nudge_fraction: NUDGE_FRACTION,
            scale: RadiusScale::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interaction {
    settings: SpawnSettings,
    secondary_held: bool,
}

impl Interaction {
    pub fn new(settings: SpawnSettings) -> Self {
        Self {
            settings,
            secondary_held: false,
        }
    }

    pub fn settings(&self) -> &SpawnSettings {
        &self.settings
    }

    pub fn secondary_held(&self) -> bool {
        self.secondary_held
    }

    /// Append a new body at the origin and start holding it
    pub fn primary_pressed(&mut self, world: &mut World) {
        let mut body = Body::new(
            DVec3::ZERO,
            DVec3::ZERO,
            self.settings.mass,
            self.settings.density,
            self.settings.color,
            false,
        )
        .with_scale(self.settings.scale);
        body.begin_hold();
        world.add(body);
        log::debug!("spawned body #{} with mass {:e}", world.len() - 1, self.settings.mass);
    }

    /// Release the held body into the simulation
    pub fn primary_released(&mut self, world: &mut World) {
        if let Some(body) = held_body(world) {
            body.launch();
            log::debug!("launched body with mass {:e}", body.mass());
        }
    }

    pub fn secondary_pressed(&mut self, world: &mut World) {
        self.secondary_held = true;
        if let Some(body) = held_body(world) {
            body.scale_mass(self.settings.mass_bump);
            log::debug!("mass: {:e}", body.mass());
        }
    }

    pub fn secondary_released(&mut self) {
        self.secondary_held = false;
    }

    /// Continuous growth while the secondary button stays down: `m *= 1 + dt`
    pub fn grow(&mut self, world: &mut World, dt: f64) {
        if !self.secondary_held {
            return;
        }
        if let Some(body) = held_body(world) {
            body.scale_mass(1.0 + dt);
        }
    }

    /// Arrow-key reposition of the held body. Up/Down move along both `y` and
    /// `z`; with Shift held only the `z` part applies.
    pub fn nudge(&mut self, world: &mut World, key: Key, shift: bool) {
        let fraction = self.settings.nudge_fraction;
        let Some(body) = held_body(world) else {
            return;
        };

        let step = body.radius() * fraction;
        let offset = match key {
            Key::Up if shift => DVec3::new(0.0, 0.0, step),
            Key::Up => DVec3::new(0.0, step, step),
            Key::Down if shift => DVec3::new(0.0, 0.0, -step),
            Key::Down => DVec3::new(0.0, -step, -step),
            Key::Left => DVec3::new(-step, 0.0, 0.0),
            Key::Right => DVec3::new(step, 0.0, 0.0),
            _ => return,
        };
        body.nudge(offset);
    }
}

fn held_body(world: &mut World) -> Option<&mut Body> {
    world.active_mut().filter(|b| b.is_initializing())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_then_release() {
        let mut world = World::default();
        let mut fsm = Interaction::default();
        assert_eq!(HoldState::of(&world), HoldState::Idle);

        fsm.primary_pressed(&mut world);
        assert_eq!(HoldState::of(&world), HoldState::Holding);
        assert_eq!(world.active().unwrap().position, DVec3::ZERO);

        fsm.primary_released(&mut world);
        assert_eq!(HoldState::of(&world), HoldState::Released);
        let body = world.active().unwrap();
        assert_eq!(body.mass(), 1.0e22);
        assert_eq!(body.velocity, DVec3::ZERO);
    }

    #[test]
    fn test_release_on_empty_world_is_noop() {
        let mut world = World::default();
        let mut fsm = Interaction::default();
        fsm.primary_released(&mut world);
        fsm.secondary_pressed(&mut world);
        fsm.grow(&mut world, 0.5);
        fsm.nudge(&mut world, Key::Up, false);
        assert!(world.is_empty());
    }

    #[test]
    fn test_secondary_press_bumps_mass() {
        let mut world = World::default();
        let mut fsm = Interaction::default();
        fsm.primary_pressed(&mut world);
        fsm.secondary_pressed(&mut world);
        assert_eq!(fsm.settings().mass_bump, 1.2);
        assert!(fsm.secondary_held());
        assert!((world.active().unwrap().mass() - 1.2e22).abs() < 1.0e7);
    }

    #[test]
    fn test_grow_only_while_held() {
        let mut world = World::default();
        let mut fsm = Interaction::default();
        fsm.primary_pressed(&mut world);

        fsm.grow(&mut world, 0.5);
        assert_eq!(world.active().unwrap().mass(), 1.0e22);

        fsm.secondary_held = true;
        fsm.grow(&mut world, 0.5);
        assert!((world.active().unwrap().mass() - 1.5e22).abs() < 1.0e7);

        fsm.primary_released(&mut world);
        fsm.grow(&mut world, 0.5);
        assert!((world.active().unwrap().mass() - 1.5e22).abs() < 1.0e7);
    }

    #[test]
    fn test_nudge_directions() {
        let mut world = World::default();
        let mut fsm = Interaction::default();
        fsm.primary_pressed(&mut world);
        let step = world.active().unwrap().radius() * 0.2;

        fsm.nudge(&mut world, Key::Up, false);
        let p = world.active().unwrap().position;
        assert!((p - DVec3::new(0.0, step, step)).length() < 1e-12);

        fsm.nudge(&mut world, Key::Down, true);
        fsm.nudge(&mut world, Key::Right, false);
        fsm.nudge(&mut world, Key::Right, false);
        fsm.nudge(&mut world, Key::Left, false);
        let p = world.active().unwrap().position;
        assert!((p - DVec3::new(step, step, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_seeded_body_is_not_controlled() {
        let mut world = World::default();
        world.add(Body::new(DVec3::ZERO, DVec3::ZERO, 1.0e22, 3344.0, Vec4::ONE, false));
        let mut fsm = Interaction::default();
        fsm.secondary_pressed(&mut world);
        fsm.nudge(&mut world, Key::Left, false);
        assert_eq!(world.active().unwrap().mass(), 1.0e22);
        assert_eq!(world.active().unwrap().position, DVec3::ZERO);
        assert_eq!(HoldState::of(&world), HoldState::Idle);
    }
}
