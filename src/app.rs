//! Frame-scoped application state and the per-frame sequence.
//!
//! [`App`] owns everything the frame loop mutates. The engine feeds it
//! [`InputEvent`]s as they arrive, then calls [`App::update`] and
//! [`App::render`] once per frame.

use glam::{Mat4, Vec4};
use std::collections::HashSet;

use crate::config::SimConfig;
use crate::core::bridge::{BridgeError, DrawUniforms, MeshHandle, Primitive, RenderBridge};
use crate::core::Camera;
use crate::input::{ButtonState, InputEvent, Key, KeyState, PointerButton};
use crate::math::model_matrix;
use crate::simulation::{GridField, Interaction, World};

pub struct App {
    world: World,
    grid: GridField,
    grid_color: Vec4,
    grid_handle: Option<MeshHandle>,
    camera: Camera,
    interaction: Interaction,
    held_keys: HashSet<Key>,
    paused: bool,
    running: bool,
    /// World units per second for held movement keys
    move_speed: f32,
    /// World units per second per scroll notch
    scroll_speed: f32,
    /// Length of the previous frame, used by scroll which arrives between frames
    last_dt: f64,
}

impl App {
    pub fn new(config: &SimConfig) -> Self {
        let mut world = World::new(config.integration());
        for body in config.initial_bodies() {
            world.add(body);
        }

        let mut grid = GridField::new(config.grid.size, config.grid.divisions);
        grid.update(world.bodies());

        log::info!(
            "scene ready: {} bodies, grid of {} segments",
            world.len(),
            grid.segment_count()
        );

        Self {
            world,
            grid,
            grid_color: config.grid.color,
            grid_handle: None,
            camera: Camera::from(&config.camera),
            interaction: Interaction::new(config.spawn_settings()),
            held_keys: HashSet::new(),
            paused: true,
            running: true,
            move_speed: config.camera.move_speed,
            scroll_speed: config.camera.scroll_speed,
            last_dt: 0.0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn grid(&self) -> &GridField {
        &self.grid
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held_keys.contains(&key)
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { key, state, shift } => self.handle_key(key, state, shift),
            InputEvent::PointerButton { button, state } => match (button, state) {
                (PointerButton::Primary, ButtonState::Pressed) => self.interaction.primary_pressed(&mut self.world),
                (PointerButton::Primary, ButtonState::Released) => {
                    self.interaction.primary_released(&mut self.world)
                }
                (PointerButton::Secondary, ButtonState::Pressed) => {
                    self.interaction.secondary_pressed(&mut self.world)
                }
                (PointerButton::Secondary, ButtonState::Released) => self.interaction.secondary_released(),
            },
            InputEvent::PointerMoved { x, y } => self.camera.pointer_moved(x, y),
            InputEvent::PointerMotion { dx, dy } => self.camera.rotate(dx as f32, -dy as f32),
            InputEvent::Scroll { dy } => {
                let step = self.scroll_speed * self.last_dt as f32;
                if dy > 0.0 {
                    self.camera.move_forward(step);
                } else if dy < 0.0 {
                    self.camera.move_forward(-step);
                }
            }
            InputEvent::CloseRequested => self.running = false,
        }
    }

    fn handle_key(&mut self, key: Key, state: KeyState, shift: bool) {
        if state.is_down() {
            self.held_keys.insert(key);
        } else {
            self.held_keys.remove(&key);
        }

        // Any key event re-reads the pause key
        self.paused = self.held_keys.contains(&Key::K);

        if !state.is_down() {
            return;
        }
        match key {
            Key::Q => {
                log::info!("quit requested");
                self.running = false;
            }
            Key::Up | Key::Down | Key::Left | Key::Right => {
                self.interaction.nudge(&mut self.world, key, shift)
            }
            _ => {}
        }
    }

    /// Advance one frame of `dt` seconds: camera, growth, grid, then physics
    pub fn update(&mut self, dt: f64) {
        self.last_dt = dt;
        self.move_camera(dt as f32);

        self.interaction.grow(&mut self.world, dt);
        self.grid.update(self.world.bodies());
        self.world.tick(self.paused);
    }

    fn move_camera(&mut self, dt: f32) {
        let step = self.move_speed * dt;
        for key in &self.held_keys {
            match key {
                Key::W => self.camera.move_forward(step),
                Key::S => self.camera.move_forward(-step),
                Key::A => self.camera.move_right(-step),
                Key::D => self.camera.move_right(step),
                Key::Space => self.camera.move_up(step),
                Key::LeftShift => self.camera.move_up(-step),
                _ => {}
            }
        }
    }

    /// Upload whatever changed since the last frame, then draw the grid and
    /// every body. Individual draw failures are logged and skipped.
    pub fn render<B: RenderBridge + ?Sized>(&mut self, bridge: &mut B) -> Result<(), BridgeError> {
        let drawing = bridge.begin_frame()?;
        self.sync_meshes(bridge)?;
        if !drawing {
            return Ok(());
        }

        let (width, height) = bridge.frame_size();
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix(aspect);

        if let Some(handle) = self.grid_handle {
            bridge.set_uniforms(&DrawUniforms {
                model: Mat4::IDENTITY,
                view,
                projection,
                color: self.grid_color,
                is_grid: true,
                glow: false,
            });
            if let Err(e) = bridge.draw(handle, Primitive::Lines) {
                log::warn!("grid draw skipped: {e}");
            }
        }

        for body in self.world.bodies() {
            let Some(handle) = body.handle() else {
                continue;
            };
            bridge.set_uniforms(&DrawUniforms {
                model: model_matrix(body.position),
                view,
                projection,
                color: body.color,
                is_grid: false,
                glow: body.glow,
            });
            if let Err(e) = bridge.draw(handle, Primitive::Triangles) {
                log::warn!("body draw skipped: {e}");
            }
        }

        bridge.end_frame()
    }

    /// Create missing handles and push dirty vertex data
    fn sync_meshes<B: RenderBridge + ?Sized>(&mut self, bridge: &mut B) -> Result<(), BridgeError> {
        match self.grid_handle {
            Some(handle) => bridge.update_line_mesh(handle, self.grid.as_floats())?,
            None => self.grid_handle = Some(bridge.create_line_mesh(self.grid.as_floats())?),
        }

        for body in self.world.bodies_mut() {
            match body.handle() {
                None => {
                    let handle = bridge.create_triangle_mesh(body.mesh().as_floats())?;
                    body.set_handle(Some(handle));
                    body.take_mesh_dirty();
                }
                Some(handle) => {
                    if body.take_mesh_dirty() {
                        bridge.update_mesh(handle, body.mesh().as_floats())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Release every handle handed out by `bridge`
    pub fn shutdown<B: RenderBridge + ?Sized>(&mut self, bridge: &mut B) {
        if let Some(handle) = self.grid_handle.take() {
            bridge.destroy(handle);
        }
        for body in self.world.bodies_mut() {
            if let Some(handle) = body.handle() {
                bridge.destroy(handle);
                body.set_handle(None);
            }
        }
        log::debug!("released all meshes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::HoldState;
    use glam::{DVec3, Vec3};

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            shift: false,
        }
    }

    fn button(button: PointerButton, state: ButtonState) -> InputEvent {
        InputEvent::PointerButton { button, state }
    }

    #[test]
    fn test_starts_paused_with_seeded_scene() {
        let app = App::new(&SimConfig::default());
        assert!(app.is_paused());
        assert!(app.is_running());
        assert_eq!(app.world().len(), 3);
    }

    #[test]
    fn test_pause_follows_k() {
        let mut app = App::new(&SimConfig::empty());
        app.handle_event(key(Key::W, KeyState::Pressed));
        assert!(!app.is_paused());

        app.handle_event(key(Key::K, KeyState::Pressed));
        assert!(app.is_paused());
        app.handle_event(key(Key::K, KeyState::Repeated));
        assert!(app.is_paused());
        app.handle_event(key(Key::K, KeyState::Released));
        assert!(!app.is_paused());
    }

    #[test]
    fn test_paused_world_does_not_move() {
        let mut app = App::new(&SimConfig::default());
        let before: Vec<DVec3> = app.world().bodies().iter().map(|b| b.position).collect();
        app.update(0.016);
        let after: Vec<DVec3> = app.world().bodies().iter().map(|b| b.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_quit_and_close() {
        let mut app = App::new(&SimConfig::empty());
        app.handle_event(key(Key::Q, KeyState::Pressed));
        assert!(!app.is_running());

        let mut app = App::new(&SimConfig::empty());
        app.handle_event(InputEvent::CloseRequested);
        assert!(!app.is_running());
    }

    #[test]
    fn test_held_key_moves_camera_each_frame() {
        let mut app = App::new(&SimConfig::empty());
        let start = app.camera().position();
        app.handle_event(key(Key::W, KeyState::Pressed));
        assert!(app.is_held(Key::W));
        app.update(0.5);
        app.update(0.5);
        // 10^4 units/s along -Z for one second
        let moved = app.camera().position() - start;
        assert!((moved - Vec3::new(0.0, 0.0, -10_000.0)).length() < 1e-2);

        app.handle_event(key(Key::W, KeyState::Released));
        assert!(!app.is_held(Key::W));
        let stopped = app.camera().position();
        app.update(0.5);
        assert_eq!(app.camera().position(), stopped);
    }

    #[test]
    fn test_scroll_uses_previous_frame_time() {
        let mut app = App::new(&SimConfig::empty());
        app.update(0.01);
        let start = app.camera().position();
        app.handle_event(InputEvent::Scroll { dy: 3.0 });
        // Direction only: 2.5e5 * 0.01 regardless of notch count
        assert!(((start - app.camera().position()).length() - 2500.0).abs() < 1e-2);
    }

    #[test]
    fn test_pointer_spawn_grow_launch() {
        let mut app = App::new(&SimConfig::empty());
        app.handle_event(button(PointerButton::Primary, ButtonState::Pressed));
        assert_eq!(HoldState::of(app.world()), HoldState::Holding);

        app.handle_event(button(PointerButton::Secondary, ButtonState::Pressed));
        assert!((app.world().active().unwrap().mass() - 1.2e22).abs() < 1e10);

        app.update(0.5);
        assert!((app.world().active().unwrap().mass() - 1.8e22).abs() < 1e10);

        app.handle_event(button(PointerButton::Secondary, ButtonState::Released));
        assert!(!app.interaction().secondary_held());
        app.update(0.5);
        assert!((app.world().active().unwrap().mass() - 1.8e22).abs() < 1e10);

        app.handle_event(button(PointerButton::Primary, ButtonState::Released));
        assert_eq!(HoldState::of(app.world()), HoldState::Released);
    }

    #[test]
    fn test_arrow_keys_only_move_held_body() {
        let mut app = App::new(&SimConfig::empty());
        app.handle_event(key(Key::Right, KeyState::Pressed));
        assert!(app.world().is_empty());

        app.handle_event(button(PointerButton::Primary, ButtonState::Pressed));
        let r = app.world().active().unwrap().radius();
        app.handle_event(key(Key::Right, KeyState::Pressed));
        app.handle_event(key(Key::Right, KeyState::Repeated));
        app.handle_event(key(Key::Right, KeyState::Released));
        let x = app.world().active().unwrap().position.x;
        assert!((x - 2.0 * 0.2 * r).abs() < 1e-12);
    }

    #[test]
    fn test_pointer_motion_turns_camera() {
        let mut app = App::new(&SimConfig::empty());
        app.handle_event(InputEvent::PointerMotion { dx: 100.0, dy: -50.0 });
        assert!((app.camera().yaw() - -80.0).abs() < 1e-4);
        assert!((app.camera().pitch() - 5.0).abs() < 1e-4);
    }
}
