use std::time::Instant;
use winit::{
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::app::App;
use crate::config::SimConfig;
use crate::core::bridge::BridgeError;
use crate::core::renderer::VulkanRenderer;
use crate::input::{ButtonState, InputEvent, Key, KeyState, PointerButton};

/// Seconds between window title refreshes
const TITLE_INTERVAL: f32 = 0.5;

pub struct Engine {
    event_loop: EventLoop<()>,
    renderer: VulkanRenderer,
    app: App,
    title: String,
}

/// Frame timing and the FPS readout in the title bar
struct FrameClock {
    last_frame: Instant,
    frame_count: u32,
    fps_timer: Instant,
    current_fps: f32,
}

impl FrameClock {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            frame_count: 0,
            fps_timer: now,
            current_fps: 0.0,
        }
    }

    /// Seconds since the previous call
    fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        self.frame_count += 1;
        dt
    }

    /// New FPS value once per interval
    fn poll_fps(&mut self) -> Option<f32> {
        let elapsed = self.fps_timer.elapsed().as_secs_f32();
        if elapsed < TITLE_INTERVAL {
            return None;
        }
        self.current_fps = self.frame_count as f32 / elapsed;
        self.frame_count = 0;
        self.fps_timer = Instant::now();
        Some(self.current_fps)
    }
}

impl Engine {
    pub fn new(config: &SimConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)?;

        let renderer = VulkanRenderer::new(window)?;
        let app = App::new(config);

        Ok(Self {
            event_loop,
            renderer,
            app,
            title: config.window.title.clone(),
        })
    }

    pub fn run(self) -> anyhow::Result<()> {
        let Engine {
            event_loop,
            mut renderer,
            mut app,
            title,
        } = self;

        let mut clock = FrameClock::new();
        let mut modifiers = ModifiersState::empty();
        let mut failure: Option<BridgeError> = None;
        // With a locked cursor only raw motion arrives; otherwise follow the cursor
        let raw_motion = grab_cursor(renderer.window());

        event_loop.run(|event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => app.handle_event(InputEvent::CloseRequested),
                Event::WindowEvent {
                    event: WindowEvent::ModifiersChanged(new),
                    ..
                } => modifiers = new.state(),
                Event::WindowEvent {
                    event:
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    physical_key: PhysicalKey::Code(code),
                                    state,
                                    repeat,
                                    ..
                                },
                            ..
                        },
                    ..
                } => {
                    if let Some(key) = map_key(code) {
                        let state = match (state, repeat) {
                            (ElementState::Released, _) => KeyState::Released,
                            (ElementState::Pressed, true) => KeyState::Repeated,
                            (ElementState::Pressed, false) => KeyState::Pressed,
                        };
                        app.handle_event(InputEvent::Key {
                            key,
                            state,
                            shift: modifiers.shift_key(),
                        });
                    }
                }
                Event::WindowEvent {
                    event: WindowEvent::MouseInput { state, button, .. },
                    ..
                } => {
                    let button = match button {
                        MouseButton::Left => Some(PointerButton::Primary),
                        MouseButton::Right => Some(PointerButton::Secondary),
                        _ => None,
                    };
                    let state = match state {
                        ElementState::Pressed => ButtonState::Pressed,
                        ElementState::Released => ButtonState::Released,
                    };
                    if let Some(button) = button {
                        app.handle_event(InputEvent::PointerButton { button, state });
                    }
                }
                Event::WindowEvent {
                    event: WindowEvent::CursorMoved { position, .. },
                    ..
                } if !raw_motion => app.handle_event(InputEvent::PointerMoved {
                    x: position.x,
                    y: position.y,
                }),
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } if raw_motion => app.handle_event(InputEvent::PointerMotion {
                    dx: delta.0,
                    dy: delta.1,
                }),
                Event::WindowEvent {
                    event: WindowEvent::MouseWheel { delta, .. },
                    ..
                } => {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                        MouseScrollDelta::PixelDelta(pos) => pos.y,
                    };
                    app.handle_event(InputEvent::Scroll { dy });
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(_),
                    ..
                } => renderer.handle_resize(),
                Event::AboutToWait => renderer.window().request_redraw(),
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    ..
                } => {
                    let dt = clock.tick();
                    app.update(dt);

                    if let Err(e) = app.render(&mut renderer) {
                        log::error!("render failed: {e}");
                        failure = Some(e);
                        target.exit();
                    }

                    if let Some(fps) = clock.poll_fps() {
                        let paused = if app.is_paused() { " [paused]" } else { "" };
                        renderer
                            .window()
                            .set_title(&format!("{title} - {fps:.0} FPS{paused}"));
                    }
                }
                _ => {}
            }

            if !app.is_running() {
                target.exit();
            }
        })?;

        app.shutdown(&mut renderer);
        drop(renderer);
        log::info!("shut down");

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Hide and capture the cursor. Returns whether it is locked in place.
fn grab_cursor(window: &Window) -> bool {
    window.set_cursor_visible(false);
    match window.set_cursor_grab(CursorGrabMode::Locked) {
        Ok(()) => true,
        Err(_) => {
            if let Err(e) = window.set_cursor_grab(CursorGrabMode::Confined) {
                log::debug!("cursor grab unavailable: {e}");
            }
            false
        }
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Space => Key::Space,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyQ => Key::Q,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    };
    Some(key)
}
