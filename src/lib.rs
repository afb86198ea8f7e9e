//! Interactive N-body gravity playground over a bending spacetime grid.
//!
//! The simulation core (`simulation`, `math`, `mesh`, `app`) is free of any
//! window or GPU dependency; `engine` and `core::renderer` put it on screen.

pub mod app;
pub mod config;
pub mod core;
pub mod engine;
pub mod input;
pub mod logging;
pub mod math;
pub mod mesh;
pub mod simulation;

pub use app::App;
pub use config::SimConfig;
