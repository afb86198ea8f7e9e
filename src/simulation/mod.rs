//! Gravity and spacetime-deformation core
//!
//! Nothing in here touches the window or the GPU:
//! - `body`: one point mass and its sphere mesh
//! - `world`: ordered bodies and the integration step
//! - `grid`: the bent ground lattice
//! - `interaction`: spawn / charge / launch of the active body

pub mod constants;
pub mod body;
pub mod world;
pub mod grid;
pub mod interaction;

pub use body::{Body, BodyState, RadiusScale};
pub use world::{Integration, World};
pub use grid::GridField;
pub use interaction::{HoldState, Interaction, SpawnSettings};
