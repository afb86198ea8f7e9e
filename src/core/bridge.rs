//! The boundary between the simulation and whatever draws it.
//!
//! The app only speaks [`RenderBridge`]; the Vulkan renderer is one
//! implementation and the integration tests carry a recording one.

use ash::vk;
use glam::{Mat4, Vec4};
use thiserror::Error;

/// Opaque reference to a vertex buffer owned by a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Per-draw shader inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub color: Vec4,
    /// Output the color unlit
    pub is_grid: bool,
    /// Blow the color far past 1.0 so the body saturates
    pub glow: bool,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to load the Vulkan library: {0}")]
    Loader(#[from] ash::LoadingError),
    #[error("window handle unavailable: {0}")]
    Window(#[from] raw_window_handle::HandleError),
    #[error("no GPU with graphics, present and swapchain support")]
    NoSuitableGpu,
    #[error("shader parse error: {0}")]
    ShaderParse(String),
    #[error("shader validation error: {0}")]
    ShaderValidation(String),
    #[error("SPIR-V generation failed: {0}")]
    ShaderCodegen(String),
    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
    #[error("no memory type with {0:?}")]
    NoMemoryType(vk::MemoryPropertyFlags),
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),
}

/// Capabilities the frame loop needs from a renderer.
///
/// Vertex data is a flat `[x, y, z, x, y, z, ...]` slice of 32-bit floats.
/// Mesh creation and updates are only valid between [`begin_frame`] and
/// [`end_frame`], after the previous frame has retired.
///
/// [`begin_frame`]: RenderBridge::begin_frame
/// [`end_frame`]: RenderBridge::end_frame
pub trait RenderBridge {
    /// Drawable size in pixels
    fn frame_size(&self) -> (u32, u32);

    /// Wait for the previous frame and start recording a new one.
    /// Returns `false` when the target had to be rebuilt and this frame
    /// should not be drawn; uploads are still allowed.
    fn begin_frame(&mut self) -> Result<bool, BridgeError>;

    fn create_triangle_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError>;

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError>;

    /// Line meshes are rewritten every frame
    fn create_line_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError>;

    fn update_line_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError>;

    /// Uniforms used by every following [`draw`](RenderBridge::draw)
    fn set_uniforms(&mut self, uniforms: &DrawUniforms);

    fn draw(&mut self, handle: MeshHandle, primitive: Primitive) -> Result<(), BridgeError>;

    /// Release a mesh. Unknown handles are ignored.
    fn destroy(&mut self, handle: MeshHandle);

    /// Submit and present
    fn end_frame(&mut self) -> Result<(), BridgeError>;
}
