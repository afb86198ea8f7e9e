//! A `RenderBridge` that records every call instead of drawing.

#![allow(dead_code)]

use spacetime_grid::core::bridge::{BridgeError, DrawUniforms, MeshHandle, Primitive, RenderBridge};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BeginFrame,
    CreateTriangles(MeshHandle, usize),
    UpdateMesh(MeshHandle, usize),
    CreateLines(MeshHandle, usize),
    UpdateLines(MeshHandle, usize),
    SetUniforms(DrawUniforms),
    Draw(MeshHandle, Primitive),
    Destroy(MeshHandle),
    EndFrame,
}

#[derive(Default)]
pub struct RecordingBridge {
    pub calls: Vec<Call>,
    /// Live meshes and their latest vertex data
    pub meshes: BTreeMap<MeshHandle, Vec<f32>>,
    /// Make the next `begin_frame` report a rebuilt target
    pub skip_next_frame: bool,
    next_handle: u32,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    fn create(&mut self, vertices: &[f32]) -> MeshHandle {
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.meshes.insert(handle, vertices.to_vec());
        handle
    }

    fn update(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        let data = self.meshes.get_mut(&handle).ok_or(BridgeError::UnknownMesh(handle))?;
        *data = vertices.to_vec();
        Ok(())
    }
}

impl RenderBridge for RecordingBridge {
    fn frame_size(&self) -> (u32, u32) {
        (800, 600)
    }

    fn begin_frame(&mut self) -> Result<bool, BridgeError> {
        self.calls.push(Call::BeginFrame);
        Ok(!std::mem::replace(&mut self.skip_next_frame, false))
    }

    fn create_triangle_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError> {
        let handle = self.create(vertices);
        self.calls.push(Call::CreateTriangles(handle, vertices.len()));
        Ok(handle)
    }

    fn update_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        self.update(handle, vertices)?;
        self.calls.push(Call::UpdateMesh(handle, vertices.len()));
        Ok(())
    }

    fn create_line_mesh(&mut self, vertices: &[f32]) -> Result<MeshHandle, BridgeError> {
        let handle = self.create(vertices);
        self.calls.push(Call::CreateLines(handle, vertices.len()));
        Ok(handle)
    }

    fn update_line_mesh(&mut self, handle: MeshHandle, vertices: &[f32]) -> Result<(), BridgeError> {
        self.update(handle, vertices)?;
        self.calls.push(Call::UpdateLines(handle, vertices.len()));
        Ok(())
    }

    fn set_uniforms(&mut self, uniforms: &DrawUniforms) {
        self.calls.push(Call::SetUniforms(*uniforms));
    }

    fn draw(&mut self, handle: MeshHandle, primitive: Primitive) -> Result<(), BridgeError> {
        if !self.meshes.contains_key(&handle) {
            return Err(BridgeError::UnknownMesh(handle));
        }
        self.calls.push(Call::Draw(handle, primitive));
        Ok(())
    }

    fn destroy(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle);
        self.calls.push(Call::Destroy(handle));
    }

    fn end_frame(&mut self) -> Result<(), BridgeError> {
        self.calls.push(Call::EndFrame);
        Ok(())
    }
}
