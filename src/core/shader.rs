//! WGSL to SPIR-V translation of the scene program.

use naga::back::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::core::bridge::BridgeError;

pub const SCENE_SOURCE: &str = include_str!("../../shaders/scene.wgsl");
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Parse, validate and emit SPIR-V words for a WGSL module.
///
/// The projection matrix already flips Y, so naga's own coordinate
/// adjustment is switched off.
pub fn compile_wgsl(source: &str) -> Result<Vec<u32>, BridgeError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| BridgeError::ShaderParse(e.emit_to_string(source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::PUSH_CONSTANT)
        .validate(&module)
        .map_err(|e| BridgeError::ShaderValidation(e.emit_to_string(source)))?;

    let mut options = spv::Options::default();
    options.flags.remove(spv::WriterFlags::ADJUST_COORDINATE_SPACE);

    let words = spv::write_vec(&module, &info, &options, None)
        .map_err(|e| BridgeError::ShaderCodegen(e.to_string()))?;

    log::debug!("scene shader translated to {} SPIR-V words", words.len());
    Ok(words)
}

pub fn compile_scene() -> Result<Vec<u32>, BridgeError> {
    compile_wgsl(SCENE_SOURCE)
}
