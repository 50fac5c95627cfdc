mod common;
mod native;
mod shared;

pub use common::{SharedUniforms, UniformStore};
pub use native::Renderer;
pub use shared::{program_source, LightingUniform, MAX_LIGHTS};

use glam::{Mat4, Vec3};

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}
