//! Immediate-mode 3-D lighting for sketches.
//!
//! Sketches register ambient, directional and point lights every frame;
//! each call resolves its color, extracts its vector and writes the next
//! slot of the lighting program's uniform arrays. The uniform writes go
//! through [`GpuBackend`], so the same code runs headless against a
//! [`UniformStore`] or feeds the wgpu [`Renderer`] in a window.

pub mod app;
pub mod args;
pub mod color;
pub mod lights;
pub mod render;
pub mod renderer;
pub mod scripting;
pub mod shader;

pub use args::{extract_vector, split_light_args, Arg, ArgumentError};
pub use color::{Color, ColorError, ColorMode, ColorResolver, ColorSpec};
pub use lights::{Light, LightKind, LightState};
pub use render::{CameraParams, LightingUniform, Renderer, SharedUniforms, UniformStore};
pub use renderer::{Renderer3D, SketchError};
pub use scripting::SketchRunner;
pub use shader::{GpuBackend, ProgramHandle, ProgramKey, ShaderError, ShaderRegistry, UniformValue};
