//! Per-frame lighting accumulator.
//!
//! Every registered light lands in the next free element of its type's
//! uniform arrays on the shared lighting program, and the type's count
//! uniform is rewritten right after so the shader never reads more
//! elements than were written this frame. The array bound itself lives in
//! the shader source; nothing here caps the number of lights.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::shader::{ProgramKey, ShaderError, ShaderRegistry};

/// Material uniform every light call resets to opaque white.
pub const MATERIAL_COLOR_UNIFORM: &str = "uMaterialColor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

impl LightKind {
    pub const ALL: [LightKind; 3] = [Self::Ambient, Self::Directional, Self::Point];

    /// Array uniform holding the light colors.
    pub fn color_uniform(self) -> &'static str {
        match self {
            Self::Ambient => "uAmbientColor",
            Self::Directional => "uDirectionalColor",
            Self::Point => "uPointLightColor",
        }
    }

    /// Array uniform holding directions or positions, if the type has one.
    pub fn geometry_uniform(self) -> Option<&'static str> {
        match self {
            Self::Ambient => None,
            Self::Directional => Some("uLightingDirection"),
            Self::Point => Some("uPointLightLocation"),
        }
    }

    pub fn count_uniform(self) -> &'static str {
        match self {
            Self::Ambient => "uAmbientLightCount",
            Self::Directional => "uDirectionalLightCount",
            Self::Point => "uPointLightCount",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Directional => "directional",
            Self::Point => "point",
        }
    }
}

/// Name of element `index` of an array uniform.
pub fn indexed_uniform(name: &str, index: u32) -> String {
    format!("{name}[{index}]")
}

/// A light whose color and geometry are fully resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient { color: Color },
    Directional { color: Color, direction: Vec3 },
    Point { color: Color, position: Vec3 },
}

impl Light {
    pub fn kind(&self) -> LightKind {
        match self {
            Self::Ambient { .. } => LightKind::Ambient,
            Self::Directional { .. } => LightKind::Directional,
            Self::Point { .. } => LightKind::Point,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Ambient { color }
            | Self::Directional { color, .. }
            | Self::Point { color, .. } => *color,
        }
    }

    pub fn geometry(&self) -> Option<Vec3> {
        match self {
            Self::Ambient { .. } => None,
            Self::Directional { direction, .. } => Some(*direction),
            Self::Point { position, .. } => Some(*position),
        }
    }
}

/// Number of lights of each type registered since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    ambient: u32,
    directional: u32,
    point: u32,
}

impl LightState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: LightKind) -> u32 {
        match kind {
            LightKind::Ambient => self.ambient,
            LightKind::Directional => self.directional,
            LightKind::Point => self.point,
        }
    }

    pub fn total(&self) -> u32 {
        self.ambient + self.directional + self.point
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn increment(&mut self, kind: LightKind) -> u32 {
        let counter = match kind {
            LightKind::Ambient => &mut self.ambient,
            LightKind::Directional => &mut self.directional,
            LightKind::Point => &mut self.point,
        };
        *counter += 1;
        *counter
    }
}

/// Writes `light` into the next free slot of its type and returns the slot
/// index it occupies.
///
/// The lighting program is resolved before any uniform is touched, so a
/// compile failure leaves both the counters and the shader untouched.
pub fn register_light(
    shaders: &mut ShaderRegistry,
    state: &mut LightState,
    light: &Light,
) -> Result<u32, ShaderError> {
    let program = shaders.get_or_compile(&ProgramKey::lighting())?;
    shaders.use_program(program);

    let kind = light.kind();
    let index = state.count(kind);
    let [r, g, b] = light.color().rgb();
    shaders.set_uniform_3f(program, &indexed_uniform(kind.color_uniform(), index), r, g, b);

    if let (Some(name), Some(vector)) = (kind.geometry_uniform(), light.geometry()) {
        shaders.set_uniform_3f(
            program,
            &indexed_uniform(name, index),
            vector.x,
            vector.y,
            vector.z,
        );
    }

    let [r, g, b, a] = Color::WHITE.to_array();
    shaders.set_uniform_4f(program, MATERIAL_COLOR_UNIFORM, r, g, b, a);

    let count = state.increment(kind);
    shaders.set_uniform_1i(program, kind.count_uniform(), count as i32);
    debug!("{} light #{index} registered", kind.name());
    Ok(index)
}

/// Zeroes the counters and, when the lighting program already exists,
/// its count uniforms.
pub fn reset_lights(shaders: &mut ShaderRegistry, state: &mut LightState) {
    state.reset();
    let Some(program) = shaders.cached(&ProgramKey::lighting()) else {
        return;
    };
    for kind in LightKind::ALL {
        shaders.set_uniform_1i(program, kind.count_uniform(), 0);
    }
}
