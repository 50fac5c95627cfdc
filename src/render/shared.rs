use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use log::warn;

use crate::lights::{indexed_uniform, LightKind, MATERIAL_COLOR_UNIFORM};
use crate::shader::{
    ProgramHandle, ProgramKey, ShaderError, UniformValue, LIGHT_FRAGMENT_STAGE,
    LIGHT_VERTEX_STAGE,
};

use super::common::UniformStore;

/// Array bound compiled into the lighting program. Slots past it are
/// written by the accumulator but never reach the GPU.
pub const MAX_LIGHTS: usize = 8;

/// Looks up the WGSL module for a pair of stage ids.
pub fn program_source(key: &ProgramKey) -> Result<&'static str, ShaderError> {
    if key.vertex != LIGHT_VERTEX_STAGE {
        return Err(ShaderError::UnknownStage(key.vertex.clone()));
    }
    if key.fragment != LIGHT_FRAGMENT_STAGE {
        return Err(ShaderError::UnknownStage(key.fragment.clone()));
    }
    Ok(LIGHTING_SHADER)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

/// GPU layout of the lighting program's uniforms.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightingUniform {
    pub material_color: [f32; 4],
    pub counts: [i32; 4],
    pub ambient_color: [[f32; 4]; MAX_LIGHTS],
    pub directional_color: [[f32; 4]; MAX_LIGHTS],
    pub lighting_direction: [[f32; 4]; MAX_LIGHTS],
    pub point_color: [[f32; 4]; MAX_LIGHTS],
    pub point_location: [[f32; 4]; MAX_LIGHTS],
}

impl LightingUniform {
    /// Packs the named uniforms of the lighting program into the buffer
    /// layout. Missing values read as zero, the material as opaque white.
    pub fn from_store(store: &UniformStore) -> Self {
        let mut uniform = Self::zeroed();
        uniform.material_color = [1.0; 4];
        let Some(program) = store.find_program(&ProgramKey::lighting()) else {
            return uniform;
        };
        if let Some(UniformValue::Vec4(color)) = store.uniform(program, MATERIAL_COLOR_UNIFORM) {
            uniform.material_color = color;
        }

        for (slot, kind) in LightKind::ALL.into_iter().enumerate() {
            let count = light_count(store, program, kind);
            uniform.counts[slot] = count as i32;
            for index in 0..count {
                uniform.color_slots(kind)[index] =
                    vec3_slot(store, program, kind.color_uniform(), index);
                if let Some(name) = kind.geometry_uniform() {
                    let value = vec3_slot(store, program, name, index);
                    if let Some(slots) = uniform.geometry_slots(kind) {
                        slots[index] = value;
                    }
                }
            }
        }
        uniform
    }

    fn color_slots(&mut self, kind: LightKind) -> &mut [[f32; 4]; MAX_LIGHTS] {
        match kind {
            LightKind::Ambient => &mut self.ambient_color,
            LightKind::Directional => &mut self.directional_color,
            LightKind::Point => &mut self.point_color,
        }
    }

    fn geometry_slots(&mut self, kind: LightKind) -> Option<&mut [[f32; 4]; MAX_LIGHTS]> {
        match kind {
            LightKind::Ambient => None,
            LightKind::Directional => Some(&mut self.lighting_direction),
            LightKind::Point => Some(&mut self.point_location),
        }
    }
}

fn light_count(store: &UniformStore, program: ProgramHandle, kind: LightKind) -> usize {
    let count = match store.uniform(program, kind.count_uniform()) {
        Some(UniformValue::Int(count)) => count.max(0) as usize,
        _ => 0,
    };
    if count > MAX_LIGHTS {
        warn!(
            "{count} {} lights registered but the shader holds {MAX_LIGHTS}; extra lights are dropped",
            kind.name()
        );
    }
    count.min(MAX_LIGHTS)
}

fn vec3_slot(store: &UniformStore, program: ProgramHandle, name: &str, index: usize) -> [f32; 4] {
    match store.uniform(program, &indexed_uniform(name, index as u32)) {
        Some(UniformValue::Vec3([x, y, z])) => [x, y, z, 0.0],
        _ => [0.0; 4],
    }
}

/// Unit cube centred on the origin with per-face normals.
pub(crate) fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    // (normal, u, v) with u x v == normal so every face winds counter-clockwise.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let corners: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in corners {
            let position = (normal + u * su + v * sv) * 0.5;
            vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

pub(crate) const LIGHTING_SHADER: &str = r#"
const MAX_LIGHTS: i32 = 8;

struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
}

struct Lighting {
    material_color: vec4<f32>,
    counts: vec4<i32>,
    ambient_color: array<vec4<f32>, 8>,
    directional_color: array<vec4<f32>, 8>,
    lighting_direction: array<vec4<f32>, 8>,
    point_color: array<vec4<f32>, 8>,
    point_location: array<vec4<f32>, 8>,
}

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(0) @binding(1)
var<uniform> lighting: Lighting;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = camera.view_proj * vec4<f32>(input.position, 1.0);
    out.world_pos = input.position;
    out.normal = input.normal;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let ambient_count = min(lighting.counts.x, MAX_LIGHTS);
    let directional_count = min(lighting.counts.y, MAX_LIGHTS);
    let point_count = min(lighting.counts.z, MAX_LIGHTS);
    if (ambient_count + directional_count + point_count == 0) {
        return lighting.material_color;
    }

    let normal = normalize(input.normal);
    var light = vec3<f32>(0.0, 0.0, 0.0);
    for (var i = 0; i < ambient_count; i = i + 1) {
        light = light + lighting.ambient_color[i].rgb;
    }
    for (var i = 0; i < directional_count; i = i + 1) {
        let direction = normalize(-lighting.lighting_direction[i].xyz);
        let diffuse = max(dot(normal, direction), 0.0);
        light = light + lighting.directional_color[i].rgb * diffuse;
    }
    for (var i = 0; i < point_count; i = i + 1) {
        let to_light = normalize(lighting.point_location[i].xyz - input.world_pos);
        let diffuse = max(dot(normal, to_light), 0.0);
        light = light + lighting.point_color[i].rgb * diffuse;
    }
    let lit = lighting.material_color.rgb * min(light, vec3<f32>(1.0, 1.0, 1.0));
    return vec4<f32>(lit, lighting.material_color.a);
}
"#;
