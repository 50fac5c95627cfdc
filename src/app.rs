use glam::{Mat4, Vec3};

use crate::lights::LightKind;
use crate::render::{CameraParams, UniformStore};
use crate::renderer::Renderer3D;
use crate::shader::{ProgramKey, UniformValue};

pub fn print_light_summary(renderer: &Renderer3D, store: &UniformStore) {
    for line in light_summary(renderer, store) {
        println!("{line}");
    }
}

/// Light counts of the current frame followed by the lighting uniforms,
/// sorted by name. Array slots at or past their type's count are left over
/// from earlier frames and are skipped.
pub fn light_summary(renderer: &Renderer3D, store: &UniformStore) -> Vec<String> {
    let counts = LightKind::ALL
        .into_iter()
        .map(|kind| format!("{}={}", kind.name(), renderer.light_state().count(kind)))
        .collect::<Vec<_>>()
        .join(" ");
    let mut lines = vec![format!("Lights: {counts}")];

    let uniforms = store
        .find_program(&ProgramKey::lighting())
        .and_then(|program| store.uniforms(program));
    match uniforms {
        Some(uniforms) => {
            lines.push("Uniforms:".to_string());
            for (name, value) in uniforms {
                if is_stale_slot(renderer, name) {
                    continue;
                }
                lines.push(format!(" - {name} = {}", format_uniform(value)));
            }
        }
        None => lines.push("Lighting program not compiled".to_string()),
    }
    lines
}

fn is_stale_slot(renderer: &Renderer3D, name: &str) -> bool {
    let Some((base, index)) = name
        .strip_suffix(']')
        .and_then(|rest| rest.split_once('['))
    else {
        return false;
    };
    let Ok(index) = index.parse::<u32>() else {
        return false;
    };
    LightKind::ALL
        .into_iter()
        .find(|kind| kind.color_uniform() == base || kind.geometry_uniform() == Some(base))
        .is_some_and(|kind| index >= renderer.light_state().count(kind))
}

pub fn format_uniform(value: &UniformValue) -> String {
    match value {
        UniformValue::Int(value) => value.to_string(),
        UniformValue::Vec3([x, y, z]) => format!("({x:.2}, {y:.2}, {z:.2})"),
        UniformValue::Vec4([x, y, z, w]) => format!("({x:.2}, {y:.2}, {z:.2}, {w:.2})"),
    }
}

/// Camera circling the origin at a fixed height, `angle` radians around Y.
pub fn orbit_camera(aspect: f32, angle: f32) -> CameraParams {
    let radius = 4.0;
    let position = Vec3::new(radius * angle.sin(), 1.5, radius * angle.cos());
    let view = Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Y);
    let projection = Mat4::perspective_rh(60f32.to_radians(), aspect.max(0.01), 0.1, 100.0);
    CameraParams {
        view_proj: projection * view,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Arg;
    use crate::render::SharedUniforms;

    #[test]
    fn summary_lists_counts_and_sorted_uniforms() {
        let uniforms = SharedUniforms::new();
        let mut renderer = Renderer3D::new(uniforms.clone());
        renderer.begin_frame();
        renderer.ambient_light(&[Arg::Number(255.0)]).unwrap();

        let lines = light_summary(&renderer, &uniforms.read());
        assert_eq!(
            lines,
            vec![
                "Lights: ambient=1 directional=0 point=0",
                "Uniforms:",
                " - uAmbientColor[0] = (1.00, 1.00, 1.00)",
                " - uAmbientLightCount = 1",
                " - uMaterialColor = (1.00, 1.00, 1.00, 1.00)",
            ]
        );
    }

    #[test]
    fn summary_hides_slots_from_earlier_frames() {
        let uniforms = SharedUniforms::new();
        let mut renderer = Renderer3D::new(uniforms.clone());
        renderer.begin_frame();
        renderer.ambient_light(&[Arg::Number(255.0)]).unwrap();
        renderer.ambient_light(&[Arg::Number(0.0)]).unwrap();
        renderer
            .point_light(&[255.0, 1.0, 2.0, 3.0].map(Arg::Number))
            .unwrap();
        renderer.begin_frame();
        renderer.ambient_light(&[Arg::Number(255.0)]).unwrap();

        let lines = light_summary(&renderer, &uniforms.read());
        assert_eq!(
            lines,
            vec![
                "Lights: ambient=1 directional=0 point=0",
                "Uniforms:",
                " - uAmbientColor[0] = (1.00, 1.00, 1.00)",
                " - uAmbientLightCount = 1",
                " - uDirectionalLightCount = 0",
                " - uMaterialColor = (1.00, 1.00, 1.00, 1.00)",
                " - uPointLightCount = 0",
            ]
        );
    }

    #[test]
    fn summary_without_lights_says_so() {
        let uniforms = SharedUniforms::new();
        let renderer = Renderer3D::new(uniforms.clone());
        let lines = light_summary(&renderer, &uniforms.read());
        assert_eq!(lines[1], "Lighting program not compiled");
    }

    #[test]
    fn orbit_camera_keeps_its_distance() {
        let camera = orbit_camera(16.0 / 9.0, 1.0);
        assert!((camera.position.length() - (16.0f32 + 2.25).sqrt()).abs() < 1e-5);
        let clip = camera.view_proj * Vec3::ZERO.extend(1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
    }
}
