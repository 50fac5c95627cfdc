use glam::Vec3;
use log::debug;
use thiserror::Error;

use crate::args::{split_light_args, Arg, ArgumentError};
use crate::color::{Color, ColorError, ColorMode, ColorResolver};
use crate::lights::{register_light, reset_lights, Light, LightState, MATERIAL_COLOR_UNIFORM};
use crate::shader::{GpuBackend, ProgramHandle, ProgramKey, ShaderError, ShaderRegistry};

#[derive(Debug, Error)]
pub enum SketchError {
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// 3-D drawing state of one sketch: the program registry, the per-frame
/// light counters and the color settings.
pub struct Renderer3D {
    shaders: ShaderRegistry,
    lights: LightState,
    colors: ColorResolver,
    frame: u64,
}

impl std::fmt::Debug for Renderer3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer3D")
            .field("lights", &self.lights)
            .field("colors", &self.colors)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl Renderer3D {
    pub fn new(backend: impl GpuBackend + 'static) -> Self {
        Self {
            shaders: ShaderRegistry::new(backend),
            lights: LightState::new(),
            colors: ColorResolver::new(),
            frame: 0,
        }
    }

    /// Starts a new frame: lights registered so far are forgotten and the
    /// shader's light counts drop back to zero.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        reset_lights(&mut self.shaders, &mut self.lights);
        debug!("frame {} started", self.frame);
    }

    /// Number of frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn light_state(&self) -> &LightState {
        &self.lights
    }

    /// The lighting program, once any light or material call compiled it.
    pub fn lighting_program(&self) -> Option<ProgramHandle> {
        self.shaders.cached(&ProgramKey::lighting())
    }

    pub fn color_mode(&mut self, mode: ColorMode) -> &mut Self {
        self.colors.set_mode(mode);
        self
    }

    pub fn color_mode_with_max(&mut self, mode: ColorMode, max: f32) -> Result<&mut Self, SketchError> {
        self.colors.set_mode_with_max(mode, max)?;
        Ok(self)
    }

    pub fn color_mode_with_maxes(
        &mut self,
        mode: ColorMode,
        maxes: [f32; 4],
    ) -> Result<&mut Self, SketchError> {
        self.colors.set_mode_with_maxes(mode, maxes)?;
        Ok(self)
    }

    pub fn colors(&self) -> &ColorResolver {
        &self.colors
    }

    /// Resolves color arguments under the current color mode.
    pub fn color(&self, args: &[Arg]) -> Result<Color, SketchError> {
        Ok(self.colors.resolve_args(args)?)
    }

    /// `ambientLight(color...)`
    pub fn ambient_light(&mut self, args: &[Arg]) -> Result<&mut Self, SketchError> {
        let color = self.color(args)?;
        self.ambient_light_color(color)
    }

    /// `directionalLight(color..., x, y, z)` or `directionalLight(color..., vector)`
    pub fn directional_light(&mut self, args: &[Arg]) -> Result<&mut Self, SketchError> {
        let (color_args, direction) = split_light_args(args)?;
        let color = self.color(color_args)?;
        self.directional_light_color(color, direction)
    }

    /// `pointLight(color..., x, y, z)` or `pointLight(color..., vector)`
    pub fn point_light(&mut self, args: &[Arg]) -> Result<&mut Self, SketchError> {
        let (color_args, position) = split_light_args(args)?;
        let color = self.color(color_args)?;
        self.point_light_color(color, position)
    }

    pub fn ambient_light_color(&mut self, color: Color) -> Result<&mut Self, SketchError> {
        self.register(Light::Ambient { color })
    }

    pub fn directional_light_color(
        &mut self,
        color: Color,
        direction: Vec3,
    ) -> Result<&mut Self, SketchError> {
        self.register(Light::Directional { color, direction })
    }

    pub fn point_light_color(&mut self, color: Color, position: Vec3) -> Result<&mut Self, SketchError> {
        self.register(Light::Point { color, position })
    }

    /// `ambientMaterial(color...)`: sets the material color of lit geometry
    /// until the next light call restores the white fallback.
    pub fn ambient_material(&mut self, args: &[Arg]) -> Result<&mut Self, SketchError> {
        let [r, g, b, a] = self.color(args)?.to_array();
        let program = self.shaders.get_or_compile(&ProgramKey::lighting())?;
        self.shaders.use_program(program);
        self.shaders
            .set_uniform_4f(program, MATERIAL_COLOR_UNIFORM, r, g, b, a);
        Ok(self)
    }

    fn register(&mut self, light: Light) -> Result<&mut Self, SketchError> {
        register_light(&mut self.shaders, &mut self.lights, &light)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::LightKind;
    use crate::render::SharedUniforms;
    use crate::shader::UniformValue;
    use crate::UniformStore;

    fn renderer() -> (Renderer3D, SharedUniforms) {
        let uniforms = SharedUniforms::new();
        (Renderer3D::new(uniforms.clone()), uniforms)
    }

    fn numbers(values: &[f32]) -> Vec<Arg> {
        values.iter().copied().map(Arg::Number).collect()
    }

    fn uniform(uniforms: &SharedUniforms, name: &str) -> Option<UniformValue> {
        let store = uniforms.read();
        let program = store.find_program(&ProgramKey::lighting())?;
        store.uniform(program, name)
    }

    fn snapshot(uniforms: &SharedUniforms) -> UniformStore {
        uniforms.read().clone()
    }

    fn assert_vec3(value: Option<UniformValue>, expected: [f32; 3]) {
        let Some(UniformValue::Vec3(actual)) = value else {
            panic!("expected a vec3 uniform, got {value:?}");
        };
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn ambient_gray_scenario() {
        let (mut renderer, uniforms) = renderer();
        renderer.begin_frame();
        renderer.ambient_light(&numbers(&[150.0])).unwrap();
        assert_vec3(uniform(&uniforms, "uAmbientColor[0]"), [150.0 / 255.0; 3]);
        assert_eq!(
            uniform(&uniforms, "uAmbientLightCount"),
            Some(UniformValue::Int(1))
        );
    }

    #[test]
    fn directional_numeric_scenario() {
        let (mut renderer, uniforms) = renderer();
        renderer.begin_frame();
        renderer
            .directional_light(&numbers(&[250.0, 250.0, 250.0, 0.5, -0.5, 0.25]))
            .unwrap();
        assert_vec3(uniform(&uniforms, "uDirectionalColor[0]"), [250.0 / 255.0; 3]);
        assert_eq!(
            uniform(&uniforms, "uLightingDirection[0]"),
            Some(UniformValue::Vec3([0.5, -0.5, 0.25]))
        );
        assert_eq!(
            uniform(&uniforms, "uDirectionalLightCount"),
            Some(UniformValue::Int(1))
        );
        assert_eq!(renderer.light_state().count(LightKind::Directional), 1);
    }

    #[test]
    fn point_vector_scenario() {
        let (mut renderer, uniforms) = renderer();
        let mut args = numbers(&[250.0, 250.0, 250.0]);
        args.push(Arg::vector(Vec3::ZERO));
        renderer.point_light(&args).unwrap();
        assert_eq!(
            uniform(&uniforms, "uPointLightLocation[0]"),
            Some(UniformValue::Vec3([0.0, 0.0, 0.0]))
        );
        assert_eq!(
            uniform(&uniforms, "uPointLightCount"),
            Some(UniformValue::Int(1))
        );
    }

    #[test]
    fn numeric_and_vector_geometry_agree() {
        let (mut numeric, numeric_uniforms) = renderer();
        numeric
            .point_light(&numbers(&[255.0, 1.0, 2.0, 3.0]))
            .unwrap();
        let (mut vector, vector_uniforms) = renderer();
        vector
            .point_light(&[Arg::Number(255.0), Arg::vector(Vec3::new(1.0, 2.0, 3.0))])
            .unwrap();
        assert_eq!(
            uniform(&numeric_uniforms, "uPointLightLocation[0]"),
            uniform(&vector_uniforms, "uPointLightLocation[0]")
        );
        assert_eq!(
            uniform(&numeric_uniforms, "uPointLightColor[0]"),
            Some(UniformValue::Vec3([1.0; 3]))
        );
    }

    #[test]
    fn malformed_vector_mutates_nothing() {
        let (mut renderer, uniforms) = renderer();
        renderer.ambient_light(&numbers(&[10.0])).unwrap();
        let before = snapshot(&uniforms);
        let state = *renderer.light_state();

        let mut args = numbers(&[250.0, 250.0, 250.0]);
        args.push(Arg::from("not-a-vector"));
        let err = renderer.point_light(&args).unwrap_err();
        assert!(matches!(
            err,
            SketchError::Argument(ArgumentError::NotAVector("string"))
        ));

        let after = snapshot(&uniforms);
        let program = after.find_program(&ProgramKey::lighting()).unwrap();
        assert_eq!(before.uniforms(program), after.uniforms(program));
        assert_eq!(*renderer.light_state(), state);
    }

    #[test]
    fn bad_color_mutates_nothing() {
        let (mut renderer, uniforms) = renderer();
        let err = renderer
            .directional_light(&[Arg::from("no-such-color"), Arg::vector(Vec3::X)])
            .unwrap_err();
        assert!(matches!(err, SketchError::Color(_)));
        assert_eq!(uniforms.read().program_count(), 0);
        assert_eq!(renderer.light_state().total(), 0);
    }

    #[test]
    fn every_light_restores_white_material() {
        let (mut renderer, uniforms) = renderer();
        renderer.ambient_material(&[Arg::from("red")]).unwrap();
        assert_eq!(
            uniform(&uniforms, MATERIAL_COLOR_UNIFORM),
            Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
        );
        renderer
            .directional_light(&numbers(&[255.0, 0.0, 0.0, -1.0]))
            .unwrap();
        assert_eq!(
            uniform(&uniforms, MATERIAL_COLOR_UNIFORM),
            Some(UniformValue::Vec4([1.0; 4]))
        );
        renderer.ambient_material(&numbers(&[0.0, 0.0, 255.0])).unwrap();
        assert_eq!(
            uniform(&uniforms, MATERIAL_COLOR_UNIFORM),
            Some(UniformValue::Vec4([0.0, 0.0, 1.0, 1.0]))
        );
        renderer
            .point_light(&numbers(&[0.0, 255.0, 0.0, 0.0, 2.0, 0.0]))
            .unwrap();
        assert_eq!(
            uniform(&uniforms, MATERIAL_COLOR_UNIFORM),
            Some(UniformValue::Vec4([1.0; 4]))
        );
        renderer.ambient_material(&[Arg::from("blue")]).unwrap();
        renderer.ambient_light(&numbers(&[40.0])).unwrap();
        assert_eq!(
            uniform(&uniforms, MATERIAL_COLOR_UNIFORM),
            Some(UniformValue::Vec4([1.0; 4]))
        );
    }

    #[test]
    fn frames_start_from_zero() {
        let (mut renderer, uniforms) = renderer();
        renderer.begin_frame();
        renderer.ambient_light(&numbers(&[100.0])).unwrap();
        renderer.ambient_light(&numbers(&[200.0])).unwrap();
        renderer.begin_frame();
        assert_eq!(renderer.light_state().total(), 0);
        assert_eq!(
            uniform(&uniforms, "uAmbientLightCount"),
            Some(UniformValue::Int(0))
        );

        renderer.ambient_light(&numbers(&[100.0])).unwrap();
        assert_vec3(uniform(&uniforms, "uAmbientColor[0]"), [100.0 / 255.0; 3]);
        assert_eq!(
            uniform(&uniforms, "uAmbientLightCount"),
            Some(UniformValue::Int(1))
        );
        assert_eq!(renderer.frame_count(), 2);
    }

    #[test]
    fn chained_calls_share_one_program() {
        let (mut renderer, uniforms) = renderer();
        renderer
            .ambient_light(&numbers(&[50.0]))
            .and_then(|r| r.directional_light(&numbers(&[255.0, 0.0, 0.0, -1.0])))
            .and_then(|r| r.point_light(&numbers(&[255.0, 0.0, 5.0, 0.0])))
            .unwrap();
        assert_eq!(uniforms.read().program_count(), 1);
        assert_eq!(renderer.light_state().total(), 3);
        assert_eq!(uniforms.read().active_program(), renderer.lighting_program());
    }

    #[test]
    fn color_mode_applies_to_lights() {
        let (mut renderer, uniforms) = renderer();
        renderer.color_mode(ColorMode::Hsb);
        renderer.ambient_light(&numbers(&[0.0, 100.0, 100.0])).unwrap();
        assert_vec3(uniform(&uniforms, "uAmbientColor[0]"), [1.0, 0.0, 0.0]);
        renderer.color_mode_with_max(ColorMode::Rgb, 1.0).unwrap();
        renderer.ambient_light(&numbers(&[0.5])).unwrap();
        assert_vec3(uniform(&uniforms, "uAmbientColor[1]"), [0.5; 3]);
    }
}
