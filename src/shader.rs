use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vertex stage shared by every lit program.
pub const LIGHT_VERTEX_STAGE: &str = "lightVert";
/// Fragment stage shared by every lit program.
pub const LIGHT_FRAGMENT_STAGE: &str = "lightTextureFrag";

/// Identifies a program by the pair of stage ids it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramKey {
    pub vertex: String,
    pub fragment: String,
}

impl ProgramKey {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// The program every light type writes into.
    pub fn lighting() -> Self {
        Self::new(LIGHT_VERTEX_STAGE, LIGHT_FRAGMENT_STAGE)
    }
}

/// Opaque handle to a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramHandle(u32);

impl ProgramHandle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Value written into a named uniform slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    Int(i32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderError {
    #[error("unknown shader stage `{0}`")]
    UnknownStage(String),
}

/// GPU-side half of the registry: compiles programs and receives uniform
/// writes addressed by name.
pub trait GpuBackend: Send {
    fn compile_program(&mut self, key: &ProgramKey) -> Result<ProgramHandle, ShaderError>;
    fn use_program(&mut self, program: ProgramHandle);
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue);
}

/// Compile-once program cache in front of a [`GpuBackend`].
pub struct ShaderRegistry {
    backend: Box<dyn GpuBackend>,
    programs: HashMap<ProgramKey, ProgramHandle>,
    active: Option<ProgramHandle>,
}

impl ShaderRegistry {
    pub fn new(backend: impl GpuBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            programs: HashMap::new(),
            active: None,
        }
    }

    /// Returns the cached program for `key`, compiling it on first use.
    pub fn get_or_compile(&mut self, key: &ProgramKey) -> Result<ProgramHandle, ShaderError> {
        if let Some(handle) = self.programs.get(key) {
            return Ok(*handle);
        }
        let handle = self.backend.compile_program(key)?;
        debug!(
            "compiled program {}/{} as #{}",
            key.vertex,
            key.fragment,
            handle.id()
        );
        self.programs.insert(key.clone(), handle);
        Ok(handle)
    }

    /// Returns the program for `key` only if it was compiled already.
    pub fn cached(&self, key: &ProgramKey) -> Option<ProgramHandle> {
        self.programs.get(key).copied()
    }

    pub fn use_program(&mut self, program: ProgramHandle) {
        if self.active == Some(program) {
            return;
        }
        trace!("use program #{}", program.id());
        self.backend.use_program(program);
        self.active = Some(program);
    }

    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active
    }

    pub fn set_uniform_1i(&mut self, program: ProgramHandle, name: &str, value: i32) {
        self.write(program, name, UniformValue::Int(value));
    }

    pub fn set_uniform_3f(&mut self, program: ProgramHandle, name: &str, x: f32, y: f32, z: f32) {
        self.write(program, name, UniformValue::Vec3([x, y, z]));
    }

    pub fn set_uniform_4f(
        &mut self,
        program: ProgramHandle,
        name: &str,
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    ) {
        self.write(program, name, UniformValue::Vec4([x, y, z, w]));
    }

    fn write(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        trace!("#{} {name} = {value:?}", program.id());
        self.backend.set_uniform(program, name, value);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        compiles: Arc<AtomicU32>,
        binds: Arc<AtomicU32>,
    }

    impl GpuBackend for CountingBackend {
        fn compile_program(&mut self, key: &ProgramKey) -> Result<ProgramHandle, ShaderError> {
            if key.vertex != LIGHT_VERTEX_STAGE {
                return Err(ShaderError::UnknownStage(key.vertex.clone()));
            }
            let id = self.compiles.fetch_add(1, Ordering::SeqCst);
            Ok(ProgramHandle::new(id))
        }

        fn use_program(&mut self, _program: ProgramHandle) {
            self.binds.fetch_add(1, Ordering::SeqCst);
        }

        fn set_uniform(&mut self, _program: ProgramHandle, _name: &str, _value: UniformValue) {}
    }

    #[test]
    fn programs_compile_once_per_key() {
        let backend = CountingBackend::default();
        let compiles = Arc::clone(&backend.compiles);
        let mut registry = ShaderRegistry::new(backend);
        let key = ProgramKey::lighting();
        assert!(registry.cached(&key).is_none());
        let first = registry.get_or_compile(&key).unwrap();
        let second = registry.get_or_compile(&key).unwrap();
        assert_eq!(first, second);
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert_eq!(registry.cached(&key), Some(first));
    }

    #[test]
    fn compile_errors_are_not_cached() {
        let mut registry = ShaderRegistry::new(CountingBackend::default());
        let key = ProgramKey::new("basicVert", LIGHT_FRAGMENT_STAGE);
        let err = registry.get_or_compile(&key).unwrap_err();
        assert_eq!(err, ShaderError::UnknownStage("basicVert".into()));
        assert!(registry.cached(&key).is_none());
    }

    #[test]
    fn rebinding_the_active_program_is_skipped() {
        let backend = CountingBackend::default();
        let binds = Arc::clone(&backend.binds);
        let mut registry = ShaderRegistry::new(backend);
        let program = registry.get_or_compile(&ProgramKey::lighting()).unwrap();
        registry.use_program(program);
        registry.use_program(program);
        assert_eq!(binds.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_program(), Some(program));
    }
}
