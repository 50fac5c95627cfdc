use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::shader::{GpuBackend, ProgramHandle, ProgramKey, ShaderError, UniformValue};

use super::shared::program_source;

#[derive(Debug, Clone)]
struct ProgramRecord {
    key: ProgramKey,
    uniforms: BTreeMap<String, UniformValue>,
}

/// Headless backend that keeps every uniform write in memory.
#[derive(Debug, Clone, Default)]
pub struct UniformStore {
    programs: Vec<ProgramRecord>,
    active: Option<ProgramHandle>,
}

impl UniformStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active
    }

    pub fn find_program(&self, key: &ProgramKey) -> Option<ProgramHandle> {
        self.programs
            .iter()
            .position(|record| &record.key == key)
            .map(|index| ProgramHandle::new(index as u32))
    }

    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.record(program)?.uniforms.get(name).copied()
    }

    /// All uniforms written to `program`, sorted by name.
    pub fn uniforms(&self, program: ProgramHandle) -> Option<&BTreeMap<String, UniformValue>> {
        self.record(program).map(|record| &record.uniforms)
    }

    fn record(&self, program: ProgramHandle) -> Option<&ProgramRecord> {
        self.programs.get(program.id() as usize)
    }
}

impl GpuBackend for UniformStore {
    fn compile_program(&mut self, key: &ProgramKey) -> Result<ProgramHandle, ShaderError> {
        program_source(key)?;
        let handle = ProgramHandle::new(self.programs.len() as u32);
        self.programs.push(ProgramRecord {
            key: key.clone(),
            uniforms: BTreeMap::new(),
        });
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.active = Some(program);
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        match self.programs.get_mut(program.id() as usize) {
            Some(record) => {
                record.uniforms.insert(name.to_string(), value);
            }
            None => warn!("uniform {name} written to unknown program #{}", program.id()),
        }
    }
}

/// A [`UniformStore`] shared between the sketch renderer and whoever reads
/// the uniforms back (the window renderer, tests, the CLI summary).
#[derive(Debug, Clone, Default)]
pub struct SharedUniforms {
    inner: Arc<RwLock<UniformStore>>,
}

impl SharedUniforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, UniformStore> {
        self.inner.read()
    }
}

impl GpuBackend for SharedUniforms {
    fn compile_program(&mut self, key: &ProgramKey) -> Result<ProgramHandle, ShaderError> {
        self.inner.write().compile_program(key)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.inner.write().use_program(program)
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.inner.write().set_uniform(program, name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_records_uniforms_per_program() {
        let mut store = UniformStore::new();
        let program = store.compile_program(&ProgramKey::lighting()).unwrap();
        store.use_program(program);
        store.set_uniform(program, "uAmbientLightCount", UniformValue::Int(2));
        store.set_uniform(program, "uAmbientLightCount", UniformValue::Int(3));
        assert_eq!(store.active_program(), Some(program));
        assert_eq!(
            store.uniform(program, "uAmbientLightCount"),
            Some(UniformValue::Int(3))
        );
        assert_eq!(store.uniforms(program).map(BTreeMap::len), Some(1));
        assert_eq!(store.find_program(&ProgramKey::lighting()), Some(program));
    }

    #[test]
    fn unknown_stages_fail_to_compile() {
        let mut store = UniformStore::new();
        let err = store
            .compile_program(&ProgramKey::new("normalVert", "normalFrag"))
            .unwrap_err();
        assert_eq!(err, ShaderError::UnknownStage("normalVert".into()));
        assert_eq!(store.program_count(), 0);
    }

    #[test]
    fn writes_to_unknown_programs_are_dropped() {
        let mut store = UniformStore::new();
        store.set_uniform(ProgramHandle::new(7), "uMaterialColor", UniformValue::Vec4([1.0; 4]));
        assert!(store.uniforms(ProgramHandle::new(7)).is_none());
    }

    #[test]
    fn shared_handles_see_the_same_store() {
        let shared = SharedUniforms::new();
        let mut writer = shared.clone();
        let program = writer.compile_program(&ProgramKey::lighting()).unwrap();
        writer.set_uniform(program, "uPointLightCount", UniformValue::Int(1));
        assert_eq!(
            shared.read().uniform(program, "uPointLightCount"),
            Some(UniformValue::Int(1))
        );
    }
}
