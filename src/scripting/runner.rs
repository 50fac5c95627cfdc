use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use mlua::{Function, Lua};
use parking_lot::Mutex;

use crate::renderer::Renderer3D;
use crate::shader::GpuBackend;

use super::bindings::{register_globals, ScriptContext};

/// Drives a Lua sketch: `setup()` once, then `draw()` once per frame with
/// the lights of the previous frame cleared.
pub struct SketchRunner {
    lua: Lua,
    renderer: Arc<Mutex<Renderer3D>>,
    frames_run: u64,
}

impl SketchRunner {
    pub fn new(backend: impl GpuBackend + 'static) -> Result<Self> {
        let renderer = Arc::new(Mutex::new(Renderer3D::new(backend)));
        let lua = Lua::new();
        let context = ScriptContext::new(Arc::clone(&renderer));
        register_globals(&lua, &context).context("failed to register sketch globals")?;
        Ok(Self {
            lua,
            renderer,
            frames_run: 0,
        })
    }

    /// Executes the sketch's top-level chunk, defining `setup` and `draw`.
    pub fn load(&self, source: &str, name: &str) -> Result<()> {
        self.lua
            .load(source)
            .set_name(name)
            .exec()
            .with_context(|| format!("failed to load sketch {name}"))
    }

    pub fn setup(&mut self) -> Result<()> {
        match self.callback("setup")? {
            Some(setup) => {
                setup.call::<_, ()>(()).context("Lua runtime error in setup()")?;
                info!("sketch setup finished");
            }
            None => debug!("sketch defines no setup()"),
        }
        Ok(())
    }

    /// Starts a frame and runs `draw()` if the sketch defines one.
    pub fn frame(&mut self) -> Result<()> {
        let frame = {
            let mut renderer = self.renderer.lock();
            renderer.begin_frame();
            renderer.frame_count()
        };
        self.lua.globals().set("frameCount", frame)?;
        if let Some(draw) = self.callback("draw")? {
            draw.call::<_, ()>(())
                .with_context(|| format!("Lua runtime error in draw() on frame {frame}"))?;
        }
        self.frames_run += 1;
        Ok(())
    }

    pub fn run_frames(&mut self, frames: u64) -> Result<()> {
        for _ in 0..frames {
            self.frame()?;
        }
        Ok(())
    }

    pub fn renderer(&self) -> &Arc<Mutex<Renderer3D>> {
        &self.renderer
    }

    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    fn callback(&self, name: &str) -> Result<Option<Function>> {
        self.lua
            .globals()
            .get::<_, Option<Function>>(name)
            .with_context(|| format!("sketch global `{name}` is not a function"))
    }
}
