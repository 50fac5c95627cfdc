use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::WindowBuilder;

use sketch_runtime::app::{orbit_camera, print_light_summary};
use sketch_runtime::{Renderer, SharedUniforms, SketchRunner};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let source = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read sketch {}", options.path))?;

    if options.summary_only {
        return run_headless(&options, &source);
    }
    match run_interactive(&options, &source) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(&options, &source)
            } else {
                Err(err)
            }
        }
    }
}

fn load_sketch(options: &CliOptions, source: &str, uniforms: &SharedUniforms) -> Result<SketchRunner> {
    let mut runner = SketchRunner::new(uniforms.clone())?;
    runner.load(source, &options.path)?;
    runner.setup()?;
    Ok(runner)
}

fn run_headless(options: &CliOptions, source: &str) -> Result<()> {
    let uniforms = SharedUniforms::new();
    let mut runner = load_sketch(options, source, &uniforms)?;
    runner.run_frames(options.frames.unwrap_or(1))?;
    print_final_state(&runner, &uniforms);
    Ok(())
}

fn run_interactive(options: &CliOptions, source: &str) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Sketch Runtime")
            .with_inner_size(LogicalSize::new(960.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let uniforms = SharedUniforms::new();
    let renderer = block_on(Renderer::new(Arc::clone(&window), uniforms.clone()))?;
    let runner = load_sketch(options, source, &uniforms)?;

    let mut app = AppState {
        renderer,
        runner,
        uniforms,
        frame_limit: options.frames,
        started: Instant::now(),
        last_error: None,
    };

    event_loop.run(|event, target| {
        target.set_control_flow(ControlFlow::Poll);
        if let Err(err) = app.process_event(&event, target) {
            app.last_error = Some(err);
            target.exit();
        }
    })?;

    print_final_state(&app.runner, &app.uniforms);
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn print_final_state(runner: &SketchRunner, uniforms: &SharedUniforms) {
    println!("Ran {} frame(s)", runner.frames_run());
    print_light_summary(&runner.renderer().lock(), &uniforms.read());
}

struct AppState {
    renderer: Renderer,
    runner: SketchRunner,
    uniforms: SharedUniforms,
    frame_limit: Option<u64>,
    started: Instant,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, target: &EventLoopWindowTarget<()>) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(size) => self.renderer.resize(*size),
                    WindowEvent::RedrawRequested => self.redraw(target)?,
                    _ => {}
                }
            }
            Event::AboutToWait => self.renderer.window().request_redraw(),
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self, target: &EventLoopWindowTarget<()>) -> Result<()> {
        if self
            .frame_limit
            .is_some_and(|limit| self.runner.frames_run() >= limit)
        {
            target.exit();
            return Ok(());
        }
        self.runner.frame()?;

        let angle = self.started.elapsed().as_secs_f32() * 0.5;
        let camera = orbit_camera(self.renderer.aspect(), angle);
        if let Err(err) = self.renderer.render(&camera) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    error!("surface reported out of memory on frame {}", self.runner.frames_run());
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }
}

struct CliOptions {
    path: String,
    frames: Option<u64>,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: sketch-runtime <sketch.lua> [--frames N] [--summary-only]"
            ));
        };
        let mut frames = None;
        let mut summary_only = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames expects a frame count"))?;
                    let count = value
                        .parse::<u64>()
                        .with_context(|| format!("invalid frame count `{value}`"))?;
                    frames = Some(count);
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --frames N or --summary-only"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            frames,
            summary_only,
        })
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}
