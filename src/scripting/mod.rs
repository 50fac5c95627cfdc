mod bindings;
mod runner;

pub use runner::SketchRunner;
