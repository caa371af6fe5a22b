use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::fmt::Display;
use std::sync::OnceLock;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime session settings for `.onnx` classifier artifacts.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 1, // One sample per request
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

fn same_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: same_level(&self.optimization_level),
        }
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init().with_name("airox").commit()?;
    Ok(())
}

/// Runs `init` at most once per cell; every caller sees the same outcome.
fn init_once<E: Display>(
    cell: &OnceLock<Result<(), String>>,
    init: impl FnOnce() -> Result<(), E>,
) -> Result<(), String> {
    cell.get_or_init(|| init().map_err(|e| format!("ONNX Runtime initialization failed: {}", e)))
        .clone()
}

pub fn ensure_initialized() -> Result<(), String> {
    init_once(&INIT, init_onnx_environment)
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, String> {
    ensure_initialized()?;
    configure(config).map_err(|e| e.to_string())
}

fn configure(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(same_level(&config.optimization_level))?;

    Ok(builder)
}
