//! Orchestration Layer
//!
//! This crate sits between a host application and the PBF kernel:
//! - JSON scene configuration and validation
//! - Scene construction (tunables, obstacles, final walls)
//! - A synchronous frame runner with lifecycle management and frame timing

#![warn(missing_docs)]

pub mod config;
pub mod runner;
pub mod scene;

pub use config::{LatticeConfig, SimulationConfig};
pub use runner::{FrameRunner, RunSummary, RunnerState};

use std::path::Path;

/// Create a runnable scene from a configuration file
///
/// Loads and validates the configuration, builds the kernel with its
/// boundaries, and wraps it in a [`FrameRunner`] in the `Created` state.
///
/// # Example
/// ```no_run
/// use pbf_orchestrator::create_simulation;
///
/// let mut runner = create_simulation("configs/dam-break.json")?;
/// runner.start();
/// runner.tick(|view| println!("{} particles", view.len()));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn create_simulation(config_path: impl AsRef<Path>) -> anyhow::Result<FrameRunner> {
    let path = config_path.as_ref();
    tracing::info!("Creating simulation from config: {}", path.display());

    let config = SimulationConfig::load(path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    FrameRunner::from_config(config)
}
