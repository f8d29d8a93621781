//! Scene construction: turns a [`SimulationConfig`] into a ready kernel.

use anyhow::{anyhow, bail};
use pbf_kernel::{PbfKernel, SimulationKernel};
use tracing::{info, warn};

use crate::config::SimulationConfig;

/// Build an idle kernel with the configured tunables and boundaries.
///
/// The lattice is not placed here; the runner does that on start so a
/// restart reproduces the initial state exactly.
pub fn build_kernel(config: &SimulationConfig) -> anyhow::Result<PbfKernel> {
    config
        .validate()
        .map_err(|e| anyhow!("scene '{}': {}", config.name, e))?;

    let mut kernel = PbfKernel::new(config.params.clone());

    for (i, rect) in config.obstacles.iter().enumerate() {
        if !kernel.add_obstacle(*rect) {
            bail!("scene '{}': obstacle {} rejected", config.name, i);
        }
    }
    for (i, rect) in config.final_walls.iter().enumerate() {
        if kernel.add_final_wall(*rect).is_none() {
            bail!("scene '{}': final wall {} rejected", config.name, i + 1);
        }
    }

    info!(
        scene = %config.name,
        lattice_x = config.lattice.num_x,
        lattice_y = config.lattice.num_y,
        obstacles = kernel.boundaries().obstacles().len(),
        final_walls = kernel.boundaries().final_walls().len(),
        "scene built"
    );
    Ok(kernel)
}

/// Place the configured lattice. Logs and returns `false` if it does not fit.
pub fn place_lattice(kernel: &mut PbfKernel, config: &SimulationConfig) -> bool {
    let lattice = config.lattice;
    if kernel.reset(lattice.num_x, lattice.num_y) {
        return true;
    }
    warn!(
        scene = %config.name,
        num_x = lattice.num_x,
        num_y = lattice.num_y,
        capacity = kernel.particles().capacity(),
        "lattice exceeds particle capacity, reset skipped"
    );
    false
}
