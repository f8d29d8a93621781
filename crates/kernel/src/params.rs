//! Tunable simulation parameters and the constants derived from them.
//!
//! Only the particle radius feeds the derived set. Changing it goes through
//! [`KernelConstants::from_radius`] so that diameter, rest density, kernel
//! radius/scale, grid spacing and the displacement cap always agree.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Bucket count of the spatial hash table (prime).
pub const DEFAULT_HASH_TABLE_SIZE: usize = 370_111;

/// Denominator floor in the Lagrange multiplier, keeps isolated particles finite.
pub const LAMBDA_EPSILON: f32 = 1.0e-4;

/// Horizontal offset applied to odd lattice rows on reset.
pub const LATTICE_JITTER: f32 = 1.0e-5;

/// Tunable parameters. Mutated only between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidParams {
    /// Vertical gravitational acceleration (negative is down).
    pub gravity: f32,
    /// Particle radius in world units. Derived constants follow from it.
    pub particle_radius: f32,
    /// XSPH blend factor toward the neighbor-average velocity, in [0, 1].
    pub viscosity: f32,
    /// Simulated time per displayed frame.
    pub time_step: f32,
    /// Sub-steps per frame.
    pub num_sub_steps: u32,
    /// Density relaxation passes per sub-step.
    pub num_iters: u32,
    /// Resist compression only; under-dense particles get no correction.
    pub unilateral: bool,
    /// Replace the density solve with pairwise contact separation.
    pub sand: bool,
    /// Particle capacity.
    pub max_particles: usize,
    /// Particles are clamped to `[-domain_half_width, domain_half_width]` in x.
    pub domain_half_width: f32,
    /// Lower-left corner of the reset lattice.
    pub fluid_origin: [f32; 2],
    /// Bucket count of the spatial hash.
    pub hash_table_size: usize,
    /// World position of cell (0, 0) in the spatial hash.
    pub hash_origin: [f32; 2],
}

impl Default for FluidParams {
    fn default() -> Self {
        Self {
            gravity: -10.0,
            particle_radius: 0.013,
            viscosity: 0.0,
            time_step: 0.01,
            num_sub_steps: 10,
            num_iters: 1,
            unilateral: true,
            sand: false,
            max_particles: 1_000_000,
            domain_half_width: 1.0,
            fluid_origin: [-0.3, 1.8],
            hash_table_size: DEFAULT_HASH_TABLE_SIZE,
            hash_origin: [-100.0, -1.0],
        }
    }
}

impl FluidParams {
    /// Length of one sub-step.
    pub fn sub_step_dt(&self) -> f32 {
        self.time_step / self.num_sub_steps.max(1) as f32
    }

    /// Constants derived from the current radius.
    pub fn constants(&self) -> KernelConstants {
        KernelConstants::from_radius(self.particle_radius)
    }
}

/// Constants derived from the particle radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConstants {
    /// Particle radius `r`.
    pub particle_radius: f32,
    /// `2r`, also the reset lattice spacing.
    pub particle_diameter: f32,
    /// `1 / d^2`: one particle per lattice cell.
    pub rest_density: f32,
    /// Kernel support `h = 3r`.
    pub kernel_radius: f32,
    /// `h^2`.
    pub h2: f32,
    /// 2D poly6 normalization `4 / (pi h^8)`.
    pub kernel_scale: f32,
    /// Hash cell size and neighbor search radius, `1.5h`.
    pub grid_spacing: f32,
    /// Maximum displacement per sub-step, `0.4r`.
    pub max_vel: f32,
}

impl KernelConstants {
    /// Compute every derived constant from `radius`.
    pub fn from_radius(radius: f32) -> Self {
        let particle_diameter = 2.0 * radius;
        let kernel_radius = 3.0 * radius;
        let h2 = kernel_radius * kernel_radius;
        let grid_spacing = 1.5 * kernel_radius;
        Self {
            particle_radius: radius,
            particle_diameter,
            rest_density: 1.0 / (particle_diameter * particle_diameter),
            kernel_radius,
            h2,
            kernel_scale: 4.0 / (PI * h2 * h2 * h2 * h2),
            grid_spacing,
            max_vel: 0.4 * radius,
        }
    }
}
