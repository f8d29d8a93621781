//! Smoothing kernel and the position-based density solver.
//!
//! Density uses the 2D poly6 kernel
//!
//! ```text
//! W(r) = (4 / (pi h^8)) * (h^2 - r^2)^3     for r <= h
//! ```
//!
//! and the constraint `C_i = rho_i / rho_0 - 1` is relaxed with one
//! Lagrange multiplier per particle, applied in place (Gauss-Seidel order):
//! particles later in the index order see corrections already made by
//! earlier ones within the same pass.

use crate::neighbor::NeighborList;
use crate::params::{KernelConstants, LAMBDA_EPSILON};
use crate::particle::ParticleStore;

/// 2D poly6 kernel value for squared distance `r2`. Zero outside the support.
#[inline]
pub fn poly6(r2: f32, h2: f32, kernel_scale: f32) -> f32 {
    if r2 > h2 {
        return 0.0;
    }
    let w = h2 - r2;
    kernel_scale * w * w * w
}

/// Radial derivative of [`poly6`] divided by the rest density.
///
/// ```text
/// dW/dr / rho_0 = kernel_scale * 3 (h^2 - r^2)^2 * (-2r) / rho_0
/// ```
///
/// Non-positive inside the support and zero at `r = 0`.
#[inline]
pub fn poly6_gradient(r: f32, h2: f32, kernel_scale: f32, rest_density: f32) -> f32 {
    let r2 = r * r;
    if r2 > h2 {
        return 0.0;
    }
    let w = h2 - r2;
    (kernel_scale * 3.0 * w * w * (-2.0 * r)) / rest_density
}

/// Which correction the solver applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolverMode {
    /// Skip particles whose constraint is negative (under-dense).
    pub unilateral: bool,
    /// Pairwise contact separation instead of the density constraint.
    pub sand: bool,
}

/// Summary of the last relaxation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveStats {
    /// Mean density over all particles.
    pub avg_density: f32,
    /// Largest density seen.
    pub max_density: f32,
    /// Particles that received their own correction.
    pub corrected: usize,
}

/// Density-constraint solver with reusable scratch space.
#[derive(Debug, Clone, Default)]
pub struct FluidSolver {
    /// Per-neighbor gradient of the particle being solved.
    grads: Vec<[f32; 2]>,
    densities: Vec<f32>,
    lambdas: Vec<f32>,
    stats: SolveStats,
}

impl FluidSolver {
    /// Create a solver with empty scratch buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Densities from the last pass. Zero in sand mode.
    pub fn densities(&self) -> &[f32] {
        &self.densities
    }

    /// Multipliers from the last pass. Zero for skipped particles.
    pub fn lambdas(&self) -> &[f32] {
        &self.lambdas
    }

    /// Statistics from the last pass.
    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// Run one relaxation pass over every particle covered by `neighbors`.
    pub fn solve(
        &mut self,
        particles: &mut ParticleStore,
        neighbors: &NeighborList,
        constants: &KernelConstants,
        mode: SolverMode,
    ) -> SolveStats {
        let n = neighbors.len().min(particles.len());
        self.densities.clear();
        self.densities.resize(n, 0.0);
        self.lambdas.clear();
        self.lambdas.resize(n, 0.0);

        self.stats = if mode.sand {
            self.separate_contacts(particles, neighbors, constants, n)
        } else {
            self.relax_density(particles, neighbors, constants, mode.unilateral, n)
        };
        self.stats
    }

    fn relax_density(
        &mut self,
        particles: &mut ParticleStore,
        neighbors: &NeighborList,
        c: &KernelConstants,
        unilateral: bool,
        n: usize,
    ) -> SolveStats {
        let h = c.kernel_radius;
        let h2 = c.h2;
        let mut stats = SolveStats::default();
        let mut density_sum = 0.0_f64;

        for i in 0..n {
            let px = particles.x[i];
            let py = particles.y[i];
            let ids = neighbors.neighbors_of(i);

            self.grads.clear();
            self.grads.resize(ids.len(), [0.0, 0.0]);

            let mut rho = 0.0_f32;
            let mut sum_grad2 = 0.0_f32;
            let mut grad_ix = 0.0_f32;
            let mut grad_iy = 0.0_f32;

            for (j, &id) in ids.iter().enumerate() {
                let id = id as usize;
                let mut nx = particles.x[id] - px;
                let mut ny = particles.y[id] - py;
                let r = (nx * nx + ny * ny).sqrt();
                if r > 0.0 {
                    nx /= r;
                    ny /= r;
                }
                if r > h {
                    continue;
                }

                rho += poly6(r * r, h2, c.kernel_scale);
                let grad = poly6_gradient(r, h2, c.kernel_scale, c.rest_density);
                self.grads[j] = [nx * grad, ny * grad];
                grad_ix -= nx * grad;
                grad_iy -= ny * grad;
                sum_grad2 += grad * grad;
            }
            sum_grad2 += grad_ix * grad_ix + grad_iy * grad_iy;

            self.densities[i] = rho;
            density_sum += rho as f64;
            stats.max_density = stats.max_density.max(rho);

            let constraint = rho / c.rest_density - 1.0;
            if unilateral && constraint < 0.0 {
                continue;
            }

            let lambda = -constraint / (sum_grad2 + LAMBDA_EPSILON);
            self.lambdas[i] = lambda;
            stats.corrected += 1;

            for (j, &id) in ids.iter().enumerate() {
                let id = id as usize;
                if id == i {
                    particles.x[id] += lambda * grad_ix;
                    particles.y[id] += lambda * grad_iy;
                } else {
                    particles.x[id] += lambda * self.grads[j][0];
                    particles.y[id] += lambda * self.grads[j][1];
                }
            }
        }

        if n > 0 {
            stats.avg_density = (density_sum / n as f64) as f32;
        }
        stats
    }

    /// Push overlapping pairs apart by half the overlap each.
    fn separate_contacts(
        &mut self,
        particles: &mut ParticleStore,
        neighbors: &NeighborList,
        c: &KernelConstants,
        n: usize,
    ) -> SolveStats {
        let contact = 2.0 * c.particle_radius;
        let mut stats = SolveStats::default();

        for i in 0..n {
            let mut touched = false;
            let px = particles.x[i];
            let py = particles.y[i];
            for &id in neighbors.neighbors_of(i) {
                let id = id as usize;
                let mut nx = particles.x[id] - px;
                let mut ny = particles.y[id] - py;
                let r = (nx * nx + ny * ny).sqrt();
                if r > 0.0 {
                    nx /= r;
                    ny /= r;
                }
                if r < contact {
                    let d = 0.5 * (contact - r);
                    particles.x[i] -= nx * d;
                    particles.y[i] -= ny * d;
                    particles.x[id] += nx * d;
                    particles.y[id] += ny * d;
                    touched |= id != i && r > 0.0;
                }
            }
            stats.corrected += touched as usize;
        }
        stats
    }
}

/// XSPH smoothing: blend each velocity toward the plain average of its
/// neighbor velocities by `viscosity`.
///
/// Runs in index order and in place, so particle `i` averages over
/// already-smoothed velocities of lower-indexed neighbors.
pub fn apply_viscosity(particles: &mut ParticleStore, neighbors: &NeighborList, viscosity: f32) {
    let n = neighbors.len().min(particles.len());
    for i in 0..n {
        let ids = neighbors.neighbors_of(i);
        if ids.is_empty() {
            continue;
        }

        let mut avg_vx = 0.0_f32;
        let mut avg_vy = 0.0_f32;
        for &id in ids {
            avg_vx += particles.vx[id as usize];
            avg_vy += particles.vy[id as usize];
        }
        let inv = 1.0 / ids.len() as f32;
        avg_vx *= inv;
        avg_vy *= inv;

        particles.vx[i] += viscosity * (avg_vx - particles.vx[i]);
        particles.vy[i] += viscosity * (avg_vy - particles.vy[i]);
    }
}
