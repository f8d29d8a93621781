//! Position-Based Fluids simulation kernel (2D).
//!
//! This crate holds the physics core: storage, neighbor search, the density
//! constraint solver, boundary resolution and the sub-stepped integrator. It
//! has no rendering or input handling; hosts drive it one frame at a time and
//! read back a [`FrameView`].
//!
//! # Modules
//! - [`particle`] -- Struct-of-arrays particle storage.
//! - [`hash`] -- Generation-marked spatial hash over a uniform grid.
//! - [`neighbor`] -- Per-frame compacted neighbor lists.
//! - [`boundary`] -- Domain walls, obstacles and final walls.
//! - [`sph`] -- Poly6 kernel, density-constraint solver, XSPH viscosity.
//! - [`params`] -- Tunables and derived constants.

#![warn(missing_docs)]

pub mod boundary;
pub mod hash;
pub mod neighbor;
pub mod params;
pub mod particle;
pub mod sph;

pub use boundary::{BoundaryKind, BoundarySet, FinalWall, Obstacle, Rect};
pub use hash::SpatialHash;
pub use neighbor::NeighborList;
pub use params::{FluidParams, KernelConstants, LATTICE_JITTER};
pub use particle::ParticleStore;
pub use sph::{apply_viscosity, poly6, poly6_gradient, FluidSolver, SolveStats, SolverMode};

use tracing::{debug, info, trace};

// ---------------------------------------------------------------------------
// State, metrics and the read-only frame view
// ---------------------------------------------------------------------------

/// Integrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimState {
    /// Not started. Frames are not advanced until [`SimulationKernel::reset`].
    #[default]
    Idle,
    /// Normal stepping.
    Running,
    /// A particle entered a final wall. Only a reset leaves this state.
    Stopped {
        /// 1-based position of the wall in the final-wall collection.
        wall: usize,
    },
}

impl SimState {
    /// Return `true` for [`SimState::Running`].
    pub fn is_running(&self) -> bool {
        matches!(self, SimState::Running)
    }

    /// Terminal wall index, if stopped.
    pub fn stopped_wall(&self) -> Option<usize> {
        match self {
            SimState::Stopped { wall } => Some(*wall),
            _ => None,
        }
    }
}

/// Statistics from the most recent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameMetrics {
    /// Mean density over rest density, from the last relaxation pass.
    pub avg_density_ratio: f32,
    /// Largest density over rest density, from the last relaxation pass.
    pub max_density_ratio: f32,
    /// Particles whose displacement was capped in the last sub-step.
    pub clamped_particles: usize,
    /// Entries in the neighbor list, self pairs included.
    pub neighbor_pairs: usize,
    /// Frames stepped since the last reset, including one cut short by a stop.
    pub frames: u64,
    /// Sub-steps started since the last reset.
    pub substeps: u64,
}

/// Everything a renderer needs for one frame, borrowed from the kernel.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Particle x positions.
    pub x: &'a [f32],
    /// Particle y positions.
    pub y: &'a [f32],
    /// Particle radius for drawing.
    pub radius: f32,
    /// Solid obstacles.
    pub obstacles: &'a [Obstacle],
    /// Terminal zones.
    pub final_walls: &'a [FinalWall],
    /// State after the frame.
    pub state: SimState,
}

impl FrameView<'_> {
    /// Number of particles in the view.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles to draw.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SimulationKernel trait
// ---------------------------------------------------------------------------

/// Frame-stepped simulation back-end.
///
/// Each frame rebuilds neighbor search once, then runs a fixed number of
/// sub-steps:
///
/// 1. Predict under gravity
/// 2. Boundary resolution
/// 3. Density relaxation
/// 4. Final-wall check (may stop the frame)
/// 5. Velocity derivation with displacement cap
/// 6. Viscosity
pub trait SimulationKernel {
    /// Advance one display frame and return the resulting state.
    fn step_frame(&mut self) -> SimState;

    /// Place a `num_x` by `num_y` lattice of particles at rest and start running.
    ///
    /// Returns `false` and changes nothing when the lattice exceeds capacity.
    fn reset(&mut self, num_x: usize, num_y: usize) -> bool;

    /// Current particle state.
    fn particles(&self) -> &ParticleStore;

    /// Borrowed view for rendering.
    fn view(&self) -> FrameView<'_>;

    /// Current integrator state.
    fn state(&self) -> SimState;

    /// Statistics from the last frame.
    fn metrics(&self) -> FrameMetrics;

    /// Number of particles in the simulation.
    fn particle_count(&self) -> usize {
        self.particles().len()
    }
}

// ---------------------------------------------------------------------------
// PbfKernel -- CPU implementation of SimulationKernel
// ---------------------------------------------------------------------------

/// Single-threaded PBF integrator.
#[derive(Debug)]
pub struct PbfKernel {
    params: FluidParams,
    constants: KernelConstants,
    particles: ParticleStore,
    hash: SpatialHash,
    neighbors: NeighborList,
    solver: FluidSolver,
    boundaries: BoundarySet,
    state: SimState,
    metrics: FrameMetrics,
}

impl PbfKernel {
    /// Create an idle kernel with no particles.
    ///
    /// # Panics
    /// If `params.particle_radius` is not positive or `params.hash_table_size` is zero.
    pub fn new(params: FluidParams) -> Self {
        let constants = params.constants();
        let hash = SpatialHash::new(
            params.hash_table_size,
            constants.grid_spacing,
            params.hash_origin,
        );
        let particles = ParticleStore::new(params.max_particles);
        Self {
            params,
            constants,
            particles,
            hash,
            neighbors: NeighborList::new(),
            solver: FluidSolver::new(),
            boundaries: BoundarySet::new(),
            state: SimState::Idle,
            metrics: FrameMetrics::default(),
        }
    }

    /// Current tunables.
    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    /// Constants derived from the current radius.
    pub fn constants(&self) -> &KernelConstants {
        &self.constants
    }

    /// Obstacles and final walls.
    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }

    /// Mutable access for authoring (selection, removal). Use between frames.
    pub fn boundaries_mut(&mut self) -> &mut BoundarySet {
        &mut self.boundaries
    }

    /// Neighbor list from the last frame.
    pub fn neighbors(&self) -> &NeighborList {
        &self.neighbors
    }

    /// Solver scratch from the last relaxation pass.
    pub fn solver(&self) -> &FluidSolver {
        &self.solver
    }

    /// Sub-steps started since the last reset.
    pub fn substeps_taken(&self) -> u64 {
        self.metrics.substeps
    }

    /// Frames stepped since the last reset.
    pub fn frames_taken(&self) -> u64 {
        self.metrics.frames
    }

    /// Append one particle at rest. Returns `false` when at capacity.
    pub fn inject_particle(&mut self, px: f32, py: f32) -> bool {
        self.particles.push_particle(px, py)
    }

    /// Add a solid obstacle. Degenerate rectangles are rejected.
    pub fn add_obstacle(&mut self, rect: Rect) -> bool {
        self.boundaries.add_obstacle(rect)
    }

    /// Add a final wall and return its sequence number.
    pub fn add_final_wall(&mut self, rect: Rect) -> Option<u32> {
        self.boundaries.add_final_wall(rect)
    }

    /// Remove obstacles and final walls matching `predicate(rect, kind, selected)`.
    pub fn remove_boundaries<F>(&mut self, predicate: F) -> usize
    where
        F: FnMut(&Rect, BoundaryKind, bool) -> bool,
    {
        self.boundaries.remove_boundaries(predicate)
    }

    // ---- Tunable setters ----

    /// Set vertical gravity.
    pub fn set_gravity(&mut self, gravity: f32) {
        self.params.gravity = gravity;
    }

    /// Set the particle radius and recompute every derived constant.
    /// Non-positive or non-finite values are ignored.
    pub fn set_particle_radius(&mut self, radius: f32) {
        if !(radius.is_finite() && radius > 0.0) {
            debug!(radius, "ignoring invalid particle radius");
            return;
        }
        self.params.particle_radius = radius;
        self.constants = KernelConstants::from_radius(radius);
        self.hash.set_cell_size(self.constants.grid_spacing);
        self.neighbors.clear();
        debug!(
            radius,
            kernel_radius = self.constants.kernel_radius,
            rest_density = self.constants.rest_density,
            grid_spacing = self.constants.grid_spacing,
            max_vel = self.constants.max_vel,
            "particle radius changed"
        );
    }

    /// Set the XSPH blend factor.
    pub fn set_viscosity(&mut self, viscosity: f32) {
        self.params.viscosity = viscosity;
    }

    /// Set simulated time per frame. Non-positive or non-finite values are ignored.
    pub fn set_time_step(&mut self, time_step: f32) {
        if !(time_step.is_finite() && time_step > 0.0) {
            debug!(time_step, "ignoring invalid time step");
            return;
        }
        self.params.time_step = time_step;
    }

    /// Set sub-steps per frame, at least one.
    pub fn set_num_sub_steps(&mut self, num_sub_steps: u32) {
        self.params.num_sub_steps = num_sub_steps.max(1);
    }

    /// Set relaxation passes per sub-step.
    pub fn set_num_iters(&mut self, num_iters: u32) {
        self.params.num_iters = num_iters;
    }

    /// Toggle compression-only correction.
    pub fn set_unilateral(&mut self, unilateral: bool) {
        self.params.unilateral = unilateral;
    }

    /// Toggle sand mode.
    pub fn set_sand(&mut self, sand: bool) {
        self.params.sand = sand;
    }

    // ---- Sub-step phases ----

    fn predict(&mut self, dt: f32) {
        let g = self.params.gravity;
        let p = &mut self.particles;
        for i in 0..p.len() {
            p.vy[i] += g * dt;
            p.prev_x[i] = p.x[i];
            p.prev_y[i] = p.y[i];
            p.x[i] += p.vx[i] * dt;
            p.y[i] += p.vy[i] * dt;
        }
    }

    /// Derive velocity from displacement, capping displacement at `max_vel`.
    /// Returns how many particles were capped.
    fn derive_velocities(&mut self, dt: f32) -> usize {
        let max_vel = self.constants.max_vel;
        let inv_dt = 1.0 / dt;
        let p = &mut self.particles;
        let mut clamped = 0;
        for i in 0..p.len() {
            let mut dx = p.x[i] - p.prev_x[i];
            let mut dy = p.y[i] - p.prev_y[i];
            let d = (dx * dx + dy * dy).sqrt();
            if d > max_vel {
                let s = max_vel / d;
                dx *= s;
                dy *= s;
                p.x[i] = p.prev_x[i] + dx;
                p.y[i] = p.prev_y[i] + dy;
                clamped += 1;
            }
            p.vx[i] = dx * inv_dt;
            p.vy[i] = dy * inv_dt;
        }
        clamped
    }

    fn record_solve(&mut self, stats: SolveStats) {
        let rest = self.constants.rest_density;
        self.metrics.avg_density_ratio = stats.avg_density / rest;
        self.metrics.max_density_ratio = stats.max_density / rest;
    }
}

impl SimulationKernel for PbfKernel {
    fn step_frame(&mut self) -> SimState {
        if !self.state.is_running() {
            return self.state;
        }

        // --- 1. Neighbor search, once per frame ---
        self.hash.rebuild(&self.particles.x, &self.particles.y);
        self.neighbors
            .build(&self.hash, &self.particles.x, &self.particles.y);
        self.metrics.neighbor_pairs = self.neighbors.total_entries();
        trace!(
            particles = self.particles.len(),
            pairs = self.metrics.neighbor_pairs,
            "neighbor list rebuilt"
        );

        let dt = self.params.sub_step_dt();
        let mode = SolverMode {
            unilateral: self.params.unilateral,
            sand: self.params.sand,
        };
        self.metrics.frames += 1;

        for _ in 0..self.params.num_sub_steps.max(1) {
            self.metrics.substeps += 1;

            // --- 2. Predict ---
            self.predict(dt);

            // --- 3. Solve ---
            self.boundaries
                .solve_boundaries(&mut self.particles, self.params.domain_half_width);
            for _ in 0..self.params.num_iters {
                let stats =
                    self.solver
                        .solve(&mut self.particles, &self.neighbors, &self.constants, mode);
                self.record_solve(stats);
            }

            // --- 4. Terminal check ---
            if let Some(wall) = self.boundaries.check_final_walls(&self.particles) {
                self.state = SimState::Stopped { wall };
                info!(
                    wall,
                    frame = self.metrics.frames,
                    substep = self.metrics.substeps,
                    "final wall reached, simulation stopped"
                );
                return self.state;
            }

            // --- 5. Velocity with displacement cap ---
            self.metrics.clamped_particles = self.derive_velocities(dt);

            // --- 6. Viscosity on the frame's neighbor list ---
            if self.params.viscosity != 0.0 {
                apply_viscosity(&mut self.particles, &self.neighbors, self.params.viscosity);
            }
        }

        self.state
    }

    fn reset(&mut self, num_x: usize, num_y: usize) -> bool {
        let count = match num_x.checked_mul(num_y) {
            Some(c) if c <= self.particles.capacity() => c,
            _ => {
                debug!(
                    num_x,
                    num_y,
                    capacity = self.particles.capacity(),
                    "reset rejected, lattice exceeds capacity"
                );
                return false;
            }
        };

        let d = self.constants.particle_diameter;
        let [ox, oy] = self.params.fluid_origin;
        self.particles.clear();
        for j in 0..num_y {
            for i in 0..num_x {
                let jitter = LATTICE_JITTER * (j % 2) as f32;
                let px = ox + i as f32 * d + jitter;
                let py = oy + j as f32 * d;
                self.particles.push_particle(px, py);
            }
        }

        self.hash.reset();
        self.neighbors.clear();
        self.metrics = FrameMetrics::default();
        self.state = SimState::Running;
        info!(num_x, num_y, particles = count, "simulation reset");
        true
    }

    fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    fn view(&self) -> FrameView<'_> {
        FrameView {
            x: &self.particles.x,
            y: &self.particles.y,
            radius: self.constants.particle_radius,
            obstacles: self.boundaries.obstacles(),
            final_walls: self.boundaries.final_walls(),
            state: self.state,
        }
    }

    fn state(&self) -> SimState {
        self.state
    }

    fn metrics(&self) -> FrameMetrics {
        self.metrics
    }
}
