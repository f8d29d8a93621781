//! Frame runner with lifecycle management
//!
//! The host's scheduler calls [`FrameRunner::tick`] once per display refresh.
//! Each tick advances at most one frame and then hands a [`FrameView`] to the
//! render callback. Everything happens on the caller's thread, so particle
//! injection and boundary edits made between ticks never race a frame.

use std::time::{Duration, Instant};

use pbf_kernel::{FrameMetrics, FrameView, PbfKernel, SimState, SimulationKernel};
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::scene;

/// Frames per timing window.
pub const TIMING_WINDOW: u32 = 11;

/// Runner state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Scene built but lattice not yet placed
    Created,
    /// Frames advance on every tick
    Running,
    /// Ticks render without advancing
    Paused,
    /// Reached `max_frames`
    Finished,
    /// A particle entered a final wall
    Halted {
        /// 1-based position of the wall
        wall: usize,
    },
}

/// Outcome of [`FrameRunner::run_to_completion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// State when the run ended
    pub state: RunnerState,
    /// Frames stepped in this run
    pub frames: u64,
    /// Sub-steps taken since the last reset
    pub substeps: u64,
    /// Kernel statistics from the last frame
    pub metrics: FrameMetrics,
    /// Wall-clock time spent stepping
    pub elapsed: Duration,
}

impl RunSummary {
    /// Terminal wall index, if the run halted on one.
    pub fn halted_wall(&self) -> Option<usize> {
        match self.state {
            RunnerState::Halted { wall } => Some(wall),
            _ => None,
        }
    }
}

/// Windowed average of per-frame stepping time.
#[derive(Debug, Clone, Default)]
struct FrameTiming {
    sum: Duration,
    frames: u32,
    last_avg_ms: Option<f64>,
}

impl FrameTiming {
    /// Record one frame. Returns the new average when a window closes.
    fn record(&mut self, elapsed: Duration) -> Option<f64> {
        self.sum += elapsed;
        self.frames += 1;
        if self.frames < TIMING_WINDOW {
            return None;
        }
        let avg = self.sum.as_secs_f64() * 1000.0 / self.frames as f64;
        self.sum = Duration::ZERO;
        self.frames = 0;
        self.last_avg_ms = Some(avg);
        Some(avg)
    }
}

/// Synchronous driver around a [`PbfKernel`].
pub struct FrameRunner {
    kernel: PbfKernel,
    config: SimulationConfig,
    state: RunnerState,
    frames: u64,
    timing: FrameTiming,
}

impl FrameRunner {
    /// Build the scene described by `config`.
    pub fn from_config(config: SimulationConfig) -> anyhow::Result<Self> {
        let kernel = scene::build_kernel(&config)?;
        Ok(Self::new(kernel, config))
    }

    /// Wrap an already built kernel. `config` supplies the lattice and frame limit.
    pub fn new(kernel: PbfKernel, config: SimulationConfig) -> Self {
        Self {
            kernel,
            config,
            state: RunnerState::Created,
            frames: 0,
            timing: FrameTiming::default(),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Scene configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Underlying kernel
    pub fn kernel(&self) -> &PbfKernel {
        &self.kernel
    }

    /// Mutable kernel access for injection, boundary edits and setters.
    pub fn kernel_mut(&mut self) -> &mut PbfKernel {
        &mut self.kernel
    }

    /// Frames stepped since the last start
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Average milliseconds per frame over the last closed timing window
    pub fn frame_time_ms(&self) -> Option<f64> {
        self.timing.last_avg_ms
    }

    /// Place the lattice and begin running. Also restarts a finished or
    /// halted run. Returns `false` if the lattice does not fit.
    pub fn start(&mut self) -> bool {
        if !scene::place_lattice(&mut self.kernel, &self.config) {
            return false;
        }
        self.frames = 0;
        self.timing = FrameTiming::default();
        self.state = RunnerState::Running;
        info!(scene = %self.config.name, particles = self.kernel.particle_count(), "run started");
        true
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        if self.state == RunnerState::Running {
            self.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == RunnerState::Paused {
            self.state = RunnerState::Running;
        }
    }

    /// Advance one frame if running, then render.
    pub fn tick<F>(&mut self, render: F) -> RunnerState
    where
        F: FnOnce(&FrameView<'_>),
    {
        if self.state == RunnerState::Running {
            self.advance();
        }
        render(&self.kernel.view());
        self.state
    }

    /// Advance one frame without rendering.
    pub fn step(&mut self) -> RunnerState {
        self.tick(|_| {})
    }

    /// Step until the run stops or `limit` frames have been taken in this call,
    /// starting it first if needed. A paused run is resumed.
    pub fn run_to_completion(&mut self, limit: u64) -> RunSummary {
        let started = Instant::now();
        let mut frames = 0;

        match self.state {
            RunnerState::Created | RunnerState::Finished | RunnerState::Halted { .. } => {
                self.start();
            }
            RunnerState::Paused => self.resume(),
            RunnerState::Running => {}
        }

        while self.state == RunnerState::Running && frames < limit {
            self.advance();
            frames += 1;
        }

        RunSummary {
            state: self.state,
            frames,
            substeps: self.kernel.substeps_taken(),
            metrics: self.kernel.metrics(),
            elapsed: started.elapsed(),
        }
    }

    fn advance(&mut self) {
        let t0 = Instant::now();
        let sim_state = self.kernel.step_frame();
        if let Some(avg_ms) = self.timing.record(t0.elapsed()) {
            debug!(avg_ms, frame = self.frames + 1, "frame time");
        }
        self.frames += 1;

        self.state = match sim_state {
            SimState::Stopped { wall } => RunnerState::Halted { wall },
            SimState::Idle => RunnerState::Created,
            SimState::Running => match self.config.max_frames {
                Some(max) if self.frames >= max => {
                    info!(scene = %self.config.name, frames = self.frames, "frame limit reached");
                    RunnerState::Finished
                }
                _ => RunnerState::Running,
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatticeConfig;
    use pbf_kernel::Rect;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::named("runner test");
        config.lattice = LatticeConfig { num_x: 3, num_y: 3 };
        config.params.max_particles = 64;
        config.params.fluid_origin = [0.0, 0.2];
        config
    }

    #[test]
    fn created_runner_does_not_step() {
        let mut runner = FrameRunner::from_config(small_config()).unwrap();
        assert_eq!(runner.step(), RunnerState::Created);
        assert_eq!(runner.frame_count(), 0);
        assert_eq!(runner.kernel().particle_count(), 0);
    }

    #[test]
    fn pause_and_resume() {
        let mut runner = FrameRunner::from_config(small_config()).unwrap();
        assert!(runner.start());
        runner.step();
        runner.pause();
        assert_eq!(runner.step(), RunnerState::Paused);
        assert_eq!(runner.frame_count(), 1);
        runner.resume();
        assert_eq!(runner.step(), RunnerState::Running);
        assert_eq!(runner.frame_count(), 2);
    }

    #[test]
    fn tick_renders_after_stepping() {
        let mut runner = FrameRunner::from_config(small_config()).unwrap();
        runner.start();
        let mut drawn = 0;
        let mut lowest = f32::MAX;
        runner.tick(|view| {
            drawn = view.len();
            lowest = view.y.iter().cloned().fold(f32::MAX, f32::min);
        });
        assert_eq!(drawn, 9);
        assert!(lowest < 0.2);
    }

    #[test]
    fn max_frames_finishes_the_run() {
        let mut config = small_config();
        config.max_frames = Some(5);
        let mut runner = FrameRunner::from_config(config).unwrap();
        let summary = runner.run_to_completion(100);
        assert_eq!(summary.state, RunnerState::Finished);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.substeps, 50);
    }

    #[test]
    fn final_wall_halts_the_run() {
        let mut config = small_config();
        config.final_walls.push(Rect {
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 0.01,
        });
        let mut runner = FrameRunner::from_config(config).unwrap();
        let summary = runner.run_to_completion(500);
        assert_eq!(summary.halted_wall(), Some(1));

        // Halted runs stay put until restarted.
        assert_eq!(runner.step(), RunnerState::Halted { wall: 1 });
        assert!(runner.start());
        assert_eq!(runner.state(), RunnerState::Running);
        assert_eq!(runner.frame_count(), 0);
    }

    #[test]
    fn timing_closes_a_window_every_eleven_frames() {
        let mut timing = FrameTiming::default();
        for _ in 0..TIMING_WINDOW - 1 {
            assert!(timing.record(Duration::from_millis(2)).is_none());
        }
        let avg = timing.record(Duration::from_millis(2)).unwrap();
        assert!((avg - 2.0).abs() < 1e-9);
        assert_eq!(timing.last_avg_ms, Some(avg));
        assert_eq!(timing.frames, 0);
    }
}
