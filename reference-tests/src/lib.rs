//! Scenario validation framework for the PBF fluid kernel
//!
//! Each reference test loads a JSON scene, drives it through the frame
//! runner, and checks the end state: termination, particle bounds, obstacle
//! containment and density.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use pbf_kernel::{BoundarySet, ParticleStore, SimulationKernel};
use pbf_orchestrator::{create_simulation, RunSummary, RunnerState};

/// Resolve a path relative to the workspace root
pub fn project_path(relative: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .join(relative)
}

/// Expected result criteria for a reference test
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    /// How the run must end
    pub terminal: Option<TerminalCheck>,
    /// Particle position bounds validation
    pub position_bounds: Option<PositionBoundsCheck>,
    /// No particle left deep inside an obstacle
    pub obstacle_containment: Option<ContainmentCheck>,
    /// Average density relative to rest density
    pub density: Option<DensityCheck>,
}

/// Expected end state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCheck {
    /// Must halt on this 1-based final wall position
    Halted(usize),
    /// Must not halt within the frame budget
    NoHalt,
}

/// Check that particles remain within specified bounds
#[derive(Debug, Clone)]
pub struct PositionBoundsCheck {
    /// Minimum allowed position [x, y]
    pub min: [f32; 2],
    /// Maximum allowed position [x, y]
    pub max: [f32; 2],
}

/// Check obstacle penetration
#[derive(Debug, Clone)]
pub struct ContainmentCheck {
    /// Allowed penetration depth below an obstacle's surface
    pub depth_tolerance: f32,
}

/// Check the last frame's average density ratio
#[derive(Debug, Clone)]
pub struct DensityCheck {
    /// Lowest acceptable mean density over rest density
    pub min_avg_ratio: f32,
    /// Highest acceptable mean density over rest density
    pub max_avg_ratio: f32,
}

/// Result of running a reference test
#[derive(Debug)]
pub struct TestResult {
    /// Test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Runner summary
    pub summary: RunSummary,
    /// Particles simulated
    pub particles: usize,
    /// Windowed average frame time, if a window closed
    pub frame_time_ms: Option<f64>,
}

/// Result of an individual validation check
#[derive(Debug)]
pub struct CheckResult {
    /// Check name
    pub name: String,
    /// Whether check passed
    pub passed: bool,
    /// Detail or failure message
    pub message: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message,
        }
    }

    fn fail(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: Some(message),
        }
    }
}

/// A reference test case
pub struct ReferenceTest {
    /// Test name
    pub name: String,
    /// Path to the scene file
    pub config_path: PathBuf,
    /// Frame budget
    pub frames: u64,
    /// Expected results to validate
    pub expected: ExpectedResult,
}

impl ReferenceTest {
    /// Run the reference test and return results
    pub fn run(&self) -> anyhow::Result<TestResult> {
        tracing::info!("Running reference test: {}", self.name);

        let mut runner = create_simulation(&self.config_path)?;
        let summary = runner.run_to_completion(self.frames);
        tracing::info!(
            "Run complete: {} frames, {} sub-steps, state {:?}",
            summary.frames,
            summary.substeps,
            summary.state
        );

        let kernel = runner.kernel();
        let particles = kernel.particles();

        let mut checks = Vec::new();
        if let Some(terminal) = self.expected.terminal {
            checks.push(validate_terminal(&summary, terminal));
        }
        if let Some(ref bounds) = self.expected.position_bounds {
            checks.push(validate_position_bounds(particles, bounds));
        }
        if let Some(ref containment) = self.expected.obstacle_containment {
            checks.push(validate_containment(particles, kernel.boundaries(), containment));
        }
        if let Some(ref density) = self.expected.density {
            checks.push(validate_density(&summary, density));
        }

        Ok(TestResult {
            name: self.name.clone(),
            passed: checks.iter().all(|c| c.passed),
            checks,
            summary,
            particles: particles.len(),
            frame_time_ms: runner.frame_time_ms(),
        })
    }
}

/// Validate how the run ended
fn validate_terminal(summary: &RunSummary, check: TerminalCheck) -> CheckResult {
    const NAME: &str = "Terminal State";
    match (check, summary.state) {
        (TerminalCheck::Halted(expected), RunnerState::Halted { wall }) if wall == expected => {
            CheckResult::pass(
                NAME,
                Some(format!("Halted on wall {} after {} frames", wall, summary.frames)),
            )
        }
        (TerminalCheck::Halted(expected), state) => CheckResult::fail(
            NAME,
            format!("Expected halt on wall {}, got {:?}", expected, state),
        ),
        (TerminalCheck::NoHalt, RunnerState::Halted { wall }) => {
            CheckResult::fail(NAME, format!("Unexpected halt on wall {}", wall))
        }
        (TerminalCheck::NoHalt, state) => CheckResult::pass(NAME, Some(format!("{:?}", state))),
    }
}

/// Validate that particles remain within specified bounds
fn validate_position_bounds(particles: &ParticleStore, bounds: &PositionBoundsCheck) -> CheckResult {
    const NAME: &str = "Position Bounds";
    let mut violations = 0;
    let mut non_finite = 0;
    let mut max_violation = 0.0_f32;

    for i in 0..particles.len() {
        let pos = particles.position(i);
        if !(pos[0].is_finite() && pos[1].is_finite()) {
            non_finite += 1;
            continue;
        }
        for axis in 0..2 {
            if pos[axis] < bounds.min[axis] {
                violations += 1;
                max_violation = max_violation.max(bounds.min[axis] - pos[axis]);
            }
            if pos[axis] > bounds.max[axis] {
                violations += 1;
                max_violation = max_violation.max(pos[axis] - bounds.max[axis]);
            }
        }
    }

    if non_finite > 0 {
        CheckResult::fail(NAME, format!("{} particles have non-finite positions", non_finite))
    } else if violations == 0 {
        CheckResult::pass(NAME, None)
    } else {
        CheckResult::fail(
            NAME,
            format!(
                "{} particles out of bounds (max violation: {:.6})",
                violations, max_violation
            ),
        )
    }
}

/// Validate that no particle sits deeper than the tolerance inside an obstacle
fn validate_containment(
    particles: &ParticleStore,
    boundaries: &BoundarySet,
    check: &ContainmentCheck,
) -> CheckResult {
    const NAME: &str = "Obstacle Containment";
    let mut embedded = 0;
    let mut deepest = 0.0_f32;

    for i in 0..particles.len() {
        let [px, py] = particles.position(i);
        for o in boundaries.obstacles() {
            let r = &o.rect;
            if !r.contains_strictly(px, py) {
                continue;
            }
            let depth = (px - r.left)
                .min(r.right - px)
                .min(py - r.bottom)
                .min(r.top - py);
            deepest = deepest.max(depth);
            if depth > check.depth_tolerance {
                embedded += 1;
            }
        }
    }

    if embedded == 0 {
        CheckResult::pass(NAME, Some(format!("Deepest penetration: {:.6}", deepest)))
    } else {
        CheckResult::fail(
            NAME,
            format!(
                "{} particles embedded (deepest: {:.6}, tolerance: {:.6})",
                embedded, deepest, check.depth_tolerance
            ),
        )
    }
}

/// Validate the average density ratio from the last relaxation pass
fn validate_density(summary: &RunSummary, check: &DensityCheck) -> CheckResult {
    const NAME: &str = "Average Density";
    let ratio = summary.metrics.avg_density_ratio;
    let detail = format!(
        "avg {:.3}, max {:.3} (allowed avg {:.2}..{:.2})",
        ratio, summary.metrics.max_density_ratio, check.min_avg_ratio, check.max_avg_ratio
    );
    if ratio >= check.min_avg_ratio && ratio <= check.max_avg_ratio {
        CheckResult::pass(NAME, Some(detail))
    } else {
        CheckResult::fail(NAME, detail)
    }
}

// ---------------------------------------------------------------------------
// Standard scenarios
// ---------------------------------------------------------------------------

/// Lattice dropped onto a floor-level final wall; a second wall above is never reached.
pub fn floor_wall_test() -> ReferenceTest {
    ReferenceTest {
        name: "Floor Wall Termination".to_string(),
        config_path: project_path("configs/floor-wall.json"),
        frames: 400,
        expected: ExpectedResult {
            terminal: Some(TerminalCheck::Halted(2)),
            position_bounds: Some(PositionBoundsCheck {
                min: [-1.0, 0.0],
                max: [1.0, 1.0],
            }),
            ..ExpectedResult::default()
        },
    }
}

/// Column released against the left wall.
pub fn dam_break_test() -> ReferenceTest {
    ReferenceTest {
        name: "Dam Break".to_string(),
        config_path: project_path("configs/dam-break.json"),
        frames: 150,
        expected: ExpectedResult {
            terminal: Some(TerminalCheck::NoHalt),
            position_bounds: Some(PositionBoundsCheck {
                min: [-1.0, 0.0],
                max: [1.0, 5.0],
            }),
            density: Some(DensityCheck {
                min_avg_ratio: 0.3,
                max_avg_ratio: 1.8,
            }),
            ..ExpectedResult::default()
        },
    }
}

/// Fluid landing on a wide shelf.
pub fn obstacle_shelf_test() -> ReferenceTest {
    ReferenceTest {
        name: "Obstacle Shelf".to_string(),
        config_path: project_path("configs/obstacle-shelf.json"),
        frames: 40,
        expected: ExpectedResult {
            terminal: Some(TerminalCheck::NoHalt),
            position_bounds: Some(PositionBoundsCheck {
                min: [-1.0, 0.0],
                max: [1.0, 1.0],
            }),
            obstacle_containment: Some(ContainmentCheck {
                depth_tolerance: 0.026,
            }),
            ..ExpectedResult::default()
        },
    }
}

/// Granular column in sand mode.
pub fn sand_pile_test() -> ReferenceTest {
    ReferenceTest {
        name: "Sand Pile".to_string(),
        config_path: project_path("configs/sand-pile.json"),
        frames: 120,
        expected: ExpectedResult {
            terminal: Some(TerminalCheck::NoHalt),
            position_bounds: Some(PositionBoundsCheck {
                min: [-1.0, 0.0],
                max: [1.0, 1.0],
            }),
            ..ExpectedResult::default()
        },
    }
}

/// Get all reference tests
pub fn all_tests() -> Vec<ReferenceTest> {
    vec![
        floor_wall_test(),
        dam_break_test(),
        obstacle_shelf_test(),
        sand_pile_test(),
    ]
}

impl TestResult {
    /// Print a summary of the test result
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("Test: {}", self.name);
        println!("{}", "=".repeat(80));
        println!("Status: {}", if self.passed { "PASSED" } else { "FAILED" });
        println!("Particles: {}", self.particles);
        println!("Frames: {}", self.summary.frames);
        println!("Sub-steps: {}", self.summary.substeps);
        println!("End state: {:?}", self.summary.state);
        match self.frame_time_ms {
            Some(ms) => println!("Frame time: {:.3} ms", ms),
            None => println!("Frame time: n/a"),
        }
        println!("\nFrame Metrics:");
        println!("  Avg density ratio: {:.3}", self.summary.metrics.avg_density_ratio);
        println!("  Max density ratio: {:.3}", self.summary.metrics.max_density_ratio);
        println!("  Neighbor pairs: {}", self.summary.metrics.neighbor_pairs);
        println!("  Clamped particles: {}", self.summary.metrics.clamped_particles);
        println!("\nValidation Checks:");
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            print!("  [{}] {}", status, check.name);
            if let Some(ref msg) = check.message {
                print!(" - {}", msg);
            }
            println!();
        }
        println!("{}", "=".repeat(80));
    }
}
