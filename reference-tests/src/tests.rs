//! Reference scenario integration tests
//!
//! These tests run the standard suite via cargo test, plus a few checks of
//! the validators themselves.

use crate::{
    dam_break_test, floor_wall_test, obstacle_shelf_test, project_path, sand_pile_test,
    validate_containment, validate_position_bounds, validate_terminal, ContainmentCheck,
    ExpectedResult, PositionBoundsCheck, ReferenceTest, TerminalCheck,
};
use pbf_kernel::{BoundarySet, ParticleStore, Rect};
use pbf_orchestrator::{RunSummary, RunnerState};
use std::time::Duration;

fn summary(state: RunnerState) -> RunSummary {
    RunSummary {
        state,
        frames: 10,
        substeps: 100,
        metrics: Default::default(),
        elapsed: Duration::ZERO,
    }
}

fn run_and_assert(test: ReferenceTest) {
    let result = test.run().expect("Test execution failed");
    result.print_summary();
    assert!(result.passed, "{} failed", result.name);
}

#[test]
fn test_floor_wall_termination() {
    run_and_assert(floor_wall_test());
}

#[test]
fn test_dam_break() {
    run_and_assert(dam_break_test());
}

#[test]
fn test_obstacle_shelf() {
    run_and_assert(obstacle_shelf_test());
}

#[test]
fn test_sand_pile() {
    run_and_assert(sand_pile_test());
}

#[test]
fn missing_config_is_an_error() {
    let test = ReferenceTest {
        name: "Missing".to_string(),
        config_path: project_path("configs/does-not-exist.json"),
        frames: 1,
        expected: ExpectedResult::default(),
    };
    let err = test.run().err().expect("missing config should fail");
    assert!(format!("{err:#}").contains("does-not-exist"));
}

#[test]
fn terminal_check_matches_wall_index() {
    let halted = summary(RunnerState::Halted { wall: 2 });
    assert!(validate_terminal(&halted, TerminalCheck::Halted(2)).passed);
    assert!(!validate_terminal(&halted, TerminalCheck::Halted(1)).passed);
    assert!(!validate_terminal(&halted, TerminalCheck::NoHalt).passed);

    let finished = summary(RunnerState::Finished);
    assert!(validate_terminal(&finished, TerminalCheck::NoHalt).passed);
    assert!(!validate_terminal(&finished, TerminalCheck::Halted(1)).passed);
}

#[test]
fn bounds_check_flags_escapes_and_nan() {
    let bounds = PositionBoundsCheck {
        min: [-1.0, 0.0],
        max: [1.0, 1.0],
    };
    let mut particles = ParticleStore::new(3);
    particles.push_particle(0.0, 0.5);
    assert!(validate_position_bounds(&particles, &bounds).passed);

    particles.push_particle(1.5, 0.5);
    assert!(!validate_position_bounds(&particles, &bounds).passed);

    let mut particles = ParticleStore::new(1);
    particles.push_particle(f32::NAN, 0.5);
    let check = validate_position_bounds(&particles, &bounds);
    assert!(!check.passed);
    assert!(check.message.unwrap().contains("non-finite"));
}

#[test]
fn containment_tolerates_shallow_penetration() {
    let mut boundaries = BoundarySet::new();
    boundaries.add_obstacle(Rect {
        left: 0.0,
        right: 1.0,
        bottom: 0.0,
        top: 1.0,
    });
    let check = ContainmentCheck {
        depth_tolerance: 0.05,
    };

    let mut particles = ParticleStore::new(2);
    particles.push_particle(0.5, 0.99);
    assert!(validate_containment(&particles, &boundaries, &check).passed);

    particles.push_particle(0.5, 0.5);
    assert!(!validate_containment(&particles, &boundaries, &check).passed);
}
