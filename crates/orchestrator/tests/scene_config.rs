//! Scene configuration parsing, validation and construction.

use pbf_kernel::SimulationKernel;
use pbf_orchestrator::{create_simulation, FrameRunner, RunnerState, SimulationConfig};

fn workspace_path(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

#[test]
fn minimal_json_takes_defaults() {
    let config = SimulationConfig::from_json(r#"{ "name": "minimal" }"#).unwrap();
    assert_eq!(config.lattice.num_x, 10);
    assert_eq!(config.lattice.num_y, 200);
    assert_eq!(config.params.num_sub_steps, 10);
    assert_eq!(config.params.particle_radius, 0.013);
    assert!(config.obstacles.is_empty());
    assert!(config.max_frames.is_none());
}

#[test]
fn partial_params_keep_other_defaults() {
    let json = r#"{
        "name": "partial",
        "params": { "gravity": -3.0, "sand": true },
        "lattice": { "num_x": 4 }
    }"#;
    let config = SimulationConfig::from_json(json).unwrap();
    assert_eq!(config.params.gravity, -3.0);
    assert!(config.params.sand);
    assert!(config.params.unilateral);
    assert_eq!(config.lattice.num_x, 4);
    assert_eq!(config.lattice.num_y, 200);
}

#[test]
fn malformed_json_is_rejected() {
    let err = SimulationConfig::from_json(r#"{ "name": 3 }"#).unwrap_err();
    assert!(format!("{err:#}").contains("parse"));
}

#[test]
fn validation_errors_surface_through_from_json() {
    let json = r#"{
        "name": "thin",
        "obstacles": [ { "left": 0.0, "right": 0.001, "bottom": 0.0, "top": 1.0 } ]
    }"#;
    let err = SimulationConfig::from_json(json).unwrap_err();
    assert!(err.to_string().contains("degenerate"));
}

#[test]
fn missing_file_mentions_path() {
    let err = SimulationConfig::load("no/such/scene.json").unwrap_err();
    assert!(format!("{err:#}").contains("no/such/scene.json"));
}

#[test]
fn config_round_trips_through_serde() {
    let mut config = SimulationConfig::named("round trip");
    config.max_frames = Some(12);
    let json = serde_json::to_string(&config).unwrap();
    let back = SimulationConfig::from_json(&json).unwrap();
    assert_eq!(back.name, "round trip");
    assert_eq!(back.params, config.params);
    assert_eq!(back.max_frames, Some(12));
}

#[test]
fn shipped_scenes_load_and_build() {
    for name in [
        "dam-break.json",
        "floor-wall.json",
        "obstacle-shelf.json",
        "sand-pile.json",
    ] {
        let runner = create_simulation(workspace_path(&format!("configs/{name}")))
            .unwrap_or_else(|e| panic!("{name}: {e:#}"));
        assert_eq!(runner.state(), RunnerState::Created);
    }
}

#[test]
fn floor_wall_scene_halts_on_second_wall() {
    let mut runner = create_simulation(workspace_path("configs/floor-wall.json")).unwrap();
    let summary = runner.run_to_completion(400);
    assert_eq!(summary.state, RunnerState::Halted { wall: 2 });
    assert_eq!(runner.kernel().particle_count(), 50);
}

#[test]
fn injected_particles_join_the_next_frame() {
    let mut config = SimulationConfig::named("inject");
    config.lattice.num_x = 2;
    config.lattice.num_y = 2;
    config.params.max_particles = 5;
    let mut runner = FrameRunner::from_config(config).unwrap();
    assert!(runner.start());

    assert!(runner.kernel_mut().inject_particle(0.5, 0.5));
    assert!(!runner.kernel_mut().inject_particle(0.6, 0.5));
    runner.step();
    assert_eq!(runner.kernel().particle_count(), 5);
    assert_eq!(runner.kernel().neighbors().len(), 5);
    assert!(runner.kernel().particles().y[4] < 0.5);
}
