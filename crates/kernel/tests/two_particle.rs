//! Two-particle density response.
//!
//! A pair closer than the kernel radius is pushed apart only when it is
//! over-dense. Under unilateral mode an under-dense pair is left alone.

use pbf_kernel::{FluidParams, PbfKernel, SimState, SimulationKernel};

/// Kernel with no gravity holding two particles `gap` apart along x.
fn setup_pair(gap_in_kernel_radii: f32, unilateral: bool) -> (PbfKernel, f32) {
    let params = FluidParams {
        gravity: 0.0,
        unilateral,
        max_particles: 2,
        ..FluidParams::default()
    };
    let mut kernel = PbfKernel::new(params);
    assert!(kernel.reset(0, 0));

    let gap = gap_in_kernel_radii * kernel.constants().kernel_radius;
    assert!(kernel.inject_particle(0.0, 0.5));
    assert!(kernel.inject_particle(gap, 0.5));
    (kernel, gap)
}

fn separation(kernel: &PbfKernel) -> f32 {
    let p = kernel.particles();
    let dx = p.x[1] - p.x[0];
    let dy = p.y[1] - p.y[0];
    (dx * dx + dy * dy).sqrt()
}

#[test]
fn half_kernel_pair_is_under_dense() {
    let (kernel, _) = setup_pair(0.5, true);
    let c = kernel.constants();
    let w_self = pbf_kernel::poly6(0.0, c.h2, c.kernel_scale);
    let r = 0.5 * c.kernel_radius;
    let w_pair = pbf_kernel::poly6(r * r, c.h2, c.kernel_scale);
    assert!(
        w_self + w_pair < c.rest_density,
        "rho={} rest={}",
        w_self + w_pair,
        c.rest_density
    );
}

#[test]
fn under_dense_pair_unchanged_under_unilateral() {
    let (mut kernel, gap) = setup_pair(0.5, true);
    assert_eq!(kernel.step_frame(), SimState::Running);

    let p = kernel.particles();
    assert_eq!(p.x[1] - p.x[0], gap);
    assert_eq!(p.y[0], 0.5);
    assert_eq!(p.y[1], 0.5);
    assert!(kernel.solver().lambdas().iter().all(|&l| l == 0.0));
}

#[test]
fn under_dense_pair_attracts_without_unilateral() {
    let (mut kernel, gap) = setup_pair(0.5, false);
    // Over a full frame the pair oscillates about its rest spacing.
    kernel.set_num_sub_steps(1);
    kernel.step_frame();
    let sep = separation(&kernel);
    assert!(sep < gap, "separation {sep} should shrink below {gap}");
}

#[test]
fn over_dense_pair_is_pushed_apart() {
    let (mut kernel, gap) = setup_pair(0.1, true);
    kernel.step_frame();
    let sep = separation(&kernel);
    assert!(sep > gap, "separation {sep} should grow beyond {gap}");

    // Motion stays on the line joining the pair.
    let p = kernel.particles();
    assert!((p.y[0] - 0.5).abs() < 1e-6);
    assert!((p.y[1] - 0.5).abs() < 1e-6);
}

#[test]
fn sand_mode_resolves_overlap_to_contact() {
    let (mut kernel, _) = setup_pair(0.1, true);
    kernel.set_sand(true);
    kernel.step_frame();
    let d = kernel.constants().particle_diameter;
    let sep = separation(&kernel);
    assert!(sep >= d * 0.999, "separation {sep}, diameter {d}");
}
