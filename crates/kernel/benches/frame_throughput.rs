//! Frame throughput at increasing lattice sizes.
//!
//! Run with: cargo bench -p pbf-kernel --bench frame_throughput

use std::time::Instant;

use pbf_kernel::{FluidParams, PbfKernel, Rect, SimulationKernel};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    println!("=== PBF Frame Throughput ===\n");

    // (lattice width, lattice height, frames)
    let configs = [(10, 50, 200), (20, 100, 100), (40, 200, 40), (60, 300, 20)];

    println!(
        "{:>10} {:>10} {:>10} {:>12} {:>12}",
        "Particles", "Frames", "Time (s)", "frames/s", "ms/frame"
    );

    for &(nx, ny, frames) in &configs {
        let mut kernel = PbfKernel::new(FluidParams {
            fluid_origin: [-0.8, 0.4],
            ..FluidParams::default()
        });
        kernel.add_obstacle(Rect {
            left: -0.2,
            right: 0.2,
            bottom: 0.0,
            top: 0.3,
        });
        if !kernel.reset(nx, ny) {
            println!("{:>10} skipped, exceeds capacity", nx * ny);
            continue;
        }

        // Warmup
        for _ in 0..5 {
            kernel.step_frame();
        }

        let start = Instant::now();
        for _ in 0..frames {
            kernel.step_frame();
        }
        let elapsed = start.elapsed().as_secs_f64();
        let fps = frames as f64 / elapsed;
        let ms_per_frame = elapsed * 1000.0 / frames as f64;

        println!(
            "{:>10} {:>10} {:>10.3} {:>12.1} {:>12.2}",
            kernel.particle_count(),
            frames,
            elapsed,
            fps,
            ms_per_frame
        );
    }
}
