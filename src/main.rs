use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use magnetic_roads::simulation::{
    CrossingPolicy, GeneratorConfig, SimWorld, TrafficConfig, CAR_SPACING, DEFAULT_SEED,
    MAX_SPEED,
};

#[derive(Parser)]
#[command(name = "magnetic_roads")]
#[command(about = "Procedural 3D road network with headless traffic simulation")]
struct Cli {
    /// Edge length of the voxel grid
    #[arg(long, default_value = "60")]
    voxels: usize,

    /// World units per voxel
    #[arg(long, default_value = "1.0")]
    voxel_size: f32,

    /// Upper bound on growth iterations
    #[arg(long, default_value = "500000")]
    max_generation_ticks: u32,

    /// World-space gap between queued cars
    #[arg(long, default_value_t = CAR_SPACING)]
    car_spacing: f32,

    /// Number of cars to spawn
    #[arg(long, default_value = "2000")]
    cars: usize,

    /// Top speed in world units per second
    #[arg(long, default_value_t = MAX_SPEED)]
    car_speed: f32,

    /// Seed for generation, spawning and routing
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Free an intersection in the same tick a car crosses it
    #[arg(long)]
    release_same_tick: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let generator = GeneratorConfig {
        voxel_count: cli.voxels,
        voxel_size: cli.voxel_size,
        max_generation_ticks: cli.max_generation_ticks,
        car_spacing: cli.car_spacing,
        seed: cli.seed,
    };
    let traffic = TrafficConfig {
        car_count: cli.cars,
        car_speed: cli.car_speed,
        crossing_policy: if cli.release_same_tick {
            CrossingPolicy::ReleaseSameTick
        } else {
            CrossingPolicy::HoldUntilCleared
        },
        seed: cli.seed,
    };

    run_headless(&generator, traffic, cli.ticks, cli.delta)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(
    generator: &GeneratorConfig,
    traffic: TrafficConfig,
    ticks: u32,
    delta: f32,
) -> Result<()> {
    anyhow::ensure!(
        delta.is_finite() && delta > 0.0,
        "delta must be positive, got {}",
        delta
    );
    info!("Running traffic simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", ticks, delta);

    let mut world = SimWorld::generate(generator, traffic)?;
    world.network().log_summary();

    // Summaries once per simulated second
    let ticks_per_second = (1.0 / delta).ceil() as u32;
    let mut tick = 0;
    while tick < ticks {
        let ticks_to_run = ticks_per_second.min(ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(delta);
        }
        info!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f32 * delta
        );
        world.log_summary();
    }

    world
        .verify_lanes()
        .context("Lane invariants broken at end of run")?;

    info!("=== SIMULATION COMPLETE ===");
    info!("Total intersections: {}", world.network().intersection_count());
    info!("Total road segments: {}", world.network().segment_count());
    world.log_summary();
    Ok(())
}
