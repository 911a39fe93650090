//! Tunable inputs for generation and simulation
//!
//! Plain numeric settings. There is no file format; the CLI fills these in.

use anyhow::{ensure, Result};

use super::types::{CAR_SPACING, DEFAULT_SEED, MAX_SPEED};

/// Largest grid edge accepted; extraction keeps an id grid of this size cubed
pub const MAX_VOXEL_COUNT: usize = 256;

/// How long an intersection side stays locked after a car enters it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossingPolicy {
    /// Keep the side locked until the crossing car has had time to clear it
    #[default]
    HoldUntilCleared,
    /// Release the side in the same step the car crosses
    ReleaseSameTick,
}

/// Settings for voxel growth and graph extraction
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Edge length of the cubic voxel grid
    pub voxel_count: usize,
    /// World units per voxel
    pub voxel_size: f32,
    /// Upper bound on growth iterations
    pub max_generation_ticks: u32,
    /// World-space distance between queued cars
    pub car_spacing: f32,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            voxel_count: 60,
            voxel_size: 1.0,
            max_generation_ticks: 500_000,
            car_spacing: CAR_SPACING,
            seed: DEFAULT_SEED,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.voxel_count >= 3,
            "voxel count must be at least 3, got {}",
            self.voxel_count
        );
        ensure!(
            self.voxel_count <= MAX_VOXEL_COUNT,
            "voxel count {} is too large (at most {})",
            self.voxel_count,
            MAX_VOXEL_COUNT
        );
        ensure!(
            self.voxel_size.is_finite() && self.voxel_size > 0.0,
            "voxel size must be positive, got {}",
            self.voxel_size
        );
        ensure!(
            self.car_spacing.is_finite() && self.car_spacing > 0.0,
            "car spacing must be positive, got {}",
            self.car_spacing
        );
        Ok(())
    }
}

/// Settings for the traffic simulation
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Cars to place at startup
    pub car_count: usize,
    /// Top speed in world units per second
    pub car_speed: f32,
    pub crossing_policy: CrossingPolicy,
    pub seed: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            car_count: 2000,
            car_speed: MAX_SPEED,
            crossing_policy: CrossingPolicy::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.car_speed.is_finite() && self.car_speed > 0.0,
            "car speed must be positive, got {}",
            self.car_speed
        );
        Ok(())
    }
}
