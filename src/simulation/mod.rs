//! Road generation and traffic simulation
//!
//! Grows a voxel network, turns it into a graph of curved roads and runs
//! cars over it. Everything here is headless; a renderer only needs
//! `RoadNetwork::segments()` once and `SimWorld::car_frames()` per tick.

mod car;
mod config;
mod curve;
mod extract;
mod intersection;
mod lane;
mod road_network;
mod types;
mod voxel;
mod world;

// Re-export public types for external use
pub use car::{car_transform, step_car, CarFrame, CarState, Constraint, SimCar};
pub use config::{CrossingPolicy, GeneratorConfig, TrafficConfig, MAX_VOXEL_COUNT};
pub use curve::{
    look_rotation, smooth_twist, BezierCurve, SplineFrame, TwistMode, TwistedCurve,
    DEGENERATE_FRAME_THRESHOLD,
};
pub use extract::{extract_network, generate_network, pair_key};
pub use intersection::{IntersectionState, SideLock};
pub use lane::{LaneContext, LaneQueue, QueueEntry};
pub use road_network::{capacity_for, GenerationReport, Intersection, RoadNetwork, RoadSegment};
pub use types::{
    CarId, Direction, IntersectionId, LaneId, SegmentId, Side, SimId, CAR_SPACING,
    DEFAULT_SEED, INTERSECTION_SIZE, MAX_NEIGHBORS, MAX_SPEED, SPLINE_RESOLUTION,
};
pub use voxel::{grow_network, VoxelGrid, VoxelGrowth, CARDINAL_DIRS};
pub use world::{SegmentLanes, SimStats, SimWorld, TickReport};
