//! Car movement logic for the traffic simulation
//!
//! Cars move along a segment's curve parameter with a normalized throttle.
//! Followers keep a lane spacing behind the car ahead; the first car in a
//! lane eases off when the intersection it is heading into is occupied.

use glam::{Quat, Vec2, Vec3, Vec4};

use super::curve::look_rotation;
use super::lane::QueueEntry;
use super::road_network::RoadSegment;
use super::types::{
    CarId, Direction, LaneId, SegmentId, ACCELERATION, APPROACH_FLOOR, APPROACH_SLOPE,
    CAR_RIDE_HEIGHT, FOLLOWING_GAIN, TRACK_RADIUS, TRACK_THICKNESS,
};

/// What a car did during the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarState {
    /// Moving freely along its segment
    #[default]
    Cruising,
    /// Held back by the car ahead or an occupied intersection
    Blocked,
    /// Switched onto a new segment
    Crossing,
}

/// What limits a car during Phase 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Someone is ahead; don't pass `max_t`
    Follow { max_t: f32 },
    /// First in line; slow down if the exit intersection is taken
    Lead { exit_occupied: bool },
}

/// A car in the traffic simulation
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    pub segment: SegmentId,
    pub lane: LaneId,
    /// Display color (RGBA)
    pub color: Vec4,
}

impl SimCar {
    pub fn new(id: CarId, segment: SegmentId, lane: LaneId, color: Vec4) -> Self {
        Self {
            id,
            segment,
            lane,
            color,
        }
    }
}

/// Per-tick output for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarFrame {
    pub car: CarId,
    pub position: Vec3,
    pub rotation: Quat,
    pub color: Vec4,
}

/// Advances one car by `dt` under `constraint`.
///
/// Speed ramps up first, t moves with the ramped speed, then the speed is
/// capped for the next tick.
pub fn step_car(
    entry: &mut QueueEntry,
    constraint: Constraint,
    arc_length: f32,
    max_speed: f32,
    dt: f32,
) -> CarState {
    entry.speed = (entry.speed + ACCELERATION * dt).clamp(0.0, 1.0);
    entry.t += entry.speed * max_speed / arc_length * dt;

    let mut approach_speed = 1.0;
    match constraint {
        Constraint::Follow { max_t } => {
            if entry.t > max_t {
                entry.t = max_t;
                entry.speed = 0.0;
                entry.state = CarState::Blocked;
                return entry.state;
            }
            approach_speed = (max_t - entry.t) * FOLLOWING_GAIN;
        }
        Constraint::Lead { exit_occupied } => {
            if exit_occupied {
                approach_speed = (1.0 - entry.t) * APPROACH_SLOPE + APPROACH_FLOOR;
            }
        }
    }

    entry.state = if entry.speed > approach_speed {
        entry.speed = approach_speed.max(0.0);
        CarState::Blocked
    } else {
        CarState::Cruising
    };
    entry.state
}

/// World-space position and orientation of a car at `t` in `lane`
pub fn car_transform(segment: &RoadSegment, lane: LaneId, t: f32) -> (Vec3, Quat) {
    let direction = lane.direction.sign();
    let side = lane.side.sign();
    let curve_t = match lane.direction {
        Direction::Forward => t,
        Direction::Backward => 1.0 - t,
    }
    .clamp(0.0, 1.0);

    let offset = Vec2::new(
        -TRACK_RADIUS * 0.5 * direction * side,
        TRACK_THICKNESS * 0.5 * side,
    );
    let (point, frame) = segment.shape.extrude(offset, curve_t);
    let up = (frame.up * side).normalize_or_zero();
    let position = point + up * CAR_RIDE_HEIGHT;
    let rotation = look_rotation(frame.tangent * direction, up);
    (position, rotation)
}
