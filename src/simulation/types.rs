//! Core types for the road network and traffic simulation
//!
//! Ids, lane addressing and the shared tuning constants.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub SimId);

/// A wrapper type for road segment IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub SimId);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub SimId);

impl IntersectionId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl SegmentId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl CarId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

/// Which way a car travels along a segment's curve parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the start intersection towards the end intersection (t grows with distance)
    Forward,
    /// From the end intersection towards the start intersection
    Backward,
}

impl Direction {
    pub fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// Which side of the road surface a lane runs on.
///
/// Each side owns one occupancy slot per intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// Panics on anything but 0 or 1: a bad side index is a caller bug.
    pub fn from_index(index: usize) -> Side {
        match index {
            0 => Side::Left,
            1 => Side::Right,
            _ => panic!("side index {} out of range (expected 0 or 1)", index),
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Address of one of the four lane queues on a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneId {
    pub direction: Direction,
    pub side: Side,
}

impl LaneId {
    pub const COUNT: usize = 4;

    pub const ALL: [LaneId; 4] = [
        LaneId::new(Direction::Forward, Side::Left),
        LaneId::new(Direction::Backward, Side::Left),
        LaneId::new(Direction::Forward, Side::Right),
        LaneId::new(Direction::Backward, Side::Right),
    ];

    pub const fn new(direction: Direction, side: Side) -> Self {
        Self { direction, side }
    }

    /// Queue slot: direction + 2 * side
    pub fn index(self) -> usize {
        self.direction.index() + 2 * self.side.index()
    }

    /// Panics when `index >= 4`.
    pub fn from_index(index: usize) -> LaneId {
        assert!(
            index < Self::COUNT,
            "lane index {} out of range (expected 0..{})",
            index,
            Self::COUNT
        );
        let direction = if index % 2 == 0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        LaneId::new(direction, Side::from_index(index / 2))
    }
}

/// Number of chords used to measure a segment's arc length
pub const SPLINE_RESOLUTION: usize = 20;

/// Default distance between queued cars in world units
pub const CAR_SPACING: f32 = 0.13;

/// Width of an intersection in voxel units
pub const INTERSECTION_SIZE: f32 = 0.5;

/// Half-width of the road surface used for lane offsets
pub const TRACK_RADIUS: f32 = 0.2;

/// Thickness of the road slab; lanes sit on either face
pub const TRACK_THICKNESS: f32 = 0.05;

/// Height a car floats above its lane
pub const CAR_RIDE_HEIGHT: f32 = 0.06;

/// Default top speed in world units per second
pub const MAX_SPEED: f32 = 2.0;

/// Normalized speed gained per second
pub const ACCELERATION: f32 = 2.0;

/// Speed cap per unit of remaining gap to the car ahead
pub const FOLLOWING_GAIN: f32 = 5.0;

/// Slope of the slow-down curve in front of an occupied intersection
pub const APPROACH_SLOPE: f32 = 0.8;

/// Minimum speed cap in front of an occupied intersection
pub const APPROACH_FLOOR: f32 = 0.2;

/// Most segments that can meet at one intersection
pub const MAX_NEIGHBORS: usize = 3;

/// Default RNG seed shared by generation and spawning
pub const DEFAULT_SEED: u64 = 0x6E62_4EB7;
