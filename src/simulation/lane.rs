//! Lane queues
//!
//! Each segment carries four lanes, one per (direction, side). A lane keeps
//! its cars ordered by decreasing curve parameter, so index 0 is the car
//! closest to the exit.

use std::collections::VecDeque;

use super::car::{step_car, CarState, Constraint};
use super::types::CarId;

/// Tolerance when fitting a car into the last free slot of a lane
const SLOT_EPSILON: f32 = 1e-4;

/// One car's place and motion within its lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEntry {
    pub car: CarId,
    /// Curve parameter in the car's direction of travel (1.0 = exit)
    pub t: f32,
    /// Normalized speed in [0, 1]
    pub speed: f32,
    pub state: CarState,
    /// Place in line at the exit threshold, handed out the first time the
    /// car is held there and cleared when it crosses
    pub waiting_since: Option<u64>,
}

impl QueueEntry {
    pub fn new(car: CarId, t: f32, speed: f32) -> Self {
        Self {
            car,
            t,
            speed,
            state: CarState::Cruising,
            waiting_since: None,
        }
    }
}

/// Ordered cars travelling one (direction, side) of one segment
#[derive(Debug, Clone, Default)]
pub struct LaneQueue {
    entries: VecDeque<QueueEntry>,
    last_in: Option<CarId>,
    last_out: Option<CarId>,
}

/// Segment data a lane needs to advance its cars
#[derive(Debug, Clone, Copy)]
pub struct LaneContext {
    pub arc_length: f32,
    pub lane_spacing: f32,
    pub max_speed: f32,
    /// Whether the intersection this lane runs into is occupied on our side
    pub exit_occupied: bool,
}

impl LaneQueue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn head(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn tail(&self) -> Option<&QueueEntry> {
        self.entries.back()
    }

    pub fn position_of(&self, car: CarId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.car == car)
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// Most recent car to join this lane, cleared when the lane empties
    pub fn last_in(&self) -> Option<CarId> {
        self.last_in
    }

    /// Most recent car to leave this lane
    pub fn last_out(&self) -> Option<CarId> {
        self.last_out
    }

    /// Highest t a newly joining car may take
    pub fn entry_limit(&self, lane_spacing: f32) -> f32 {
        match self.entries.back() {
            Some(tail) => tail.t - lane_spacing,
            None => 1.0 - lane_spacing,
        }
    }

    pub fn has_room(&self, capacity: usize, lane_spacing: f32) -> bool {
        self.entries.len() < capacity && self.entry_limit(lane_spacing) > -SLOT_EPSILON
    }

    /// Appends a car behind the current tail.
    ///
    /// The caller checks `has_room` first; `t` is clamped into the free slot.
    pub fn push_back(&mut self, mut entry: QueueEntry, lane_spacing: f32) {
        entry.t = entry.t.min(self.entry_limit(lane_spacing)).max(0.0);
        self.last_in = Some(entry.car);
        self.entries.push_back(entry);
    }

    /// Removes the car nearest the exit
    pub fn pop_front(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front()?;
        self.last_out = Some(entry.car);
        if self.entries.is_empty() {
            self.last_in = None;
        }
        Some(entry)
    }

    /// Stops the head car at the exit threshold and pulls any follower that
    /// overshot back to one spacing behind the car ahead of it.
    ///
    /// A head that was not waiting yet takes `ticket`; returns whether it did.
    pub fn hold_head(&mut self, lane_spacing: f32, ticket: u64) -> bool {
        let mut took_ticket = false;
        let mut ahead_t: Option<f32> = None;
        for entry in self.entries.iter_mut() {
            match ahead_t {
                None => {
                    entry.t = entry.t.min(1.0);
                    if entry.waiting_since.is_none() {
                        entry.waiting_since = Some(ticket);
                        took_ticket = true;
                    }
                    entry.speed = 0.0;
                    entry.state = CarState::Blocked;
                }
                Some(t) if entry.t > t - lane_spacing => {
                    entry.t = (t - lane_spacing).max(0.0);
                    entry.speed = 0.0;
                    entry.state = CarState::Blocked;
                }
                Some(_) => {}
            }
            ahead_t = Some(entry.t);
        }
        took_ticket
    }

    /// Phase 1 update: moves every car, front to back.
    ///
    /// Each follower is limited by the already-updated t of the car ahead.
    /// Returns how many cars ended up blocked.
    pub fn advance(&mut self, ctx: &LaneContext, dt: f32) -> usize {
        let mut blocked = 0;
        let mut ahead_t: Option<f32> = None;
        for entry in self.entries.iter_mut() {
            let constraint = match ahead_t {
                Some(t) => Constraint::Follow {
                    max_t: t - ctx.lane_spacing,
                },
                None => Constraint::Lead {
                    exit_occupied: ctx.exit_occupied,
                },
            };
            if step_car(entry, constraint, ctx.arc_length, ctx.max_speed, dt) == CarState::Blocked {
                blocked += 1;
            }
            ahead_t = Some(entry.t);
        }
        blocked
    }

    /// True when t never increases from head to tail
    pub fn is_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(ahead, behind)| behind.t <= ahead.t)
    }
}
