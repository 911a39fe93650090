//! Intersection occupancy for the traffic simulation
//!
//! Each intersection has one crossing lock per side of the road surface.

use std::ops::Index;

use super::types::{CarId, Side};

/// Crossing lock for one side of an intersection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideLock {
    /// The car currently crossing on this side (if any)
    pub holder: Option<CarId>,
    /// How long the current holder has had the lock
    pub held_for: f32,
}

impl SideLock {
    pub fn is_occupied(&self) -> bool {
        self.holder.is_some()
    }
}

/// Runtime state of an intersection
#[derive(Debug, Clone, Default)]
pub struct IntersectionState {
    sides: [SideLock; 2],
    /// Time it takes for a car to cross through the intersection
    pub crossing_time: f32,
}

impl IntersectionState {
    pub fn new(crossing_time: f32) -> Self {
        Self {
            sides: [SideLock::default(); 2],
            crossing_time,
        }
    }

    pub fn is_occupied(&self, side: Side) -> bool {
        self.sides[side.index()].is_occupied()
    }

    pub fn holder(&self, side: Side) -> Option<CarId> {
        self.sides[side.index()].holder
    }

    /// Takes the lock for `car` if the side is free.
    /// Returns true only when the flag went from free to held.
    pub fn try_acquire(&mut self, side: Side, car: CarId) -> bool {
        let lock = &mut self.sides[side.index()];
        if lock.is_occupied() {
            return false;
        }
        lock.holder = Some(car);
        lock.held_for = 0.0;
        true
    }

    /// Release the lock if `car` holds it
    pub fn release(&mut self, side: Side, car: CarId) {
        let lock = &mut self.sides[side.index()];
        if lock.holder == Some(car) {
            *lock = SideLock::default();
        }
    }

    /// Advances hold timers and frees sides whose crossing time has passed.
    /// Returns how many sides were released.
    pub fn update_timers(&mut self, delta_time: f32) -> usize {
        let crossing_time = self.crossing_time;
        let mut released = 0;
        for lock in self.sides.iter_mut().filter(|lock| lock.is_occupied()) {
            lock.held_for += delta_time;
            if lock.held_for >= crossing_time {
                *lock = SideLock::default();
                released += 1;
            }
        }
        released
    }
}

/// Raw side access; any index other than 0 or 1 panics.
impl Index<usize> for IntersectionState {
    type Output = SideLock;

    fn index(&self, side: usize) -> &SideLock {
        &self.sides[Side::from_index(side).index()]
    }
}
