//! Main simulation world that ties everything together
//!
//! Owns a finished road network plus all traffic state: lane queues,
//! intersection locks and cars. `tick` runs the two update phases.

use std::collections::VecDeque;

use anyhow::{bail, ensure, Context, Result};
use glam::Vec4;
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::car::{car_transform, CarFrame, CarState, SimCar};
use super::config::{CrossingPolicy, GeneratorConfig, TrafficConfig};
use super::extract::generate_network;
use super::intersection::IntersectionState;
use super::lane::{LaneContext, LaneQueue, QueueEntry};
use super::road_network::RoadNetwork;
use super::types::{
    CarId, Direction, IntersectionId, LaneId, SegmentId, SimId, INTERSECTION_SIZE,
};

/// The four lanes of one segment, indexed by `LaneId::index`
pub type SegmentLanes = [LaneQueue; LaneId::COUNT];

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Cars that moved onto a new segment
    pub crossings: usize,
    /// Of those, cars that turned around at a dead end
    pub reversals: usize,
    /// Cars held at an intersection threshold
    pub refused: usize,
    /// Cars held back during movement
    pub blocked: usize,
    /// Intersection sides freed by their crossing timer
    pub released: usize,
}

/// Running totals over the whole simulation
#[derive(Debug, Clone, Copy, Default)]
pub struct SimStats {
    pub ticks: u64,
    pub crossings: u64,
    pub reversals: u64,
    pub refused: u64,
}

impl SimStats {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.crossings += report.crossings as u64;
        self.reversals += report.reversals as u64;
        self.refused += report.refused as u64;
    }
}

enum Crossing {
    Crossed { reversed: bool },
    Waiting,
}

/// The main simulation world
pub struct SimWorld {
    /// Static road layout
    network: RoadNetwork,

    pub config: TrafficConfig,

    /// Lane queues, one array per segment
    lanes: Vec<SegmentLanes>,

    /// Occupancy per intersection
    intersections: Vec<IntersectionState>,

    /// All cars, indexed by id
    cars: Vec<SimCar>,

    /// Seeded RNG for spawning and routing
    rng: StdRng,

    /// Next place in line handed to a car held at an exit threshold
    next_ticket: u64,

    /// Simulation time
    pub time: f32,

    pub stats: SimStats,
}

impl SimWorld {
    /// Wraps a finished network with empty traffic state
    pub fn new(network: RoadNetwork, config: TrafficConfig) -> Result<Self> {
        config.validate()?;
        let crossing_time = INTERSECTION_SIZE * network.voxel_size() / config.car_speed;
        let lanes = (0..network.segment_count())
            .map(|_| SegmentLanes::default())
            .collect();
        let intersections = (0..network.intersection_count())
            .map(|_| IntersectionState::new(crossing_time))
            .collect();
        Ok(Self {
            network,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            lanes,
            intersections,
            cars: Vec::new(),
            next_ticket: 0,
            time: 0.0,
            stats: SimStats::default(),
        })
    }

    /// Generates a network and fills it with `traffic.car_count` cars
    pub fn generate(generator: &GeneratorConfig, traffic: TrafficConfig) -> Result<Self> {
        let network = generate_network(generator).context("Failed to generate road network")?;
        let car_count = traffic.car_count;
        let mut world = Self::new(network, traffic)?;
        world.spawn_cars(car_count);
        Ok(world)
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn cars(&self) -> &[SimCar] {
        &self.cars
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.cars.get(id.index())
    }

    pub fn lane(&self, segment: SegmentId, lane: LaneId) -> Option<&LaneQueue> {
        self.lanes.get(segment.index()).map(|lanes| &lanes[lane.index()])
    }

    pub fn intersection_state(&self, id: IntersectionId) -> Option<&IntersectionState> {
        self.intersections.get(id.index())
    }

    /// A car's current queue entry (t, speed, state)
    pub fn car_entry(&self, id: CarId) -> Option<&QueueEntry> {
        let car = self.car(id)?;
        let lane = self.lane(car.segment, car.lane)?;
        lane.entries().find(|entry| entry.car == id)
    }

    fn random_color(&mut self) -> Vec4 {
        Vec4::new(
            self.rng.random::<f32>(),
            self.rng.random::<f32>(),
            self.rng.random::<f32>(),
            1.0,
        )
    }

    fn enqueue(&mut self, segment: SegmentId, lane: LaneId, t: f32, speed: f32) -> Option<CarId> {
        let road = self.network.segment(segment)?;
        let (capacity, spacing) = (road.capacity, road.lane_spacing());
        let queue = &self.lanes[segment.index()][lane.index()];
        if !queue.has_room(capacity, spacing) || t > queue.entry_limit(spacing) + 1e-4 {
            return None;
        }

        let id = CarId(SimId(self.cars.len()));
        let color = self.random_color();
        self.cars.push(SimCar::new(id, segment, lane, color));
        self.lanes[segment.index()][lane.index()].push_back(QueueEntry::new(id, t, speed), spacing);
        Some(id)
    }

    /// Places one car at `t` in a lane.
    ///
    /// Fails when the lane is full or `t` would sit closer than one lane
    /// spacing behind its current tail.
    pub fn spawn_car_at(
        &mut self,
        segment: SegmentId,
        lane: LaneId,
        t: f32,
        speed: f32,
    ) -> Result<CarId> {
        ensure!((0.0..=1.0).contains(&t), "t {} outside [0, 1]", t);
        let road = self
            .network
            .segment(segment)
            .with_context(|| format!("Segment {:?} not found", segment))?;
        let capacity = road.capacity;
        match self.enqueue(segment, lane, t, speed.clamp(0.0, 1.0)) {
            Some(id) => Ok(id),
            None => bail!(
                "Lane {:?} of {:?} has no room at t = {} (capacity {})",
                lane,
                segment,
                t,
                capacity
            ),
        }
    }

    /// Spreads up to `count` cars over random segments.
    /// Returns how many found room.
    pub fn spawn_cars(&mut self, count: usize) -> usize {
        let mut free: Vec<SegmentId> = self.network.segments().iter().map(|s| s.id).collect();
        let mut placed = 0;

        while placed < count && !free.is_empty() {
            let last = free.len() - 1;
            let pick = self.rng.random_range(0..free.len());
            free.swap(pick, last);
            let segment = free[last];

            let speed: f32 = self.rng.random_range(0.4..0.8);
            let spacing = self.network.segments()[segment.index()].lane_spacing();
            let mut added = false;
            for tries in 0..LaneId::COUNT {
                let lane = LaneId::from_index((placed + tries) % LaneId::COUNT);
                let t = self.lanes[segment.index()][lane.index()].entry_limit(spacing);
                if self.enqueue(segment, lane, t, speed).is_some() {
                    added = true;
                    break;
                }
            }

            if added {
                placed += 1;
            } else {
                free.pop();
            }
        }

        if placed < count {
            warn!(
                "Only {} of {} cars fit on the road network",
                placed, count
            );
        } else {
            info!("Spawned {} cars", placed);
        }
        placed
    }

    /// Releases intersection sides whose crossing time has passed
    fn update_intersections(&mut self, delta_secs: f32) -> usize {
        self.intersections
            .iter_mut()
            .map(|state| state.update_timers(delta_secs))
            .sum()
    }

    /// Phase 1: speed and position for every car, in parallel per segment
    fn update_cars(&mut self, delta_secs: f32) -> usize {
        let network = &self.network;
        let intersections = &self.intersections;
        let max_speed = self.config.car_speed;

        self.lanes
            .par_iter_mut()
            .zip(network.segments().par_iter())
            .map(|(lanes, segment)| {
                LaneId::ALL
                    .into_iter()
                    .map(|lane| {
                        let exit = match lane.direction {
                            Direction::Forward => segment.end_intersection,
                            Direction::Backward => segment.start_intersection,
                        };
                        let ctx = LaneContext {
                            arc_length: segment.arc_length,
                            lane_spacing: segment.lane_spacing(),
                            max_speed,
                            exit_occupied: intersections[exit.index()].is_occupied(lane.side),
                        };
                        lanes[lane.index()].advance(&ctx, delta_secs)
                    })
                    .sum::<usize>()
            })
            .sum()
    }

    fn hold_at_threshold(&mut self, segment: SegmentId, lane: LaneId) {
        let spacing = self.network.segments()[segment.index()].lane_spacing();
        if self.lanes[segment.index()][lane.index()].hold_head(spacing, self.next_ticket) {
            self.next_ticket += 1;
        }
    }

    /// Moves the head car of a lane through the intersection it has reached
    fn try_cross(&mut self, segment_id: SegmentId, lane: LaneId, car: CarId) -> Crossing {
        let segment = &self.network.segments()[segment_id.index()];
        let intersection_id = match lane.direction {
            Direction::Forward => segment.end_intersection,
            Direction::Backward => segment.start_intersection,
        };

        // dead ends force u-turns, but otherwise u-turns are not allowed
        let neighbors = self.network.neighbors(intersection_id);
        let next_id = match neighbors.len() {
            0 => None,
            1 => Some(neighbors[0]),
            count => {
                let choice = match self.network.index_of(intersection_id, segment_id) {
                    Some(mine) => {
                        let pick = self.rng.random_range(0..count - 1);
                        if pick >= mine {
                            pick + 1
                        } else {
                            pick
                        }
                    }
                    None => self.rng.random_range(0..count),
                };
                Some(neighbors[choice])
            }
        };
        let Some(next_id) = next_id else {
            self.hold_at_threshold(segment_id, lane);
            return Crossing::Waiting;
        };

        let next = &self.network.segments()[next_id.index()];
        let new_direction = if next.start_intersection == intersection_id {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let new_lane = LaneId::new(new_direction, lane.side);
        let (capacity, spacing) = (next.capacity, next.lane_spacing());

        if self.intersections[intersection_id.index()].is_occupied(lane.side) {
            trace!("{:?} waiting on {:?} ({:?})", car, intersection_id, lane.side);
            self.hold_at_threshold(segment_id, lane);
            return Crossing::Waiting;
        }
        if !self.lanes[next_id.index()][new_lane.index()].has_room(capacity, spacing) {
            trace!("{:?} waiting for room on {:?}", car, next_id);
            self.hold_at_threshold(segment_id, lane);
            return Crossing::Waiting;
        }

        let state = &mut self.intersections[intersection_id.index()];
        if !state.try_acquire(lane.side, car) {
            self.hold_at_threshold(segment_id, lane);
            return Crossing::Waiting;
        }

        let Some(mut entry) = self.lanes[segment_id.index()][lane.index()].pop_front() else {
            state.release(lane.side, car);
            return Crossing::Waiting;
        };
        // leftover t carries over unscaled
        entry.t -= 1.0;
        entry.state = CarState::Crossing;
        entry.waiting_since = None;
        self.lanes[next_id.index()][new_lane.index()].push_back(entry, spacing);

        if let Some(record) = self.cars.get_mut(car.index()) {
            record.segment = next_id;
            record.lane = new_lane;
        }
        if self.config.crossing_policy == CrossingPolicy::ReleaseSameTick {
            self.intersections[intersection_id.index()].release(lane.side, car);
        }

        debug!(
            "{:?} crossed {:?}: {:?} -> {:?} ({:?})",
            car, intersection_id, segment_id, next_id, new_direction
        );
        Crossing::Crossed {
            reversed: next_id == segment_id,
        }
    }

    /// Phase 2: serial segment transitions for every lane head past t = 1
    ///
    /// Heads already waiting go first, in the order they were held. A lane
    /// whose head crossed is retried after everyone who was already in line.
    fn transfer_cars(&mut self, report: &mut TickReport) {
        let mut arrivals: Vec<(u64, SegmentId, LaneId)> = Vec::new();
        for (segment_index, lanes) in self.lanes.iter().enumerate() {
            for lane in LaneId::ALL {
                if let Some(head) = lanes[lane.index()].head().filter(|head| head.t >= 1.0) {
                    let ticket = head.waiting_since.unwrap_or(u64::MAX);
                    arrivals.push((ticket, SegmentId(SimId(segment_index)), lane));
                }
            }
        }
        arrivals.sort_by_key(|&(ticket, segment, lane)| (ticket, segment, lane.index()));

        let mut pending: VecDeque<(SegmentId, LaneId)> = arrivals
            .into_iter()
            .map(|(_, segment, lane)| (segment, lane))
            .collect();
        while let Some((segment_id, lane)) = pending.pop_front() {
            let head = match self.lanes[segment_id.index()][lane.index()].head() {
                Some(head) if head.t >= 1.0 => head.car,
                _ => continue,
            };
            match self.try_cross(segment_id, lane, head) {
                Crossing::Crossed { reversed } => {
                    report.crossings += 1;
                    if reversed {
                        report.reversals += 1;
                    }
                    pending.push_back((segment_id, lane));
                }
                Crossing::Waiting => report.refused += 1,
            }
        }
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) -> TickReport {
        let mut report = TickReport {
            released: self.update_intersections(delta_secs),
            ..Default::default()
        };
        report.blocked = self.update_cars(delta_secs);
        self.transfer_cars(&mut report);

        self.time += delta_secs;
        self.stats.record(&report);
        report
    }

    /// Position, orientation and color of every car, ordered by id
    pub fn car_frames(&self) -> Vec<CarFrame> {
        let mut frames: Vec<CarFrame> = self
            .network
            .segments()
            .iter()
            .zip(&self.lanes)
            .flat_map(|(segment, lanes)| {
                LaneId::ALL.into_iter().flat_map(move |lane| {
                    lanes[lane.index()].entries().map(move |entry| {
                        let (position, rotation) = car_transform(segment, lane, entry.t);
                        (entry.car, position, rotation)
                    })
                })
            })
            .map(|(car, position, rotation)| CarFrame {
                car,
                position,
                rotation,
                color: self.cars[car.index()].color,
            })
            .collect();
        frames.sort_by_key(|frame| frame.car);
        frames
    }

    /// Checks lane capacity, ordering, and that every car sits in exactly
    /// the lane its record names
    pub fn verify_lanes(&self) -> Result<()> {
        let mut seen = vec![false; self.cars.len()];
        for (segment, lanes) in self.network.segments().iter().zip(&self.lanes) {
            for lane in LaneId::ALL {
                let queue = &lanes[lane.index()];
                ensure!(
                    queue.len() <= segment.capacity,
                    "{:?} {:?} holds {} cars, capacity {}",
                    segment.id,
                    lane,
                    queue.len(),
                    segment.capacity
                );
                ensure!(
                    queue.is_ordered(),
                    "{:?} {:?} is out of order",
                    segment.id,
                    lane
                );
                for entry in queue.entries() {
                    let slot = seen
                        .get_mut(entry.car.index())
                        .with_context(|| format!("Unknown car {:?}", entry.car))?;
                    ensure!(!*slot, "{:?} is queued twice", entry.car);
                    *slot = true;
                    let car = &self.cars[entry.car.index()];
                    ensure!(
                        car.segment == segment.id && car.lane == lane,
                        "{:?} is queued on {:?} {:?} but records {:?} {:?}",
                        car.id,
                        segment.id,
                        lane,
                        car.segment,
                        car.lane
                    );
                }
            }
        }
        if let Some(missing) = seen.iter().position(|queued| !queued) {
            bail!("Car {} is not in any lane", missing);
        }
        Ok(())
    }

    /// Number of cars that were held back on the last tick
    pub fn waiting_cars(&self) -> usize {
        self.lanes
            .iter()
            .flat_map(|lanes| lanes.iter())
            .flat_map(|queue| queue.entries())
            .filter(|entry| entry.state == CarState::Blocked)
            .count()
    }

    pub fn log_summary(&self) {
        info!("Simulation time: {:.1}s ({} ticks)", self.time, self.stats.ticks);
        info!("Active cars: {}", self.cars.len());
        info!("Cars waiting: {}", self.waiting_cars());
        info!("Total crossings: {}", self.stats.crossings);
        info!("Dead-end reversals: {}", self.stats.reversals);
        info!("Refused crossings: {}", self.stats.refused);
    }
}
