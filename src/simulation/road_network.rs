//! Road network graph
//!
//! Intersections and the curved segments between them. Built once by the
//! generator (or by hand in tests) and read-only while traffic runs.

use anyhow::{bail, ensure, Context, Result};
use glam::{IVec3, Vec3};
use log::info;
use ordered_float::OrderedFloat;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use smallvec::SmallVec;

use super::curve::{BezierCurve, TwistMode, TwistedCurve};
use super::types::{
    IntersectionId, SegmentId, SimId, CAR_SPACING, INTERSECTION_SIZE, MAX_NEIGHBORS,
    SPLINE_RESOLUTION,
};

/// A graph node where road segments meet
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    /// Grid coordinate the intersection was grown at
    pub voxel: IVec3,
    pub position: Vec3,
    /// The cardinal axis with no neighbors; `None` for a nonplanar junction
    pub normal: Option<IVec3>,
    neighbors: SmallVec<[SegmentId; MAX_NEIGHBORS]>,
}

impl Intersection {
    pub fn neighbors(&self) -> &[SegmentId] {
        &self.neighbors
    }

    /// Position of `segment` in this intersection's neighbor list
    pub fn index_of(&self, segment: SegmentId) -> Option<usize> {
        self.neighbors.iter().position(|s| *s == segment)
    }
}

/// A curved road between two intersections (a "track spline")
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub id: SegmentId,
    pub start_intersection: IntersectionId,
    pub end_intersection: IntersectionId,
    /// Control points, normals, tangents and twist mode
    pub shape: TwistedCurve,
    pub arc_length: f32,
    /// Cars that fit in one lane
    pub capacity: usize,
}

impl RoadSegment {
    fn new(
        id: SegmentId,
        start: &Intersection,
        start_tangent: IVec3,
        end: &Intersection,
        end_tangent: IVec3,
        voxel_size: f32,
        car_spacing: f32,
    ) -> Self {
        let start_tangent = start_tangent.as_vec3();
        let end_tangent = end_tangent.as_vec3();
        let inset = INTERSECTION_SIZE * 0.5 * voxel_size;

        let start_point = start.position + start_tangent * inset;
        let end_point = end.position + end_tangent * inset;
        let reach = start_point.distance(end_point) * 0.5;
        let curve = BezierCurve::new(
            start_point,
            start_point + start_tangent * reach,
            end_point + end_tangent * reach,
            end_point,
        );

        let mut shape = TwistedCurve {
            curve,
            start_normal: start.normal.map_or(Vec3::ZERO, |n| n.as_vec3()),
            end_normal: end.normal.map_or(Vec3::ZERO, |n| n.as_vec3()),
            start_tangent,
            end_tangent,
            twist_mode: TwistMode::AroundTangent,
        };
        shape.twist_mode = pick_twist_mode(&shape);

        let arc_length = curve.measure_length(SPLINE_RESOLUTION);
        let capacity = capacity_for(arc_length, car_spacing);

        Self {
            id,
            start_intersection: start.id,
            end_intersection: end.id,
            shape,
            arc_length,
            capacity,
        }
    }

    pub fn curve(&self) -> &BezierCurve {
        &self.shape.curve
    }

    pub fn twist_mode(&self) -> TwistMode {
        self.shape.twist_mode
    }

    /// Curve-parameter gap between consecutive cars in one lane
    pub fn lane_spacing(&self) -> f32 {
        1.0 / self.capacity as f32
    }

    /// Degenerate surface frames under the chosen twist mode
    pub fn degenerate_frames(&self) -> usize {
        self.shape.degenerate_frames(SPLINE_RESOLUTION)
    }

    pub fn other_end(&self, intersection: IntersectionId) -> IntersectionId {
        if self.start_intersection == intersection {
            self.end_intersection
        } else {
            self.start_intersection
        }
    }
}

/// ceil(arc_length / car_spacing), never below one car
pub fn capacity_for(arc_length: f32, car_spacing: f32) -> usize {
    ((arc_length / car_spacing).ceil() as usize).max(1)
}

fn pick_twist_mode(shape: &TwistedCurve) -> TwistMode {
    TwistMode::ALL
        .iter()
        .copied()
        .min_by_key(|mode| {
            let candidate = TwistedCurve {
                twist_mode: *mode,
                ..*shape
            };
            (candidate.degenerate_frames(SPLINE_RESOLUTION), mode.index())
        })
        .unwrap_or(TwistMode::AroundTangent)
}

/// Summary of one generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub voxels: usize,
    pub intersections: usize,
    pub segments: usize,
    /// Walks out of an intersection that ended without reaching another
    pub dead_end_walks: usize,
    /// Intersections without exactly one free axis
    pub planarity_violations: usize,
    /// Segments refused because an intersection already had three
    pub rejected_segments: usize,
    /// Degenerate frames summed over all segments
    pub degenerate_frames: usize,
    pub ticks_used: u32,
    pub budget_exhausted: bool,
    pub connected_components: usize,
}

/// Immutable container of intersections and road segments
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    graph: UnGraph<IntersectionId, SegmentId>,
    intersections: Vec<Intersection>,
    segments: Vec<RoadSegment>,
    voxel_size: f32,
    car_spacing: f32,
    pub report: GenerationReport,
}

impl Default for RoadNetwork {
    fn default() -> Self {
        Self::new(1.0, CAR_SPACING)
    }
}

impl RoadNetwork {
    pub fn new(voxel_size: f32, car_spacing: f32) -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            intersections: Vec::new(),
            segments: Vec::new(),
            voxel_size,
            car_spacing,
            report: GenerationReport::default(),
        }
    }

    pub fn car_spacing(&self) -> f32 {
        self.car_spacing
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Adds an intersection at a grid coordinate
    pub fn add_intersection(&mut self, voxel: IVec3, normal: Option<IVec3>) -> IntersectionId {
        let id = IntersectionId(SimId(self.intersections.len()));
        let node = self.graph.add_node(id);
        debug_assert_eq!(node.index(), id.index());
        self.intersections.push(Intersection {
            id,
            voxel,
            position: voxel.as_vec3() * self.voxel_size,
            normal,
            neighbors: SmallVec::new(),
        });
        id
    }

    /// Adds a segment leaving `start` along `start_tangent` and arriving at
    /// `end` from `end_tangent` (both pointing out of their intersection)
    pub fn add_segment(
        &mut self,
        start: IntersectionId,
        start_tangent: IVec3,
        end: IntersectionId,
        end_tangent: IVec3,
    ) -> Result<SegmentId> {
        ensure!(start != end, "Segment cannot loop back to {:?}", start);
        let start_node = self
            .intersections
            .get(start.index())
            .context("Start intersection not found")?;
        let end_node = self
            .intersections
            .get(end.index())
            .context("End intersection not found")?;
        for node in [start_node, end_node] {
            if node.neighbors.len() >= MAX_NEIGHBORS {
                bail!(
                    "Intersection {:?} already has {} segments",
                    node.id,
                    MAX_NEIGHBORS
                );
            }
        }

        let id = SegmentId(SimId(self.segments.len()));
        let segment = RoadSegment::new(
            id,
            start_node,
            start_tangent,
            end_node,
            end_tangent,
            self.voxel_size,
            self.car_spacing,
        );
        self.segments.push(segment);
        self.intersections[start.index()].neighbors.push(id);
        self.intersections[end.index()].neighbors.push(id);
        self.graph.add_edge(
            NodeIndex::new(start.index()),
            NodeIndex::new(end.index()),
            id,
        );
        Ok(id)
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id.index())
    }

    pub fn segment(&self, id: SegmentId) -> Option<&RoadSegment> {
        self.segments.get(id.index())
    }

    /// Segments meeting at an intersection, in discovery order
    pub fn neighbors(&self, id: IntersectionId) -> &[SegmentId] {
        self.intersection(id)
            .map(|i| i.neighbors())
            .unwrap_or(&[])
    }

    pub fn index_of(&self, intersection: IntersectionId, segment: SegmentId) -> Option<usize> {
        self.intersection(intersection)?.index_of(segment)
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Cars that fit in every lane of every segment
    pub fn total_capacity(&self) -> usize {
        self.segments.iter().map(|s| s.capacity * 4).sum()
    }

    /// Shortest and longest segment arc length
    pub fn length_range(&self) -> Option<(f32, f32)> {
        let shortest = self
            .segments
            .iter()
            .map(|s| OrderedFloat(s.arc_length))
            .min()?;
        let longest = self
            .segments
            .iter()
            .map(|s| OrderedFloat(s.arc_length))
            .max()?;
        Some((shortest.0, longest.0))
    }

    pub fn connected_components(&self) -> usize {
        connected_components(&self.graph)
    }

    pub fn log_summary(&self) {
        let report = &self.report;
        info!("=== ROAD NETWORK ===");
        info!("Total intersections: {}", self.intersection_count());
        info!("Total road segments: {}", self.segment_count());
        info!("Connected components: {}", self.connected_components());
        info!("Lane capacity: {} cars", self.total_capacity());
        if let Some((shortest, longest)) = self.length_range() {
            info!("Segment length: {:.2} to {:.2}", shortest, longest);
        }
        info!("Dead-end walks: {}", report.dead_end_walks);
        info!("Planarity violations: {}", report.planarity_violations);
        info!("Degenerate frames: {}", report.degenerate_frames);
    }
}
