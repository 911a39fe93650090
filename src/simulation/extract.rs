//! Graph extraction: the second generation pass
//!
//! Reinterprets the voxel layout as intersections joined by chains of plain
//! voxels. Each chain becomes one road segment.

use std::collections::HashSet;

use anyhow::Result;
use glam::IVec3;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::GeneratorConfig;
use super::road_network::{GenerationReport, RoadNetwork};
use super::types::IntersectionId;
use super::voxel::{grow_network, VoxelGrid, VoxelGrowth, CARDINAL_DIRS};

/// Grows and extracts a complete network from `config`
pub fn generate_network(config: &GeneratorConfig) -> Result<RoadNetwork> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let growth = grow_network(config, &mut rng);
    Ok(extract_network(&growth, config, &mut rng))
}

/// Symmetric key for an unordered intersection pair
pub fn pair_key(a: IntersectionId, b: IntersectionId) -> u64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    ((low.index() as u64) << 32) | (high.index() as u64 & 0xFFFF_FFFF)
}

struct Connection {
    start: IntersectionId,
    start_tangent: IVec3,
    end: IntersectionId,
    end_tangent: IVec3,
}

/// Walks from an intersection along `dir` until another intersection is hit.
///
/// Returns the intersection found and the direction pointing back out of it
/// along the chain, or `None` at a dead end.
fn find_first_intersection(
    voxels: &VoxelGrid<bool>,
    grid: &VoxelGrid<Option<IntersectionId>>,
    start: IVec3,
    mut dir: IVec3,
) -> Option<(IntersectionId, IVec3)> {
    let max_steps = voxels.size().pow(3);
    let mut pos = start;
    for _ in 0..max_steps {
        pos += dir;
        if let Some(Some(found)) = grid.get(pos) {
            return Some((*found, -dir));
        }
        if !voxels.occupied(pos + dir, false) {
            dir = CARDINAL_DIRS
                .iter()
                .copied()
                .find(|turn| *turn != dir && *turn != -dir && voxels.occupied(pos + *turn, false))?;
        }
    }
    debug!("Walk from {:?} never reached an intersection", start);
    None
}

/// The one axis without neighbors, or `None` for zero or several such axes
fn free_axis(voxels: &VoxelGrid<bool>, pos: IVec3) -> Option<usize> {
    let mut tally = IVec3::ZERO;
    for dir in CARDINAL_DIRS {
        if voxels.occupied(pos + dir, false) {
            tally += dir.abs();
        }
    }
    let mut free = (0..3).filter(|axis| tally[*axis] == 0);
    match (free.next(), free.next()) {
        (Some(axis), None) => Some(axis),
        _ => None,
    }
}

/// Converts a grown voxel layout into a road network
pub fn extract_network<R: Rng>(
    growth: &VoxelGrowth,
    config: &GeneratorConfig,
    rng: &mut R,
) -> RoadNetwork {
    let voxels = &growth.voxels;
    let mut report = GenerationReport {
        voxels: voxels.occupied_count(),
        ticks_used: growth.ticks_used,
        budget_exhausted: growth.budget_exhausted,
        ..Default::default()
    };

    let mut grid = VoxelGrid::<Option<IntersectionId>>::new(voxels.size());
    let mut network = RoadNetwork::new(config.voxel_size, config.car_spacing);

    for &voxel in &growth.intersections {
        let normal = match free_axis(voxels, voxel) {
            Some(axis) => {
                let mut normal = IVec3::ZERO;
                normal[axis] = if rng.random_bool(0.5) { 1 } else { -1 };
                Some(normal)
            }
            None => {
                error!("Nonplanar intersection at {:?}", voxel);
                report.planarity_violations += 1;
                None
            }
        };
        let id = network.add_intersection(voxel, normal);
        grid.set(voxel, Some(id));
    }

    let mut pairs = HashSet::new();
    let mut connections = Vec::new();
    for intersection in network.intersections() {
        for dir in CARDINAL_DIRS {
            if !voxels.occupied(intersection.voxel + dir, false) {
                continue;
            }
            match find_first_intersection(voxels, &grid, intersection.voxel, dir) {
                Some((neighbor, arrival)) if neighbor != intersection.id => {
                    if pairs.insert(pair_key(intersection.id, neighbor)) {
                        connections.push(Connection {
                            start: intersection.id,
                            start_tangent: dir,
                            end: neighbor,
                            end_tangent: arrival,
                        });
                    }
                }
                Some(_) => {}
                None => {
                    debug!("Dead end leaving {:?} along {:?}", intersection.id, dir);
                    report.dead_end_walks += 1;
                }
            }
        }
    }

    for connection in connections {
        if let Err(e) = network.add_segment(
            connection.start,
            connection.start_tangent,
            connection.end,
            connection.end_tangent,
        ) {
            error!("Dropping segment: {:#}", e);
            report.rejected_segments += 1;
        }
    }

    report.intersections = network.intersection_count();
    report.segments = network.segment_count();
    report.degenerate_frames = network
        .segments()
        .iter()
        .map(|segment| segment.degenerate_frames())
        .sum();
    report.connected_components = network.connected_components();

    info!(
        "Extracted {} intersections and {} road segments",
        report.intersections, report.segments
    );
    network.report = report;
    network
}
