//! Road network generation tests

use glam::IVec3;
use magnetic_roads::simulation::{
    capacity_for, generate_network, pair_key, GeneratorConfig, IntersectionId, LaneId,
    RoadNetwork, Side, SimId, MAX_VOXEL_COUNT,
};

fn small_config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        voxel_count: 24,
        max_generation_ticks: 50_000,
        seed,
        ..Default::default()
    }
}

#[test]
fn test_generated_network_has_roads() {
    let network = generate_network(&small_config(7)).expect("generation failed");

    assert!(network.intersection_count() > 0);
    assert!(network.segment_count() > 0);
    assert_eq!(network.report.segments, network.segment_count());
    assert!(network.connected_components() >= 1);
}

#[test]
fn test_segment_capacity() {
    let network = generate_network(&small_config(7)).expect("generation failed");

    for segment in network.segments() {
        assert!(segment.capacity >= 1);
        assert_eq!(
            segment.capacity,
            capacity_for(segment.arc_length, network.car_spacing())
        );
    }
}

#[test]
fn test_generated_intersections_are_planar() {
    for seed in [1, 2, 3] {
        let network = generate_network(&small_config(seed)).expect("generation failed");

        assert_eq!(network.report.planarity_violations, 0);
        for intersection in network.intersections() {
            assert!(intersection.normal.is_some());
            assert!(intersection.neighbors().len() <= 3);
        }
    }
}

#[test]
fn test_generation_is_reproducible() {
    let first = generate_network(&small_config(42)).expect("generation failed");
    let second = generate_network(&small_config(42)).expect("generation failed");

    assert_eq!(first.intersection_count(), second.intersection_count());
    assert_eq!(first.segment_count(), second.segment_count());
    for (a, b) in first.segments().iter().zip(second.segments()) {
        assert_eq!(a.shape, b.shape);
        assert_eq!(a.capacity, b.capacity);
    }
}

#[test]
fn test_segment_neighbors_are_consistent() {
    let network = generate_network(&small_config(7)).expect("generation failed");

    for segment in network.segments() {
        for end in [segment.start_intersection, segment.end_intersection] {
            assert!(network.index_of(end, segment.id).is_some());
        }
        assert_eq!(
            segment.other_end(segment.start_intersection),
            segment.end_intersection
        );
    }
}

#[test]
fn test_invalid_generator_config_rejected() {
    let too_small = GeneratorConfig {
        voxel_count: 2,
        ..Default::default()
    };
    assert!(too_small.validate().is_err());
    assert!(generate_network(&too_small).is_err());

    let bad_spacing = GeneratorConfig {
        car_spacing: 0.0,
        ..Default::default()
    };
    assert!(bad_spacing.validate().is_err());

    let bad_size = GeneratorConfig {
        voxel_size: f32::NAN,
        ..Default::default()
    };
    assert!(bad_size.validate().is_err());

    // The id grid grows with the cube of the edge length
    let too_large = GeneratorConfig {
        voxel_count: MAX_VOXEL_COUNT + 1,
        ..Default::default()
    };
    assert!(too_large.validate().is_err());
    assert!(generate_network(&too_large).is_err());

    let largest = GeneratorConfig {
        voxel_count: MAX_VOXEL_COUNT,
        ..Default::default()
    };
    assert!(largest.validate().is_ok());

    assert!(GeneratorConfig::default().validate().is_ok());
}

#[test]
fn test_pair_key_is_symmetric() {
    let a = IntersectionId(SimId(3));
    let b = IntersectionId(SimId(11));

    assert_eq!(pair_key(a, b), pair_key(b, a));
    assert_ne!(pair_key(a, b), pair_key(a, IntersectionId(SimId(12))));
}

#[test]
fn test_add_segment_rejects_bad_input() {
    let mut network = RoadNetwork::new(1.0, 0.1);
    let center = network.add_intersection(IVec3::ZERO, Some(IVec3::Y));

    // Self loops and unknown ids
    assert!(network
        .add_segment(center, IVec3::X, center, IVec3::NEG_X)
        .is_err());
    assert!(network
        .add_segment(center, IVec3::X, IntersectionId(SimId(99)), IVec3::NEG_X)
        .is_err());

    // A fourth segment on one intersection
    let dirs = [IVec3::X, IVec3::NEG_X, IVec3::Z, IVec3::NEG_Z];
    let mut results = Vec::new();
    for dir in dirs {
        let other = network.add_intersection(dir * 2, Some(IVec3::Y));
        results.push(network.add_segment(center, dir, other, -dir));
    }
    assert!(results[..3].iter().all(|result| result.is_ok()));
    assert!(results[3].is_err());
    assert_eq!(network.neighbors(center).len(), 3);
}

#[test]
fn test_hand_built_segment_geometry() {
    let mut network = RoadNetwork::new(1.0, 0.1);
    let a = network.add_intersection(IVec3::ZERO, Some(IVec3::Y));
    let b = network.add_intersection(IVec3::new(2, 0, 0), Some(IVec3::Y));
    let id = network
        .add_segment(a, IVec3::X, b, IVec3::NEG_X)
        .expect("segment rejected");

    let segment = network.segment(id).expect("segment missing");
    // Inset by half an intersection at both ends
    assert!((segment.arc_length - 1.5).abs() < 1e-4);
    assert_eq!(segment.capacity, capacity_for(segment.arc_length, 0.1));
    assert_eq!(segment.degenerate_frames(), 0);
    assert_eq!(network.total_capacity(), segment.capacity * LaneId::COUNT);
}

#[test]
fn test_lane_index_layout() {
    for (index, lane) in LaneId::ALL.iter().enumerate() {
        assert_eq!(lane.index(), index);
        assert_eq!(LaneId::from_index(index), *lane);
    }
}

#[test]
#[should_panic(expected = "out of range")]
fn test_side_index_out_of_range_panics() {
    Side::from_index(2);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_lane_index_out_of_range_panics() {
    LaneId::from_index(4);
}
