//! Curve and road surface frame tests

use glam::{Vec2, Vec3};
use magnetic_roads::simulation::{
    look_rotation, smooth_twist, BezierCurve, TwistMode, TwistedCurve, SPLINE_RESOLUTION,
};

fn bend(twist_mode: TwistMode, normal: Vec3) -> TwistedCurve {
    // Leaves along +X and arrives from +Y, all in the XY plane
    let start = Vec3::new(0.25, 0.0, 0.0);
    let end = Vec3::new(2.0, 1.75, 0.0);
    let reach = start.distance(end) * 0.5;
    TwistedCurve {
        curve: BezierCurve::new(
            start,
            start + Vec3::X * reach,
            end + Vec3::NEG_Y * reach,
            end,
        ),
        start_normal: normal,
        end_normal: normal,
        start_tangent: Vec3::X,
        end_tangent: Vec3::NEG_Y,
        twist_mode,
    }
}

#[test]
fn test_bezier_hits_its_endpoints() {
    let curve = BezierCurve::new(
        Vec3::new(0.25, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(2.0, 1.0, 0.0),
        Vec3::new(2.0, 1.75, 0.0),
    );

    assert_eq!(curve.evaluate(0.0), curve.start_point);
    assert_eq!(curve.evaluate(1.0), curve.end_point);
}

#[test]
fn test_straight_curve_length() {
    let curve = BezierCurve::new(
        Vec3::ZERO,
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.5, 0.0, 0.0),
    );

    let length = curve.measure_length(SPLINE_RESOLUTION);
    assert!((length - 1.5).abs() < 1e-4, "length was {}", length);
    assert!((curve.tangent(0.5) - Vec3::X).length() < 1e-5);
}

#[test]
fn test_equal_normals_never_flip() {
    for mode in TwistMode::ALL {
        let shape = bend(mode, Vec3::Z);
        for i in 0..=SPLINE_RESOLUTION {
            let t = i as f32 / SPLINE_RESOLUTION as f32;
            let frame = shape.frame(t);
            assert!(
                (frame.up - Vec3::Z).length() < 1e-3,
                "{:?} flipped the surface at t = {}: up = {:?}",
                mode,
                t,
                frame.up
            );
        }
        assert_eq!(shape.degenerate_frames(SPLINE_RESOLUTION), 0);
    }
}

#[test]
fn test_twist_reaches_end_normal() {
    let mut shape = bend(TwistMode::FromTo, Vec3::Z);
    shape.end_normal = Vec3::X;

    let start = shape.frame(0.0);
    let end = shape.frame(1.0);
    assert!((start.up - Vec3::Z).length() < 1e-4);
    assert!((end.up - Vec3::X).length() < 1e-4);
}

#[test]
fn test_missing_normal_disables_twist() {
    let mut shape = bend(TwistMode::Orientation, Vec3::Z);
    shape.end_normal = Vec3::ZERO;

    let frame = shape.frame(0.5);
    assert!((frame.up - Vec3::Z).length() < 1e-5);
}

#[test]
fn test_extrude_offsets_along_frame() {
    let shape = bend(TwistMode::AroundTangent, Vec3::Z);
    let (point, frame) = shape.extrude(Vec2::new(0.0, 0.1), 0.0);

    assert!((point - (frame.point + Vec3::Z * 0.1)).length() < 1e-5);
}

#[test]
fn test_smooth_twist_settles_at_ends() {
    assert_eq!(smooth_twist(0.0), 0.0);
    assert_eq!(smooth_twist(1.0), 1.0);
    assert!((smooth_twist(0.5) - 0.5).abs() < 1e-5);
}

#[test]
fn test_look_rotation_maps_forward_and_up() {
    let rotation = look_rotation(Vec3::X, Vec3::Y);

    assert!((rotation * Vec3::Z - Vec3::X).length() < 1e-5);
    assert!((rotation * Vec3::Y - Vec3::Y).length() < 1e-5);
}
