//! Cubic Bezier evaluation and road surface frames
//!
//! Every road segment is one cubic curve. The "up" direction along it comes
//! from one of three twist modes, each of which rotates the start normal
//! towards the end normal. With equal normals a mode may turn 0 or 360
//! degrees but never 180, or the road surface would flip.

use glam::{Mat3, Quat, Vec2, Vec3};

/// Frames with a shorter `up` or `right` than this are counted as degenerate
pub const DEGENERATE_FRAME_THRESHOLD: f32 = 0.5;

/// Control points of a cubic Bezier curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub start_point: Vec3,
    pub anchor1: Vec3,
    pub anchor2: Vec3,
    pub end_point: Vec3,
}

impl BezierCurve {
    pub fn new(start_point: Vec3, anchor1: Vec3, anchor2: Vec3, end_point: Vec3) -> Self {
        Self {
            start_point,
            anchor1,
            anchor2,
            end_point,
        }
    }

    pub fn evaluate(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        self.start_point * (u * u * u)
            + self.anchor1 * (3.0 * u * u * t)
            + self.anchor2 * (3.0 * u * t * t)
            + self.end_point * (t * t * t)
    }

    /// First derivative with respect to t
    pub fn derivative(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        (self.anchor1 - self.start_point) * (3.0 * u * u)
            + (self.anchor2 - self.anchor1) * (6.0 * u * t)
            + (self.end_point - self.anchor2) * (3.0 * t * t)
    }

    pub fn tangent(&self, t: f32) -> Vec3 {
        self.derivative(t).normalize_or_zero()
    }

    /// Sum of chord lengths over `resolution` even steps of t
    pub fn measure_length(&self, resolution: usize) -> f32 {
        let resolution = resolution.max(1);
        let mut length = 0.0;
        let mut point = self.evaluate(0.0);
        for i in 1..=resolution {
            let next = self.evaluate(i as f32 / resolution as f32);
            length += point.distance(next);
            point = next;
        }
        length
    }
}

/// How the surface normal is interpolated along a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwistMode {
    /// Rotate the start normal around the local tangent
    AroundTangent = 0,
    /// Shortest rotation from the start normal to the end normal
    FromTo = 1,
    /// Rotation taking the start orientation to the end orientation
    Orientation = 2,
}

impl TwistMode {
    pub const ALL: [TwistMode; 3] = [
        TwistMode::AroundTangent,
        TwistMode::FromTo,
        TwistMode::Orientation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The curve plus everything needed to orient its surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwistedCurve {
    pub curve: BezierCurve,
    pub start_normal: Vec3,
    pub end_normal: Vec3,
    pub start_tangent: Vec3,
    pub end_tangent: Vec3,
    pub twist_mode: TwistMode,
}

/// Position and orientation of a road surface at one value of t
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineFrame {
    pub point: Vec3,
    pub tangent: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    /// Twist applied to the start normal at this t
    pub rotation: Quat,
}

impl SplineFrame {
    pub fn is_degenerate(&self) -> bool {
        !(self.up.length() >= DEGENERATE_FRAME_THRESHOLD
            && self.right.length() >= DEGENERATE_FRAME_THRESHOLD)
    }
}

impl TwistedCurve {
    /// Full rotation the selected twist mode reaches at the end of the curve.
    ///
    /// `tangent` is only used by `AroundTangent`.
    pub fn twist(&self, tangent: Vec3) -> Quat {
        if self.start_normal == Vec3::ZERO || self.end_normal == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        match self.twist_mode {
            TwistMode::AroundTangent => {
                if tangent == Vec3::ZERO {
                    return Quat::IDENTITY;
                }
                let angle = signed_angle(self.start_normal, self.end_normal, tangent);
                Quat::from_axis_angle(tangent, angle)
            }
            TwistMode::FromTo => Quat::from_rotation_arc(self.start_normal, self.end_normal),
            TwistMode::Orientation => {
                let start_rotation = look_rotation(self.start_tangent, self.start_normal);
                let end_rotation = look_rotation(-self.end_tangent, self.end_normal);
                (end_rotation * start_rotation.inverse()).normalize()
            }
        }
    }

    pub fn frame(&self, t: f32) -> SplineFrame {
        let point = self.curve.evaluate(t);
        let tangent = self.curve.tangent(t);
        let rotation = Quat::IDENTITY.slerp(self.twist(tangent), smooth_twist(t));
        let up = rotation * self.start_normal;
        let right = tangent.cross(up);
        SplineFrame {
            point,
            tangent,
            up,
            right,
            rotation,
        }
    }

    /// Offset a cross-section point (x = right, y = up) onto the surface at t
    pub fn extrude(&self, offset: Vec2, t: f32) -> (Vec3, SplineFrame) {
        let frame = self.frame(t);
        let point = frame.point + frame.right * offset.x + frame.up * offset.y;
        (point, frame)
    }

    /// Degenerate frames across `resolution + 1` evenly spaced samples
    pub fn degenerate_frames(&self, resolution: usize) -> usize {
        let resolution = resolution.max(1);
        (0..=resolution)
            .filter(|&i| self.frame(i as f32 / resolution as f32).is_degenerate())
            .count()
    }
}

/// Smoothstep of t, stretched slightly past [0, 1] so both ends settle fully
pub fn smooth_twist(t: f32) -> f32 {
    smoothstep(0.0, 1.0, t * 1.02 - 0.01)
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Angle from `from` to `to` in radians, signed by which side of `axis` the turn falls on
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let angle = from.angle_between(to);
    if axis.dot(from.cross(to)) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Rotation taking +Z to `forward` and +Y as close to `up` as possible
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = up.cross(forward).normalize_or_zero();
    if right == Vec3::ZERO {
        right = forward.any_orthonormal_vector();
    }
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}
