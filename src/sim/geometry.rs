//! Circle geometry for the sweep-and-prune pass and the shot resolver
//!
//! Pure functions only. Degenerate inputs (zero-length vectors, coincident
//! centers) produce zero vectors rather than NaNs, so callers must tolerate
//! a zero direction.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A circle: world position plus radius.
///
/// This is also the "position" attribute of every entity, since radius drives
/// both collision size and note class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            radius,
        }
    }

    /// Left edge (`x - radius`), the sort key of the sweep
    #[inline]
    pub fn left(&self) -> f32 {
        self.center.x - self.radius
    }

    /// Right edge (`x + radius`)
    #[inline]
    pub fn right(&self) -> f32 {
        self.center.x + self.radius
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.center.y - self.radius
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.center.y + self.radius
    }
}

/// Result of a circle-circle test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleContact {
    /// Whether the circles overlap
    pub hit: bool,
    /// Displacement that pushes the second circle out of the first
    /// (magnitude = radius sum - distance, direction first -> second)
    pub depenetration: Vec2,
}

impl CircleContact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            depenetration: Vec2::ZERO,
        }
    }
}

/// Unit vector in the direction of `v`, or zero if `v` has no length
#[inline]
pub fn normalize(v: Vec2) -> Vec2 {
    let length = v.length();
    if length == 0.0 { v } else { v / length }
}

/// Unit direction from `from` toward `to` (zero if the points coincide)
#[inline]
pub fn unit_direction(from: Vec2, to: Vec2) -> Vec2 {
    normalize(to - from)
}

/// Clockwise perpendicular in screen space (y grows downward)
#[inline]
pub fn perpendicular_cw(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Rotate a vector by an angle in degrees
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Test two circles for overlap
///
/// Hit iff the center distance is strictly less than the radius sum. When the
/// centers coincide the depenetration direction is undefined and stays zero,
/// so perfectly stacked circles do not separate that frame.
pub fn circle_intersect(a: &Circle, b: &Circle) -> CircleContact {
    let delta = b.center - a.center;
    let distance = delta.length();
    let radius_sum = a.radius + b.radius;

    if distance < radius_sum {
        CircleContact {
            hit: true,
            depenetration: normalize(delta) * (radius_sum - distance),
        }
    } else {
        CircleContact::miss()
    }
}

/// Strict point-in-circle test (boundary points are outside)
#[inline]
pub fn point_in_circle(point: Vec2, circle: &Circle) -> bool {
    point.distance(circle.center) < circle.radius
}
