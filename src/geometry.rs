use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Minimum inter-point distance during force computations. Distances below
/// this are floored to avoid division-by-zero singularities.
pub const MIN_DISTANCE: f32 = 0.01;

/// Floor applied to segment lengths so coincident endpoints never divide by
/// zero in compatibility scoring.
const MIN_SEGMENT_LENGTH: f32 = 1e-6;

/// A finite 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn norm(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn norm_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Point) -> f32 {
        (other - self).norm()
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Point {
        let norm = self.norm();
        if norm > 0.0 { self / norm } else { Point::ZERO }
    }

    /// Unit vector orthogonal to this one (rotated a quarter turn
    /// counter-clockwise), or zero for a zero vector.
    pub fn orthogonal(self) -> Point {
        Point::new(-self.y, self.x).normalized()
    }

    /// Angle of the vector in radians, measured from the positive x axis.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn lerp(self, other: Point, fraction: f32) -> Point {
        self + (other - self) * fraction
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Point {
    type Output = Point;

    fn div(self, rhs: f32) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from(value: (f32, f32)) -> Self {
        Point::new(value.0, value.1)
    }
}

/// Read-only view of an edge's straight-line geometry, recomputed per call
/// and used by the bundling compatibility measures.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub p0: Point,
    pub p1: Point,
    pub vector: Point,
    pub length: f32,
    pub unit_vector: Point,
    pub midpoint: Point,
}

impl Segment {
    pub fn new(p0: Point, p1: Point) -> Self {
        let vector = p1 - p0;
        let length = vector.norm().max(MIN_SEGMENT_LENGTH);
        Self {
            p0,
            p1,
            vector,
            length,
            unit_vector: vector / length,
            midpoint: p0 + vector * 0.5,
        }
    }

    /// Orthogonal projection of `point` onto the line extending the segment.
    pub fn project(&self, point: Point) -> Point {
        let t = (point - self.p0).dot(self.vector) / (self.length * self.length);
        self.p0 + self.vector * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_is_unit_and_perpendicular() {
        let v = Point::new(3.0, 4.0);
        let orth = v.orthogonal();
        assert!((orth.norm() - 1.0).abs() < 1e-6);
        assert!(v.dot(orth).abs() < 1e-6);
    }

    #[test]
    fn segment_projection_lands_on_line() {
        let segment = Segment::new(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        let projected = segment.project(Point::new(1.0, 5.0));
        assert!((projected.x - 1.0).abs() < 1e-6);
        assert!(projected.y.abs() < 1e-6);
    }

    #[test]
    fn segment_midpoint_halves_the_chord() {
        let segment = Segment::new(Point::new(1.0, 1.0), Point::new(3.0, 5.0));
        assert!((segment.midpoint.x - 2.0).abs() < 1e-6);
        assert!((segment.midpoint.y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_normalizes_to_zero() {
        assert_eq!(Point::ZERO.normalized(), Point::ZERO);
        assert_eq!(Point::ZERO.orthogonal(), Point::ZERO);
    }
}
