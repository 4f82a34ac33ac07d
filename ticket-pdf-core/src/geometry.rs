//! Basic geometric types for PDF

use std::ops::{Add, Sub};

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin point (0, 0)
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Length of the vector from the origin to this point
    pub fn length(&self) -> f64 {
        self.distance_to(&Point::origin())
    }

    pub fn scale(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A rectangle defined by two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left corner
    pub lower_left: Point,
    /// Upper-right corner
    pub upper_right: Point,
}

impl Rectangle {
    /// Create a new rectangle from two points
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Create a rectangle from position and size
    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Point::new(x, y),
            upper_right: Point::new(x + width, y + height),
        }
    }

    /// Normalizes a PDF rectangle array `[x1 y1 x2 y2]`, whose corners may be
    /// given in any order.
    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            lower_left: Point::new(values[0].min(values[2]), values[1].min(values[3])),
            upper_right: Point::new(values[0].max(values[2]), values[1].max(values[3])),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.lower_left.x,
            self.lower_left.y,
            self.upper_right.x,
            self.upper_right.y,
        ]
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    /// Get the center point
    pub fn center(&self) -> Point {
        Point::new(
            (self.lower_left.x + self.upper_right.x) / 2.0,
            (self.lower_left.y + self.upper_right.y) / 2.0,
        )
    }

    pub fn upper_left(&self) -> Point {
        Point::new(self.lower_left.x, self.upper_right.y)
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.lower_left.x
            && point.x <= self.upper_right.x
            && point.y >= self.lower_left.y
            && point.y <= self.upper_right.y
    }
}

/// An affine map `[a b c d e f]` in PDF's row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformationMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for TransformationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformationMatrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Horizontal shear: `x' = x + factor * y`.
    pub fn shear_x(factor: f64) -> Self {
        Self::new(1.0, 0.0, factor, 1.0, 0.0, 0.0)
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// `self × other`: the resulting map applies `self` first, then `other`.
    ///
    /// The `cm` operator therefore yields `operand.multiply(&ctm)`.
    pub fn multiply(&self, other: &TransformationMatrix) -> TransformationMatrix {
        TransformationMatrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse map, `None` when the matrix is degenerate.
    pub fn invert(&self) -> Option<TransformationMatrix> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        Some(TransformationMatrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    /// Applies only the linear part, for direction vectors.
    pub fn apply_vector(&self, vector: Point) -> Point {
        Point::new(
            self.a * vector.x + self.c * vector.y,
            self.b * vector.x + self.d * vector.y,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn approx_eq(&self, other: &TransformationMatrix, tolerance: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(x, y)| (x - y).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(p.x, 10.0);
        assert_eq!(p.y, 20.0);

        let origin = Point::origin();
        assert_eq!(origin.x, 0.0);
        assert_eq!(origin.y, 0.0);
        assert_eq!(Point::new(3.0, 4.0).length(), 5.0);
        assert_eq!(Point::new(1.0, 1.0) + Point::new(2.0, 3.0), Point::new(3.0, 4.0));
    }

    #[test]
    fn test_rectangle() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), Point::new(110.0, 120.0));

        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 100.0);
        assert_eq!(rect.center(), Point::new(60.0, 70.0));
        assert!(rect.contains(&Point::new(10.0, 120.0)));
        assert!(!rect.contains(&Point::new(9.9, 50.0)));
    }

    #[test]
    fn test_rectangle_from_unordered_array() {
        let rect = Rectangle::from_array([595.0, 842.0, 0.0, 0.0]);
        assert_eq!(rect.lower_left, Point::origin());
        assert_eq!(rect.upper_right, Point::new(595.0, 842.0));
    }

    #[test]
    fn test_multiply_applies_left_operand_first() {
        let scale = TransformationMatrix::scaling(2.0, 2.0);
        let translate = TransformationMatrix::translation(10.0, 0.0);

        let scale_then_translate = scale.multiply(&translate);
        assert_eq!(
            scale_then_translate.apply(Point::new(1.0, 1.0)),
            Point::new(12.0, 2.0)
        );

        let translate_then_scale = translate.multiply(&scale);
        assert_eq!(
            translate_then_scale.apply(Point::new(1.0, 1.0)),
            Point::new(22.0, 2.0)
        );
    }

    #[test]
    fn test_invert() {
        let m = TransformationMatrix::new(2.0, 1.0, -1.0, 3.0, 40.0, -7.5);
        let inverse = m.invert().unwrap();

        assert!(m
            .multiply(&inverse)
            .approx_eq(&TransformationMatrix::identity(), 1e-9));

        let p = Point::new(3.5, -2.0);
        assert!(inverse.apply(m.apply(p)).approx_eq(&p, 1e-9));
    }

    #[test]
    fn test_degenerate_matrix_has_no_inverse() {
        let m = TransformationMatrix::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0);
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let m = TransformationMatrix::rotation(std::f64::consts::FRAC_PI_2);
        assert!(m.apply(Point::new(1.0, 0.0)).approx_eq(&Point::new(0.0, 1.0), 1e-12));
        assert!(m
            .apply_vector(Point::new(0.0, 1.0))
            .approx_eq(&Point::new(-1.0, 0.0), 1e-12));
    }
}
