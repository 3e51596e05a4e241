//! Geometric primitives shared by the element model and both renderers.
//!
//! This module provides:
//! - [`Point`], the surface-local coordinate pair used everywhere
//! - Proximity testing and center/pivot derivation helpers
//! - Signed angle computation for rotation gestures

use serde::{Deserialize, Serialize};

/// A point in surface-local space.
///
/// Persisted as a plain `[x, y]` array, which is also the shape used by
/// drawing files written by earlier releases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Both coordinates rounded to 2 decimal places (persistence precision).
    pub fn rounded(self) -> Point {
        Point {
            x: (self.x * 100.0).round() / 100.0,
            y: (self.y * 100.0).round() / 100.0,
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// Returns true when `a` and `b` are closer than `threshold`.
pub fn is_near(a: Point, b: Point, threshold: f64) -> bool {
    a.distance_to(b) < threshold
}

/// Arithmetic mean of the vertices. Exact for regular polygons, and the
/// fallback whenever fewer than 3 points are available.
pub fn naive_center(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sum_x / points.len() as f64, sum_y / points.len() as f64)
}

/// Signed-area (shoelace) polygon centroid.
///
/// Degenerate polygons with zero signed area (collinear vertices) fall back
/// to [`naive_center`].
pub fn centroid(points: &[Point]) -> Point {
    if points.len() < 3 {
        return naive_center(points);
    }

    let mut doubled_area = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        let cross = p.x * q.y - q.x * p.y;
        doubled_area += cross;
        sum_x += (p.x + q.x) * cross;
        sum_y += (p.y + q.y) * cross;
    }

    if doubled_area == 0.0 {
        return naive_center(points);
    }
    Point::new(sum_x / (3.0 * doubled_area), sum_y / (3.0 * doubled_area))
}

/// Closed-form point on the cubic Bézier through `p0..p3`, used as a visual
/// rotation pivot for curves.
///
/// Evaluated at t = 1/2, or t = 2/3 when `p0 == p1` (a quadratic drawn as a
/// cubic, where the midpoint parameter sits too close to the start). When the
/// curve has a symmetry axis this is a true center; otherwise it is only a
/// visual approximation.
pub fn curve_center(p0: Point, p1: Point, p2: Point, p3: Point) -> Point {
    if p0 == p1 {
        Point::new(
            (7.0 * p1.x + 12.0 * p2.x + 8.0 * p3.x) / 27.0,
            (7.0 * p1.y + 12.0 * p2.y + 8.0 * p3.y) / 27.0,
        )
    } else {
        Point::new(
            (p0.x + 3.0 * p1.x + 3.0 * p2.x + p3.x) / 8.0,
            (p0.y + 3.0 * p1.y + 3.0 * p2.y + p3.y) / 8.0,
        )
    }
}

/// Angle in (−π, π] between the rays `origin→reference` and `origin→target`.
///
/// The magnitude comes from the clamped arccosine of the normalized dot
/// product; the sign from which side of the reference line the target falls
/// on (positive toward +y). A vertical reference ray is special-cased to
/// avoid the slope division. Zero-length rays yield 0 rather than NaN.
pub fn signed_angle(origin: Point, reference: Point, target: Point) -> f64 {
    let denominator = origin.distance_to(reference) * origin.distance_to(target);
    if denominator == 0.0 {
        return 0.0;
    }

    let dot = (reference.x - origin.x) * (target.x - origin.x)
        + (reference.y - origin.y) * (target.y - origin.y);
    let cos = (dot / denominator).clamp(-1.0, 1.0);
    let mut angle = cos.acos();

    if reference.x == origin.x {
        if target.x > origin.x {
            angle = -angle;
        }
    } else {
        // Reference line: y = slope * x + intercept
        let slope = (reference.y - origin.y) / (reference.x - origin.x);
        let intercept = reference.y - slope * reference.x;
        if target.y < slope * target.x + intercept {
            angle = -angle;
        }
        if reference.x < origin.x {
            angle = -angle;
        }
    }

    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn is_near_uses_strict_threshold() {
        let a = Point::new(0.0, 0.0);
        assert!(is_near(a, Point::new(2.0, 2.0), 3.0));
        assert!(!is_near(a, Point::new(3.0, 0.0), 3.0));
    }

    #[test]
    fn naive_center_averages_vertices() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 4.0)];
        assert_eq!(naive_center(&points), Point::new(5.0, 2.0));
    }

    #[test]
    fn centroid_of_square() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert_eq!(centroid(&points), Point::new(2.0, 2.0));
    }

    #[test]
    fn centroid_falls_back_when_collinear() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ];
        assert_eq!(centroid(&points), naive_center(&points));
    }

    #[test]
    fn curve_center_of_symmetric_cubic_is_on_axis() {
        let center = curve_center(
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert!((center.x - 5.0).abs() < 1e-9);
        assert!((center.y - 7.5).abs() < 1e-9);
    }

    #[test]
    fn curve_center_degenerate_first_control_uses_two_thirds() {
        let p = Point::new(3.0, 3.0);
        let center = curve_center(p, p, Point::new(6.0, 3.0), Point::new(9.0, 3.0));
        assert!((center.x - ((7.0 * 3.0 + 12.0 * 6.0 + 8.0 * 9.0) / 27.0)).abs() < 1e-9);
        assert!((center.y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_quadrant_signs() {
        let origin = Point::new(0.0, 0.0);
        let reference = Point::new(1.0, 0.0);
        let below = signed_angle(origin, reference, Point::new(0.0, 1.0));
        let above = signed_angle(origin, reference, Point::new(0.0, -1.0));
        assert!((below - FRAC_PI_2).abs() < 1e-9);
        assert!((above + FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_vertical_reference() {
        let origin = Point::new(0.0, 0.0);
        let reference = Point::new(0.0, 1.0);
        let angle = signed_angle(origin, reference, Point::new(1.0, 0.0));
        assert!((angle + FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn signed_angle_opposite_ray_is_pi() {
        let origin = Point::new(2.0, 2.0);
        let angle = signed_angle(origin, Point::new(4.0, 2.0), Point::new(0.0, 2.0 + 1e-12));
        assert!((angle.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn signed_angle_guards_zero_length_rays() {
        let origin = Point::new(1.0, 1.0);
        assert_eq!(signed_angle(origin, origin, Point::new(5.0, 5.0)), 0.0);
    }
}
