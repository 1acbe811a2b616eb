//! Plain 2D geometry used by the markup store and the overlay hit-testing.
//!
//! All coordinates are overlay pixels (f64, y-down).

/// A 2D point in overlay pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point with the given coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate the squared distance to another point.
    /// Using squared distance avoids the sqrt when only comparing.
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Calculate the Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Return this point offset by (dx, dy).
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Total length of a polyline: the sum of the Euclidean distances between
/// consecutive vertices. Zero for fewer than two vertices.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Distance from point `p` to the closed segment `a`..`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab_x = b.x - a.x;
    let ab_y = b.y - a.y;
    let len_sq = ab_x * ab_x + ab_y * ab_y;
    if len_sq == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * ab_x + (p.y - a.y) * ab_y) / len_sq).clamp(0.0, 1.0);
    let closest = Point::new(a.x + ab_x * t, a.y + ab_y * t);
    p.distance(&closest)
}

/// Distance from point `p` to the nearest segment of a polyline.
/// Returns `None` for polylines with fewer than two vertices.
pub fn point_polyline_distance(p: Point, points: &[Point]) -> Option<f64> {
    points
        .windows(2)
        .map(|w| point_segment_distance(p, w[0], w[1]))
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}
