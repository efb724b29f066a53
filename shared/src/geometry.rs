//! Pure 2D geometry helpers shared by the client and the server.
//!
//! Angles are in degrees, with 0 pointing "up" (towards increasing y).
//! `calculate_angle` and `vector_2d` use the same sign convention, so
//! walking `vector_2d(a, m)` from a point and measuring the angle back
//! yields `a` again.

/// A point or vector in world coordinates.
pub type Point = (f32, f32);

/// A segment between two points.
pub type Segment = (Point, Point);

/// Tolerance used when deciding whether three points lie on one line.
pub const EPSILON: f32 = 0.005;

/// Angle in degrees, in `[0, 360)`, of the direction from `(sx, sy)` to `(ex, ey)`.
pub fn calculate_angle(sx: f32, sy: f32, ex: f32, ey: f32) -> f32 {
    let rads = (ex - sx).atan2(ey - sy);
    let angle = (-rads.to_degrees()).rem_euclid(360.0);
    // rem_euclid can round tiny negative inputs up to exactly 360.0
    if angle >= 360.0 {
        0.0
    } else {
        angle
    }
}

/// Splits a vector of length `scalar` pointing at `angle` into its x and y parts.
pub fn vector_2d(angle: f32, scalar: f32) -> Point {
    let rad = -angle.to_radians();
    (rad.sin() * scalar, rad.cos() * scalar)
}

/// Point reached by stepping `magnitude` units from `start` towards `target`.
pub fn move_along_vector(start: Point, magnitude: f32, target: Point) -> Point {
    let angle = calculate_angle(start.0, start.1, target.0, target.1);
    let (dx, dy) = vector_2d(angle, magnitude);
    (start.0 + dx, start.1 + dy)
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f32 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Rotates `point` counter-clockwise by `angle` degrees around `center`.
pub fn rotate_point(point: Point, center: Point, angle: f32) -> Point {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (dx, dy) = (point.0 - center.0, point.1 - center.1);
    (
        center.0 + dx * cos - dy * sin,
        center.1 + dx * sin + dy * cos,
    )
}

/// Axis-aligned bounding box of a segment as `(min, max)` corners.
pub fn segment_bounding_box(segment: Segment) -> (Point, Point) {
    let (a, b) = segment;
    ((a.0.min(b.0), a.1.min(b.1)), (a.0.max(b.0), a.1.max(b.1)))
}

/// Returns true when two `(min, max)` boxes overlap, edges included.
pub fn do_boxes_intersect(first: (Point, Point), second: (Point, Point)) -> bool {
    let ((a_min_x, a_min_y), (a_max_x, a_max_y)) = first;
    let ((b_min_x, b_min_y), (b_max_x, b_max_y)) = second;
    a_min_x <= b_max_x && a_max_x >= b_min_x && a_min_y <= b_max_y && a_max_y >= b_min_y
}

/// Orientation of the triple `a, b, c`: true for one winding, false for the
/// other or for colinear points.
pub fn ccw(a: Point, b: Point, c: Point) -> bool {
    let val = (b.1 - a.1) * (c.0 - b.0) - (b.0 - a.0) * (c.1 - b.1);
    val > 0.0
}

/// True when `c` lies on the segment `a`-`b`, within [`EPSILON`].
pub fn is_point_on_segment(a: Point, b: Point, c: Point) -> bool {
    let slack = distance(a, c) + distance(c, b) - distance(a, b);
    -EPSILON < slack && slack < EPSILON
}

/// Segment-segment intersection test.
///
/// Touching and colinear-overlap cases count as intersecting: if any
/// endpoint lies on the other segment the answer is true. The test is
/// symmetric in its two segments.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    if is_point_on_segment(a, b, c)
        || is_point_on_segment(a, b, d)
        || is_point_on_segment(c, d, a)
        || is_point_on_segment(c, d, b)
    {
        return true;
    }

    if !do_boxes_intersect(segment_bounding_box((a, b)), segment_bounding_box((c, d))) {
        return false;
    }

    ccw(a, b, c) != ccw(a, b, d) && ccw(c, d, b) != ccw(c, d, a)
}

/// Even-odd crossing test. The polygon is implicitly closed; fewer than three
/// vertices never contain anything.
pub fn point_in_polygon(x: f32, y: f32, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Boundary segments of a closed polygon, including the closing edge.
pub fn polygon_edges(vertices: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    let count = vertices.len();
    (0..count).map(move |i| (vertices[i], vertices[(i + 1) % count]))
}
