// src/region.rs
//
// Geometric model for regions of interest: axis-aligned rectangles and
// arbitrary closed polygons, with the membership, centroid, and envelope
// operations the density scan and the annotator are built on.

use crate::error::CoreError;

/// A 2D coordinate in canvas/region space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned box given by two corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Builds a normalized rect from two corners in any order.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Closed-interval membership on both axes.
    pub fn contains(&self, p: Point) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Corner sequence for outline drawing, counter-clockwise from min.
    pub fn vertices(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    /// Smallest rect covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// A closed polygon. Consecutive points are segment endpoints and the last
/// point connects back to the first, so the first point is not repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Ray casting (PNPoly / even-odd) membership test.
    ///
    /// Segments may cross; crossing segments partition the plane and the
    /// regions along the perimeter count as inside, interior regions by the
    /// two-coloring of the parity rule. Fewer than three vertices never
    /// contain anything.
    ///
    /// Boundary policy: the crossing test uses half-open vertical intervals
    /// and a strict `p.x < x_intersection` comparison, so a point exactly on
    /// a non-horizontal segment classifies as if displaced infinitesimally
    /// towards +x (on a west-facing boundary it is inside, on an east-facing
    /// one outside). Deterministic, but callers must not rely on any
    /// particular answer for boundary points.
    pub fn contains(&self, p: Point) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let first = self.vertices[0];
        let mut inside = ray_intersects_segment(p, self.vertices[self.vertices.len() - 1], first);
        let mut a = first;
        for &b in &self.vertices[1..] {
            if ray_intersects_segment(p, a, b) {
                inside = !inside;
            }
            a = b;
        }
        inside
    }

    /// Centroid by the shoelace formula.
    ///
    /// Requires a simple polygon with consistent winding. A zero signed area
    /// (collinear or repeated vertices) has no centroid and fails instead of
    /// dividing by zero.
    pub fn centroid(&self) -> Result<Point, CoreError> {
        let n = self.vertices.len();
        if n < 3 {
            return Err(CoreError::UndefinedCentroid);
        }

        let mut signed_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p0 = self.vertices[i];
            let p1 = self.vertices[(i + 1) % n];
            let cross = p0.x * p1.y - p1.x * p0.y;
            signed_area += cross;
            cx += (p0.x + p1.x) * cross;
            cy += (p0.y + p1.y) * cross;
        }

        signed_area *= 0.5;
        if signed_area == 0.0 {
            return Err(CoreError::UndefinedCentroid);
        }

        Ok(Point::new(cx / (6.0 * signed_area), cy / (6.0 * signed_area)))
    }

    /// Component-wise min/max over all vertices. `None` for an empty vertex
    /// list.
    pub fn min_max(&self) -> Option<Rect> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        Some(Rect { min, max })
    }
}

// Segment intersect expression from the PNPoly notes: the horizontal ray
// from p crosses (a, b) iff the segment spans p.y as a half-open interval
// and the ray's x-intersection lies strictly right of p.
fn ray_intersects_segment(p: Point, a: Point, b: Point) -> bool {
    (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
}

/// One region of interest: a rectangle or polygon with its display ordinal
/// and an optional threshold override.
#[derive(Debug, Clone)]
pub struct Region {
    /// 1-based ordinal; drawn into the label.
    pub id: usize,
    pub shape: Shape,
    /// Absolute percentage-empty cutoff overriding the scene profile.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
}

impl Region {
    /// Bounding box used to prune the density scan. `None` only for a
    /// polygon with no vertices.
    pub fn bounding_box(&self) -> Option<Rect> {
        match &self.shape {
            Shape::Rect(r) => Some(*r),
            Shape::Polygon(p) => p.min_max(),
        }
    }

    /// Membership predicate. Rectangles use direct coordinate comparison,
    /// polygons the ray casting test.
    pub fn contains(&self, p: Point) -> bool {
        match &self.shape {
            Shape::Rect(r) => r.contains(p),
            Shape::Polygon(poly) => poly.contains(p),
        }
    }

    /// Vertex sequence for outline drawing; the closing edge back to the
    /// first vertex is implicit. A rectangle degenerates to its four
    /// corners.
    pub fn outline(&self) -> Vec<Point> {
        match &self.shape {
            Shape::Rect(r) => r.vertices().to_vec(),
            Shape::Polygon(p) => p.vertices().to_vec(),
        }
    }
}

/// Envelope of the individual bounding boxes of many regions; restricts the
/// density scan to the area that can matter. `None` when no region has a
/// bounding box.
pub fn min_max_many(regions: &[Region]) -> Option<Rect> {
    regions
        .iter()
        .filter_map(Region::bounding_box)
        .reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ])
    }

    #[test]
    fn test_point_strictly_inside_square() {
        let p = square(10.0);
        assert!(p.contains(Point::new(5.0, 5.0)));
        assert!(p.contains(Point::new(0.5, 9.5)));
    }

    #[test]
    fn test_point_strictly_outside_square() {
        let p = square(10.0);
        assert!(!p.contains(Point::new(10.5, 5.0)));
        assert!(!p.contains(Point::new(-0.1, 5.0)));
        assert!(!p.contains(Point::new(5.0, 11.0)));
    }

    #[test]
    fn test_concave_polygon_notch_is_outside() {
        // U shape: the notch between the prongs is not inside.
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(7.0, 10.0),
            Point::new(7.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(poly.contains(Point::new(1.5, 8.0))); // left prong
        assert!(poly.contains(Point::new(8.5, 8.0))); // right prong
        assert!(poly.contains(Point::new(5.0, 1.5))); // base
        assert!(!poly.contains(Point::new(5.0, 8.0))); // notch
    }

    #[test]
    fn test_self_intersecting_bowtie() {
        // Segments cross at (2, 2); both lobes are perimeter regions.
        let bowtie = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ]);
        assert!(bowtie.contains(Point::new(1.0, 2.0)));
        assert!(bowtie.contains(Point::new(3.0, 2.0)));
        assert!(!bowtie.contains(Point::new(2.0, 3.5)));
        assert!(!bowtie.contains(Point::new(2.0, 0.5)));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let two = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
        assert!(!two.contains(Point::new(5.0, 5.0)));
        assert!(!Polygon::new(vec![]).contains(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_boundary_policy_is_east_displaced() {
        // A point on the west edge counts as inside, on the east edge as
        // outside: boundary points classify as if nudged towards +x.
        let p = square(10.0);
        assert!(p.contains(Point::new(0.0, 5.0)));
        assert!(!p.contains(Point::new(10.0, 5.0)));
    }

    #[test]
    fn test_centroid_of_unit_square() {
        let c = square(1.0).centroid().unwrap();
        assert!((c.x - 0.5).abs() < 1e-12);
        assert!((c.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_winding_independent() {
        let cw = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
        ]);
        let c = cw.centroid().unwrap();
        assert!((c.x - 1.0).abs() < 1e-12);
        assert!((c.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_of_collinear_polygon_is_undefined() {
        let line = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ]);
        assert!(matches!(line.centroid(), Err(CoreError::UndefinedCentroid)));
    }

    #[test]
    fn test_rect_normalizes_swapped_corners() {
        let a = Rect::new(Point::new(1.0, 2.0), Point::new(5.0, 7.0));
        let b = Rect::new(Point::new(5.0, 7.0), Point::new(1.0, 2.0));
        assert_eq!(a, b);
        assert!(b.contains(Point::new(3.0, 4.0)));
    }

    #[test]
    fn test_rect_membership_includes_edges() {
        let r = Rect::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(4.0, 4.0)));
        assert!(!r.contains(Point::new(4.1, 4.0)));
    }

    #[test]
    fn test_min_max_single_region() {
        let region = Region {
            id: 1,
            shape: Shape::Polygon(Polygon::new(vec![
                Point::new(3.0, 9.0),
                Point::new(7.0, 1.0),
                Point::new(5.0, 4.0),
            ])),
            threshold: None,
        };
        let bb = region.bounding_box().unwrap();
        assert_eq!(bb.min, Point::new(3.0, 1.0));
        assert_eq!(bb.max, Point::new(7.0, 9.0));
    }

    #[test]
    fn test_min_max_many_is_envelope() {
        let regions = vec![
            Region {
                id: 1,
                shape: Shape::Rect(Rect::new(Point::new(0.0, 5.0), Point::new(2.0, 8.0))),
                threshold: None,
            },
            Region {
                id: 2,
                shape: Shape::Polygon(Polygon::new(vec![
                    Point::new(10.0, 0.0),
                    Point::new(12.0, 3.0),
                    Point::new(11.0, 1.0),
                ])),
                threshold: None,
            },
        ];
        let envelope = min_max_many(&regions).unwrap();
        assert_eq!(envelope.min, Point::new(0.0, 0.0));
        assert_eq!(envelope.max, Point::new(12.0, 8.0));
    }

    #[test]
    fn test_min_max_many_skips_empty_polygons() {
        let regions = vec![Region {
            id: 1,
            shape: Shape::Polygon(Polygon::new(vec![])),
            threshold: None,
        }];
        assert!(min_max_many(&regions).is_none());
    }
}
