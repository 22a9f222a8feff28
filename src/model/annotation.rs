//! Annotation tool types and data structures.
//!
//! All coordinates are in image space (pixels from the image's top-left
//! corner), independent of zoom and pan.

use serde::{Deserialize, Serialize};

use super::category::CategoryId;

/// Unique identifier for an annotation. Assigned monotonically, so a larger
/// id always means a more recently created shape.
pub type ShapeId = u64;

/// Identifier of an image known to the model.
pub type ImageId = u32;

/// Minimum number of vertices required for an exportable polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Annotation tools available in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnnotationTool {
    /// Selection tool for selecting and moving existing annotations
    #[default]
    Select,
    /// Bounding box annotation tool
    BoundingBox,
    /// Polygon annotation tool
    Polygon,
    /// Point annotation tool
    Point,
}

impl AnnotationTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationTool::Select => "Select",
            AnnotationTool::BoundingBox => "Bounding Box",
            AnnotationTool::Polygon => "Polygon",
            AnnotationTool::Point => "Point",
        }
    }

    /// Check if this tool is a drawing tool (not Select).
    pub fn is_drawing_tool(&self) -> bool {
        !matches!(self, AnnotationTool::Select)
    }
}

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Return this point moved by `(dx, dy)`.
    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned bounding box stored as two corners.
///
/// At rest `x1 <= x2` and `y1 <= y2`; a box being dragged out may hold its
/// corners in raw pointer order until [`BoundingBox::normalized`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a bounding box from two corner points, in any order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self::new(p1.x, p1.y, p2.x, p2.y).normalized()
    }

    /// Reorder the corners so that `x1 <= x2` and `y1 <= y2`.
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }

    /// Get the area of the box.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// The four corners, clockwise from (x1, y1).
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x1, self.y1),
            Point::new(self.x2, self.y1),
            Point::new(self.x2, self.y2),
            Point::new(self.x1, self.y2),
        ]
    }

    /// Check if a point lies inside the box grown by `tolerance` on every side.
    pub fn contains(&self, point: &Point, tolerance: f32) -> bool {
        let b = self.normalized();
        point.x >= b.x1 - tolerance
            && point.x <= b.x2 + tolerance
            && point.y >= b.y1 - tolerance
            && point.y <= b.y2 + tolerance
    }
}

/// A polygon defined by an ordered sequence of vertices. Always treated as
/// closed once committed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Check if the polygon has enough vertices to enclose an area.
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= MIN_POLYGON_VERTICES
    }

    /// Point-in-polygon test using the ray casting algorithm.
    pub fn contains(&self, point: &Point) -> bool {
        if !self.is_valid() {
            return false;
        }

        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];
            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Shortest distance from `point` to any edge of the closed polygon.
    ///
    /// A single-vertex polygon degenerates to point distance.
    pub fn distance_to_edge(&self, point: &Point) -> Option<f32> {
        let n = self.vertices.len();
        match n {
            0 => None,
            1 => Some(self.vertices[0].distance_to(point)),
            _ => (0..n)
                .map(|i| {
                    segment_distance(point, &self.vertices[i], &self.vertices[(i + 1) % n])
                })
                .reduce(f32::min),
        }
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: &Point, a: &Point, b: &Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// Discriminant of [`Geometry`], used where only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[serde(rename = "box")]
    BoundingBox,
    Point,
    Polygon,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::BoundingBox => "box",
            ShapeKind::Point => "point",
            ShapeKind::Polygon => "polygon",
        }
    }
}

/// Variant-specific coordinates of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    #[serde(rename = "box")]
    BoundingBox(BoundingBox),
    Point(Point),
    Polygon(Polygon),
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::BoundingBox(_) => ShapeKind::BoundingBox,
            Geometry::Point(_) => ShapeKind::Point,
            Geometry::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// Iterate over every coordinate pair of this geometry.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Geometry::BoundingBox(b) => vec![Point::new(b.x1, b.y1), Point::new(b.x2, b.y2)],
            Geometry::Point(p) => vec![*p],
            Geometry::Polygon(poly) => poly.vertices.clone(),
        }
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty polygon.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let points = self.points();
        let first = points.first()?;
        let init = (*first, *first);
        Some(points.iter().fold(init, |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    /// Return this geometry moved rigidly by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> Geometry {
        match self {
            Geometry::BoundingBox(b) => {
                Geometry::BoundingBox(BoundingBox::new(b.x1 + dx, b.y1 + dy, b.x2 + dx, b.y2 + dy))
            }
            Geometry::Point(p) => Geometry::Point(p.offset(dx, dy)),
            Geometry::Polygon(poly) => Geometry::Polygon(Polygon::new(
                poly.vertices.iter().map(|v| v.offset(dx, dy)).collect(),
            )),
        }
    }

    /// Canonical at-rest form: boxes get ordered corners.
    pub fn normalized(&self) -> Geometry {
        match self {
            Geometry::BoundingBox(b) => Geometry::BoundingBox(b.normalized()),
            other => other.clone(),
        }
    }

    /// Editable vertices: box corners or polygon vertices. Points have none.
    pub fn handles(&self) -> Vec<Point> {
        match self {
            Geometry::BoundingBox(b) => b.corners().to_vec(),
            Geometry::Point(_) => Vec::new(),
            Geometry::Polygon(poly) => poly.vertices.clone(),
        }
    }

    /// Move the handle at `index` to `to`. Returns `None` if the index is out
    /// of range. Dragging a box corner keeps the opposite corner fixed.
    pub fn with_handle_moved(&self, index: usize, to: Point) -> Option<Geometry> {
        match self {
            Geometry::BoundingBox(b) => {
                let b = b.normalized();
                let moved = match index {
                    0 => BoundingBox::new(to.x, to.y, b.x2, b.y2),
                    1 => BoundingBox::new(b.x1, to.y, to.x, b.y2),
                    2 => BoundingBox::new(b.x1, b.y1, to.x, to.y),
                    3 => BoundingBox::new(to.x, b.y1, b.x2, to.y),
                    _ => return None,
                };
                Some(Geometry::BoundingBox(moved))
            }
            Geometry::Point(_) => None,
            Geometry::Polygon(poly) => {
                let mut vertices = poly.vertices.clone();
                *vertices.get_mut(index)? = to;
                Some(Geometry::Polygon(Polygon::new(vertices)))
            }
        }
    }

    /// Degenerate shapes are kept in the model but skipped at export.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Geometry::BoundingBox(b) => b.area() <= 0.0,
            Geometry::Point(_) => false,
            Geometry::Polygon(poly) => !poly.is_valid(),
        }
    }

    /// Check that every coordinate is finite and polygons have a vertex.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Geometry::Polygon(poly) if poly.vertices.is_empty() => false,
            _ => self.points().iter().all(Point::is_finite),
        }
    }
}

/// A committed annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Unique identifier.
    pub id: ShapeId,
    /// Category ID this annotation belongs to.
    pub category_id: CategoryId,
    /// Image this annotation is drawn on.
    pub image_id: ImageId,
    /// The shape geometry.
    pub geometry: Geometry,
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Whether this shape is written to label files.
    pub fn is_exportable(&self) -> bool {
        !self.geometry.is_degenerate()
    }
}
