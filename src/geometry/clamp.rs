//! Clamping to image bounds.
//!
//! Applied when a shape is committed, never to drafts.

use crate::model::{BoundingBox, Geometry, Point, Polygon};

/// Clip a coordinate pair to `[0, width] x [0, height]`.
pub fn clamp_to_image(ix: f32, iy: f32, width: f32, height: f32) -> (f32, f32) {
    (ix.clamp(0.0, width.max(0.0)), iy.clamp(0.0, height.max(0.0)))
}

pub fn clamp_point(point: &Point, width: f32, height: f32) -> Point {
    let (x, y) = clamp_to_image(point.x, point.y, width, height);
    Point::new(x, y)
}

/// Clamp every coordinate of `geometry` independently.
pub fn clamp_geometry(geometry: &Geometry, width: f32, height: f32) -> Geometry {
    match geometry {
        Geometry::BoundingBox(b) => {
            let (x1, y1) = clamp_to_image(b.x1, b.y1, width, height);
            let (x2, y2) = clamp_to_image(b.x2, b.y2, width, height);
            Geometry::BoundingBox(BoundingBox::new(x1, y1, x2, y2))
        }
        Geometry::Point(p) => Geometry::Point(clamp_point(p, width, height)),
        Geometry::Polygon(poly) => Geometry::Polygon(Polygon::new(
            poly.vertices
                .iter()
                .map(|v| clamp_point(v, width, height))
                .collect(),
        )),
    }
}

/// Limit a translation so the geometry's bounds stay inside the image.
///
/// The shape stops at the boundary and keeps its size. An axis on which the
/// shape already does not fit is left untranslated.
pub fn clamp_translation(geometry: &Geometry, dx: f32, dy: f32, width: f32, height: f32) -> (f32, f32) {
    let Some((min, max)) = geometry.bounds() else {
        return (dx, dy);
    };
    (
        clamp_axis(dx, -min.x, width - max.x),
        clamp_axis(dy, -min.y, height - max.y),
    )
}

fn clamp_axis(delta: f32, lo: f32, hi: f32) -> f32 {
    if lo <= hi { delta.clamp(lo, hi) } else { 0.0 }
}
