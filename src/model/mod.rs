//! Data models for annotation projects.

mod annotation;
mod category;
mod store;

pub use annotation::{
    AnnotationTool, BoundingBox, Geometry, ImageId, MIN_POLYGON_VERTICES, Point, Polygon, Shape,
    ShapeId, ShapeKind,
};
pub use category::{Category, CategoryId};
pub use store::{ImageInfo, ShapeModel, ShapeUpdate};
