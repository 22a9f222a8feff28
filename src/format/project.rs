//! Native project file.
//!
//! `ProjectData` is a full-fidelity snapshot of a [`ShapeModel`]: categories
//! with their colors, images with their declared sizes and every shape.
//!
//! # Versioning
//!
//! The file uses semantic versioning (MAJOR.MINOR.PATCH). While the major
//! version is 0 the format is unstable and only files with the same minor
//! version are considered compatible; other 0.x files are read with a
//! warning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color_utils::{category_color, from_hex, to_hex};
use crate::format::error::FormatError;
use crate::model::{
    BoundingBox, Category, CategoryId, Geometry, ImageId, ImageInfo, Point, Polygon, Shape,
    ShapeId, ShapeModel,
};

/// Complete project data for the native JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    /// Format version for compatibility checking.
    pub version: String,

    /// Category definitions in creation order.
    pub categories: Vec<CategoryEntry>,

    /// Images with their annotations.
    pub images: Vec<ImageEntry>,

    #[serde(default)]
    pub metadata: ProjectMetadata,
}

impl ProjectData {
    /// Current version of the project data format.
    pub const CURRENT_VERSION: &'static str = "0.1.0";

    /// Major version number for compatibility checking.
    pub const VERSION_MAJOR: u32 = 0;

    /// Minor version number.
    pub const VERSION_MINOR: u32 = 1;

    /// Create a new empty project.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            categories: Vec::new(),
            images: Vec::new(),
            metadata: ProjectMetadata::default(),
        }
    }

    /// Parse a version string into (major, minor, patch) components.
    pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((major, minor, patch))
    }

    /// Check if a version is fully compatible with the current version.
    pub fn is_version_compatible(file_version: &str) -> bool {
        let Some((file_major, file_minor, _)) = Self::parse_version(file_version) else {
            return false;
        };

        if Self::VERSION_MAJOR == 0 {
            file_major == 0 && file_minor == Self::VERSION_MINOR
        } else {
            file_major == Self::VERSION_MAJOR
        }
    }

    /// Check if a file can be read at all, possibly with warnings.
    pub fn is_version_readable(file_version: &str) -> bool {
        Self::parse_version(file_version)
            .is_some_and(|(major, _, _)| major == 0 || major == Self::VERSION_MAJOR)
    }

    /// Get total annotation count across all images.
    pub fn total_annotations(&self) -> usize {
        self.images.iter().map(|i| i.annotations.len()).sum()
    }

    /// Snapshot a model.
    pub fn from_model(model: &ShapeModel) -> Self {
        let mut data = Self::new();
        data.categories = model
            .categories()
            .iter()
            .map(CategoryEntry::from_category)
            .collect();
        data.images = model
            .images()
            .map(|image| ImageEntry {
                id: image.id,
                filename: image.filename.clone(),
                width: image.width,
                height: image.height,
                annotations: model
                    .list_for_image(image.id)
                    .into_iter()
                    .map(AnnotationEntry::from_shape)
                    .collect(),
            })
            .collect();
        data.metadata = ProjectMetadata::now();
        log::debug!(
            "Snapshot: {} categories, {} images, {} annotations",
            data.categories.len(),
            data.images.len(),
            data.total_annotations()
        );
        data
    }

    /// Rebuild a model, keeping every stored id.
    pub fn to_model(&self) -> Result<ShapeModel, FormatError> {
        Self::check_version(&self.version)?;

        let mut model = ShapeModel::new();
        for entry in &self.categories {
            model.insert_category(entry.to_category())?;
        }
        for image in &self.images {
            model.register_image(ImageInfo::new(
                image.id,
                image.filename.clone(),
                image.width,
                image.height,
            ));
        }
        for image in &self.images {
            for annotation in &image.annotations {
                model.insert_shape(annotation.to_shape(image.id))?;
            }
        }
        Ok(model)
    }

    fn check_version(version: &str) -> Result<(), FormatError> {
        if !Self::is_version_readable(version) {
            return Err(FormatError::VersionMismatch {
                expected: Self::CURRENT_VERSION.to_string(),
                found: version.to_string(),
            });
        }
        if !Self::is_version_compatible(version) {
            log::warn!(
                "Project version {} may not be fully compatible with current version {}",
                version,
                Self::CURRENT_VERSION
            );
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let data: Self = serde_json::from_str(json)?;
        Self::check_version(&data.version)?;
        Ok(data)
    }

    /// Read a project file from disk.
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let json = std::fs::read_to_string(path)?;
        let data = Self::from_json(&json)?;
        log::info!(
            "📂 Loaded project {:?}: {} images, {} annotations",
            path,
            data.images.len(),
            data.total_annotations()
        );
        Ok(data)
    }

    /// Write a project file to disk.
    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("💾 Saved project {:?}", path);
        Ok(())
    }
}

impl Default for ProjectData {
    fn default() -> Self {
        Self::new()
    }
}

/// An image with its annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub id: ImageId,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub annotations: Vec<AnnotationEntry>,
}

/// An annotation entry with shape and category information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub id: ShapeId,
    pub category_id: CategoryId,
    pub shape: ShapeEntry,
}

impl AnnotationEntry {
    pub fn from_shape(shape: &Shape) -> Self {
        Self {
            id: shape.id,
            category_id: shape.category_id,
            shape: ShapeEntry::from_geometry(&shape.geometry),
        }
    }

    pub fn to_shape(&self, image_id: ImageId) -> Shape {
        Shape {
            id: self.id,
            category_id: self.category_id,
            image_id,
            geometry: self.shape.to_geometry(),
        }
    }
}

/// Shape types with their coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeEntry {
    /// Bounding box defined by two corners.
    #[serde(rename = "bbox")]
    BoundingBox { x1: f32, y1: f32, x2: f32, y2: f32 },

    /// Single point marker.
    #[serde(rename = "point")]
    Point { x: f32, y: f32 },

    /// Polygon defined by vertices.
    #[serde(rename = "polygon")]
    Polygon { vertices: Vec<(f32, f32)> },
}

impl ShapeEntry {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::BoundingBox(b) => ShapeEntry::BoundingBox {
                x1: b.x1,
                y1: b.y1,
                x2: b.x2,
                y2: b.y2,
            },
            Geometry::Point(p) => ShapeEntry::Point { x: p.x, y: p.y },
            Geometry::Polygon(poly) => ShapeEntry::Polygon {
                vertices: poly.vertices.iter().map(|v| (v.x, v.y)).collect(),
            },
        }
    }

    pub fn to_geometry(&self) -> Geometry {
        match self {
            ShapeEntry::BoundingBox { x1, y1, x2, y2 } => {
                Geometry::BoundingBox(BoundingBox::new(*x1, *y1, *x2, *y2))
            }
            ShapeEntry::Point { x, y } => Geometry::Point(Point::new(*x, *y)),
            ShapeEntry::Polygon { vertices } => Geometry::Polygon(Polygon::new(
                vertices.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            )),
        }
    }
}

/// Category definition. Colors are stored as `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CategoryEntry {
    pub fn from_category(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            color: Some(category.hex_color()),
        }
    }

    /// Convert to a category. A missing or malformed color is replaced by
    /// the name's deterministic color.
    pub fn to_category(&self) -> Category {
        let color = self
            .color
            .as_deref()
            .and_then(from_hex)
            .unwrap_or_else(|| {
                let fallback = category_color(&self.name);
                log::debug!(
                    "Category '{}' has no usable color, using {}",
                    self.name,
                    to_hex(fallback)
                );
                fallback
            });
        Category::new(self.id, &self.name, color)
    }
}

/// Project metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Tool that wrote this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// Save time in seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<u64>,
}

impl ProjectMetadata {
    /// Metadata stamped with the current time.
    pub fn now() -> Self {
        let saved_at = web_time::SystemTime::now()
            .duration_since(web_time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .ok();
        Self {
            created_by: Some(format!("pixmark {}", env!("CARGO_PKG_VERSION"))),
            saved_at,
        }
    }
}
