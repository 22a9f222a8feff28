//! The shape model: sole owner of category, image and shape records.
//!
//! Every mutation validates first and writes second, so a rejected call
//! leaves the model exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::annotation::{Geometry, ImageId, Point, Shape, ShapeId};
use super::category::{Category, CategoryId};
use crate::error::EditError;
use crate::geometry::{clamp_geometry, clamp_translation};

/// Declared dimensions of an image, as provided by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: ImageId,
    /// Original filename; its stem names the exported label file.
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(id: ImageId, filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id,
            filename: filename.into(),
            width,
            height,
        }
    }

    /// Filename without its extension.
    pub fn stem(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.filename)
    }

    /// Width and height as floats, for normalization and clamping.
    pub fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }
}

/// A change applied to a single shape by [`ShapeModel::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeUpdate {
    /// Replace the geometry wholesale (same kind or not).
    Geometry(Geometry),
    /// Move rigidly; the move stops at the image boundary.
    Translate { dx: f32, dy: f32 },
    /// Move one box corner or polygon vertex.
    MoveVertex { index: usize, to: Point },
    /// Reassign the category.
    Category(CategoryId),
}

/// Category, image and shape records for a project.
#[derive(Debug, Clone)]
pub struct ShapeModel {
    /// Categories in creation order; the index is the exported class id.
    categories: Vec<Category>,
    next_category_id: CategoryId,
    images: BTreeMap<ImageId, ImageInfo>,
    /// Keyed by id, which is also creation order.
    shapes: BTreeMap<ShapeId, Shape>,
    next_shape_id: ShapeId,
}

impl Default for ShapeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeModel {
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
            next_category_id: 1,
            images: BTreeMap::new(),
            shapes: BTreeMap::new(),
            next_shape_id: 1,
        }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// All categories in creation order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Get a category by ID.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Find a category by exact (case-sensitive) name.
    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn validate_category_name(&self, name: &str, except: Option<CategoryId>) -> Result<String, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyCategoryName);
        }
        if name.chars().any(char::is_control) {
            return Err(EditError::InvalidCategoryName {
                name: name.to_string(),
            });
        }
        match self.category_by_name(name) {
            Some(existing) if Some(existing.id) != except => Err(EditError::DuplicateCategoryName {
                name: name.to_string(),
            }),
            _ => Ok(name.to_string()),
        }
    }

    /// Create a category with a fresh id.
    pub fn add_category(&mut self, name: &str, color: [u8; 3]) -> Result<CategoryId, EditError> {
        let name = self.validate_category_name(name, None)?;
        let id = self.next_category_id;
        self.next_category_id += 1;
        self.categories.push(Category::new(id, &name, color));
        log::info!("Created category {} '{}'", id, name);
        Ok(id)
    }

    /// Insert a category that already has an id (e.g. loaded from storage).
    pub fn insert_category(&mut self, category: Category) -> Result<(), EditError> {
        let name = self.validate_category_name(&category.name, None)?;
        if self.category(category.id).is_some() {
            return Err(EditError::DuplicateCategoryName { name });
        }
        self.next_category_id = self.next_category_id.max(category.id + 1);
        self.categories.push(Category { name, ..category });
        Ok(())
    }

    /// Rename and/or recolor a category.
    pub fn update_category(
        &mut self,
        id: CategoryId,
        name: Option<&str>,
        color: Option<[u8; 3]>,
    ) -> Result<(), EditError> {
        let new_name = name
            .map(|n| self.validate_category_name(n, Some(id)))
            .transpose()?;
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EditError::CategoryNotFound { id })?;
        if let Some(new_name) = new_name {
            category.name = new_name;
        }
        if let Some(color) = color {
            category.color = color;
        }
        log::debug!("Updated category {} -> '{}'", id, category.name);
        Ok(())
    }

    /// Delete a category and every shape that references it.
    ///
    /// Returns the ids of the removed shapes (possibly empty).
    pub fn delete_category(&mut self, id: CategoryId) -> Result<Vec<ShapeId>, EditError> {
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::CategoryNotFound { id })?;
        let removed = self.delete_by_category(id);
        let category = self.categories.remove(index);
        log::info!(
            "Deleted category {} '{}' (removed {} associated annotation(s))",
            id,
            category.name,
            removed.len()
        );
        Ok(removed)
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Register (or re-declare) an image and its pixel dimensions.
    ///
    /// When an image is re-declared, its shapes are clamped to the new
    /// bounds. Returns the shapes whose geometry changed.
    pub fn register_image(&mut self, info: ImageInfo) -> Vec<Shape> {
        log::debug!(
            "Registered image {} '{}' ({}x{})",
            info.id,
            info.filename,
            info.width,
            info.height
        );
        let (width, height) = info.size();
        let image_id = info.id;
        let redeclared = self.images.insert(image_id, info).is_some();
        if !redeclared {
            return Vec::new();
        }

        let mut changed = Vec::new();
        for shape in self.shapes.values_mut().filter(|s| s.image_id == image_id) {
            let clamped = clamp_geometry(&shape.geometry, width, height);
            if clamped != shape.geometry {
                shape.geometry = clamped;
                changed.push(shape.clone());
            }
        }
        if !changed.is_empty() {
            log::info!(
                "Image {} resized, clamped {} annotation(s) to the new bounds",
                image_id,
                changed.len()
            );
        }
        changed
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageInfo> {
        self.images.get(&id)
    }

    /// All images, ordered by id.
    pub fn images(&self) -> impl Iterator<Item = &ImageInfo> {
        self.images.values()
    }

    /// Remove an image and all of its shapes.
    pub fn remove_image(&mut self, id: ImageId) -> Result<Vec<ShapeId>, EditError> {
        self.images
            .remove(&id)
            .ok_or(EditError::ImageNotFound { id })?;
        let removed: Vec<ShapeId> = self
            .shapes
            .values()
            .filter(|s| s.image_id == id)
            .map(|s| s.id)
            .collect();
        for shape_id in &removed {
            self.shapes.remove(shape_id);
        }
        log::info!("Removed image {} and {} annotation(s)", id, removed.len());
        Ok(removed)
    }

    // ========================================================================
    // Shapes
    // ========================================================================

    fn require_category(&self, id: CategoryId) -> Result<(), EditError> {
        self.category(id)
            .map(|_| ())
            .ok_or(EditError::CategoryNotFound { id })
    }

    fn require_image(&self, id: ImageId) -> Result<&ImageInfo, EditError> {
        self.images.get(&id).ok_or(EditError::ImageNotFound { id })
    }

    /// Commit a new shape. The geometry is normalized and clamped to the
    /// image bounds; degenerate geometry is accepted and kept.
    pub fn create(
        &mut self,
        image_id: ImageId,
        category_id: CategoryId,
        geometry: Geometry,
    ) -> Result<Shape, EditError> {
        let (width, height) = self.require_image(image_id)?.size();
        self.require_category(category_id)?;
        if !geometry.is_well_formed() {
            return Err(EditError::invalid_geometry(format!(
                "{} has no vertices or non-finite coordinates",
                geometry.kind().name()
            )));
        }

        let id = self.next_shape_id;
        self.next_shape_id += 1;
        let shape = Shape {
            id,
            category_id,
            image_id,
            geometry: clamp_geometry(&geometry.normalized(), width, height),
        };
        if shape.geometry.is_degenerate() {
            log::debug!("Shape {} is degenerate and will not be exported", id);
        }
        log::info!(
            "Created {} annotation {} on image {} (category {})",
            shape.kind().name(),
            id,
            image_id,
            category_id
        );
        self.shapes.insert(id, shape.clone());
        Ok(shape)
    }

    /// Insert a shape that already has an id (e.g. loaded from storage).
    ///
    /// An id that is already taken is rejected; the existing shape stays.
    pub fn insert_shape(&mut self, shape: Shape) -> Result<(), EditError> {
        if self.shapes.contains_key(&shape.id) {
            return Err(EditError::DuplicateShapeId { id: shape.id });
        }
        let (width, height) = self.require_image(shape.image_id)?.size();
        self.require_category(shape.category_id)?;
        if !shape.geometry.is_well_formed() {
            return Err(EditError::invalid_geometry("loaded shape is malformed"));
        }
        self.next_shape_id = self.next_shape_id.max(shape.id + 1);
        let geometry = clamp_geometry(&shape.geometry.normalized(), width, height);
        self.shapes.insert(shape.id, Shape { geometry, ..shape });
        Ok(())
    }

    /// Apply an update to one shape and return the committed result.
    pub fn update(&mut self, id: ShapeId, update: ShapeUpdate) -> Result<Shape, EditError> {
        let current = self.shapes.get(&id).ok_or(EditError::ShapeNotFound { id })?;
        let (width, height) = self.require_image(current.image_id)?.size();

        let mut next = current.clone();
        match update {
            ShapeUpdate::Geometry(geometry) => {
                if !geometry.is_well_formed() {
                    return Err(EditError::invalid_geometry("replacement geometry is malformed"));
                }
                next.geometry = clamp_geometry(&geometry.normalized(), width, height);
            }
            ShapeUpdate::Translate { dx, dy } => {
                if !dx.is_finite() || !dy.is_finite() {
                    return Err(EditError::invalid_geometry("non-finite translation"));
                }
                let (dx, dy) = clamp_translation(&current.geometry, dx, dy, width, height);
                next.geometry = current.geometry.translated(dx, dy);
            }
            ShapeUpdate::MoveVertex { index, to } => {
                let moved = current
                    .geometry
                    .with_handle_moved(index, to)
                    .ok_or(EditError::InvalidVertex { id, index })?;
                if !moved.is_well_formed() {
                    return Err(EditError::invalid_geometry("non-finite vertex"));
                }
                next.geometry = clamp_geometry(&moved.normalized(), width, height);
            }
            ShapeUpdate::Category(category_id) => {
                self.require_category(category_id)?;
                next.category_id = category_id;
            }
        }

        log::debug!("Updated annotation {}", id);
        self.shapes.insert(id, next.clone());
        Ok(next)
    }

    /// Remove a shape.
    pub fn delete(&mut self, id: ShapeId) -> Result<Shape, EditError> {
        let removed = self.shapes.remove(&id).ok_or(EditError::ShapeNotFound { id })?;
        log::info!("Deleted annotation {}", id);
        Ok(removed)
    }

    /// Remove every shape tagged with `category_id`.
    pub fn delete_by_category(&mut self, category_id: CategoryId) -> Vec<ShapeId> {
        let removed: Vec<ShapeId> = self
            .shapes
            .values()
            .filter(|s| s.category_id == category_id)
            .map(|s| s.id)
            .collect();
        for id in &removed {
            self.shapes.remove(id);
        }
        removed
    }

    /// Shapes on one image, oldest first (bottom of the z-order first).
    pub fn list_for_image(&self, image_id: ImageId) -> Vec<&Shape> {
        self.shapes
            .values()
            .filter(|s| s.image_id == image_id)
            .collect()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// All shapes across all images, oldest first.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
