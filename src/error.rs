//! Error types for editing operations.
//!
//! Every error in the editing core is recoverable: the mutation that caused
//! it is rejected and the session stays interactive.

use thiserror::Error;

use crate::model::{CategoryId, ImageId, ShapeId};

/// Broad classification used by hosts to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was rejected (bad name, bad geometry, strict-mode export).
    Validation,
    /// An id no longer (or never did) refer to a live record.
    Reference,
    /// A background save failed; local state stays authoritative.
    Persistence,
    /// Interchange input could not be parsed.
    Format,
}

/// Errors raised by the shape model and the edit controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// Category referenced by a create/update does not exist
    #[error("Category not found: {id}")]
    CategoryNotFound {
        /// The missing category ID
        id: CategoryId,
    },

    /// Shape id is stale or unknown
    #[error("Shape not found: {id}")]
    ShapeNotFound {
        /// The missing shape ID
        id: ShapeId,
    },

    /// Image id is not registered with the model
    #[error("Image not found: {id}")]
    ImageNotFound {
        /// The missing image ID
        id: ImageId,
    },

    /// Category names are unique (case-sensitive) within a project
    #[error("Category name already in use: '{name}'")]
    DuplicateCategoryName {
        /// The conflicting name
        name: String,
    },

    /// Category names must contain at least one non-whitespace character
    #[error("Category name must not be empty")]
    EmptyCategoryName,

    /// Category names are written one per line, so control characters
    /// (line breaks in particular) are not allowed
    #[error("Category name contains control characters: {name:?}")]
    InvalidCategoryName {
        /// The rejected name
        name: String,
    },

    /// A stored shape reuses an id that is already taken
    #[error("Shape id already in use: {id}")]
    DuplicateShapeId {
        /// The conflicting shape ID
        id: ShapeId,
    },

    /// Vertex index outside the shape's vertex list
    #[error("Vertex {index} out of range for shape {id}")]
    InvalidVertex {
        /// Shape being edited
        id: ShapeId,
        /// Offending vertex index
        index: usize,
    },

    /// A shape was committed with no category chosen
    #[error("No active category selected")]
    NoActiveCategory,

    /// A shape was committed with no image displayed
    #[error("No image is displayed")]
    NoActiveImage,

    /// Geometry contains non-finite coordinates or has no vertices
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of the problem
        message: String,
    },
}

impl EditError {
    /// Create an invalid geometry error with a message.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::CategoryNotFound { .. }
            | EditError::ShapeNotFound { .. }
            | EditError::ImageNotFound { .. } => ErrorKind::Reference,
            EditError::DuplicateCategoryName { .. }
            | EditError::EmptyCategoryName
            | EditError::InvalidCategoryName { .. }
            | EditError::DuplicateShapeId { .. }
            | EditError::NoActiveCategory
            | EditError::NoActiveImage
            | EditError::InvalidVertex { .. }
            | EditError::InvalidGeometry { .. } => ErrorKind::Validation,
        }
    }
}

/// A failed background save, reported to the host as a transient banner.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceWarning {
    /// Human-readable description of the operation that failed.
    pub operation: String,
    /// Error message returned by the persistence service.
    pub message: String,
    /// How many attempts have been made so far (1-based).
    pub attempt: u32,
    /// True when the retry budget is exhausted and the op was dropped.
    pub gave_up: bool,
}

impl PersistenceWarning {
    /// Always [`ErrorKind::Persistence`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Persistence
    }
}

impl std::fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.gave_up {
            write!(
                f,
                "Could not save '{}' after {} attempts: {}",
                self.operation, self.attempt, self.message
            )
        } else {
            write!(
                f,
                "Saving '{}' failed (attempt {}), will retry: {}",
                self.operation, self.attempt, self.message
            )
        }
    }
}
