//! Category data model for annotation categories.

use serde::{Deserialize, Serialize};

use crate::color_utils;

/// Identifier of a category. Stable once assigned.
pub type CategoryId = u32;

/// An annotation category with a name and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for the category
    pub id: CategoryId,
    /// Display name of the category, unique within a project (case-sensitive)
    pub name: String,
    /// RGB color for the category
    pub color: [u8; 3],
}

impl Category {
    /// Create a new category with the given ID, name, and color.
    pub fn new(id: CategoryId, name: &str, color: [u8; 3]) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
        }
    }

    /// Color as `#RRGGBB`, the form exchanged with the persistence service.
    pub fn hex_color(&self) -> String {
        color_utils::to_hex(self.color)
    }
}
