//! Session-wide clipboard of detached shapes.
//!
//! Entries carry no id and no image, so they can be pasted into any image
//! any number of times until the next copy overwrites them.

use crate::model::{CategoryId, Geometry, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardEntry {
    pub category_id: CategoryId,
    pub geometry: Geometry,
}

impl From<&Shape> for ClipboardEntry {
    fn from(shape: &Shape) -> Self {
        Self {
            category_id: shape.category_id,
            geometry: shape.geometry.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Vec<ClipboardEntry>,
    /// Pastes since the last copy; scales the paste offset.
    paste_count: u32,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the clipboard contents.
    pub fn copy(&mut self, entries: Vec<ClipboardEntry>) {
        self.entries = entries;
        self.paste_count = 0;
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Offset for the next paste: `step` times the number of pastes so far,
    /// counting this one.
    pub fn next_paste_offset(&mut self, step: f32) -> f32 {
        self.paste_count += 1;
        step * self.paste_count as f32
    }
}
