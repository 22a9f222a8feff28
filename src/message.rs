//! Editor event types.
//!
//! Raw device input is bound to these semantic events by the host; the edit
//! controller only ever sees this enum.

use crate::model::{AnnotationTool, CategoryId, ImageId};

/// Modifier state captured with a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Multi-select modifier (Shift/Ctrl) held: toggle instead of replace.
    pub multi_select: bool,
}

impl Modifiers {
    pub fn multi() -> Self {
        Self { multi_select: true }
    }
}

/// Events dispatched into the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    // Pointer (screen coordinates)
    /// Primary button pressed
    PointerDown { x: f32, y: f32, modifiers: Modifiers },
    /// Pointer moved, with or without the button held
    PointerMove { x: f32, y: f32 },
    /// Primary button released
    PointerUp { x: f32, y: f32 },
    /// Pointer left the canvas
    PointerLeave,

    // Actions
    /// Escape: discard the draft or drag in progress
    Cancel,
    /// Commit the polygon being drafted
    Finish,
    /// Select every shape on the current image
    SelectAll,
    /// Copy the selection to the clipboard
    Copy,
    /// Paste the clipboard into the current image
    Paste,
    /// Delete the selected shapes
    Delete,

    // Tool & category
    /// Switch the active tool
    SetTool(AnnotationTool),
    /// Set the category used for new shapes
    SetCategory(CategoryId),
    /// Move every selected shape to a category
    ReassignCategory(CategoryId),

    // Session & view
    /// Display another image
    SwitchImage(ImageId),
    /// Canvas resized
    Resize { width: f32, height: f32 },
    /// Zoom by `factor` around a screen position
    ZoomAt { factor: f32, x: f32, y: f32 },
    /// Zoom in one step (`viewport.zoom_factor`) around the canvas centre
    ZoomIn,
    /// Zoom out one step around the canvas centre
    ZoomOut,
    /// Pan by a screen-space delta
    Pan { dx: f32, dy: f32 },
    /// Fit the image to the canvas
    FitToScreen,
}

impl EditorEvent {
    /// Convenience constructor for a plain pointer press.
    pub fn press(x: f32, y: f32) -> Self {
        EditorEvent::PointerDown {
            x,
            y,
            modifiers: Modifiers::default(),
        }
    }

    /// Pointer press with the multi-select modifier held.
    pub fn press_multi(x: f32, y: f32) -> Self {
        EditorEvent::PointerDown {
            x,
            y,
            modifiers: Modifiers::multi(),
        }
    }

    /// Whether this event only changes the view and never the shape model.
    pub fn is_view_only(&self) -> bool {
        matches!(
            self,
            EditorEvent::Resize { .. }
                | EditorEvent::ZoomAt { .. }
                | EditorEvent::ZoomIn
                | EditorEvent::ZoomOut
                | EditorEvent::Pan { .. }
                | EditorEvent::FitToScreen
        )
    }
}
