//! Editing session state: selection, clipboard and the edit controller.

mod clipboard;
mod controller;
mod edit_state;
mod selection;

pub use clipboard::{Clipboard, ClipboardEntry};
pub use controller::{BatchReport, EditController, EventOutcome};
pub use edit_state::{Draft, EditState, GroupDrag, VertexDrag};
pub use selection::Selection;
