//! pixmark - image annotation editing core
//!
//! Draw, select, move and label boxes, points and polygons on images, keep
//! them in a [`model::ShapeModel`], and export them as normalized YOLO label
//! files. Rendering and storage are reached through small traits
//! ([`render::RenderSurface`], [`persistence::PersistenceService`]) so the
//! core runs the same in a desktop shell, a browser or a test.

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod geometry;
pub mod message;
pub mod model;
pub mod persistence;
pub mod render;
pub mod session;
pub mod state;

pub use config::EditorConfig;
pub use error::{EditError, ErrorKind, PersistenceWarning};
pub use message::EditorEvent;
pub use model::ShapeModel;
pub use session::Editor;
