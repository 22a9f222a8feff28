//! Interchange format import/export.
//!
//! Codecs implement [`AnnotationFormat`] and convert between a
//! [`ShapeModel`](crate::model::ShapeModel) and an in-memory [`Dataset`].
//! Packaging a dataset for download is a separate step ([`to_zip_bytes`]).
//!
//! ## Supported Formats
//!
//! - **pixmark JSON**: native format with full fidelity (ids, colors, image sizes)
//! - **YOLO TXT**: `classes.txt` plus one normalized label file per image
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pixmark::format::{ExportOptions, FormatRegistry, to_zip_bytes};
//!
//! let registry = FormatRegistry::new();
//! let yolo = registry.get("yolo").unwrap();
//! let result = yolo.export(&model, &ExportOptions::default())?;
//! let bytes = to_zip_bytes(&result.dataset)?;
//! ```

mod archive;
mod error;
pub mod formats;
mod project;
mod registry;
mod traits;

pub use archive::{from_zip_bytes, load_zip, read_zip, save_zip, to_zip_bytes, write_zip};
pub use error::FormatError;
pub use project::{
    AnnotationEntry, CategoryEntry, ImageEntry, ProjectData, ProjectMetadata, ShapeEntry,
};
pub use registry::FormatRegistry;
pub use traits::{
    AnnotationFormat, Dataset, DatasetFile, ExportOptions, ExportResult, FormatWarning,
    ImportOptions, ImportResult, WarningSeverity,
};
