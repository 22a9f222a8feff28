//! Trait definitions for interchange format implementations.

use crate::config::ExportSettings;
use crate::format::error::FormatError;
use crate::model::{CategoryId, ShapeId, ShapeModel};

/// Trait for interchange format import/export implementations.
///
/// Codecs work on an in-memory [`Dataset`] and never touch the filesystem,
/// so the same codec serves a download, a ZIP archive or a test.
pub trait AnnotationFormat: Send + Sync {
    /// Unique identifier for this format (e.g., "pixmark", "yolo").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// Whether this format supports polygon annotations.
    fn supports_polygon(&self) -> bool;

    /// Whether this format supports point annotations.
    fn supports_point(&self) -> bool;

    /// Serialize the model into a set of files.
    fn export(
        &self,
        model: &ShapeModel,
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError>;

    /// Read a set of files into the model.
    ///
    /// Either the whole import is applied or, on error, nothing is.
    fn import(
        &self,
        dataset: &Dataset,
        model: &mut ShapeModel,
        options: &ImportOptions,
    ) -> Result<ImportResult, FormatError>;
}

/// One file of a dataset, addressed by a `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// Files produced by an export or consumed by an import, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    files: Vec<DatasetFile>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any file already stored under `path`.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        let contents = contents.into();
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(existing) => existing.contents = contents,
            None => self.files.push(DatasetFile { path, contents }),
        }
    }

    /// Contents of the file at `path`.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.contents.as_slice())
    }

    /// Contents of the file at `path` as UTF-8 text.
    pub fn get_text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn files(&self) -> &[DatasetFile] {
        &self.files
    }

    /// Files whose path starts with `prefix` (e.g. `"labels/"`).
    pub fn files_in<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a DatasetFile> + 'a {
        self.files.iter().filter(move |f| f.path.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Options for export operations.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Fail on degenerate shapes instead of skipping them.
    pub strict: bool,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Options from the `export` section of the config file.
    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self::new().strict(settings.strict)
    }
}

/// Options for import operations.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Read only the class list and ignore any label files.
    pub classes_only: bool,
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the import to the class list.
    pub fn classes_only(mut self, classes_only: bool) -> Self {
        self.classes_only = classes_only;
        self
    }
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Files written by the codec.
    pub dataset: Dataset,

    /// Number of images with at least one label line.
    pub images_exported: usize,

    /// Number of annotations exported.
    pub annotations_exported: usize,

    /// Degenerate shapes left out of the label files.
    pub skipped: Vec<ShapeId>,

    /// Warnings generated during export.
    pub warnings: Vec<FormatWarning>,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of an import operation.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// Category id for each class index of the imported class list.
    pub class_map: Vec<CategoryId>,

    /// Categories that did not exist before the import.
    pub categories_created: usize,

    /// Class names that matched an existing category.
    pub categories_reused: usize,

    /// Shapes created from label files.
    pub annotations_imported: usize,

    /// Warnings generated during import.
    pub warnings: Vec<FormatWarning>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }
}

/// Warning generated during format conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatWarning {
    /// Filename of the image this warning relates to (if applicable).
    pub image: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            image: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the image this warning relates to.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was skipped or modified.
    Warning,
}
