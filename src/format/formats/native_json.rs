//! Native pixmark JSON format.
//!
//! The only format that keeps everything: ids, category colors, image
//! sizes and all shape kinds. See [`ProjectData`] for versioning rules.

use crate::format::error::FormatError;
use crate::format::project::ProjectData;
use crate::format::traits::{
    AnnotationFormat, Dataset, ExportOptions, ExportResult, ImportOptions, ImportResult,
};
use crate::model::ShapeModel;

/// Path of the project file inside a dataset.
pub const PROJECT_FILE: &str = "project.json";

/// Native pixmark JSON format.
pub struct NativeJsonFormat;

impl AnnotationFormat for NativeJsonFormat {
    fn id(&self) -> &'static str {
        "pixmark"
    }

    fn display_name(&self) -> &'static str {
        "pixmark Project (JSON)"
    }

    fn supports_polygon(&self) -> bool {
        true
    }

    fn supports_point(&self) -> bool {
        true
    }

    fn export(
        &self,
        model: &ShapeModel,
        _options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        let data = ProjectData::from_model(model);
        let mut result = ExportResult::new();
        result.images_exported = data.images.len();
        result.annotations_exported = data.total_annotations();
        result.dataset.insert(PROJECT_FILE, data.to_json()?);

        log::info!(
            "Exported {} images with {} annotations",
            result.images_exported,
            result.annotations_exported
        );
        Ok(result)
    }

    /// Replaces the whole model with the project file's contents.
    fn import(
        &self,
        dataset: &Dataset,
        model: &mut ShapeModel,
        _options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        let json = dataset
            .get(PROJECT_FILE)
            .ok_or_else(|| FormatError::missing_file(PROJECT_FILE))?;
        let json = std::str::from_utf8(json)
            .map_err(|e| FormatError::unparsable(0, format!("{}: {}", PROJECT_FILE, e)))?;
        let data = ProjectData::from_json(json)?;
        let loaded = data.to_model()?;

        let result = ImportResult {
            class_map: loaded.categories().iter().map(|c| c.id).collect(),
            categories_created: loaded.categories().len(),
            annotations_imported: loaded.len(),
            ..ImportResult::default()
        };
        *model = loaded;

        log::info!(
            "Imported project with {} categories and {} annotations",
            result.categories_created,
            result.annotations_imported
        );
        Ok(result)
    }
}
