//! YOLO TXT format implementation.
//!
//! A dataset is a `classes.txt` file (one category name per line, the line
//! number being the class index) plus one `labels/<image-stem>.txt` file per
//! image. Each label line is a class index followed by coordinates divided
//! by the image width/height:
//!
//! ```text
//! box      idx cx cy w h
//! point    idx x y
//! polygon  idx x1 y1 x2 y2 ... xn yn
//! ```

use std::collections::HashMap;

use crate::color_utils::distinct_category_color;
use crate::format::error::FormatError;
use crate::format::traits::{
    AnnotationFormat, Dataset, ExportOptions, ExportResult, FormatWarning, ImportOptions,
    ImportResult,
};
use crate::model::{
    BoundingBox, CategoryId, Geometry, ImageId, MIN_POLYGON_VERTICES, Point, Polygon, ShapeModel,
};

/// Path of the class list inside a dataset.
pub const CLASSES_FILE: &str = "classes.txt";

/// Directory holding one label file per image.
pub const LABELS_DIR: &str = "labels/";

/// YOLO TXT format.
///
/// Supports boxes, points and polygons. Category colors are not stored;
/// imported categories get a deterministic color.
pub struct YoloFormat;

/// Class names in index order, with the index of every category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassList {
    pub names: Vec<String>,
    index: HashMap<CategoryId, usize>,
}

impl ClassList {
    /// Build the class list for a model's categories.
    ///
    /// Categories that share a name share the first one's index.
    pub fn from_model(model: &ShapeModel) -> Self {
        let mut list = Self::default();
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for category in model.categories() {
            let index = *by_name.entry(category.name.as_str()).or_insert_with(|| {
                list.names.push(category.name.clone());
                list.names.len() - 1
            });
            list.index.insert(category.id, index);
        }
        list
    }

    /// Class index of a category.
    pub fn index_of(&self, id: CategoryId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// `classes.txt` contents: names joined by newlines, no trailing newline.
    pub fn to_text(&self) -> String {
        self.names.join("\n")
    }
}

/// Clamp to `[0, 1]`; adding `0.0` turns `-0.0` into `0.0`.
fn unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0) + 0.0
}

/// Format one label line. Returns `None` for shapes that cannot be written
/// (zero-area box, polygon with too few vertices).
pub fn format_label_line(
    class_index: usize,
    geometry: &Geometry,
    width: f32,
    height: f32,
) -> Option<String> {
    if geometry.is_degenerate() {
        return None;
    }
    let mut line = class_index.to_string();
    let mut push = |value: f32| line.push_str(&format!(" {:.6}", unit(value)));
    match geometry {
        Geometry::BoundingBox(b) => {
            let b = b.normalized();
            let center = b.center();
            push(center.x / width);
            push(center.y / height);
            push(b.width() / width);
            push(b.height() / height);
        }
        Geometry::Point(p) => {
            push(p.x / width);
            push(p.y / height);
        }
        Geometry::Polygon(poly) => {
            for v in &poly.vertices {
                push(v.x / width);
                push(v.y / height);
            }
        }
    }
    Some(line)
}

/// A parsed label line, still in normalized coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLine {
    pub class_index: usize,
    pub geometry: Geometry,
}

impl LabelLine {
    /// Scale normalized coordinates to image pixels.
    pub fn to_pixels(&self, width: f32, height: f32) -> Geometry {
        match &self.geometry {
            Geometry::BoundingBox(b) => Geometry::BoundingBox(BoundingBox::new(
                b.x1 * width,
                b.y1 * height,
                b.x2 * width,
                b.y2 * height,
            )),
            Geometry::Point(p) => Geometry::Point(Point::new(p.x * width, p.y * height)),
            Geometry::Polygon(poly) => Geometry::Polygon(Polygon::new(
                poly.vertices
                    .iter()
                    .map(|v| Point::new(v.x * width, v.y * height))
                    .collect(),
            )),
        }
    }
}

/// Parse one non-empty label line. The token count selects the kind:
/// 3 is a point, 5 a box, any odd count of at least 7 a polygon.
pub fn parse_label_line(text: &str) -> Result<LabelLine, String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((class_token, coords)) = tokens.split_first() else {
        return Err("empty line".to_string());
    };
    let class_index: usize = class_token
        .parse()
        .map_err(|_| format!("invalid class index '{}'", class_token))?;
    let values = coords
        .iter()
        .map(|token| match token.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(format!("invalid coordinate '{}'", token)),
        })
        .collect::<Result<Vec<f32>, String>>()?;

    let geometry = match values.as_slice() {
        [x, y] => Geometry::Point(Point::new(*x, *y)),
        [cx, cy, w, h] => Geometry::BoundingBox(BoundingBox::new(
            cx - w / 2.0,
            cy - h / 2.0,
            cx + w / 2.0,
            cy + h / 2.0,
        )),
        pairs if pairs.len() >= 2 * MIN_POLYGON_VERTICES && pairs.len() % 2 == 0 => {
            Geometry::Polygon(Polygon::new(
                pairs
                    .chunks_exact(2)
                    .map(|pair| Point::new(pair[0], pair[1]))
                    .collect(),
            ))
        }
        _ => {
            return Err(format!(
                "unexpected number of values ({})",
                tokens.len()
            ));
        }
    };
    Ok(LabelLine {
        class_index,
        geometry,
    })
}

/// Parse a class list. Lines are trimmed and empty lines skipped; the
/// result may contain repeated names.
pub fn parse_class_list(bytes: &[u8]) -> Result<Vec<String>, FormatError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        let valid = &bytes[..e.valid_up_to()];
        let parsed = valid.iter().filter(|b| **b == b'\n').count();
        FormatError::unparsable(
            parsed,
            format!("invalid UTF-8 at byte {}", e.valid_up_to()),
        )
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut names = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().any(char::is_control) {
            return Err(FormatError::unparsable(
                number,
                format!("control character in class name on line {}", number + 1),
            ));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Merge class names into the model's categories.
///
/// A name matching an existing category (exactly) reuses its id and color;
/// any other name creates a category with a deterministic distinct color.
/// Returns the category id for each position of `names`.
pub fn import_classes(
    names: &[String],
    model: &mut ShapeModel,
    result: &mut ImportResult,
) -> Result<Vec<CategoryId>, FormatError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        if let Some(existing) = model.category_by_name(name) {
            log::debug!("Class '{}' matches category {}", name, existing.id);
            ids.push(existing.id);
            result.categories_reused += 1;
            continue;
        }
        let taken: Vec<[u8; 3]> = model.categories().iter().map(|c| c.color).collect();
        let id = model.add_category(name, distinct_category_color(name, &taken))?;
        ids.push(id);
        result.categories_created += 1;
    }
    Ok(ids)
}

/// Shapes parsed from one label file, ready to commit.
struct PendingLabels {
    image_id: ImageId,
    lines: Vec<LabelLine>,
    size: (f32, f32),
}

fn parse_label_file(
    bytes: &[u8],
    class_count: usize,
    image: &str,
) -> Result<Vec<LabelLine>, FormatError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FormatError::unparsable(0, format!("label file for '{}': {}", image, e)))?;
    let mut lines = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let line = parse_label_line(raw).map_err(|message| {
            FormatError::invalid_line(number + 1, lines.len(), format!("{}: {}", image, message))
        })?;
        if line.class_index >= class_count {
            return Err(FormatError::UnknownClass {
                index: line.class_index,
                line: number + 1,
            });
        }
        lines.push(line);
    }
    Ok(lines)
}

impl YoloFormat {
    fn collect_labels(
        dataset: &Dataset,
        model: &ShapeModel,
        class_count: usize,
        result: &mut ImportResult,
    ) -> Result<Vec<PendingLabels>, FormatError> {
        let mut pending = Vec::new();
        for file in dataset.files_in(LABELS_DIR) {
            let Some(stem) = file
                .path
                .strip_prefix(LABELS_DIR)
                .and_then(|name| name.strip_suffix(".txt"))
            else {
                continue;
            };
            let Some(image) = model.images().find(|image| image.stem() == stem) else {
                result.add_warning(
                    FormatWarning::warning(format!("No image named '{}', labels skipped", stem))
                        .with_image(stem),
                );
                continue;
            };
            if image.width == 0 || image.height == 0 {
                return Err(FormatError::MissingDimensions {
                    image: image.filename.clone(),
                });
            }
            let lines = parse_label_file(&file.contents, class_count, &image.filename)?;
            pending.push(PendingLabels {
                image_id: image.id,
                lines,
                size: image.size(),
            });
        }
        Ok(pending)
    }
}

impl AnnotationFormat for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
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
        options: &ExportOptions,
    ) -> Result<ExportResult, FormatError> {
        let classes = ClassList::from_model(model);
        let mut result = ExportResult::new();
        result.dataset.insert(CLASSES_FILE, classes.to_text());

        for image in model.images() {
            let shapes = model.list_for_image(image.id);
            if shapes.is_empty() {
                continue;
            }
            if image.width == 0 || image.height == 0 {
                if options.strict {
                    return Err(FormatError::MissingDimensions {
                        image: image.filename.clone(),
                    });
                }
                result.add_warning(
                    FormatWarning::warning(format!(
                        "Skipping image '{}': dimensions required for YOLO format",
                        image.filename
                    ))
                    .with_image(&image.filename),
                );
                continue;
            }
            let (width, height) = image.size();

            let mut lines = Vec::new();
            for shape in shapes {
                let Some(class_index) = classes.index_of(shape.category_id) else {
                    result.add_warning(
                        FormatWarning::warning(format!(
                            "Unknown category ID {}, skipping annotation {}",
                            shape.category_id, shape.id
                        ))
                        .with_image(&image.filename),
                    );
                    continue;
                };
                match format_label_line(class_index, &shape.geometry, width, height) {
                    Some(line) => lines.push(line),
                    None if options.strict => {
                        return Err(FormatError::DegenerateShape { shape: shape.id });
                    }
                    None => {
                        log::debug!("Skipping degenerate {} {}", shape.kind().name(), shape.id);
                        result.skipped.push(shape.id);
                    }
                }
            }

            if lines.is_empty() {
                continue;
            }
            let path = format!("{}{}.txt", LABELS_DIR, image.stem());
            if result.dataset.contains(&path) {
                result.add_warning(
                    FormatWarning::warning(format!(
                        "Another image already wrote '{}'; labels of '{}' replace it",
                        path, image.filename
                    ))
                    .with_image(&image.filename),
                );
            }
            result.annotations_exported += lines.len();
            result.images_exported += 1;
            result.dataset.insert(path, lines.join("\n"));
        }

        log::info!(
            "📦 Exported {} classes, {} images, {} annotations ({} skipped)",
            classes.names.len(),
            result.images_exported,
            result.annotations_exported,
            result.skipped.len()
        );
        Ok(result)
    }

    fn import(
        &self,
        dataset: &Dataset,
        model: &mut ShapeModel,
        options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        let bytes = dataset
            .get(CLASSES_FILE)
            .ok_or_else(|| FormatError::missing_file(CLASSES_FILE))?;
        let names = parse_class_list(bytes)?;
        if names.is_empty() {
            return Err(FormatError::unparsable(0, "no valid class names"));
        }

        let mut result = ImportResult::new();
        // Parse every label file before touching the model
        let pending = if options.classes_only {
            Vec::new()
        } else {
            Self::collect_labels(dataset, model, names.len(), &mut result)?
        };

        result.class_map = import_classes(&names, model, &mut result)?;

        for labels in pending {
            let (width, height) = labels.size;
            for line in &labels.lines {
                let category_id = result.class_map[line.class_index];
                match model.create(labels.image_id, category_id, line.to_pixels(width, height)) {
                    Ok(_) => result.annotations_imported += 1,
                    Err(e) => result.add_warning(FormatWarning::warning(format!(
                        "Label on image {} not imported: {}",
                        labels.image_id, e
                    ))),
                }
            }
        }

        log::info!(
            "📥 Imported {} classes ({} new, {} reused), {} annotations",
            names.len(),
            result.categories_created,
            result.categories_reused,
            result.annotations_imported
        );
        Ok(result)
    }
}
