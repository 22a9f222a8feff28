//! Tests for the YOLO format.

use crate::error::ErrorKind;
use crate::format::formats::{YoloFormat, format_label_line, parse_class_list, parse_label_line};
use crate::format::traits::{AnnotationFormat, Dataset, ExportOptions, ImportOptions};
use crate::format::{FormatError, WarningSeverity};
use crate::model::{
    BoundingBox, CategoryId, Geometry, ImageInfo, Point, Polygon, ShapeKind, ShapeModel,
};

use super::approx_eq;

/// One 200x200 image named `street.jpg` with categories car and person.
fn create_yolo_model() -> (ShapeModel, CategoryId, CategoryId) {
    let mut model = ShapeModel::new();
    model.register_image(ImageInfo::new(1, "street.jpg", 200, 200));
    let car = model.add_category("car", [255, 0, 0]).unwrap();
    let person = model.add_category("person", [0, 0, 255]).unwrap();
    (model, car, person)
}

fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> Geometry {
    Geometry::BoundingBox(BoundingBox::new(x1, y1, x2, y2))
}

#[test]
fn test_yolo_format_metadata() {
    let format = YoloFormat;

    assert_eq!(format.id(), "yolo");
    assert_eq!(format.display_name(), "YOLO (TXT)");
    assert!(format.supports_polygon());
    assert!(format.supports_point());
}

#[test]
fn test_yolo_export_box_line() {
    let (mut model, car, _) = create_yolo_model();
    model.create(1, car, bbox(10.0, 20.0, 110.0, 120.0)).unwrap();

    let result = YoloFormat.export(&model, &ExportOptions::default()).unwrap();

    assert_eq!(
        result.dataset.get_text("labels/street.txt"),
        Some("0 0.300000 0.350000 0.500000 0.500000")
    );
    assert_eq!(result.annotations_exported, 1);
    assert_eq!(result.images_exported, 1);
}

#[test]
fn test_yolo_export_all_kinds_in_creation_order() {
    let (mut model, car, person) = create_yolo_model();
    model
        .create(1, person, Geometry::Point(Point::new(50.0, 150.0)))
        .unwrap();
    model
        .create(
            1,
            car,
            Geometry::Polygon(Polygon::new(vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 50.0),
            ])),
        )
        .unwrap();

    let result = YoloFormat.export(&model, &ExportOptions::default()).unwrap();
    let labels = result.dataset.get_text("labels/street.txt").unwrap();
    let lines: Vec<&str> = labels.lines().collect();

    assert_eq!(
        lines,
        vec![
            "1 0.250000 0.750000",
            "0 0.000000 0.000000 0.500000 0.000000 0.500000 0.250000",
        ]
    );
    assert!(!labels.ends_with('\n'));
}

#[test]
fn test_yolo_export_classes_file() {
    let (model, _, _) = create_yolo_model();

    let result = YoloFormat.export(&model, &ExportOptions::default()).unwrap();

    assert_eq!(result.dataset.get_text("classes.txt"), Some("car\nperson"));
    // No shapes, no label files
    assert_eq!(result.dataset.len(), 1);
}

#[test]
fn test_yolo_export_clamps_to_unit_range() {
    // Written straight into the model, bypassing commit clamping
    let line = format_label_line(0, &bbox(-20.0, 0.0, 20.0, 400.0), 200.0, 200.0).unwrap();
    assert_eq!(line, "0 0.000000 1.000000 0.200000 1.000000");
}

#[test]
fn test_yolo_export_never_writes_negative_zero() {
    let point = Geometry::Point(Point::new(-0.0, -0.0));
    assert_eq!(
        format_label_line(2, &point, 200.0, 200.0).unwrap(),
        "2 0.000000 0.000000"
    );
    let polygon = Geometry::Polygon(Polygon::new(vec![
        Point::new(-0.0, 10.0),
        Point::new(100.0, -0.0),
        Point::new(100.0, 100.0),
    ]));
    let line = format_label_line(0, &polygon, 200.0, 200.0).unwrap();
    assert!(!line.contains('-'), "{}", line);
}

#[test]
fn test_yolo_degenerate_shapes_skipped() {
    let (mut model, car, _) = create_yolo_model();
    let flat = model.create(1, car, bbox(10.0, 10.0, 10.0, 50.0)).unwrap();
    let line = model
        .create(
            1,
            car,
            Geometry::Polygon(Polygon::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])),
        )
        .unwrap();
    model.create(1, car, bbox(0.0, 0.0, 100.0, 100.0)).unwrap();

    let result = YoloFormat.export(&model, &ExportOptions::default()).unwrap();

    assert_eq!(result.skipped, vec![flat.id, line.id]);
    assert_eq!(result.annotations_exported, 1);
    // Still in the live model
    assert_eq!(model.list_for_image(1).len(), 3);
}

#[test]
fn test_yolo_strict_export_rejects_degenerate() {
    let (mut model, car, _) = create_yolo_model();
    let flat = model.create(1, car, bbox(10.0, 10.0, 50.0, 10.0)).unwrap();

    let err = YoloFormat
        .export(&model, &ExportOptions::new().strict(true))
        .unwrap_err();

    assert!(matches!(err, FormatError::DegenerateShape { shape } if shape == flat.id));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_yolo_export_skips_image_without_dimensions() {
    let (mut model, car, _) = create_yolo_model();
    model.register_image(ImageInfo::new(2, "broken.png", 0, 0));
    model.create(2, car, Geometry::Point(Point::new(0.0, 0.0))).unwrap();

    let result = YoloFormat.export(&model, &ExportOptions::default()).unwrap();

    assert!(!result.dataset.contains("labels/broken.txt"));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].severity, WarningSeverity::Warning);
    assert_eq!(result.warnings[0].image.as_deref(), Some("broken.png"));
}

#[test]
fn test_parse_class_list_skips_blank_lines() {
    let names = parse_class_list(b"car\r\n\n  pedestrian  \n\ncar\n").unwrap();
    assert_eq!(names, vec!["car", "pedestrian", "car"]);
}

#[test]
fn test_parse_class_list_reports_parsed_lines() {
    let err = parse_class_list(b"car\nbus\n\xff\xfe").unwrap_err();
    assert!(matches!(err, FormatError::Unparsable { parsed: 2, .. }));
    assert_eq!(err.parsed_lines(), Some(2));
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = parse_class_list(b"car\nb\x07us").unwrap_err();
    assert_eq!(err.parsed_lines(), Some(1));
}

#[test]
fn test_parse_label_line_kinds() {
    let point = parse_label_line("2 0.5 0.25").unwrap();
    assert_eq!(point.class_index, 2);
    assert_eq!(point.geometry.kind(), ShapeKind::Point);

    let boxed = parse_label_line("0 0.5 0.5 0.2 0.4").unwrap();
    match boxed.geometry {
        Geometry::BoundingBox(b) => {
            assert!(approx_eq(b.x1, 0.4));
            assert!(approx_eq(b.y1, 0.3));
            assert!(approx_eq(b.x2, 0.6));
            assert!(approx_eq(b.y2, 0.7));
        }
        other => panic!("expected box, got {:?}", other),
    }

    let polygon = parse_label_line("1 0 0 1 0 1 1").unwrap();
    assert_eq!(polygon.geometry.points().len(), 3);

    assert!(parse_label_line("0 0.5 0.5 0.5").is_err());
    assert!(parse_label_line("0 0.5").is_err());
    assert!(parse_label_line("x 0.5 0.5").is_err());
    assert!(parse_label_line("0 0.5 NaN").is_err());
}

#[test]
fn test_yolo_import_labels() {
    let (mut model, _, _) = create_yolo_model();
    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "person\nbike");
    dataset.insert(
        "labels/street.txt",
        "1 0.300000 0.350000 0.500000 0.500000\n\n0 1.2 0.5\n",
    );

    let result = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::default())
        .unwrap();

    assert_eq!(result.categories_created, 1);
    assert_eq!(result.categories_reused, 1);
    assert_eq!(result.annotations_imported, 2);

    let bike = model.category_by_name("bike").unwrap().id;
    let shapes = model.list_for_image(1);
    assert_eq!(shapes[0].category_id, bike);
    match &shapes[0].geometry {
        Geometry::BoundingBox(b) => {
            assert!(approx_eq(b.x1, 10.0));
            assert!(approx_eq(b.y1, 20.0));
            assert!(approx_eq(b.x2, 110.0));
            assert!(approx_eq(b.y2, 120.0));
        }
        other => panic!("expected box, got {:?}", other),
    }
    // Clamped to the image on commit
    assert_eq!(shapes[1].geometry, Geometry::Point(Point::new(200.0, 100.0)));
}

#[test]
fn test_yolo_import_is_all_or_nothing() {
    let (mut model, _, _) = create_yolo_model();
    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "truck");
    dataset.insert("labels/street.txt", "0 0.5 0.5\n3 0.5 0.5");

    let err = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::default())
        .unwrap_err();

    assert!(matches!(err, FormatError::UnknownClass { index: 3, line: 2 }));
    assert!(model.category_by_name("truck").is_none());
    assert!(model.is_empty());
}

#[test]
fn test_yolo_import_bad_line_reports_position() {
    let (mut model, _, _) = create_yolo_model();
    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "car");
    dataset.insert("labels/street.txt", "0 0.5 0.5\n0 0.1 0.1\n0 oops 0.5");

    let err = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::default())
        .unwrap_err();

    assert!(matches!(err, FormatError::InvalidLine { line: 3, parsed: 2, .. }));
}

#[test]
fn test_yolo_import_unknown_image_warns() {
    let (mut model, _, _) = create_yolo_model();
    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "car");
    dataset.insert("labels/elsewhere.txt", "0 0.5 0.5");

    let result = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::default())
        .unwrap();

    assert_eq!(result.annotations_imported, 0);
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_yolo_import_classes_only_ignores_labels() {
    let (mut model, _, _) = create_yolo_model();
    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "car");
    dataset.insert("labels/street.txt", "garbage");

    let result = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::new().classes_only(true))
        .unwrap();

    assert_eq!(result.class_map.len(), 1);
    assert!(model.is_empty());
}

#[test]
fn test_yolo_import_requires_classes() {
    let (mut model, _, _) = create_yolo_model();

    let err = YoloFormat
        .import(&Dataset::new(), &mut model, &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::MissingFile { .. }));

    let mut dataset = Dataset::new();
    dataset.insert("classes.txt", "\n  \n");
    let err = YoloFormat
        .import(&dataset, &mut model, &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::Unparsable { parsed: 0, .. }));
}
