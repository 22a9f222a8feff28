//! Interchange format implementations.

mod native_json;
mod yolo;

#[cfg(test)]
mod tests;

pub use native_json::{NativeJsonFormat, PROJECT_FILE};
pub use yolo::{
    CLASSES_FILE, ClassList, LABELS_DIR, LabelLine, YoloFormat, format_label_line, import_classes,
    parse_class_list, parse_label_line,
};
