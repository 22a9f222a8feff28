//! Error types for interchange format operations.

use thiserror::Error;

use crate::error::{EditError, ErrorKind};
use crate::model::ShapeId;

/// Errors that can occur while reading or writing interchange files.
///
/// Import errors fail the whole import: nothing is written to the model.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive could not be read or written
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A label or class-list line could not be parsed
    #[error("Invalid line {line} ({parsed} lines parsed before it): {message}")]
    InvalidLine {
        /// 1-based line number of the offending line
        line: usize,
        /// Lines successfully parsed before the failure
        parsed: usize,
        /// Description of the problem
        message: String,
    },

    /// Input is not text at all (bad encoding, control characters)
    #[error("Unparsable input after {parsed} lines: {message}")]
    Unparsable {
        /// Lines successfully parsed before the failure
        parsed: usize,
        /// Description of the problem
        message: String,
    },

    /// Strict export refused a shape that cannot be written
    #[error("Shape {shape} is degenerate and cannot be exported")]
    DegenerateShape {
        /// The offending shape
        shape: ShapeId,
    },

    /// A label line references a class index missing from the class list
    #[error("Unknown class index {index} on line {line}")]
    UnknownClass {
        /// Class index found in the label line
        index: usize,
        /// 1-based line number
        line: usize,
    },

    /// Normalized coordinates need the image's pixel size
    #[error("Image dimensions required but not available for image '{image}'")]
    MissingDimensions {
        /// The image missing dimensions
        image: String,
    },

    /// Version mismatch between expected and found
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version string
        expected: String,
        /// Found version string
        found: String,
    },

    /// Project file content was rejected by the shape model
    #[error("Invalid project data: {0}")]
    Model(#[from] EditError),

    /// A required file is absent from a dataset
    #[error("Missing file in dataset: {path}")]
    MissingFile {
        /// Dataset-relative path
        path: String,
    },
}

impl FormatError {
    /// Create an invalid line error.
    pub fn invalid_line(line: usize, parsed: usize, message: impl Into<String>) -> Self {
        Self::InvalidLine {
            line,
            parsed,
            message: message.into(),
        }
    }

    /// Create an unparsable input error.
    pub fn unparsable(parsed: usize, message: impl Into<String>) -> Self {
        Self::Unparsable {
            parsed,
            message: message.into(),
        }
    }

    /// Create a missing file error.
    pub fn missing_file(path: impl Into<String>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// Classify this error. Strict-mode refusals are validation failures;
    /// everything else is a format problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormatError::DegenerateShape { .. } => ErrorKind::Validation,
            _ => ErrorKind::Format,
        }
    }

    /// Lines parsed before the failure, when the error came from text input.
    pub fn parsed_lines(&self) -> Option<usize> {
        match self {
            FormatError::InvalidLine { parsed, .. } | FormatError::Unparsable { parsed, .. } => {
                Some(*parsed)
            }
            _ => None,
        }
    }
}
