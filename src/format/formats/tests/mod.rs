//! Unit tests for interchange format implementations.

mod yolo_tests;

/// Compare coordinates that went through 6-decimal text.
fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}
