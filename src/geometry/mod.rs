//! Geometry and coordinate transforms.
//!
//! Pure functions only: mapping between screen and image space, clamping to
//! image bounds, and hit-testing shapes under the pointer.

mod clamp;
mod transform;

pub use clamp::{clamp_geometry, clamp_point, clamp_to_image, clamp_translation};
pub use hit_test::{HitTolerance, hit_test, hit_test_handle};
pub use transform::Viewport;
