//! Default values for editor behaviour.
//!
//! Pixel values marked "screen" are divided by the current zoom before they
//! are compared with image-space coordinates.

/// Edge slack for grabbing boxes and polygon outlines (screen px)
pub const DEFAULT_HIT_TOLERANCE: f32 = 4.0;

/// Grab radius around point annotations (screen px)
pub const DEFAULT_POINT_HIT_RADIUS: f32 = 8.0;

/// Grab radius around box corners and polygon vertices (screen px)
pub const DEFAULT_VERTEX_HANDLE_RADIUS: f32 = 6.0;

/// Offset applied per paste to avoid exact overlap (image px)
pub const DEFAULT_PASTE_OFFSET: f32 = 10.0;

/// Distance to the first vertex that closes a polygon draft (screen px)
pub const DEFAULT_POLYGON_CLOSE_THRESHOLD: f32 = 10.0;

/// Zoom limits and step
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;
pub const ZOOM_FACTOR: f32 = 1.2;

/// Fraction of the canvas filled by fit-to-screen
pub const FIT_MARGIN: f32 = 0.9;

/// Write-behind retry policy
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_DELAY_MS: u64 = 8000;
