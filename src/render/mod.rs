//! Render loop.
//!
//! After every event that changes something visible, the session rebuilds an
//! [`Overlay`] from the shape model plus the controller's in-progress gesture
//! and hands it to a [`RenderSurface`]. Nothing is cached between frames, so
//! a frame always shows the latest committed state.

mod overlay;

pub use overlay::{Overlay, OverlayItem, OverlayShape, build_overlay};

/// Radius of point markers, in screen pixels.
pub const POINT_RADIUS: f32 = 5.0;

/// Alpha of committed shapes.
pub const SHAPE_ALPHA: f32 = 1.0;

/// Alpha of drafts and shapes being dragged.
pub const PREVIEW_ALPHA: f32 = 0.6;

/// Fallback color for shapes whose category is gone or not yet chosen.
pub const NEUTRAL_COLOR: [u8; 3] = [178, 178, 178];

/// Anything that can display a frame.
pub trait RenderSurface {
    fn draw(&mut self, overlay: &Overlay);
}
