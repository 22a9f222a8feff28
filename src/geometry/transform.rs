//! Viewport transform between screen space and image space.
//!
//! Screen coordinates are relative to the canvas' top-left corner, image
//! coordinates to the image's top-left pixel:
//!
//! ```text
//! screen = image * zoom + pan
//! image  = (screen - pan) / zoom
//! ```

use crate::model::Point;

/// Pan/zoom state for the image currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Viewport {
    /// Create a viewport with the given zoom and pan.
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Zoom 1, no pan.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Map a screen position to image space.
    pub fn screen_to_image(&self, px: f32, py: f32) -> Point {
        Point::new((px - self.pan_x) / self.zoom, (py - self.pan_y) / self.zoom)
    }

    /// Map an image-space point to screen space.
    pub fn image_to_screen(&self, point: &Point) -> Point {
        Point::new(
            point.x * self.zoom + self.pan_x,
            point.y * self.zoom + self.pan_y,
        )
    }

    /// Convert a screen-space length (e.g. a pixel tolerance) to image space.
    pub fn screen_len_to_image(&self, len: f32) -> f32 {
        len / self.zoom
    }

    /// Change zoom while keeping the image point under the cursor fixed.
    pub fn zoom_to_cursor(&self, new_zoom: f32, cursor_x: f32, cursor_y: f32) -> Viewport {
        let anchor = self.screen_to_image(cursor_x, cursor_y);
        Viewport {
            zoom: new_zoom,
            pan_x: cursor_x - anchor.x * new_zoom,
            pan_y: cursor_y - anchor.y * new_zoom,
        }
    }

    /// Multiply zoom by `factor` around the cursor, clamped to `[min_zoom, max_zoom]`.
    pub fn zoom_at(
        &self,
        factor: f32,
        cursor_x: f32,
        cursor_y: f32,
        min_zoom: f32,
        max_zoom: f32,
    ) -> Viewport {
        if !(factor.is_finite() && factor > 0.0) {
            return *self;
        }
        let new_zoom = (self.zoom * factor).max(min_zoom).min(max_zoom);
        self.zoom_to_cursor(new_zoom, cursor_x, cursor_y)
    }

    /// Apply a pan delta in screen pixels.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Viewport {
        Viewport {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..*self
        }
    }

    /// Zoom in one step around a screen position, capped at `max_zoom`.
    pub fn zoom_in(&self, factor: f32, center_x: f32, center_y: f32, max_zoom: f32) -> Viewport {
        self.zoom_to_cursor((self.zoom * factor).min(max_zoom), center_x, center_y)
    }

    /// Zoom out one step around a screen position, floored at `min_zoom`.
    pub fn zoom_out(&self, factor: f32, center_x: f32, center_y: f32, min_zoom: f32) -> Viewport {
        self.zoom_to_cursor((self.zoom / factor).max(min_zoom), center_x, center_y)
    }

    /// Fit the whole image into the canvas, scaled by `margin`, and centre it.
    ///
    /// Returns the identity transform when either size is not positive.
    pub fn fit(canvas_w: f32, canvas_h: f32, image_w: f32, image_h: f32, margin: f32) -> Viewport {
        if canvas_w <= 0.0 || canvas_h <= 0.0 || image_w <= 0.0 || image_h <= 0.0 {
            return Viewport::identity();
        }
        let zoom = (canvas_w / image_w).min(canvas_h / image_h) * margin;
        Viewport {
            zoom,
            pan_x: (canvas_w - image_w * zoom) / 2.0,
            pan_y: (canvas_h - image_h * zoom) / 2.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}
