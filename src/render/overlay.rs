//! Overlay shapes for rendering on top of images.
//!
//! Every coordinate here is in screen space; the surface does not need to
//! know about zoom or pan.

use crate::color_utils::to_rgba;
use crate::geometry::Viewport;
use crate::model::{CategoryId, Geometry, Point, ShapeId, ShapeModel};
use crate::state::{Draft, EditController, EditState};

use super::{NEUTRAL_COLOR, POINT_RADIUS, PREVIEW_ALPHA, SHAPE_ALPHA};

/// A shape that can be drawn as an overlay on an image.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// A point marker (filled circle).
    Point {
        x: f32,
        y: f32,
        /// Radius in screen pixels
        radius: f32,
    },
    /// A rectangle (bounding box).
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// A polygon defined by vertices.
    Polygon {
        vertices: Vec<(f32, f32)>,
        /// Whether the polygon is closed
        closed: bool,
    },
}

impl OverlayShape {
    fn from_geometry(geometry: &Geometry, viewport: &Viewport, closed: bool) -> Self {
        match geometry {
            Geometry::Point(p) => {
                let s = viewport.image_to_screen(p);
                OverlayShape::Point {
                    x: s.x,
                    y: s.y,
                    radius: POINT_RADIUS,
                }
            }
            Geometry::BoundingBox(b) => {
                let b = b.normalized();
                let top_left = viewport.image_to_screen(&Point::new(b.x1, b.y1));
                OverlayShape::Rect {
                    x: top_left.x,
                    y: top_left.y,
                    width: b.width() * viewport.zoom,
                    height: b.height() * viewport.zoom,
                }
            }
            Geometry::Polygon(poly) => OverlayShape::Polygon {
                vertices: poly
                    .vertices
                    .iter()
                    .map(|v| {
                        let s = viewport.image_to_screen(v);
                        (s.x, s.y)
                    })
                    .collect(),
                closed,
            },
        }
    }
}

/// An overlay item with shape and styling.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    /// Shape this item draws, if it is a committed annotation
    pub shape_id: Option<ShapeId>,
    pub shape: OverlayShape,
    /// RGBA color
    pub color: [f32; 4],
    pub selected: bool,
    /// Drawn but skipped at export
    pub degenerate: bool,
    /// Vertex handles (screen space), shown for selected shapes
    pub handles: Vec<(f32, f32)>,
}

impl OverlayItem {
    pub fn new(shape: OverlayShape, color: [f32; 4]) -> Self {
        Self {
            shape_id: None,
            shape,
            color,
            selected: false,
            degenerate: false,
            handles: Vec::new(),
        }
    }
}

/// A collection of overlay items to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Annotations on the current image, bottom of the z-order first
    pub items: Vec<OverlayItem>,
    /// Shape being drawn
    pub preview: Option<OverlayItem>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.preview.is_none()
    }

    /// Find the item drawn for a committed shape.
    pub fn item(&self, id: ShapeId) -> Option<&OverlayItem> {
        self.items.iter().find(|item| item.shape_id == Some(id))
    }
}

fn category_rgba(model: &ShapeModel, category_id: Option<CategoryId>, alpha: f32) -> [f32; 4] {
    let color = category_id
        .and_then(|id| model.category(id))
        .map_or(NEUTRAL_COLOR, |c| c.color);
    to_rgba(color, alpha)
}

/// Gesture geometry replacing the committed geometry of `id`, if any.
fn gesture_override(state: &EditState, id: ShapeId) -> Option<Geometry> {
    match state {
        EditState::Dragging(drag) => drag
            .preview()
            .find(|(dragged, _)| *dragged == id)
            .map(|(_, geometry)| geometry),
        EditState::EditingVertex(vertex) if vertex.shape_id == id => Some(vertex.preview()),
        _ => None,
    }
}

/// Build the frame for the image the controller is showing.
pub fn build_overlay(model: &ShapeModel, controller: &EditController) -> Overlay {
    let mut overlay = Overlay::new();
    let Some(image_id) = controller.current_image() else {
        return overlay;
    };
    let viewport = controller.viewport();
    let state = controller.state();
    let selection = controller.selection();

    for shape in model.list_for_image(image_id) {
        let moving = gesture_override(state, shape.id);
        let alpha = if moving.is_some() { PREVIEW_ALPHA } else { SHAPE_ALPHA };
        let geometry = moving.unwrap_or_else(|| shape.geometry.clone());
        let selected = selection.contains(shape.id);

        let mut item = OverlayItem::new(
            OverlayShape::from_geometry(&geometry, viewport, true),
            category_rgba(model, Some(shape.category_id), alpha),
        );
        item.shape_id = Some(shape.id);
        item.selected = selected;
        item.degenerate = geometry.is_degenerate();
        if selected {
            item.handles = geometry
                .handles()
                .iter()
                .map(|h| {
                    let s = viewport.image_to_screen(h);
                    (s.x, s.y)
                })
                .collect();
        }
        overlay.items.push(item);
    }

    if let EditState::Drawing(draft) = state {
        let mut geometry = draft.geometry();
        // Rubber band to the pointer
        if let (Draft::Polygon { cursor: Some(cursor), .. }, Geometry::Polygon(poly)) =
            (draft, &mut geometry)
        {
            poly.vertices.push(*cursor);
        }
        let mut preview = OverlayItem::new(
            OverlayShape::from_geometry(&geometry, viewport, false),
            category_rgba(model, controller.active_category(), PREVIEW_ALPHA),
        );
        preview.degenerate = geometry.is_degenerate();
        overlay.preview = Some(preview);
    }

    overlay
}
