//! Gesture states of the edit controller.
//!
//! Drafts and drags live here, never in the shape model: the model only sees
//! a gesture once it is committed, and cancelling simply drops the state.

use crate::model::{AnnotationTool, BoundingBox, Geometry, Point, Polygon, ShapeId};

/// A shape being drawn, in image coordinates. May lie outside the image.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    /// Button held since `start`; corners kept in raw pointer order.
    BoundingBox { start: Point, current: Point },
    /// Button held; the point follows the pointer until release.
    Point { at: Point },
    /// One vertex per click; `cursor` is the rubber-band end.
    Polygon {
        vertices: Vec<Point>,
        cursor: Option<Point>,
    },
}

impl Draft {
    /// Start a draft for a drawing tool. `Select` draws nothing.
    pub fn start(tool: AnnotationTool, at: Point) -> Option<Self> {
        match tool {
            AnnotationTool::Select => None,
            AnnotationTool::BoundingBox => Some(Draft::BoundingBox { start: at, current: at }),
            AnnotationTool::Point => Some(Draft::Point { at }),
            AnnotationTool::Polygon => Some(Draft::Polygon {
                vertices: vec![at],
                cursor: None,
            }),
        }
    }

    /// Follow the pointer.
    pub fn update(&mut self, to: Point) {
        match self {
            Draft::BoundingBox { current, .. } => *current = to,
            Draft::Point { at } => *at = to,
            Draft::Polygon { cursor, .. } => *cursor = Some(to),
        }
    }

    /// Whether the draft is tied to a held button (and so dies with it).
    pub fn is_press_gesture(&self) -> bool {
        !matches!(self, Draft::Polygon { .. })
    }

    /// Geometry that would be committed now.
    pub fn geometry(&self) -> Geometry {
        match self {
            Draft::BoundingBox { start, current } => {
                Geometry::BoundingBox(BoundingBox::new(start.x, start.y, current.x, current.y))
            }
            Draft::Point { at } => Geometry::Point(*at),
            Draft::Polygon { vertices, .. } => Geometry::Polygon(Polygon::new(vertices.clone())),
        }
    }
}

/// Rigid move of the whole selection.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDrag {
    /// Image-space position of the press.
    pub anchor: Point,
    /// Current image-space delta from the anchor.
    pub delta: (f32, f32),
    /// Geometry of every dragged shape when the drag started.
    pub snapshot: Vec<(ShapeId, Geometry)>,
}

impl GroupDrag {
    pub fn has_moved(&self) -> bool {
        self.delta != (0.0, 0.0)
    }

    /// Shapes as they would look with the current delta applied.
    pub fn preview(&self) -> impl Iterator<Item = (ShapeId, Geometry)> + '_ {
        let (dx, dy) = self.delta;
        self.snapshot
            .iter()
            .map(move |(id, geometry)| (*id, geometry.translated(dx, dy)))
    }
}

/// Drag of one box corner or polygon vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDrag {
    pub shape_id: ShapeId,
    pub index: usize,
    /// Geometry before the drag.
    pub original: Geometry,
    /// Current pointer position in image space.
    pub current: Point,
}

impl VertexDrag {
    pub fn has_moved(&self) -> bool {
        self.original.handles().get(self.index) != Some(&self.current)
    }

    pub fn preview(&self) -> Geometry {
        self.original
            .with_handle_moved(self.index, self.current)
            .unwrap_or_else(|| self.original.clone())
    }
}

/// Controller state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    /// Nothing selected, no gesture
    #[default]
    Idle,
    /// One or more shapes selected, no gesture
    SelectionActive,
    /// A draft shape in progress
    Drawing(Draft),
    /// The selection being moved
    Dragging(GroupDrag),
    /// A single vertex being moved
    EditingVertex(VertexDrag),
}

impl EditState {
    /// Whether a draft or drag is in progress.
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            EditState::Drawing(_) | EditState::Dragging(_) | EditState::EditingVertex(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditState::Idle => "Idle",
            EditState::SelectionActive => "SelectionActive",
            EditState::Drawing(_) => "Drawing",
            EditState::Dragging(_) => "Dragging",
            EditState::EditingVertex(_) => "EditingVertex",
        }
    }
}
