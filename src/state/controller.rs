//! Selection & edit controller.
//!
//! A single reducer, [`EditController::handle_event`], owns the active tool
//! and category, the selection, the clipboard and the viewport. It reads and
//! mutates the [`ShapeModel`] only through its public operations and reports
//! what happened through an [`EventOutcome`].

use crate::config::{EditingSettings, EditorConfig, ViewportSettings};
use crate::error::EditError;
use crate::geometry::{HitTolerance, Viewport, clamp_translation, hit_test, hit_test_handle};
use crate::message::{EditorEvent, Modifiers};
use crate::model::{
    AnnotationTool, CategoryId, Geometry, ImageId, MIN_POLYGON_VERTICES, Point, ShapeId,
    ShapeModel, ShapeUpdate,
};
use crate::persistence::{AnnotationChange, PersistenceOp};

use super::clipboard::{Clipboard, ClipboardEntry};
use super::edit_state::{Draft, EditState, GroupDrag, VertexDrag};
use super::selection::Selection;

/// Per-shape result of a batch operation (move, delete, reassign, paste).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<ShapeId>,
    pub failed: Vec<(ShapeId, EditError)>,
}

impl BatchReport {
    pub fn failed_ids(&self) -> Vec<ShapeId> {
        self.failed.iter().map(|(id, _)| *id).collect()
    }
}

/// Everything a single event caused.
#[derive(Debug, Clone, Default)]
pub struct EventOutcome {
    /// The shape model was mutated.
    pub model_changed: bool,
    /// Something visible changed and the canvas must be redrawn.
    pub redraw: bool,
    /// Calls to forward to the persistence service, in order.
    pub persistence: Vec<PersistenceOp>,
    /// Rejected mutations.
    pub errors: Vec<EditError>,
    /// Per-shape results of a batch operation.
    pub batch: Option<BatchReport>,
}

/// Session state for editing one image at a time.
#[derive(Debug, Clone)]
pub struct EditController {
    editing: EditingSettings,
    view: ViewportSettings,
    tool: AnnotationTool,
    active_category: Option<CategoryId>,
    image: Option<ImageId>,
    state: EditState,
    selection: Selection,
    clipboard: Clipboard,
    viewport: Viewport,
    canvas: Option<(f32, f32)>,
    /// Refit on resize until the user zooms or pans.
    auto_fit: bool,
}

impl EditController {
    pub fn new(editing: EditingSettings, view: ViewportSettings) -> Self {
        let view = match view.validate() {
            Ok(()) => view,
            Err(e) => {
                log::warn!("{}; using default viewport settings", e);
                ViewportSettings::default()
            }
        };
        Self {
            editing,
            view,
            tool: AnnotationTool::default(),
            active_category: None,
            image: None,
            state: EditState::Idle,
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            viewport: Viewport::identity(),
            canvas: None,
            auto_fit: true,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.editing, config.viewport)
    }

    pub fn tool(&self) -> AnnotationTool {
        self.tool
    }

    pub fn active_category(&self) -> Option<CategoryId> {
        self.active_category
    }

    pub fn current_image(&self) -> Option<ImageId> {
        self.image
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn editing_settings(&self) -> &EditingSettings {
        &self.editing
    }

    /// Apply one event.
    pub fn handle_event(&mut self, model: &mut ShapeModel, event: EditorEvent) -> EventOutcome {
        let mut out = EventOutcome::default();
        match event {
            EditorEvent::PointerDown { x, y, modifiers } => {
                self.pointer_down(model, x, y, modifiers, &mut out)
            }
            EditorEvent::PointerMove { x, y } => self.pointer_move(x, y, &mut out),
            EditorEvent::PointerUp { x, y } => self.pointer_up(model, x, y, &mut out),
            EditorEvent::PointerLeave => self.pointer_leave(&mut out),
            EditorEvent::Cancel => self.cancel(&mut out),
            EditorEvent::Finish => {
                if matches!(self.state, EditState::Drawing(Draft::Polygon { .. })) {
                    self.commit_draft(model, &mut out);
                }
            }
            EditorEvent::SelectAll => self.select_all(model, &mut out),
            EditorEvent::Copy => self.copy(model, &mut out),
            EditorEvent::Paste => self.paste(model, &mut out),
            EditorEvent::Delete => self.delete_selected(model, &mut out),
            EditorEvent::SetTool(tool) => {
                self.abort_gesture(&mut out);
                self.tool = tool;
                log::debug!("🖌️ Annotation tool: {}", tool.name());
            }
            EditorEvent::SetCategory(id) => {
                if model.category(id).is_some() {
                    self.active_category = Some(id);
                    log::debug!("🏷️ Category: {}", id);
                } else {
                    out.errors.push(EditError::CategoryNotFound { id });
                }
            }
            EditorEvent::ReassignCategory(id) => self.reassign(model, id, &mut out),
            EditorEvent::SwitchImage(id) => self.switch_image(model, id, &mut out),
            EditorEvent::Resize { width, height } => {
                self.canvas = Some((width, height));
                if self.auto_fit {
                    self.fit_to_screen(model);
                }
                out.redraw = true;
            }
            EditorEvent::ZoomAt { factor, x, y } => {
                if !(factor.is_finite() && factor > 0.0 && x.is_finite() && y.is_finite()) {
                    log::warn!("Ignoring zoom by {} at ({}, {})", factor, x, y);
                    return out;
                }
                self.viewport =
                    self.viewport
                        .zoom_at(factor, x, y, self.view.min_zoom, self.view.max_zoom);
                self.auto_fit = false;
                out.redraw = true;
            }
            EditorEvent::ZoomIn => {
                let (cx, cy) = self.canvas_center();
                self.viewport = self
                    .viewport
                    .zoom_in(self.view.zoom_factor, cx, cy, self.view.max_zoom);
                self.auto_fit = false;
                out.redraw = true;
            }
            EditorEvent::ZoomOut => {
                let (cx, cy) = self.canvas_center();
                self.viewport = self
                    .viewport
                    .zoom_out(self.view.zoom_factor, cx, cy, self.view.min_zoom);
                self.auto_fit = false;
                out.redraw = true;
            }
            EditorEvent::Pan { dx, dy } => {
                if !(dx.is_finite() && dy.is_finite()) {
                    log::warn!("Ignoring pan by ({}, {})", dx, dy);
                    return out;
                }
                self.viewport = self.viewport.pan_by(dx, dy);
                self.auto_fit = false;
                out.redraw = true;
            }
            EditorEvent::FitToScreen => {
                self.fit_to_screen(model);
                self.auto_fit = true;
                out.redraw = true;
            }
        }
        log::trace!("Edit state: {}", self.state.name());
        out
    }

    /// Drop references to records that no longer exist in the model.
    ///
    /// Called after mutations made outside the controller, such as a
    /// category or image delete that cascaded to shapes.
    pub fn sync_with_model(&mut self, model: &ShapeModel) {
        let stale = self.selection.prune(|id| model.contains(id));
        if !stale.is_empty() {
            log::debug!("Dropped {} removed annotation(s) from selection", stale.len());
        }
        if self.active_category.is_some_and(|id| model.category(id).is_none()) {
            self.active_category = None;
        }
        if self.image.is_some_and(|id| model.image(id).is_none()) {
            self.image = None;
            self.selection.clear();
            self.state = EditState::Idle;
        }
        let gesture_stale = match &self.state {
            EditState::Dragging(drag) => drag.snapshot.iter().any(|(id, _)| !model.contains(*id)),
            EditState::EditingVertex(vertex) => !model.contains(vertex.shape_id),
            _ => false,
        };
        if gesture_stale || !self.state.is_gesture() {
            self.settle();
        }
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    fn pointer_down(
        &mut self,
        model: &mut ShapeModel,
        x: f32,
        y: f32,
        modifiers: Modifiers,
        out: &mut EventOutcome,
    ) {
        let Some(image_id) = self.image else {
            log::debug!("Ignoring pointer press: no image displayed");
            return;
        };
        let at = self.viewport.screen_to_image(x, y);

        // A polygon draft takes every click until it is closed
        let close_distance = self
            .viewport
            .screen_len_to_image(self.editing.polygon_close_threshold);
        let closes = match &self.state {
            EditState::Drawing(Draft::Polygon { vertices, .. }) => Some(
                vertices.len() >= MIN_POLYGON_VERTICES
                    && vertices
                        .first()
                        .is_some_and(|first| first.distance_to(&at) <= close_distance),
            ),
            _ => None,
        };
        match closes {
            Some(true) => {
                self.commit_draft(model, out);
                return;
            }
            Some(false) => {
                if let EditState::Drawing(Draft::Polygon { vertices, .. }) = &mut self.state {
                    vertices.push(at);
                    log::debug!(
                        "✏️ Added polygon point at ({:.1}, {:.1}), total: {}",
                        at.x,
                        at.y,
                        vertices.len()
                    );
                }
                out.redraw = true;
                return;
            }
            None => {}
        }

        // A press without a release in between: drop the stale gesture
        if self.state.is_gesture() {
            self.abort_gesture(out);
        }

        match Draft::start(self.tool, at) {
            Some(draft) => {
                log::debug!("✏️ Started {} at ({:.1}, {:.1})", self.tool.name(), at.x, at.y);
                self.state = EditState::Drawing(draft);
                out.redraw = true;
            }
            None => self.select_press(model, image_id, at, modifiers, out),
        }
    }

    fn select_press(
        &mut self,
        model: &ShapeModel,
        image_id: ImageId,
        at: Point,
        modifiers: Modifiers,
        out: &mut EventOutcome,
    ) {
        out.redraw = true;

        if !modifiers.multi_select {
            let radius = self
                .viewport
                .screen_len_to_image(self.editing.vertex_handle_radius);
            let selected = self.selection.to_vec();
            for id in selected.into_iter().rev() {
                let Some(shape) = model.get(id) else {
                    continue;
                };
                if let Some(index) = hit_test_handle(&at, &shape.geometry, radius) {
                    log::debug!("Editing vertex {} of annotation {}", index, id);
                    self.state = EditState::EditingVertex(VertexDrag {
                        shape_id: id,
                        index,
                        original: shape.geometry.clone(),
                        current: at,
                    });
                    return;
                }
            }
        }

        let tolerance = HitTolerance::from_screen(
            self.editing.hit_tolerance,
            self.editing.point_hit_radius,
            self.viewport.zoom,
        );
        let hits = hit_test(&at, model.list_for_image(image_id), &tolerance);

        if modifiers.multi_select {
            if let Some(&top) = hits.first() {
                let selected = self.selection.toggle(top);
                log::debug!(
                    "🔍 {} annotation {}",
                    if selected { "Added" } else { "Removed" },
                    top
                );
            }
            self.settle();
            return;
        }

        let grabbed_selected = hits.iter().any(|id| self.selection.contains(*id));
        if !grabbed_selected {
            match hits.first() {
                Some(&top) => {
                    self.selection.select_only(top);
                    log::debug!("🔍 Selected annotation {}", top);
                }
                None => {
                    self.selection.clear();
                    self.settle();
                    return;
                }
            }
        }

        let snapshot = self
            .selection
            .ids()
            .filter_map(|id| model.get(id).map(|shape| (id, shape.geometry.clone())))
            .collect();
        self.state = EditState::Dragging(GroupDrag {
            anchor: at,
            delta: (0.0, 0.0),
            snapshot,
        });
    }

    fn pointer_move(&mut self, x: f32, y: f32, out: &mut EventOutcome) {
        let at = self.viewport.screen_to_image(x, y);
        match &mut self.state {
            EditState::Drawing(draft) => draft.update(at),
            EditState::Dragging(drag) => {
                drag.delta = (at.x - drag.anchor.x, at.y - drag.anchor.y);
                log::trace!("Dragging by ({:.1}, {:.1})", drag.delta.0, drag.delta.1);
            }
            EditState::EditingVertex(vertex) => vertex.current = at,
            EditState::Idle | EditState::SelectionActive => return,
        }
        out.redraw = true;
    }

    fn pointer_up(&mut self, model: &mut ShapeModel, x: f32, y: f32, out: &mut EventOutcome) {
        let at = self.viewport.screen_to_image(x, y);
        match std::mem::take(&mut self.state) {
            EditState::Drawing(mut draft) if draft.is_press_gesture() => {
                draft.update(at);
                self.state = EditState::Drawing(draft);
                self.commit_draft(model, out);
            }
            EditState::Dragging(mut drag) => {
                drag.delta = (at.x - drag.anchor.x, at.y - drag.anchor.y);
                self.commit_group_drag(model, drag, out);
            }
            EditState::EditingVertex(mut vertex) => {
                vertex.current = at;
                self.commit_vertex(model, vertex, out);
            }
            other => self.state = other,
        }
    }

    fn pointer_leave(&mut self, out: &mut EventOutcome) {
        // Polygon drafts are built from separate clicks and outlive the pointer
        if let EditState::Drawing(Draft::Polygon { cursor, .. }) = &mut self.state {
            *cursor = None;
            out.redraw = true;
            return;
        }
        if self.state.is_gesture() {
            log::debug!("❌ Pointer left canvas, {} cancelled", self.state.name());
            self.abort_gesture(out);
        }
    }

    // ========================================================================
    // Commits
    // ========================================================================

    fn commit_draft(&mut self, model: &mut ShapeModel, out: &mut EventOutcome) {
        let EditState::Drawing(draft) = std::mem::take(&mut self.state) else {
            return;
        };
        let result = match (self.image, self.active_category) {
            (None, _) => Err(EditError::NoActiveImage),
            (_, None) => Err(EditError::NoActiveCategory),
            (Some(image_id), Some(category_id)) => {
                model.create(image_id, category_id, draft.geometry())
            }
        };
        match result {
            Ok(shape) => {
                log::info!(
                    "✅ Created {} annotation {} (category={})",
                    shape.kind().name(),
                    shape.id,
                    shape.category_id
                );
                self.selection.select_only(shape.id);
                out.model_changed = true;
                out.persistence.push(PersistenceOp::CreateAnnotation { shape });
            }
            Err(e) => {
                log::warn!("Draft discarded: {}", e);
                out.errors.push(e);
            }
        }
        self.settle();
        out.redraw = true;
    }

    fn commit_group_drag(&mut self, model: &mut ShapeModel, drag: GroupDrag, out: &mut EventOutcome) {
        out.redraw = true;
        if !drag.has_moved() {
            self.settle();
            return;
        }

        let (dx, dy) = drag.delta;
        let mut report = BatchReport::default();
        for (id, _) in &drag.snapshot {
            match model.update(*id, ShapeUpdate::Translate { dx, dy }) {
                Ok(shape) => {
                    report.succeeded.push(*id);
                    out.persistence.push(PersistenceOp::UpdateAnnotation {
                        id: *id,
                        change: AnnotationChange::Geometry(shape.geometry),
                    });
                }
                Err(e) => {
                    log::warn!("Could not move annotation {}: {}", id, e);
                    self.selection.remove(*id);
                    report.failed.push((*id, e));
                }
            }
        }
        log::info!(
            "↔️ Moved {} annotation(s) by ({:.1}, {:.1})",
            report.succeeded.len(),
            dx,
            dy
        );
        out.model_changed = !report.succeeded.is_empty();
        out.batch = Some(report);
        self.settle();
    }

    fn commit_vertex(&mut self, model: &mut ShapeModel, vertex: VertexDrag, out: &mut EventOutcome) {
        out.redraw = true;
        if vertex.has_moved() {
            let update = ShapeUpdate::MoveVertex {
                index: vertex.index,
                to: vertex.current,
            };
            match model.update(vertex.shape_id, update) {
                Ok(shape) => {
                    log::info!("Moved vertex {} of annotation {}", vertex.index, shape.id);
                    out.model_changed = true;
                    out.persistence.push(PersistenceOp::UpdateAnnotation {
                        id: shape.id,
                        change: AnnotationChange::Geometry(shape.geometry),
                    });
                }
                Err(e) => {
                    log::warn!("Vertex edit rejected: {}", e);
                    if matches!(e, EditError::ShapeNotFound { .. }) {
                        self.selection.remove(vertex.shape_id);
                    }
                    out.errors.push(e);
                }
            }
        }
        self.settle();
    }

    // ========================================================================
    // Actions
    // ========================================================================

    fn cancel(&mut self, out: &mut EventOutcome) {
        if self.state.is_gesture() {
            log::debug!("❌ {} cancelled", self.state.name());
            self.abort_gesture(out);
        } else if !self.selection.is_empty() {
            self.selection.clear();
            self.settle();
            out.redraw = true;
        }
    }

    fn select_all(&mut self, model: &ShapeModel, out: &mut EventOutcome) {
        let Some(image_id) = self.image else {
            return;
        };
        self.abort_gesture(out);
        self.selection
            .replace(model.list_for_image(image_id).iter().map(|s| s.id));
        log::debug!("🔍 Selected all {} annotation(s)", self.selection.len());
        self.settle();
        out.redraw = true;
    }

    fn copy(&mut self, model: &ShapeModel, out: &mut EventOutcome) {
        self.prune_stale(model, out);
        if self.selection.is_empty() {
            log::debug!("Nothing selected to copy");
            return;
        }
        let entries: Vec<ClipboardEntry> = self
            .selection
            .ids()
            .filter_map(|id| model.get(id))
            .map(ClipboardEntry::from)
            .collect();
        log::info!("📋 Copied {} annotation(s)", entries.len());
        self.clipboard.copy(entries);
    }

    fn paste(&mut self, model: &mut ShapeModel, out: &mut EventOutcome) {
        let Some((image_id, (width, height))) = self
            .image
            .and_then(|id| model.image(id).map(|info| (id, info.size())))
        else {
            return;
        };
        if self.clipboard.is_empty() {
            return;
        }
        self.abort_gesture(out);

        let offset = self.clipboard.next_paste_offset(self.editing.paste_offset);
        let mut report = BatchReport::default();
        for entry in self.clipboard.entries() {
            let (dx, dy) = paste_translation(&entry.geometry, offset, width, height);
            match model.create(image_id, entry.category_id, entry.geometry.translated(dx, dy)) {
                Ok(shape) => {
                    report.succeeded.push(shape.id);
                    out.persistence.push(PersistenceOp::CreateAnnotation { shape });
                }
                Err(e) => {
                    log::warn!("Could not paste annotation: {}", e);
                    out.errors.push(e);
                }
            }
        }
        log::info!("📋 Pasted {} annotation(s)", report.succeeded.len());

        self.selection.replace(report.succeeded.iter().copied());
        out.model_changed = !report.succeeded.is_empty();
        out.batch = Some(report);
        self.settle();
        out.redraw = true;
    }

    fn delete_selected(&mut self, model: &mut ShapeModel, out: &mut EventOutcome) {
        self.abort_gesture(out);
        let mut report = BatchReport::default();
        for id in self.selection.to_vec() {
            match model.delete(id) {
                Ok(_) => {
                    report.succeeded.push(id);
                    out.persistence.push(PersistenceOp::DeleteAnnotation { id });
                }
                Err(e) => report.failed.push((id, e)),
            }
        }
        if report.succeeded.is_empty() && report.failed.is_empty() {
            return;
        }
        log::info!("🗑️ Deleted {} annotation(s)", report.succeeded.len());
        self.selection.clear();
        out.model_changed = !report.succeeded.is_empty();
        out.batch = Some(report);
        self.settle();
        out.redraw = true;
    }

    fn reassign(&mut self, model: &mut ShapeModel, category_id: CategoryId, out: &mut EventOutcome) {
        self.abort_gesture(out);
        let mut report = BatchReport::default();
        for id in self.selection.to_vec() {
            match model.update(id, ShapeUpdate::Category(category_id)) {
                Ok(_) => {
                    report.succeeded.push(id);
                    out.persistence.push(PersistenceOp::UpdateAnnotation {
                        id,
                        change: AnnotationChange::Category(category_id),
                    });
                }
                Err(e) => {
                    if matches!(e, EditError::ShapeNotFound { .. }) {
                        self.selection.remove(id);
                    }
                    report.failed.push((id, e));
                }
            }
        }
        if !report.failed.is_empty() {
            log::warn!(
                "Category {} not applied to annotation(s) {:?}",
                category_id,
                report.failed_ids()
            );
        }
        log::info!(
            "🏷️ Reassigned {} annotation(s) to category {}",
            report.succeeded.len(),
            category_id
        );
        out.model_changed = !report.succeeded.is_empty();
        out.redraw = out.model_changed;
        out.batch = Some(report);
        self.settle();
    }

    fn switch_image(&mut self, model: &ShapeModel, image_id: ImageId, out: &mut EventOutcome) {
        if model.image(image_id).is_none() {
            out.errors.push(EditError::ImageNotFound { id: image_id });
            return;
        }
        self.abort_gesture(out);
        self.selection.clear();
        self.image = Some(image_id);
        self.auto_fit = true;
        self.fit_to_screen(model);
        self.settle();
        log::debug!("Switched to image {}", image_id);
        out.redraw = true;
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn canvas_center(&self) -> (f32, f32) {
        self.canvas
            .map_or((0.0, 0.0), |(width, height)| (width / 2.0, height / 2.0))
    }

    fn fit_to_screen(&mut self, model: &ShapeModel) {
        let image = self.image.and_then(|id| model.image(id));
        if let (Some(image), Some((canvas_w, canvas_h))) = (image, self.canvas) {
            let (image_w, image_h) = image.size();
            self.viewport =
                Viewport::fit(canvas_w, canvas_h, image_w, image_h, self.view.fit_margin);
        } else {
            self.viewport = Viewport::identity();
        }
    }

    /// Discard the current gesture; committed shapes are untouched.
    fn abort_gesture(&mut self, out: &mut EventOutcome) {
        if self.state.is_gesture() {
            out.redraw = true;
        }
        self.settle();
    }

    /// Return to `Idle` or `SelectionActive` depending on the selection.
    fn settle(&mut self) {
        self.state = if self.selection.is_empty() {
            EditState::Idle
        } else {
            EditState::SelectionActive
        };
    }

    /// Drop selected ids that were deleted behind the controller's back.
    fn prune_stale(&mut self, model: &ShapeModel, out: &mut EventOutcome) {
        let stale = self.selection.prune(|id| model.contains(id));
        if stale.is_empty() {
            return;
        }
        log::warn!("Dropped stale annotation(s) {:?} from selection", stale);
        if self.selection.is_empty() {
            out.errors
                .extend(stale.into_iter().map(|id| EditError::ShapeNotFound { id }));
        }
        self.settle();
        out.redraw = true;
    }
}

/// Offset for a pasted copy. Each axis moves by `offset` down/right, or
/// up/left when the image edge leaves more room that way, so a copy never
/// lands exactly on its source while either direction has room.
fn paste_translation(geometry: &Geometry, offset: f32, width: f32, height: f32) -> (f32, f32) {
    let (fx, fy) = clamp_translation(geometry, offset, offset, width, height);
    let (bx, by) = clamp_translation(geometry, -offset, -offset, width, height);
    let pick = |forward: f32, back: f32| if forward.abs() >= back.abs() { forward } else { back };
    (pick(fx, bx), pick(fy, by))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, ImageInfo, Polygon};

    struct Fixture {
        model: ShapeModel,
        controller: EditController,
        car: CategoryId,
        person: CategoryId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut model = ShapeModel::new();
            model.register_image(ImageInfo::new(1, "a.jpg", 200, 200));
            model.register_image(ImageInfo::new(2, "b.jpg", 100, 100));
            let car = model.add_category("car", [255, 0, 0]).unwrap();
            let person = model.add_category("person", [0, 0, 255]).unwrap();
            let mut fixture = Self {
                model,
                controller: EditController::new(EditingSettings::default(), ViewportSettings::default()),
                car,
                person,
            };
            fixture.send(EditorEvent::SwitchImage(1));
            fixture.send(EditorEvent::SetCategory(car));
            fixture
        }

        fn send(&mut self, event: EditorEvent) -> EventOutcome {
            self.controller.handle_event(&mut self.model, event)
        }

        fn click(&mut self, x: f32, y: f32) -> EventOutcome {
            self.send(EditorEvent::press(x, y));
            self.send(EditorEvent::PointerUp { x, y })
        }

        fn drag(&mut self, from: (f32, f32), to: (f32, f32)) -> EventOutcome {
            self.send(EditorEvent::press(from.0, from.1));
            self.send(EditorEvent::PointerMove { x: to.0, y: to.1 });
            self.send(EditorEvent::PointerUp { x: to.0, y: to.1 })
        }

        fn add_box(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> ShapeId {
            self.model
                .create(1, self.car, Geometry::BoundingBox(BoundingBox::new(x1, y1, x2, y2)))
                .unwrap()
                .id
        }

        fn geometry(&self, id: ShapeId) -> Geometry {
            self.model.get(id).unwrap().geometry.clone()
        }
    }

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> Geometry {
        Geometry::BoundingBox(BoundingBox::new(x1, y1, x2, y2))
    }

    #[test]
    fn test_draw_box_selects_new_shape() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::BoundingBox));
        let out = f.drag((110.0, 120.0), (10.0, 20.0));

        assert!(out.model_changed);
        assert_eq!(out.persistence.len(), 1);
        let shapes = f.model.list_for_image(1);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].geometry, bbox(10.0, 20.0, 110.0, 120.0));
        assert_eq!(f.controller.selection().to_vec(), vec![shapes[0].id]);
        assert_eq!(f.controller.state(), &EditState::SelectionActive);
    }

    #[test]
    fn test_draft_may_leave_image_but_commit_is_clamped() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::BoundingBox));
        f.send(EditorEvent::press(150.0, 150.0));
        f.send(EditorEvent::PointerMove { x: 260.0, y: 230.0 });
        match f.controller.state() {
            EditState::Drawing(draft) => assert_eq!(draft.geometry(), bbox(150.0, 150.0, 260.0, 230.0)),
            other => panic!("unexpected state {:?}", other),
        }
        f.send(EditorEvent::PointerUp { x: 260.0, y: 230.0 });
        let id = f.controller.selection().to_vec()[0];
        assert_eq!(f.geometry(id), bbox(150.0, 150.0, 200.0, 200.0));
    }

    #[test]
    fn test_drawing_without_category_is_rejected() {
        let mut model = ShapeModel::new();
        model.register_image(ImageInfo::new(1, "a.jpg", 50, 50));
        let mut controller =
            EditController::new(EditingSettings::default(), ViewportSettings::default());
        controller.handle_event(&mut model, EditorEvent::SwitchImage(1));
        controller.handle_event(&mut model, EditorEvent::SetTool(AnnotationTool::Point));
        controller.handle_event(&mut model, EditorEvent::press(5.0, 5.0));
        let out = controller.handle_event(&mut model, EditorEvent::PointerUp { x: 5.0, y: 5.0 });

        assert_eq!(out.errors, vec![EditError::NoActiveCategory]);
        assert!(model.is_empty());
        assert_eq!(controller.state(), &EditState::Idle);
    }

    #[test]
    fn test_leaving_canvas_cancels_box_draft() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::BoundingBox));
        f.send(EditorEvent::press(10.0, 10.0));
        f.send(EditorEvent::PointerMove { x: 50.0, y: 50.0 });
        f.send(EditorEvent::PointerLeave);
        f.send(EditorEvent::PointerUp { x: 50.0, y: 50.0 });
        assert!(f.model.is_empty());
        assert_eq!(f.controller.state(), &EditState::Idle);
    }

    #[test]
    fn test_polygon_closes_near_first_vertex() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::Polygon));
        f.click(10.0, 10.0);
        f.click(100.0, 10.0);
        f.click(100.0, 100.0);
        assert!(f.model.is_empty());
        let out = f.click(13.0, 12.0);

        assert!(out.model_changed);
        let id = f.controller.selection().to_vec()[0];
        assert_eq!(
            f.geometry(id),
            Geometry::Polygon(Polygon::new(vec![
                Point::new(10.0, 10.0),
                Point::new(100.0, 10.0),
                Point::new(100.0, 100.0),
            ]))
        );
    }

    #[test]
    fn test_polygon_draft_survives_pointer_leave() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::Polygon));
        f.click(10.0, 10.0);
        f.send(EditorEvent::PointerLeave);
        assert!(matches!(f.controller.state(), EditState::Drawing(_)));
        f.send(EditorEvent::Cancel);
        assert_eq!(f.controller.state(), &EditState::Idle);
        assert!(f.model.is_empty());
    }

    #[test]
    fn test_finish_keeps_degenerate_polygon() {
        let mut f = Fixture::new();
        f.send(EditorEvent::SetTool(AnnotationTool::Polygon));
        f.click(10.0, 10.0);
        f.click(40.0, 40.0);
        f.send(EditorEvent::Finish);

        let shapes = f.model.list_for_image(1);
        assert_eq!(shapes.len(), 1);
        assert!(!shapes[0].is_exportable());
    }

    #[test]
    fn test_click_selects_topmost_and_empty_clears() {
        let mut f = Fixture::new();
        let _below = f.add_box(0.0, 0.0, 50.0, 50.0);
        let above = f.add_box(25.0, 25.0, 75.0, 75.0);

        f.click(30.0, 30.0);
        assert_eq!(f.controller.selection().to_vec(), vec![above]);
        assert_eq!(f.controller.state(), &EditState::SelectionActive);

        f.click(150.0, 150.0);
        assert!(f.controller.selection().is_empty());
        assert_eq!(f.controller.state(), &EditState::Idle);
    }

    #[test]
    fn test_multi_select_toggles() {
        let mut f = Fixture::new();
        let a = f.add_box(0.0, 0.0, 20.0, 20.0);
        let b = f.add_box(100.0, 100.0, 120.0, 120.0);

        f.send(EditorEvent::press_multi(10.0, 10.0));
        f.send(EditorEvent::press_multi(110.0, 110.0));
        assert_eq!(f.controller.selection().to_vec(), vec![a, b]);

        f.send(EditorEvent::press_multi(10.0, 10.0));
        assert_eq!(f.controller.selection().to_vec(), vec![b]);
    }

    #[test]
    fn test_group_drag_clamps_each_shape_independently() {
        let mut f = Fixture::new();
        let a = f.add_box(10.0, 10.0, 50.0, 50.0);
        let b = f.add_box(150.0, 10.0, 190.0, 50.0);
        f.send(EditorEvent::press_multi(20.0, 20.0));
        f.send(EditorEvent::press_multi(160.0, 20.0));

        let out = f.drag((20.0, 20.0), (50.0, 20.0));

        assert_eq!(out.batch.unwrap().succeeded, vec![a, b]);
        assert_eq!(f.geometry(a), bbox(40.0, 10.0, 80.0, 50.0));
        assert_eq!(f.geometry(b), bbox(160.0, 10.0, 200.0, 50.0));
        assert_eq!(f.controller.state(), &EditState::SelectionActive);
    }

    #[test]
    fn test_drag_preview_does_not_touch_model() {
        let mut f = Fixture::new();
        let a = f.add_box(10.0, 10.0, 50.0, 50.0);
        f.send(EditorEvent::press(20.0, 20.0));
        f.send(EditorEvent::PointerMove { x: 60.0, y: 60.0 });
        assert!(matches!(f.controller.state(), EditState::Dragging(_)));
        assert_eq!(f.geometry(a), bbox(10.0, 10.0, 50.0, 50.0));

        f.send(EditorEvent::Cancel);
        assert_eq!(f.geometry(a), bbox(10.0, 10.0, 50.0, 50.0));
        assert_eq!(f.controller.state(), &EditState::SelectionActive);
    }

    #[test]
    fn test_leaving_canvas_restores_dragged_shapes() {
        let mut f = Fixture::new();
        let a = f.add_box(10.0, 10.0, 50.0, 50.0);
        f.send(EditorEvent::press(20.0, 20.0));
        f.send(EditorEvent::PointerMove { x: 90.0, y: 70.0 });

        let out = f.send(EditorEvent::PointerLeave);
        assert!(out.redraw);
        assert!(out.persistence.is_empty());
        assert_eq!(f.controller.state(), &EditState::SelectionActive);

        // A release outside the canvas arrives after the leave
        let out = f.send(EditorEvent::PointerUp { x: 90.0, y: 70.0 });
        assert!(!out.model_changed);
        assert_eq!(f.geometry(a), bbox(10.0, 10.0, 50.0, 50.0));
    }

    #[test]
    fn test_leaving_canvas_restores_vertex() {
        let mut f = Fixture::new();
        let a = f.add_box(10.0, 20.0, 110.0, 120.0);
        f.click(50.0, 50.0);
        f.send(EditorEvent::press(110.0, 120.0));
        f.send(EditorEvent::PointerMove { x: 180.0, y: 190.0 });
        assert!(matches!(f.controller.state(), EditState::EditingVertex(_)));

        f.send(EditorEvent::PointerLeave);
        let out = f.send(EditorEvent::PointerUp { x: 180.0, y: 190.0 });

        assert!(!out.model_changed);
        assert_eq!(f.geometry(a), bbox(10.0, 20.0, 110.0, 120.0));
        assert_eq!(f.controller.selection().to_vec(), vec![a]);
    }

    #[test]
    fn test_vertex_edit_on_selected_box() {
        let mut f = Fixture::new();
        let a = f.add_box(10.0, 20.0, 110.0, 120.0);
        f.click(50.0, 50.0);

        f.send(EditorEvent::press(110.0, 120.0));
        assert!(matches!(f.controller.state(), EditState::EditingVertex(_)));
        f.send(EditorEvent::PointerMove { x: 150.0, y: 160.0 });
        let out = f.send(EditorEvent::PointerUp { x: 150.0, y: 160.0 });

        assert!(out.model_changed);
        assert_eq!(f.geometry(a), bbox(10.0, 20.0, 150.0, 160.0));
    }

    #[test]
    fn test_copy_paste_twice() {
        let mut f = Fixture::new();
        let originals = [
            f.add_box(0.0, 0.0, 10.0, 10.0),
            f.add_box(20.0, 20.0, 30.0, 30.0),
            f.add_box(40.0, 40.0, 50.0, 50.0),
        ];
        f.send(EditorEvent::SelectAll);
        f.send(EditorEvent::Copy);
        let first = f.send(EditorEvent::Paste).batch.unwrap().succeeded;
        let second = f.send(EditorEvent::Paste).batch.unwrap().succeeded;

        assert_eq!(f.model.len(), 9);
        let mut all: Vec<ShapeId> = originals.iter().chain(&first).chain(&second).copied().collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 9);

        assert_eq!(f.geometry(first[0]), bbox(10.0, 10.0, 20.0, 20.0));
        assert_eq!(f.geometry(second[0]), bbox(20.0, 20.0, 30.0, 30.0));
        assert_eq!(f.controller.selection().to_vec(), second);
    }

    #[test]
    fn test_paste_at_image_edge_still_offsets() {
        let mut f = Fixture::new();
        let original = f.add_box(180.0, 180.0, 200.0, 200.0);
        f.send(EditorEvent::SelectAll);
        f.send(EditorEvent::Copy);
        let first = f.send(EditorEvent::Paste).batch.unwrap().succeeded;
        let second = f.send(EditorEvent::Paste).batch.unwrap().succeeded;

        assert_eq!(f.geometry(original), bbox(180.0, 180.0, 200.0, 200.0));
        assert_eq!(f.geometry(first[0]), bbox(170.0, 170.0, 190.0, 190.0));
        assert_eq!(f.geometry(second[0]), bbox(160.0, 160.0, 180.0, 180.0));
    }

    #[test]
    fn test_paste_offset_per_axis() {
        let mut f = Fixture::new();
        // Room to the right, none below
        f.add_box(10.0, 190.0, 30.0, 200.0);
        f.send(EditorEvent::SelectAll);
        f.send(EditorEvent::Copy);
        let pasted = f.send(EditorEvent::Paste).batch.unwrap().succeeded;
        assert_eq!(f.geometry(pasted[0]), bbox(20.0, 180.0, 40.0, 190.0));
    }

    #[test]
    fn test_paste_across_images() {
        let mut f = Fixture::new();
        f.add_box(180.0, 180.0, 195.0, 195.0);
        f.send(EditorEvent::SelectAll);
        f.send(EditorEvent::Copy);

        f.send(EditorEvent::SwitchImage(2));
        assert!(f.controller.selection().is_empty());
        f.send(EditorEvent::Paste);

        let pasted = f.model.list_for_image(2);
        assert_eq!(pasted.len(), 1);
        let (min, max) = pasted[0].geometry.bounds().unwrap();
        assert!(min.x >= 0.0 && max.x <= 100.0 && max.y <= 100.0);
    }

    #[test]
    fn test_delete_selection() {
        let mut f = Fixture::new();
        let a = f.add_box(0.0, 0.0, 10.0, 10.0);
        let b = f.add_box(20.0, 20.0, 30.0, 30.0);
        f.click(5.0, 5.0);
        let out = f.send(EditorEvent::Delete);

        assert_eq!(out.persistence, vec![PersistenceOp::DeleteAnnotation { id: a }]);
        assert!(!f.model.contains(a));
        assert!(f.model.contains(b));
        assert!(f.controller.selection().is_empty());
    }

    #[test]
    fn test_reassign_reports_failures_per_shape() {
        let mut f = Fixture::new();
        let a = f.add_box(0.0, 0.0, 10.0, 10.0);
        let b = f.add_box(20.0, 20.0, 30.0, 30.0);
        f.send(EditorEvent::SelectAll);

        let out = f.send(EditorEvent::ReassignCategory(99));
        let report = out.batch.unwrap();
        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed_ids(), vec![a, b]);
        assert_eq!(f.model.get(a).unwrap().category_id, f.car);

        let person = f.person;
        let out = f.send(EditorEvent::ReassignCategory(person));
        assert_eq!(out.batch.unwrap().succeeded, vec![a, b]);
        assert_eq!(f.model.get(b).unwrap().category_id, person);
    }

    #[test]
    fn test_stale_selection_reported_when_emptied() {
        let mut f = Fixture::new();
        let a = f.add_box(0.0, 0.0, 10.0, 10.0);
        f.click(5.0, 5.0);
        f.model.delete(a).unwrap();

        let out = f.send(EditorEvent::Copy);
        assert_eq!(out.errors, vec![EditError::ShapeNotFound { id: a }]);
        assert!(f.controller.selection().is_empty());
        assert!(f.controller.clipboard().is_empty());
    }

    #[test]
    fn test_switch_to_unknown_image() {
        let mut f = Fixture::new();
        let out = f.send(EditorEvent::SwitchImage(7));
        assert_eq!(out.errors, vec![EditError::ImageNotFound { id: 7 }]);
        assert_eq!(f.controller.current_image(), Some(1));
    }

    #[test]
    fn test_resize_fits_image() {
        let mut f = Fixture::new();
        f.send(EditorEvent::Resize {
            width: 400.0,
            height: 400.0,
        });
        let zoom = f.controller.viewport().zoom;
        assert!((zoom - 1.8).abs() < 1e-4);

        f.send(EditorEvent::ZoomAt {
            factor: 1.2,
            x: 200.0,
            y: 200.0,
        });
        f.send(EditorEvent::Resize {
            width: 800.0,
            height: 800.0,
        });
        // Manual zoom sticks until the next fit
        assert!((f.controller.viewport().zoom - 2.16).abs() < 1e-4);
    }

    #[test]
    fn test_screen_coordinates_respect_zoom() {
        let mut f = Fixture::new();
        f.send(EditorEvent::Resize {
            width: 400.0,
            height: 400.0,
        });
        // zoom 1.8, pan 20: image (10, 20) is at screen (38, 56)
        f.send(EditorEvent::SetTool(AnnotationTool::Point));
        f.click(38.0, 56.0);
        let id = f.controller.selection().to_vec()[0];
        match f.geometry(id) {
            Geometry::Point(p) => {
                assert!((p.x - 10.0).abs() < 1e-3);
                assert!((p.y - 20.0).abs() < 1e-3);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_unusable_zoom_and_pan_are_ignored() {
        let mut f = Fixture::new();
        let before = *f.controller.viewport();

        for factor in [f32::NAN, f32::INFINITY, 0.0, -2.0] {
            let out = f.send(EditorEvent::ZoomAt { factor, x: 10.0, y: 10.0 });
            assert!(!out.redraw);
        }
        f.send(EditorEvent::Pan {
            dx: f32::NAN,
            dy: 3.0,
        });
        assert_eq!(*f.controller.viewport(), before);

        f.send(EditorEvent::ZoomAt {
            factor: 1.2,
            x: 0.0,
            y: 0.0,
        });
        assert!((f.controller.viewport().zoom - 1.2).abs() < 1e-4);

        // Drawing still maps to finite image coordinates
        f.send(EditorEvent::SetTool(AnnotationTool::Point));
        let out = f.click(12.0, 24.0);
        assert!(out.model_changed);
    }

    #[test]
    fn test_zoom_steps_use_configured_factor() {
        let mut f = Fixture::new();
        f.controller = EditController::new(
            EditingSettings::default(),
            ViewportSettings {
                zoom_factor: 2.0,
                ..ViewportSettings::default()
            },
        );
        f.send(EditorEvent::SwitchImage(1));
        f.send(EditorEvent::Resize {
            width: 200.0,
            height: 200.0,
        });
        f.send(EditorEvent::FitToScreen);
        let fitted = f.controller.viewport().zoom;
        let centre = f.controller.viewport().screen_to_image(100.0, 100.0);

        f.send(EditorEvent::ZoomIn);
        assert!((f.controller.viewport().zoom - fitted * 2.0).abs() < 1e-4);
        let after = f.controller.viewport().screen_to_image(100.0, 100.0);
        assert!((after.x - centre.x).abs() < 1e-3);

        f.send(EditorEvent::ZoomOut);
        f.send(EditorEvent::ZoomOut);
        assert!((f.controller.viewport().zoom - fitted / 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_viewport_settings_fall_back_to_defaults() {
        let mut f = Fixture::new();
        f.controller = EditController::new(
            EditingSettings::default(),
            ViewportSettings {
                min_zoom: 10.0,
                max_zoom: 1.0,
                ..ViewportSettings::default()
            },
        );
        f.send(EditorEvent::SwitchImage(1));
        f.send(EditorEvent::ZoomAt {
            factor: 100.0,
            x: 0.0,
            y: 0.0,
        });
        assert_eq!(f.controller.viewport().zoom, ViewportSettings::default().max_zoom);
    }
}
