//! Editing session.
//!
//! [`Editor`] owns the shape model, the edit controller, the write-behind
//! queue and the render surface. Every mutation goes through it so that the
//! canvas is redrawn right after the change and the matching persistence
//! call is queued in issue order.

use std::collections::BTreeSet;

use web_time::Instant;

use crate::color_utils::distinct_category_color;
use crate::config::EditorConfig;
use crate::error::{EditError, PersistenceWarning};
use crate::format::{
    AnnotationFormat, Dataset, ExportOptions, ExportResult, FormatError, ImportOptions,
    ImportResult,
};
use crate::message::EditorEvent;
use crate::model::{CategoryId, ImageId, ImageInfo, Shape, ShapeId, ShapeModel};
use crate::persistence::{
    AnnotationChange, PersistenceOp, PersistenceService, RetryPolicy, Ticket, WriteBehindQueue,
};
use crate::render::{Overlay, RenderSurface, build_overlay};
use crate::state::{EditController, EventOutcome};

/// A live editing session over one project.
pub struct Editor<S: RenderSurface> {
    config: EditorConfig,
    model: ShapeModel,
    controller: EditController,
    queue: WriteBehindQueue,
    surface: S,
}

impl<S: RenderSurface> Editor<S> {
    /// Start a session over an empty project.
    pub fn new(config: EditorConfig, surface: S) -> Self {
        Self::with_model(config, ShapeModel::new(), surface)
    }

    /// Start a session over an existing model (e.g. a loaded project file).
    pub fn with_model(config: EditorConfig, model: ShapeModel, surface: S) -> Self {
        let controller = EditController::from_config(&config);
        let queue = WriteBehindQueue::new(RetryPolicy::from_settings(&config.persistence));
        Self {
            config,
            model,
            controller,
            queue,
            surface,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &ShapeModel {
        &self.model
    }

    pub fn controller(&self) -> &EditController {
        &self.controller
    }

    pub fn queue(&self) -> &WriteBehindQueue {
        &self.queue
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Frame for the current image and gesture.
    pub fn overlay(&self) -> Overlay {
        build_overlay(&self.model, &self.controller)
    }

    fn render(&mut self) {
        let overlay = build_overlay(&self.model, &self.controller);
        self.surface.draw(&overlay);
    }

    fn queue_all(&mut self, ops: impl IntoIterator<Item = PersistenceOp>) {
        for op in ops {
            self.queue.enqueue(op);
        }
    }

    /// Resync the controller after a change made outside it, then redraw.
    fn after_external_change(&mut self) {
        self.controller.sync_with_model(&self.model);
        self.render();
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Feed one pointer/keyboard action to the controller.
    pub fn dispatch(&mut self, event: EditorEvent) -> EventOutcome {
        let view_only = event.is_view_only();
        let outcome = self.controller.handle_event(&mut self.model, event);
        for error in &outcome.errors {
            log::warn!("❌ {}", error);
        }
        if !view_only {
            self.queue_all(outcome.persistence.iter().cloned());
        }
        if outcome.redraw {
            self.render();
        }
        outcome
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// Create a category. Without an explicit color, a deterministic color
    /// distinct from the existing ones is picked.
    pub fn add_category(
        &mut self,
        name: &str,
        color: Option<[u8; 3]>,
    ) -> Result<CategoryId, EditError> {
        let color = color.unwrap_or_else(|| {
            let taken: Vec<[u8; 3]> = self.model.categories().iter().map(|c| c.color).collect();
            distinct_category_color(name.trim(), &taken)
        });
        let id = self.model.add_category(name, color)?;
        if let Some(category) = self.model.category(id) {
            self.queue.enqueue(PersistenceOp::CreateCategory {
                category: category.clone(),
            });
        }
        log::info!("🏷️ Added category {}", id);
        Ok(id)
    }

    /// Rename and/or recolor a category.
    pub fn update_category(
        &mut self,
        id: CategoryId,
        name: Option<&str>,
        color: Option<[u8; 3]>,
    ) -> Result<(), EditError> {
        self.model.update_category(id, name, color)?;
        if let Some(category) = self.model.category(id) {
            self.queue.enqueue(PersistenceOp::UpdateCategory {
                category: category.clone(),
            });
        }
        self.render();
        Ok(())
    }

    /// Delete a category together with all of its shapes.
    pub fn delete_category(&mut self, id: CategoryId) -> Result<Vec<ShapeId>, EditError> {
        let removed = self.model.delete_category(id)?;
        self.queue.enqueue(PersistenceOp::DeleteCategory { id });
        self.after_external_change();
        Ok(removed)
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Declare an image provided by the image service. Re-declaring it with
    /// smaller dimensions clamps its shapes and queues their new geometry.
    pub fn register_image(&mut self, info: ImageInfo) -> Vec<ShapeId> {
        let clamped = self.model.register_image(info);
        let ids = clamped.iter().map(|shape| shape.id).collect();
        self.queue_all(clamped.into_iter().map(|shape| PersistenceOp::UpdateAnnotation {
            id: shape.id,
            change: AnnotationChange::Geometry(shape.geometry),
        }));
        self.after_external_change();
        ids
    }

    /// Forget an image and every shape on it.
    pub fn remove_image(&mut self, id: ImageId) -> Result<Vec<ShapeId>, EditError> {
        let removed = self.model.remove_image(id)?;
        self.after_external_change();
        Ok(removed)
    }

    /// Add shapes returned by the persistence service's listing for an
    /// image. Listed shapes are already stored, so nothing is queued.
    ///
    /// Shapes that fail validation are skipped and returned with the reason.
    pub fn load_annotations(
        &mut self,
        image_id: ImageId,
        shapes: Vec<Shape>,
    ) -> Vec<(ShapeId, EditError)> {
        let mut rejected = Vec::new();
        for shape in shapes {
            let id = shape.id;
            let result = if shape.image_id == image_id {
                self.model.insert_shape(shape)
            } else {
                Err(EditError::ImageNotFound { id: shape.image_id })
            };
            if let Err(e) = result {
                log::warn!("Listed annotation {} not loaded: {}", id, e);
                rejected.push((id, e));
            }
        }
        self.after_external_change();
        rejected
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Send the next queued operation if the service is idle.
    pub fn pump(&mut self, service: &mut dyn PersistenceService, now: Instant) -> Option<Ticket> {
        self.queue.pump(service, now)
    }

    /// When the host should next call [`Editor::pump`]: `None` while a call
    /// is in flight or nothing is queued, otherwise `now` or the end of the
    /// current backoff, whichever is later.
    pub fn next_pump_at(&self, now: Instant) -> Option<Instant> {
        if self.queue.is_in_flight() || self.queue.is_empty() {
            return None;
        }
        Some(self.queue.next_retry_at().map_or(now, |at| at.max(now)))
    }

    /// Report the outcome of a dispatched persistence call. A failure never
    /// touches the local model; the returned warning is for the host's banner.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<(), String>,
        now: Instant,
    ) -> Option<PersistenceWarning> {
        self.queue.complete(ticket, result, now)
    }

    // ========================================================================
    // Interchange
    // ========================================================================

    /// Export the project with a codec, honoring the configured strict mode.
    pub fn export(&self, format: &dyn AnnotationFormat) -> Result<ExportResult, FormatError> {
        format.export(&self.model, &ExportOptions::from_settings(&self.config.export))
    }

    /// Import a dataset and queue creation of everything it added.
    pub fn import(
        &mut self,
        format: &dyn AnnotationFormat,
        dataset: &Dataset,
        options: &ImportOptions,
    ) -> Result<ImportResult, FormatError> {
        let known_categories: BTreeSet<CategoryId> =
            self.model.categories().iter().map(|c| c.id).collect();
        let known_shapes: BTreeSet<ShapeId> = self.model.shapes().map(|s| s.id).collect();

        let result = format.import(dataset, &mut self.model, options)?;

        let mut ops: Vec<PersistenceOp> = self
            .model
            .categories()
            .iter()
            .filter(|c| !known_categories.contains(&c.id))
            .map(|c| PersistenceOp::CreateCategory {
                category: c.clone(),
            })
            .collect();
        ops.extend(
            self.model
                .shapes()
                .filter(|s| !known_shapes.contains(&s.id))
                .map(|s| PersistenceOp::CreateAnnotation { shape: s.clone() }),
        );
        self.queue_all(ops);
        self.after_external_change();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::formats::YoloFormat;
    use crate::model::{AnnotationTool, Geometry, Point};

    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<Overlay>,
    }

    impl RenderSurface for RecordingSurface {
        fn draw(&mut self, overlay: &Overlay) {
            self.frames.push(overlay.clone());
        }
    }

    #[derive(Default)]
    struct RecordingService {
        sent: Vec<(Ticket, PersistenceOp)>,
    }

    impl PersistenceService for RecordingService {
        fn dispatch(&mut self, ticket: Ticket, op: &PersistenceOp) {
            self.sent.push((ticket, op.clone()));
        }
    }

    fn editor() -> (Editor<RecordingSurface>, CategoryId) {
        let mut editor = Editor::new(EditorConfig::default(), RecordingSurface::default());
        editor.register_image(ImageInfo::new(1, "field.jpg", 300, 200));
        let crop = editor.add_category("crop", Some([0, 200, 0])).unwrap();
        editor.dispatch(EditorEvent::SwitchImage(1));
        editor.dispatch(EditorEvent::SetCategory(crop));
        editor.dispatch(EditorEvent::SetTool(AnnotationTool::BoundingBox));
        (editor, crop)
    }

    fn draw_box(editor: &mut Editor<RecordingSurface>) -> EventOutcome {
        editor.dispatch(EditorEvent::press(10.0, 10.0));
        editor.dispatch(EditorEvent::PointerMove { x: 60.0, y: 40.0 });
        editor.dispatch(EditorEvent::PointerUp { x: 60.0, y: 40.0 })
    }

    #[test]
    fn test_commit_redraws_and_queues() {
        let (mut editor, _) = editor();
        let frames_before = editor.surface().frames.len();

        let outcome = draw_box(&mut editor);

        assert!(outcome.model_changed);
        assert_eq!(editor.model().len(), 1);
        assert!(editor.surface().frames.len() > frames_before);
        let last = editor.surface().frames.last().unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.preview.is_none());
        // CreateCategory, then CreateAnnotation
        assert_eq!(editor.queue().len(), 2);
    }

    #[test]
    fn test_failed_save_keeps_local_change() {
        let (mut editor, _) = editor();
        draw_box(&mut editor);
        let mut service = RecordingService::default();
        let now = Instant::now();

        let ticket = editor.pump(&mut service, now).unwrap();
        let warning = editor.complete(ticket, Err("503".into()), now).unwrap();

        assert!(!warning.gave_up);
        assert_eq!(editor.model().len(), 1);
        assert_eq!(editor.queue().len(), 2);
    }

    #[test]
    fn test_operations_sent_in_issue_order() {
        let (mut editor, crop) = editor();
        draw_box(&mut editor);
        editor.dispatch(EditorEvent::Delete);
        editor.delete_category(crop).unwrap();

        let mut service = RecordingService::default();
        let now = Instant::now();
        while let Some(ticket) = editor.pump(&mut service, now) {
            editor.complete(ticket, Ok(()), now);
        }

        let kinds: Vec<&str> = service
            .sent
            .iter()
            .map(|(_, op)| match op {
                PersistenceOp::CreateCategory { .. } => "create-category",
                PersistenceOp::CreateAnnotation { .. } => "create",
                PersistenceOp::DeleteAnnotation { .. } => "delete",
                PersistenceOp::DeleteCategory { .. } => "delete-category",
                PersistenceOp::UpdateAnnotation { .. } => "update",
                PersistenceOp::UpdateCategory { .. } => "update-category",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["create-category", "create", "delete", "delete-category"]
        );
        assert!(editor.queue().is_empty());
    }

    #[test]
    fn test_category_delete_cascades_and_prunes_selection() {
        let (mut editor, crop) = editor();
        draw_box(&mut editor);
        assert_eq!(editor.controller().selection().len(), 1);

        let removed = editor.delete_category(crop).unwrap();

        assert_eq!(removed.len(), 1);
        assert!(editor.model().is_empty());
        assert!(editor.controller().selection().is_empty());
        assert_eq!(editor.controller().active_category(), None);
        assert!(editor.surface().frames.last().unwrap().items.is_empty());
    }

    #[test]
    fn test_add_category_picks_distinct_color() {
        let (mut editor, _) = editor();
        let weed = editor.add_category("weed", None).unwrap();
        let color = editor.model().category(weed).unwrap().color;
        assert_ne!(color, [0, 200, 0]);
        assert!(matches!(
            editor.add_category("  ", None),
            Err(EditError::EmptyCategoryName)
        ));
    }

    #[test]
    fn test_load_annotations_does_not_queue() {
        let (mut editor, crop) = editor();
        let queued = editor.queue().len();
        let listed = vec![
            Shape {
                id: 50,
                category_id: crop,
                image_id: 1,
                geometry: Geometry::Point(Point::new(5.0, 5.0)),
            },
            Shape {
                id: 51,
                category_id: 99,
                image_id: 1,
                geometry: Geometry::Point(Point::new(6.0, 6.0)),
            },
        ];

        let rejected = editor.load_annotations(1, listed);

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 51);
        assert!(editor.model().contains(50));
        assert_eq!(editor.queue().len(), queued);
        assert_eq!(editor.overlay().items.len(), 1);
    }

    #[test]
    fn test_load_annotations_keeps_local_shape_on_id_clash() {
        let (mut editor, crop) = editor();
        editor.register_image(ImageInfo::new(2, "other.jpg", 100, 100));
        draw_box(&mut editor);
        let local = editor.model().list_for_image(1)[0].clone();

        let rejected = editor.load_annotations(
            2,
            vec![Shape {
                id: local.id,
                category_id: crop,
                image_id: 2,
                geometry: Geometry::Point(Point::new(1.0, 1.0)),
            }],
        );

        assert_eq!(rejected, vec![(local.id, EditError::DuplicateShapeId { id: local.id })]);
        assert_eq!(editor.model().get(local.id), Some(&local));
        assert!(editor.model().list_for_image(2).is_empty());
    }

    #[test]
    fn test_shrinking_image_queues_clamped_geometry() {
        let (mut editor, _) = editor();
        draw_box(&mut editor);
        let id = editor.model().list_for_image(1)[0].id;
        let queued = editor.queue().len();

        let clamped = editor.register_image(ImageInfo::new(1, "field.jpg", 40, 30));

        assert_eq!(clamped, vec![id]);
        assert_eq!(editor.queue().len(), queued + 1);
        let (_, max) = editor.model().get(id).unwrap().geometry.bounds().unwrap();
        assert!(max.x <= 40.0 && max.y <= 30.0);
    }

    #[test]
    fn test_view_events_queue_nothing() {
        let (mut editor, _) = editor();
        let queued = editor.queue().len();
        let frames = editor.surface().frames.len();

        editor.dispatch(EditorEvent::Resize {
            width: 600.0,
            height: 400.0,
        });
        editor.dispatch(EditorEvent::ZoomIn);
        editor.dispatch(EditorEvent::Pan { dx: 5.0, dy: 5.0 });

        assert_eq!(editor.queue().len(), queued);
        assert_eq!(editor.surface().frames.len(), frames + 3);
    }

    #[test]
    fn test_next_pump_at_follows_backoff() {
        let (mut editor, _) = editor();
        let mut service = RecordingService::default();
        let now = Instant::now();
        assert_eq!(editor.next_pump_at(now), Some(now));

        let ticket = editor.pump(&mut service, now).unwrap();
        assert_eq!(editor.next_pump_at(now), None);

        editor.complete(ticket, Err("offline".into()), now);
        let retry_at = editor.next_pump_at(now).unwrap();
        assert_eq!(retry_at, now + std::time::Duration::from_millis(500));
        assert!(editor.pump(&mut service, now).is_none());
        assert!(editor.pump(&mut service, retry_at).is_some());
    }

    #[test]
    fn test_import_queues_only_new_records() {
        let (mut editor, _) = editor();
        let queued = editor.queue().len();
        let mut dataset = Dataset::new();
        dataset.insert("classes.txt", "crop\nweed");
        dataset.insert("labels/field.txt", "1 0.5 0.5");

        let result = editor
            .import(&YoloFormat, &dataset, &ImportOptions::default())
            .unwrap();

        assert_eq!(result.categories_created, 1);
        assert_eq!(result.annotations_imported, 1);
        assert_eq!(editor.queue().len(), queued + 2);
    }

    #[test]
    fn test_export_uses_configured_strictness() {
        let mut config = EditorConfig::default();
        config.export.strict = true;
        let mut editor = Editor::new(config, RecordingSurface::default());
        editor.register_image(ImageInfo::new(1, "a.jpg", 10, 10));
        let id = editor.add_category("x", None).unwrap();
        editor.dispatch(EditorEvent::SwitchImage(1));
        editor.dispatch(EditorEvent::SetCategory(id));
        editor.dispatch(EditorEvent::SetTool(AnnotationTool::BoundingBox));
        // A click with the box tool commits a zero-area box
        editor.dispatch(EditorEvent::press(2.0, 2.0));
        editor.dispatch(EditorEvent::PointerUp { x: 2.0, y: 2.0 });

        assert!(matches!(
            editor.export(&YoloFormat),
            Err(FormatError::DegenerateShape { .. })
        ));
    }
}
