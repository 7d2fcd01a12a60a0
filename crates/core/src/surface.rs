//! Annotation surface
//!
//! One surface per annotated container. It owns the store, the drawing
//! history, the ink engine and its pointer session, and routes pointer
//! events according to the active tool:
//!
//! - `draw`: pointer-down captures the pointer and starts a stroke; moves
//!   extend it; pointer-up commits it and records a history snapshot.
//! - `eraser`: while pressed, every sample erases whole strokes under the
//!   eraser circle.
//! - any tool: an active drag/resize takes pointer-moves first.
//!
//! Recoverable failures (malformed import, refused highlight wrap, backend
//! errors) never roll back in-memory state; they are queued as [`Notice`]s
//! for the host to display.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::{
    AnnotationId, AnnotationKind, AnnotationSet, BrushType, ContainerPoint, Drawing,
    HighlightStyle, LayerVisibility, PointerKind,
};
use crate::canvas::{Canvas, RecordingCanvas};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::coords::{ContainerBounds, ContainerRect, CoordinateMapper};
use crate::eraser;
use crate::filter::{self, FilterCriteria};
use crate::format_painter::FormatPainter;
use crate::history::UndoRedoStack;
use crate::ink::{redraw_canvas, InkEngine, InkResponse, InkStyle, PointerSample, PointerSession};
use crate::manipulation::{DragResizeController, DragTarget, ResizeMode};
use crate::persistence::{self, AnnotationBackend};
use crate::search::{Direction, SearchEngine, SearchResult};
use crate::shortcuts::{self, KeyEvent, ShortcutCommand};
use crate::store::{AnnotationStore, FloatingTextDraft, FloatingTextPatch, NoteDraft, NotePatch};
use crate::text_range::{self, HighlightSpan, TextRange, TextRangeAnnotator};

/// Active interaction tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Highlight,
    Note,
    Draw,
    Text,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

/// Raw pointer event in client (viewport) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: i32,
    pub client_x: f64,
    pub client_y: f64,
    /// Device pressure; 0 when unsupported
    pub pressure: f64,
    pub pointer_type: PointerKind,
}

/// What the surface did with a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// Executed by the surface
    Handled(ShortcutCommand),
    /// Bound, but the host must carry it out (save, export, panels, help)
    Host(ShortcutCommand),
    Unbound,
}

/// Host environment of a surface: container geometry, canvas, pointer capture
pub trait SurfaceHost: ContainerBounds {
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Route further events of `pointer_id` to the surface; returns whether
    /// capture is now held
    fn set_pointer_capture(&mut self, _pointer_id: i32) -> bool {
        false
    }

    fn release_pointer_capture(&mut self, _pointer_id: i32) {}
}

/// Host without a UI: fixed bounds, an in-memory canvas, tracked capture
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost<C = RecordingCanvas> {
    pub bounds: Option<ContainerRect>,
    pub canvas: C,
    pub captured: Option<i32>,
}

impl<C: Canvas> HeadlessHost<C> {
    pub fn new(bounds: ContainerRect, canvas: C) -> Self {
        Self { bounds: Some(bounds), canvas, captured: None }
    }
}

impl<C> ContainerBounds for HeadlessHost<C> {
    fn bounding_rect(&self) -> Option<ContainerRect> {
        self.bounds
    }
}

impl<C: Canvas> SurfaceHost for HeadlessHost<C> {
    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn set_pointer_capture(&mut self, pointer_id: i32) -> bool {
        self.captured = Some(pointer_id);
        true
    }

    fn release_pointer_capture(&mut self, pointer_id: i32) {
        if self.captured == Some(pointer_id) {
            self.captured = None;
        }
    }
}

pub struct AnnotationSurface<H: SurfaceHost> {
    host: H,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    tool: Tool,
    color: String,
    brush: BrushType,
    store: AnnotationStore,
    history: UndoRedoStack,
    ink: InkEngine,
    session: PointerSession,
    /// Pointer currently held by the surface
    capture: Option<i32>,
    /// Pointer pressed with the eraser tool
    erasing: Option<i32>,
    painter: FormatPainter,
    search: SearchEngine,
    manipulation: DragResizeController,
    notices: Vec<Notice>,
}

impl<H: SurfaceHost> AnnotationSurface<H> {
    pub fn new(host: H, config: EngineConfig) -> Self {
        Self::with_clock(host, config, Box::new(SystemClock))
    }

    pub fn with_clock(host: H, config: EngineConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            store: AnnotationStore::with_defaults(config.store_defaults()),
            history: UndoRedoStack::with_limit(config.history_limit),
            ink: InkEngine::new(config.default_pressure),
            search: SearchEngine::new(config.search_preview_chars),
            color: config.default_color.clone(),
            brush: config.default_brush,
            host,
            config,
            clock,
            tool: Tool::default(),
            session: PointerSession::new(),
            capture: None,
            erasing: None,
            painter: FormatPainter::new(),
            manipulation: DragResizeController::new(),
            notices: Vec::new(),
        }
    }

    // ------------------------------------------------------------- accessors

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn annotations(&self) -> &AnnotationSet {
        self.store.set()
    }

    pub fn history(&self) -> &UndoRedoStack {
        &self.history
    }

    pub fn painter(&self) -> &FormatPainter {
        &self.painter
    }

    pub fn session(&self) -> &PointerSession {
        &self.session
    }

    pub fn is_drawing(&self) -> bool {
        self.ink.is_drawing()
    }

    pub fn captured_pointer(&self) -> Option<i32> {
        self.capture
    }

    /// Drain queued notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ----------------------------------------------------------------- tools

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tool; leaving `draw` or `eraser` mid-gesture aborts the gesture
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        if self.tool == Tool::Draw && self.ink.is_drawing() {
            self.abort_stroke();
        }
        if self.tool == Tool::Eraser {
            if let Some(pointer_id) = self.erasing.take() {
                self.release_capture(pointer_id);
            }
        }
        debug!(from = ?self.tool, to = ?tool, "tool changed");
        self.tool = tool;
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn brush(&self) -> BrushType {
        self.brush
    }

    pub fn set_brush(&mut self, brush: BrushType) {
        self.brush = brush;
    }

    // -------------------------------------------------------------- pointers

    /// Map client coordinates into container space using the current bounds
    pub fn to_container_coords(&self, client_x: f64, client_y: f64) -> ContainerPoint {
        CoordinateMapper::new(&self.host).to_container_coords(client_x, client_y)
    }

    fn sample(&self, event: &PointerEvent) -> PointerSample {
        PointerSample {
            pointer_id: event.pointer_id,
            position: self.to_container_coords(event.client_x, event.client_y),
            pressure: event.pressure,
            pointer_type: event.pointer_type,
        }
    }

    /// Returns whether the event was consumed
    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        let sample = self.sample(&event);
        match self.tool {
            Tool::Draw => {
                let style = InkStyle { color: self.color.clone(), brush: self.brush };
                match self.ink.pointer_down(sample, style, &mut self.session) {
                    InkResponse::Started { pointer_id } => {
                        self.acquire_capture(pointer_id);
                        true
                    }
                    _ => false,
                }
            }
            Tool::Eraser => {
                if self.erasing.is_some() {
                    return false;
                }
                self.erasing = Some(event.pointer_id);
                self.acquire_capture(event.pointer_id);
                self.erase_at(sample.position);
                true
            }
            _ => false,
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        let sample = self.sample(&event);
        if self.manipulation.is_active() {
            return self.manipulation.pointer_move(&mut self.store, sample.position);
        }

        match self.tool {
            Tool::Draw => {
                let canvas = if self.store.visibility().drawings { Some(self.host.canvas()) } else { None };
                let response = self.ink.pointer_move(sample, &mut self.session, canvas);
                response == InkResponse::Extended
            }
            Tool::Eraser if self.erasing == Some(event.pointer_id) => {
                self.erase_at(sample.position);
                true
            }
            _ => false,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> bool {
        let mut consumed = self.manipulation.end();

        if self.erasing == Some(event.pointer_id) {
            self.erasing = None;
            consumed = true;
        }
        if let Some(drawing) = self.ink.pointer_up(event.pointer_id, self.clock.now_millis()) {
            self.commit_stroke(drawing);
            consumed = true;
        }
        self.release_capture(event.pointer_id);
        consumed
    }

    /// Abort the gesture of `pointer_id` without committing anything
    pub fn pointer_cancel(&mut self, pointer_id: i32) -> bool {
        let mut cancelled = self.manipulation.end();
        if self.ink.cancel(pointer_id) {
            // Drop the partially painted live stroke
            self.redraw();
            cancelled = true;
        }
        if self.erasing == Some(pointer_id) {
            self.erasing = None;
            cancelled = true;
        }
        self.release_capture(pointer_id);
        cancelled
    }

    /// Pointer left the container; ignored while the pointer is captured
    pub fn pointer_leave(&mut self, event: PointerEvent) -> bool {
        if self.capture == Some(event.pointer_id) {
            return false;
        }
        self.pointer_up(event)
    }

    fn acquire_capture(&mut self, pointer_id: i32) {
        if self.host.set_pointer_capture(pointer_id) {
            self.capture = Some(pointer_id);
        }
    }

    fn release_capture(&mut self, pointer_id: i32) {
        if self.capture == Some(pointer_id) {
            self.host.release_pointer_capture(pointer_id);
            self.capture = None;
        }
    }

    fn abort_stroke(&mut self) {
        if let Some(pointer_id) = self.ink.abort() {
            self.release_capture(pointer_id);
            self.redraw();
        }
    }

    // --------------------------------------------------------------- drawing

    fn commit_stroke(&mut self, drawing: Drawing) {
        let before = self.store.drawings().to_vec();
        if self.store.add_drawing(drawing) {
            self.history.record(&before, self.store.drawings().to_vec());
        }
    }

    fn erase_at(&mut self, center: ContainerPoint) -> usize {
        self.erase(center, self.config.eraser_radius)
    }

    /// Remove every stroke touched by the eraser circle; returns the count
    pub fn erase(&mut self, center: ContainerPoint, radius: f64) -> usize {
        let Some(outcome) = eraser::erase(self.store.drawings(), center, radius) else {
            return 0;
        };
        let before = self.store.drawings().to_vec();
        self.store.set_drawings(outcome.remaining);
        self.history.record(&before, self.store.drawings().to_vec());
        self.redraw();
        outcome.removed.len()
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().map(<[Drawing]>::to_vec) else {
            return false;
        };
        self.store.set_drawings(snapshot);
        self.redraw();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().map(<[Drawing]>::to_vec) else {
            return false;
        };
        self.store.set_drawings(snapshot);
        self.redraw();
        true
    }

    /// Repaint the whole drawings layer
    pub fn redraw(&mut self) {
        let visible = self.store.visibility().drawings;
        redraw_canvas(self.host.canvas(), self.store.drawings(), visible);
    }

    /// Remove every drawing and forget drawing history
    pub fn clear_drawings(&mut self) {
        self.abort_stroke();
        self.store.clear_drawings();
        self.history.clear();
        self.redraw();
    }

    pub fn clear_all(&mut self) {
        self.abort_stroke();
        self.store.clear_all();
        self.reset_session_state();
        self.redraw();
    }

    // ---------------------------------------------------------------- layers

    pub fn visibility(&self) -> LayerVisibility {
        self.store.visibility()
    }

    /// Apply stored layer preferences; persisting them is left to the host
    pub fn set_visibility(&mut self, visibility: LayerVisibility) {
        self.store.set_visibility(visibility);
        self.redraw();
    }

    /// Flip one layer and return its new state
    ///
    /// The host owns saving the result to its preference store.
    pub fn toggle_layer(&mut self, kind: AnnotationKind) -> bool {
        let visible = self.store.toggle_layer(kind);
        if kind == AnnotationKind::Drawing {
            self.redraw();
        }
        visible
    }

    // ------------------------------------------------------ notes and texts

    pub fn add_note(&mut self, draft: NoteDraft) -> Option<AnnotationId> {
        let now = self.clock.now_millis();
        self.store.add_note(draft, now)
    }

    pub fn update_note(&mut self, id: &AnnotationId, patch: NotePatch) -> bool {
        self.store.update_note(id, patch)
    }

    pub fn delete_note(&mut self, id: &AnnotationId) -> bool {
        self.store.delete_note(id)
    }

    pub fn add_floating_text(&mut self, draft: FloatingTextDraft) -> Option<AnnotationId> {
        let now = self.clock.now_millis();
        self.store.add_floating_text(draft, now)
    }

    pub fn update_floating_text(&mut self, id: &AnnotationId, patch: FloatingTextPatch) -> bool {
        self.store.update_floating_text(id, patch)
    }

    pub fn delete_floating_text(&mut self, id: &AnnotationId) -> bool {
        self.store.delete_floating_text(id)
    }

    // ------------------------------------------------------------ highlights

    /// Highlight `range` with the current color
    ///
    /// A refused wrap is reported as a notice and stores nothing.
    pub fn apply_highlight(
        &mut self,
        annotator: &mut dyn TextRangeAnnotator,
        range: TextRange,
        style: HighlightStyle,
    ) -> Option<AnnotationId> {
        let now = self.clock.now_millis();
        match text_range::apply_highlight(annotator, &mut self.store, range, &self.color, style, now) {
            Ok(id) => Some(id),
            Err(error) => {
                self.notices.push(Notice::new(NoticeLevel::Error, format!("Could not highlight: {error}")));
                None
            }
        }
    }

    // ------------------------------------------------------- format painter

    pub fn copy_format(&mut self, id: &AnnotationId, kind: AnnotationKind) -> bool {
        self.painter.copy_format(&self.store, id, kind)
    }

    pub fn apply_format(&mut self, id: &AnnotationId, kind: AnnotationKind) -> bool {
        self.painter.apply_format(&mut self.store, id, kind)
    }

    /// Apply the armed format and restyle the wrapped span of a highlight
    pub fn apply_format_with(
        &mut self,
        annotator: &mut dyn TextRangeAnnotator,
        id: &AnnotationId,
        kind: AnnotationKind,
    ) -> bool {
        if !self.apply_format(id, kind) {
            return false;
        }
        if let Some(highlight) = self.store.set().highlight(id).filter(|_| kind == AnnotationKind::Highlight) {
            let span = HighlightSpan { id: id.clone(), color: highlight.color.clone(), style: highlight.style };
            if let Err(error) = annotator.restyle(&span) {
                warn!(%id, %error, "highlight span restyle failed");
            }
        }
        true
    }

    // ------------------------------------------------------ search / filter

    pub fn search(&mut self, query: &str) -> &[SearchResult] {
        self.search.run(self.store.set(), query)
    }

    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        self.search.navigate(direction)
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// Filtered copy of the set; the store is untouched
    pub fn filtered(&self, criteria: &FilterCriteria) -> AnnotationSet {
        filter::filter(self.store.set(), criteria, self.clock.now_millis())
    }

    // ---------------------------------------------------------- drag/resize

    pub fn begin_drag(&mut self, target: DragTarget, client_x: f64, client_y: f64) -> bool {
        let pointer = self.to_container_coords(client_x, client_y);
        self.manipulation.begin_drag(&self.store, target, pointer)
    }

    pub fn begin_resize(&mut self, note_id: &AnnotationId, mode: ResizeMode, client_x: f64, client_y: f64) -> bool {
        let pointer = self.to_container_coords(client_x, client_y);
        self.manipulation.begin_resize(&self.store, note_id, mode, pointer)
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulation.is_active()
    }

    // ------------------------------------------------------ export / import

    pub fn export_json(&mut self) -> Option<String> {
        match persistence::export_json(self.store.set()) {
            Ok(json) => {
                info!(total = self.store.counts().total, "annotations exported");
                self.notices.push(Notice::new(NoticeLevel::Success, "Annotations exported"));
                Some(json)
            }
            Err(error) => {
                warn!(%error, "export failed");
                self.notices.push(Notice::new(NoticeLevel::Error, format!("Export failed: {error}")));
                None
            }
        }
    }

    /// Replace the whole set with an exported one
    ///
    /// Malformed input leaves the current set untouched.
    pub fn import_json(&mut self, json: &str) -> bool {
        match persistence::import_json(json) {
            Ok(set) => {
                self.replace_set(set);
                self.notices.push(Notice::new(NoticeLevel::Success, "Annotations imported"));
                true
            }
            Err(error) => {
                warn!(%error, "import rejected");
                self.notices.push(Notice::new(NoticeLevel::Error, format!("Import failed: {error}")));
                false
            }
        }
    }

    /// Load the stored set for (document, user); returns whether a set was loaded
    pub fn load(&mut self, backend: &dyn AnnotationBackend, document_id: &str, user_id: &str) -> bool {
        match backend.load(document_id, user_id) {
            Ok(Some(set)) => {
                info!(document_id, user_id, "annotations loaded");
                self.replace_set(set);
                self.notices.push(Notice::new(NoticeLevel::Info, "Annotations loaded"));
                true
            }
            Ok(None) => false,
            Err(error) => {
                warn!(document_id, user_id, %error, "load failed");
                self.notices.push(Notice::new(NoticeLevel::Error, format!("Could not load annotations: {error}")));
                false
            }
        }
    }

    /// Hand the current set to the backend
    ///
    /// A failed save keeps the in-memory set as it is.
    pub fn save(&mut self, backend: &dyn AnnotationBackend, document_id: &str, user_id: &str) -> bool {
        match backend.save(document_id, user_id, self.store.set()) {
            Ok(()) => {
                info!(document_id, user_id, "annotations saved");
                self.notices.push(Notice::new(NoticeLevel::Success, "Annotations saved"));
                true
            }
            Err(error) => {
                warn!(document_id, user_id, %error, "save failed");
                self.notices.push(Notice::new(NoticeLevel::Error, format!("Could not save annotations: {error}")));
                false
            }
        }
    }

    fn replace_set(&mut self, set: AnnotationSet) {
        self.abort_stroke();
        self.store.replace_all(set);
        self.reset_session_state();
        self.redraw();
    }

    fn reset_session_state(&mut self) {
        self.history.clear();
        self.painter.reset();
        self.search.clear();
        self.manipulation.end();
    }

    // ------------------------------------------------------------- shortcuts

    pub fn apply_shortcut(&mut self, event: &KeyEvent) -> ShortcutOutcome {
        let Some(command) = shortcuts::resolve(event) else {
            return ShortcutOutcome::Unbound;
        };

        match command {
            ShortcutCommand::SelectTool(tool) => self.set_tool(tool),
            ShortcutCommand::ToggleEraser => {
                let next = if self.tool == Tool::Eraser { Tool::Draw } else { Tool::Eraser };
                self.set_tool(next);
            }
            ShortcutCommand::Undo => {
                self.undo();
            }
            ShortcutCommand::Redo => {
                self.redo();
            }
            ShortcutCommand::ToggleLayer(kind) => {
                self.toggle_layer(kind);
            }
            ShortcutCommand::ClearCanvas => self.clear_drawings(),
            ShortcutCommand::Escape => {
                self.abort_stroke();
                self.manipulation.end();
                self.painter.reset();
            }
            ShortcutCommand::Save
            | ShortcutCommand::Export
            | ShortcutCommand::Search
            | ShortcutCommand::ToggleSearchPanel
            | ShortcutCommand::ToggleLayersPanel
            | ShortcutCommand::ToggleFiltersPanel
            | ShortcutCommand::Help => return ShortcutOutcome::Host(command),
        }
        ShortcutOutcome::Handled(command)
    }
}
