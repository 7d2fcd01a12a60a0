//! Drag and resize of notes and floating texts
//!
//! A manipulation starts on pointer-down over an element's handle, updates
//! the element live on every pointer-move and stops on pointer-up. Nothing
//! here participates in undo/redo.

use tracing::debug;

use crate::annotation::{
    clamp_dimension, AnnotationId, ContainerPoint, NOTE_MIN_HEIGHT, NOTE_MIN_WIDTH,
};
use crate::store::{AnnotationStore, FloatingTextPatch, NotePatch};

/// Element being manipulated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Note(AnnotationId),
    FloatingText(AnnotationId),
}

impl DragTarget {
    pub fn id(&self) -> &AnnotationId {
        match self {
            DragTarget::Note(id) | DragTarget::FloatingText(id) => id,
        }
    }
}

/// Axes a note resize handle adjusts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Width only (right edge)
    Horizontal,
    /// Height only (bottom edge)
    Vertical,
    /// Both (bottom-right corner)
    Diagonal,
}

/// Handle grabbed by the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    Move,
    Resize(ResizeMode),
}

/// Position and size of a manipulable element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementGeometry {
    pub position: ContainerPoint,
    /// Floating texts have no box; only notes carry a size
    pub size: Option<(f64, f64)>,
}

/// Active manipulation state
#[derive(Debug, Clone)]
pub struct ManipulationState {
    pub target: DragTarget,
    pub handle_type: HandleType,
    /// Geometry before manipulation started
    pub original: ElementGeometry,
    /// Pointer position at pointer-down, container space
    pub drag_start: ContainerPoint,
    pub current_position: ContainerPoint,
}

impl ManipulationState {
    pub fn new(
        target: DragTarget,
        handle_type: HandleType,
        original: ElementGeometry,
        drag_start: ContainerPoint,
    ) -> Self {
        Self { target, handle_type, original, drag_start, current_position: drag_start }
    }

    /// Pointer offset from the element's top-left at pointer-down
    pub fn grab_offset(&self) -> ContainerPoint {
        ContainerPoint::new(
            self.drag_start.x - self.original.position.x,
            self.drag_start.y - self.original.position.y,
        )
    }

    pub fn update_position(&mut self, position: ContainerPoint) {
        self.current_position = position;
    }

    /// Geometry implied by the current pointer position
    ///
    /// Moves keep the element at or right/below the container origin;
    /// resizes never go below the note minimums.
    pub fn calculate_new_geometry(&self) -> ElementGeometry {
        match self.handle_type {
            HandleType::Move => {
                let offset = self.grab_offset();
                ElementGeometry {
                    position: ContainerPoint::new(
                        (self.current_position.x - offset.x).max(0.0),
                        (self.current_position.y - offset.y).max(0.0),
                    ),
                    size: self.original.size,
                }
            }
            HandleType::Resize(mode) => {
                let Some((width, height)) = self.original.size else {
                    return self.original;
                };
                let delta_x = self.current_position.x - self.drag_start.x;
                let delta_y = self.current_position.y - self.drag_start.y;
                let (width, height) = match mode {
                    ResizeMode::Horizontal => (width + delta_x, height),
                    ResizeMode::Vertical => (width, height + delta_y),
                    ResizeMode::Diagonal => (width + delta_x, height + delta_y),
                };
                ElementGeometry {
                    position: self.original.position,
                    size: Some((
                        clamp_dimension(width, NOTE_MIN_WIDTH),
                        clamp_dimension(height, NOTE_MIN_HEIGHT),
                    )),
                }
            }
        }
    }
}

/// Drives drag/resize gestures against the store
#[derive(Debug, Clone, Default)]
pub struct DragResizeController {
    active: Option<ManipulationState>,
}

impl DragResizeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> Option<&ManipulationState> {
        self.active.as_ref()
    }

    /// Grab an element's move handle
    pub fn begin_drag(&mut self, store: &AnnotationStore, target: DragTarget, pointer: ContainerPoint) -> bool {
        let position = match &target {
            DragTarget::Note(id) => store.set().note(id).map(|n| (n.position, Some((n.width, n.height)))),
            DragTarget::FloatingText(id) => store.set().floating_text(id).map(|t| (t.position, None)),
        };
        let Some((position, size)) = position else {
            return false;
        };

        debug!(id = %target.id(), "drag started");
        self.active = Some(ManipulationState::new(
            target,
            HandleType::Move,
            ElementGeometry { position, size },
            pointer,
        ));
        true
    }

    /// Grab one of a note's resize handles
    pub fn begin_resize(
        &mut self,
        store: &AnnotationStore,
        note_id: &AnnotationId,
        mode: ResizeMode,
        pointer: ContainerPoint,
    ) -> bool {
        let Some(note) = store.set().note(note_id) else {
            return false;
        };

        debug!(id = %note_id, ?mode, "resize started");
        self.active = Some(ManipulationState::new(
            DragTarget::Note(note_id.clone()),
            HandleType::Resize(mode),
            ElementGeometry { position: note.position, size: Some((note.width, note.height)) },
            pointer,
        ));
        true
    }

    /// Apply the pointer's new position to the element immediately
    pub fn pointer_move(&mut self, store: &mut AnnotationStore, pointer: ContainerPoint) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        state.update_position(pointer);
        let geometry = state.calculate_new_geometry();

        match (&state.target, state.handle_type) {
            (DragTarget::Note(id), HandleType::Move) => store.update_note(
                id,
                NotePatch { position: Some(geometry.position), ..NotePatch::default() },
            ),
            (DragTarget::Note(id), HandleType::Resize(_)) => {
                let (width, height) = geometry.size.unwrap_or((NOTE_MIN_WIDTH, NOTE_MIN_HEIGHT));
                store.update_note(
                    id,
                    NotePatch { width: Some(width), height: Some(height), ..NotePatch::default() },
                )
            }
            (DragTarget::FloatingText(id), HandleType::Move) => store.update_floating_text(
                id,
                FloatingTextPatch { position: Some(geometry.position), ..FloatingTextPatch::default() },
            ),
            (DragTarget::FloatingText(_), HandleType::Resize(_)) => false,
        }
    }

    /// Stop updating; returns whether a manipulation was active
    pub fn end(&mut self) -> bool {
        match self.active.take() {
            Some(state) => {
                debug!(id = %state.target.id(), "manipulation ended");
                true
            }
            None => false,
        }
    }
}
