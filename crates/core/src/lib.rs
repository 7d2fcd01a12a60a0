//! Marginalia Core Library
//!
//! Annotation engine for reading surfaces: highlights, sticky notes,
//! pressure-sensitive ink and floating text layered over document content.

pub mod annotation;
pub mod canvas;
pub mod clock;
pub mod config;
pub mod coords;
pub mod eraser;
pub mod filter;
pub mod format_painter;
pub mod history;
pub mod ink;
pub mod manipulation;
pub mod persistence;
pub mod search;
pub mod shortcuts;
pub mod store;
pub mod surface;
pub mod text_range;

pub use annotation::{
    AnnotationCounts, AnnotationId, AnnotationKind, AnnotationRef, AnnotationSet, BrushType,
    Color, ContainerPoint, Drawing, FloatingText, Highlight, HighlightStyle, InkPoint,
    LayerVisibility, Note, PointerKind,
};
pub use canvas::{Canvas, CanvasOp, RasterCanvas, RecordingCanvas};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{ConfigError, EngineConfig};
pub use coords::{ContainerBounds, ContainerRect, CoordinateMapper};
pub use eraser::{erase, EraseOutcome};
pub use filter::{filter, FilterCriteria};
pub use format_painter::{FormatPainter, PainterState};
pub use history::UndoRedoStack;
pub use ink::{redraw_canvas, InkEngine, InkResponse, PointerSession};
pub use manipulation::{DragResizeController, DragTarget, ResizeMode};
pub use persistence::{
    export_json, import_json, AnnotationBackend, ExchangeError, MemoryBackend, PersistenceError,
};
pub use search::{search, Direction, SearchEngine, SearchResult};
pub use shortcuts::{KeyEvent, ShortcutCommand};
pub use store::{AnnotationStore, FloatingTextDraft, FloatingTextPatch, NoteDraft, NotePatch};
pub use surface::{
    AnnotationSurface, HeadlessHost, Notice, NoticeLevel, PointerEvent, ShortcutOutcome,
    SurfaceHost, Tool,
};
pub use text_range::{PlainTextDocument, TextRange, TextRangeAnnotator, TextRangeError};
