//! Pressure-sensitive ink engine
//!
//! Turns pointer samples into live-rendered segments and, on pointer-up, into
//! a committed [`Drawing`]. Owns pressure normalization, the pressure-to-width
//! mapping and stylus palm rejection.
//!
//! Per gesture the engine moves `Idle -> Drawing -> Idle`. The first sample
//! only records a point; every later sample strokes one segment from the
//! previous sample, so a live stroke is never re-rendered as a whole.

use tracing::{debug, trace};

use crate::annotation::{
    AnnotationId, BrushType, Color, ContainerPoint, Drawing, InkPoint, PointerKind,
    DEFAULT_PRESSURE,
};
use crate::canvas::Canvas;
use crate::clock::Timestamp;

/// Width multiplier at zero pressure
pub const MIN_WIDTH_MULTIPLIER: f64 = 0.3;

/// Additional multiplier gained between zero and full pressure
pub const PRESSURE_WIDTH_GAIN: f64 = 2.2;

/// Nominal geometry of a brush
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushProfile {
    /// Nominal stroke width in pixels
    pub width: f64,
    /// Compositing opacity; below 1.0 strokes blend translucently
    pub alpha: f64,
}

impl BrushType {
    pub fn profile(self) -> BrushProfile {
        match self {
            BrushType::Thin => BrushProfile { width: 2.0, alpha: 1.0 },
            BrushType::Medium => BrushProfile { width: 4.0, alpha: 1.0 },
            BrushType::Thick => BrushProfile { width: 6.0, alpha: 1.0 },
            BrushType::Marker => BrushProfile { width: 10.0, alpha: 1.0 },
            BrushType::Highlighter => BrushProfile { width: 20.0, alpha: 0.3 },
        }
    }
}

/// Substitute `default` for missing pressure
///
/// Mice and many styluses report 0 on contact; NaN and negative readings are
/// treated the same way. Readings above 1.0 are clamped.
pub fn normalize_pressure(raw: f64, default: f64) -> f64 {
    if raw.is_nan() || raw <= 0.0 {
        default
    } else {
        raw.min(1.0)
    }
}

/// Width multiplier for a pressure in `[0, 1]`: 0.3x at zero, 2.5x at full
pub fn width_multiplier(pressure: f64) -> f64 {
    let pressure = if pressure.is_nan() { 0.0 } else { pressure.clamp(0.0, 1.0) };
    MIN_WIDTH_MULTIPLIER + pressure * PRESSURE_WIDTH_GAIN
}

/// Rendered line width of `brush` at `pressure`
pub fn line_width(brush: BrushType, pressure: f64) -> f64 {
    brush.profile().width * width_multiplier(pressure)
}

/// Per-surface pointer bookkeeping for palm rejection
///
/// Lives on the surface that owns the ink engine, never in global state, so
/// independent surfaces on one page cannot reject each other's input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerSession {
    last_active: Option<PointerKind>,
}

impl PointerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_active(&self) -> Option<PointerKind> {
        self.last_active
    }

    /// Decide whether a pointer-down/move may reach the engine
    ///
    /// A touch arriving while a pen stroke is in progress is treated as a
    /// resting palm and dropped. Pen input is never rejected.
    pub fn admit(&mut self, kind: PointerKind, stroke_in_progress: bool) -> bool {
        if kind == PointerKind::Touch
            && stroke_in_progress
            && self.last_active == Some(PointerKind::Pen)
        {
            return false;
        }
        self.last_active = Some(kind);
        true
    }
}

/// Pointer sample already mapped into container space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pointer_id: i32,
    pub position: ContainerPoint,
    /// Raw device pressure (0 when unsupported)
    pub pressure: f64,
    pub pointer_type: PointerKind,
}

/// Stroke settings captured at pointer-down
#[derive(Debug, Clone, PartialEq)]
pub struct InkStyle {
    pub color: String,
    pub brush: BrushType,
}

/// Result of feeding a sample to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkResponse {
    /// A stroke began; the host should capture this pointer
    Started { pointer_id: i32 },
    /// The sample extended the active stroke
    Extended,
    /// Dropped by palm rejection
    Rejected,
    /// Not part of the active gesture
    Ignored,
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    pointer_id: i32,
    pointer_type: PointerKind,
    style: InkStyle,
    points: Vec<InkPoint>,
}

#[derive(Debug, Clone, Default)]
enum InkState {
    #[default]
    Idle,
    Drawing(ActiveStroke),
}

/// Live stroke builder
#[derive(Debug, Clone)]
pub struct InkEngine {
    state: InkState,
    default_pressure: f64,
}

impl Default for InkEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PRESSURE)
    }
}

impl InkEngine {
    pub fn new(default_pressure: f64) -> Self {
        Self { state: InkState::Idle, default_pressure }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, InkState::Drawing(_))
    }

    /// Pointer id held for the active stroke
    pub fn captured_pointer(&self) -> Option<i32> {
        match &self.state {
            InkState::Drawing(stroke) => Some(stroke.pointer_id),
            InkState::Idle => None,
        }
    }

    /// Points collected so far for the active stroke
    pub fn active_points(&self) -> &[InkPoint] {
        match &self.state {
            InkState::Drawing(stroke) => &stroke.points,
            InkState::Idle => &[],
        }
    }

    pub fn pointer_down(
        &mut self,
        sample: PointerSample,
        style: InkStyle,
        session: &mut PointerSession,
    ) -> InkResponse {
        if !session.admit(sample.pointer_type, self.is_drawing()) {
            trace!(pointer_id = sample.pointer_id, "palm contact rejected on pointer-down");
            return InkResponse::Rejected;
        }
        if self.is_drawing() {
            return InkResponse::Ignored;
        }

        let point = self.ink_point(&sample);
        debug!(
            pointer_id = sample.pointer_id,
            pointer_type = ?sample.pointer_type,
            brush = ?style.brush,
            "stroke started"
        );
        self.state = InkState::Drawing(ActiveStroke {
            pointer_id: sample.pointer_id,
            pointer_type: sample.pointer_type,
            style,
            points: vec![point],
        });
        InkResponse::Started { pointer_id: sample.pointer_id }
    }

    /// Record a sample and stroke the segment from the previous one
    ///
    /// With no canvas (hidden layer) the sample is only recorded.
    pub fn pointer_move(
        &mut self,
        sample: PointerSample,
        session: &mut PointerSession,
        canvas: Option<&mut dyn Canvas>,
    ) -> InkResponse {
        if !session.admit(sample.pointer_type, self.is_drawing()) {
            trace!(pointer_id = sample.pointer_id, "palm contact rejected on pointer-move");
            return InkResponse::Rejected;
        }

        let point = self.ink_point(&sample);
        let InkState::Drawing(stroke) = &mut self.state else {
            return InkResponse::Ignored;
        };
        if stroke.pointer_id != sample.pointer_id {
            return InkResponse::Ignored;
        }

        if let (Some(previous), Some(canvas)) = (stroke.points.last(), canvas) {
            let width = line_width(stroke.style.brush, point.pressure);
            let color = Color::resolve(&stroke.style.color);
            stroke_with_alpha(canvas, stroke.style.brush, |canvas| {
                canvas.stroke_segment(previous.position(), point.position(), color, width);
            });
        }
        stroke.points.push(point);
        InkResponse::Extended
    }

    /// Finish the stroke held by `pointer_id` and build its record
    pub fn pointer_up(&mut self, pointer_id: i32, timestamp: Timestamp) -> Option<Drawing> {
        match std::mem::take(&mut self.state) {
            InkState::Drawing(stroke) if stroke.pointer_id == pointer_id => {
                let drawing = Drawing {
                    id: AnnotationId::new(),
                    points: stroke.points,
                    color: stroke.style.color,
                    brush_type: stroke.style.brush,
                    timestamp,
                    pointer_type: stroke.pointer_type,
                };
                debug!(id = %drawing.id, points = drawing.points.len(), "stroke committed");
                Some(drawing)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Abort the stroke held by `pointer_id` without committing
    pub fn cancel(&mut self, pointer_id: i32) -> bool {
        if self.captured_pointer() == Some(pointer_id) {
            self.abort();
            true
        } else {
            false
        }
    }

    /// Abort whatever stroke is in progress; returns the released pointer id
    pub fn abort(&mut self) -> Option<i32> {
        let released = self.captured_pointer();
        if released.is_some() {
            debug!(pointer_id = ?released, "stroke aborted");
        }
        self.state = InkState::Idle;
        released
    }

    fn ink_point(&self, sample: &PointerSample) -> InkPoint {
        InkPoint::new(
            sample.position.x,
            sample.position.y,
            normalize_pressure(sample.pressure, self.default_pressure),
            sample.pointer_type,
        )
    }
}

/// Run `paint` with the brush's alpha, restoring full opacity afterwards
fn stroke_with_alpha(canvas: &mut dyn Canvas, brush: BrushType, paint: impl FnOnce(&mut dyn Canvas)) {
    let alpha = brush.profile().alpha;
    if alpha < 1.0 {
        canvas.set_global_alpha(alpha);
        paint(canvas);
        canvas.set_global_alpha(1.0);
    } else {
        paint(canvas);
    }
}

/// Clear the canvas and replay every stroke of a visible drawings layer
///
/// Segment widths use the mean pressure of their two endpoints, so reloaded
/// or undone strokes keep their pressure-varying look.
pub fn redraw_canvas(canvas: &mut dyn Canvas, drawings: &[Drawing], layer_visible: bool) {
    canvas.clear();
    if !layer_visible {
        return;
    }

    for drawing in drawings {
        if drawing.points.len() < 2 {
            continue;
        }
        let color = Color::resolve(&drawing.color);
        stroke_with_alpha(canvas, drawing.brush_type, |canvas| {
            for pair in drawing.points.windows(2) {
                let avg_pressure = (pair[0].pressure + pair[1].pressure) / 2.0;
                let width = line_width(drawing.brush_type, avg_pressure);
                canvas.stroke_segment(pair[0].position(), pair[1].position(), color, width);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasOp, RecordingCanvas};
    use proptest::prelude::*;

    fn sample(id: i32, x: f64, y: f64, pressure: f64, kind: PointerKind) -> PointerSample {
        PointerSample { pointer_id: id, position: ContainerPoint::new(x, y), pressure, pointer_type: kind }
    }

    fn style(brush: BrushType) -> InkStyle {
        InkStyle { color: "blue".to_owned(), brush }
    }

    #[test]
    fn test_brush_catalogue() {
        assert_eq!(BrushType::Thin.profile().width, 2.0);
        assert_eq!(BrushType::Medium.profile().width, 4.0);
        assert_eq!(BrushType::Thick.profile().width, 6.0);
        assert_eq!(BrushType::Marker.profile().width, 10.0);
        assert_eq!(BrushType::Highlighter.profile(), BrushProfile { width: 20.0, alpha: 0.3 });
    }

    #[test]
    fn test_width_multiplier_endpoints() {
        assert!((width_multiplier(0.0) - 0.3).abs() < 1e-12);
        assert!((width_multiplier(1.0) - 2.5).abs() < 1e-12);
        assert!((line_width(BrushType::Marker, 0.5) - 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pressure_uses_default() {
        assert_eq!(normalize_pressure(0.0, 0.5), 0.5);
        assert_eq!(normalize_pressure(f64::NAN, 0.5), 0.5);
        assert_eq!(normalize_pressure(0.75, 0.5), 0.75);
        assert_eq!(normalize_pressure(3.0, 0.5), 1.0);
    }

    #[test]
    fn test_stroke_lifecycle() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        let mut canvas = RecordingCanvas::new();

        let started = engine.pointer_down(sample(7, 0.0, 0.0, 0.0, PointerKind::Mouse), style(BrushType::Medium), &mut session);
        assert_eq!(started, InkResponse::Started { pointer_id: 7 });
        assert_eq!(engine.captured_pointer(), Some(7));
        assert!(canvas.ops().is_empty());

        engine.pointer_move(sample(7, 10.0, 0.0, 0.0, PointerKind::Mouse), &mut session, Some(&mut canvas));
        engine.pointer_move(sample(7, 20.0, 5.0, 0.0, PointerKind::Mouse), &mut session, Some(&mut canvas));
        assert_eq!(canvas.visible_segments().len(), 2);

        let drawing = engine.pointer_up(7, 1_234).expect("stroke should commit");
        assert_eq!(drawing.points.len(), 3);
        assert_eq!(drawing.timestamp, 1_234);
        assert_eq!(drawing.pointer_type, PointerKind::Mouse);
        assert_eq!(drawing.brush_type, BrushType::Medium);
        assert!(drawing.points.iter().all(|p| p.pressure == DEFAULT_PRESSURE));
        assert!(!engine.is_drawing());
    }

    #[test]
    fn test_single_sample_stroke_commits() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        engine.pointer_down(sample(1, 3.0, 4.0, 0.2, PointerKind::Pen), style(BrushType::Thin), &mut session);
        let drawing = engine.pointer_up(1, 0).unwrap();
        assert_eq!(drawing.points.len(), 1);
        assert_eq!(drawing.points[0].pressure, 0.2);
    }

    #[test]
    fn test_palm_rejected_during_pen_stroke() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        let mut canvas = RecordingCanvas::new();

        engine.pointer_down(sample(1, 0.0, 0.0, 0.4, PointerKind::Pen), style(BrushType::Medium), &mut session);
        let palm_move = engine.pointer_move(sample(2, 50.0, 50.0, 0.0, PointerKind::Touch), &mut session, Some(&mut canvas));
        assert_eq!(palm_move, InkResponse::Rejected);
        let palm_down = engine.pointer_down(sample(3, 60.0, 60.0, 0.0, PointerKind::Touch), style(BrushType::Medium), &mut session);
        assert_eq!(palm_down, InkResponse::Rejected);
        assert_eq!(session.last_active(), Some(PointerKind::Pen));

        engine.pointer_move(sample(1, 5.0, 5.0, 0.6, PointerKind::Pen), &mut session, Some(&mut canvas));
        let drawing = engine.pointer_up(1, 0).unwrap();
        assert_eq!(drawing.points.len(), 2);
        assert!(drawing.points.iter().all(|p| p.pointer_type == PointerKind::Pen));
    }

    #[test]
    fn test_touch_allowed_without_active_pen_stroke() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        engine.pointer_down(sample(1, 0.0, 0.0, 0.4, PointerKind::Pen), style(BrushType::Medium), &mut session);
        engine.pointer_up(1, 0);

        let response = engine.pointer_down(sample(2, 0.0, 0.0, 0.0, PointerKind::Touch), style(BrushType::Medium), &mut session);
        assert_eq!(response, InkResponse::Started { pointer_id: 2 });
    }

    #[test]
    fn test_other_pointer_ignored_while_captured() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        let mut canvas = RecordingCanvas::new();
        engine.pointer_down(sample(1, 0.0, 0.0, 0.0, PointerKind::Mouse), style(BrushType::Medium), &mut session);

        let response = engine.pointer_move(sample(9, 4.0, 4.0, 0.0, PointerKind::Mouse), &mut session, Some(&mut canvas));
        assert_eq!(response, InkResponse::Ignored);
        assert!(engine.pointer_up(9, 0).is_none());
        assert!(engine.is_drawing());
    }

    #[test]
    fn test_cancel_discards_stroke() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        engine.pointer_down(sample(4, 0.0, 0.0, 0.0, PointerKind::Mouse), style(BrushType::Medium), &mut session);
        assert!(!engine.cancel(5));
        assert!(engine.cancel(4));
        assert!(engine.pointer_up(4, 0).is_none());
    }

    #[test]
    fn test_highlighter_alpha_scoped_to_segment() {
        let mut engine = InkEngine::default();
        let mut session = PointerSession::new();
        let mut canvas = RecordingCanvas::new();
        engine.pointer_down(sample(1, 0.0, 0.0, 0.0, PointerKind::Mouse), style(BrushType::Highlighter), &mut session);
        engine.pointer_move(sample(1, 8.0, 0.0, 0.0, PointerKind::Mouse), &mut session, Some(&mut canvas));

        assert_eq!(canvas.ops()[0], CanvasOp::GlobalAlpha(0.3));
        assert!(matches!(canvas.ops()[1], CanvasOp::Segment { .. }));
        assert_eq!(canvas.ops()[2], CanvasOp::GlobalAlpha(1.0));
        assert_eq!(canvas.global_alpha(), 1.0);
    }

    #[test]
    fn test_redraw_averages_pressure() {
        let drawing = Drawing {
            id: "d".into(),
            points: vec![
                InkPoint::new(0.0, 0.0, 0.2, PointerKind::Pen),
                InkPoint::new(10.0, 0.0, 0.6, PointerKind::Pen),
            ],
            color: "#000000".to_owned(),
            brush_type: BrushType::Thin,
            timestamp: 0,
            pointer_type: PointerKind::Pen,
        };
        let mut canvas = RecordingCanvas::new();
        redraw_canvas(&mut canvas, &[drawing], true);

        assert_eq!(canvas.ops()[0], CanvasOp::Clear);
        match &canvas.ops()[1] {
            CanvasOp::Segment { width, .. } => {
                let expected = 2.0 * (0.3 + 0.4 * 2.2);
                assert!((width - expected).abs() < 1e-9);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_redraw_hidden_layer_only_clears() {
        let drawing = Drawing {
            id: "d".into(),
            points: vec![
                InkPoint::new(0.0, 0.0, 0.5, PointerKind::Mouse),
                InkPoint::new(1.0, 1.0, 0.5, PointerKind::Mouse),
            ],
            color: "yellow".to_owned(),
            brush_type: BrushType::Medium,
            timestamp: 0,
            pointer_type: PointerKind::Mouse,
        };
        let mut canvas = RecordingCanvas::new();
        redraw_canvas(&mut canvas, &[drawing], false);
        assert_eq!(canvas.ops(), &[CanvasOp::Clear]);
    }

    proptest! {
        #[test]
        fn prop_width_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(width_multiplier(lo) <= width_multiplier(hi));
            prop_assert!(width_multiplier(lo) >= MIN_WIDTH_MULTIPLIER);
            prop_assert!(width_multiplier(hi) <= MIN_WIDTH_MULTIPLIER + PRESSURE_WIDTH_GAIN + 1e-12);
        }
    }
}
