//! Whole-stroke spatial eraser
//!
//! A stroke is atomic: if any of its points falls inside the eraser circle the
//! whole stroke goes.

use tracing::debug;

use crate::annotation::{AnnotationId, ContainerPoint, Drawing};

/// Strokes surviving an erase pass and the ids that were removed
#[derive(Debug, Clone, PartialEq)]
pub struct EraseOutcome {
    pub remaining: Vec<Drawing>,
    pub removed: Vec<AnnotationId>,
}

/// Whether any point of `drawing` lies within `radius` of `center`
pub fn stroke_hit(drawing: &Drawing, center: &ContainerPoint, radius: f64) -> bool {
    drawing.points.iter().any(|p| p.position().distance_to(center) <= radius)
}

/// Remove every stroke touched by the eraser circle
///
/// Returns `None` when nothing was hit, so callers can skip recording history
/// and redrawing.
pub fn erase(drawings: &[Drawing], center: ContainerPoint, radius: f64) -> Option<EraseOutcome> {
    let (removed, remaining): (Vec<&Drawing>, Vec<&Drawing>) =
        drawings.iter().partition(|d| stroke_hit(d, &center, radius));

    if removed.is_empty() {
        return None;
    }

    let removed: Vec<AnnotationId> = removed.into_iter().map(|d| d.id.clone()).collect();
    debug!(x = center.x, y = center.y, radius, removed = removed.len(), "strokes erased");
    Some(EraseOutcome { remaining: remaining.into_iter().cloned().collect(), removed })
}
