//! Annotation filtering by type, color and date range
//!
//! Filters never touch the store; they produce a filtered copy of the set.

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationKind, AnnotationSet};
use crate::clock::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    /// Kinds to keep; empty means every kind
    pub types: Vec<AnnotationKind>,
    /// Colors to keep; empty means every color. Not applied to drawings.
    pub colors: Vec<String>,
    pub date_from: Option<Timestamp>,
    pub date_to: Option<Timestamp>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.colors.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

/// Apply `criteria` to `set`; `now` closes an open-ended date range
///
/// The type, color and date filters compose with logical AND.
pub fn filter(set: &AnnotationSet, criteria: &FilterCriteria, now: Timestamp) -> AnnotationSet {
    if criteria.is_empty() {
        return set.clone();
    }

    let keep_kind = |kind: AnnotationKind| criteria.types.is_empty() || criteria.types.contains(&kind);
    let keep_color = |color: Option<&str>| {
        criteria.colors.is_empty() || color.is_some_and(|c| criteria.colors.iter().any(|k| k == c))
    };
    let has_dates = criteria.date_from.is_some() || criteria.date_to.is_some();
    let from = criteria.date_from.unwrap_or(0);
    let to = criteria.date_to.unwrap_or(now);
    let keep_time = |timestamp: Timestamp| !has_dates || (from..=to).contains(&timestamp);

    let mut out = AnnotationSet::new();
    if keep_kind(AnnotationKind::Highlight) {
        out.highlights = set
            .highlights
            .iter()
            .filter(|h| keep_color(Some(&h.color)) && keep_time(h.timestamp))
            .cloned()
            .collect();
    }
    if keep_kind(AnnotationKind::Note) {
        out.notes = set
            .notes
            .iter()
            .filter(|n| keep_color(n.color.as_deref()) && keep_time(n.timestamp))
            .cloned()
            .collect();
    }
    if keep_kind(AnnotationKind::Drawing) {
        out.drawings = set.drawings.iter().filter(|d| keep_time(d.timestamp)).cloned().collect();
    }
    if keep_kind(AnnotationKind::FloatingText) {
        out.floating_texts = set
            .floating_texts
            .iter()
            .filter(|t| keep_color(Some(&t.color)) && keep_time(t.timestamp))
            .cloned()
            .collect();
    }
    out
}
