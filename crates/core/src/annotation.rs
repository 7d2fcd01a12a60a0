//! Annotation data model
//!
//! Highlights, sticky notes, ink drawings and floating texts layered over
//! document content. All positions are stored in container-relative space so
//! scrolling and resizing never invalidate stored geometry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::Timestamp;

/// Minimum width of a sticky note, in container pixels
pub const NOTE_MIN_WIDTH: f64 = 200.0;

/// Minimum height of a sticky note, in container pixels
pub const NOTE_MIN_HEIGHT: f64 = 100.0;

/// Pressure assumed when a device reports none
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// Unique identifier for an annotation
///
/// Unique within its own collection only. New ids are UUID v4 strings;
/// imported sets may carry numeric ids, which are kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "IdRepr")]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for AnnotationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<IdRepr> for AnnotationId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(text) => Self(text),
            IdRepr::Integer(value) => Self(value.to_string()),
            IdRepr::Float(value) => Self(value.to_string()),
        }
    }
}

/// Point relative to the annotation container's top-left corner
///
/// - Origin (0, 0) at the container's top-left
/// - X increases to the right
/// - Y increases downward
/// - Units are CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerPoint {
    pub x: f64,
    pub y: f64,
}

impl ContainerPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &ContainerPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Annotation collection discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKind {
    Highlight,
    Note,
    Drawing,
    FloatingText,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::Highlight,
        AnnotationKind::Note,
        AnnotationKind::Drawing,
        AnnotationKind::FloatingText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Note => "note",
            AnnotationKind::Drawing => "drawing",
            AnnotationKind::FloatingText => "floatingText",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = String;

    /// Accepts both singular and collection names (`note`, `notes`, `floating-text`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
        match normalized.as_str() {
            "highlight" | "highlights" => Ok(AnnotationKind::Highlight),
            "note" | "notes" => Ok(AnnotationKind::Note),
            "drawing" | "drawings" => Ok(AnnotationKind::Drawing),
            "floatingtext" | "floatingtexts" | "text" | "texts" => Ok(AnnotationKind::FloatingText),
            _ => Err(format!("unknown annotation type: {s}")),
        }
    }
}

/// Visual treatment of a highlighted text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightStyle {
    #[default]
    Classic,
    Underline,
    DoubleUnderline,
    Wavy,
    Box,
}

/// A wrapped run of document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: AnnotationId,
    /// Denormalized copy of the wrapped content, for search and export
    pub text: String,
    pub color: String,
    #[serde(default)]
    pub style: HighlightStyle,
    #[serde(default)]
    pub timestamp: Timestamp,
}

/// Sticky note, optionally quoting the document text it is attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: AnnotationId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    pub position: ContainerPoint,
    #[serde(default = "default_note_width")]
    pub width: f64,
    #[serde(default = "default_note_height")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default)]
    pub timestamp: Timestamp,
}

fn default_note_width() -> f64 {
    250.0
}

fn default_note_height() -> f64 {
    150.0
}

/// Clamp a note dimension to its minimum (NaN collapses to the minimum)
pub fn clamp_dimension(value: f64, min: f64) -> f64 {
    if value >= min {
        value
    } else {
        min
    }
}

/// Input device that produced a pointer sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Pen,
    Touch,
    /// Also used for unrecognized pointer types
    #[default]
    #[serde(other)]
    Mouse,
}

/// Ink brush catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushType {
    Thin,
    #[default]
    Medium,
    Thick,
    Marker,
    Highlighter,
}

impl BrushType {
    pub const ALL: [BrushType; 5] = [
        BrushType::Thin,
        BrushType::Medium,
        BrushType::Thick,
        BrushType::Marker,
        BrushType::Highlighter,
    ];
}

/// One sample of an ink stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "InkPointRepr")]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub pointer_type: PointerKind,
}

impl InkPoint {
    pub fn new(x: f64, y: f64, pressure: f64, pointer_type: PointerKind) -> Self {
        Self { x, y, pressure, pointer_type }
    }

    pub fn position(&self) -> ContainerPoint {
        ContainerPoint::new(self.x, self.y)
    }
}

/// Accepts both `{x, y, pressure, pointerType}` objects and bare `[x, y]` pairs
#[derive(Deserialize)]
#[serde(untagged)]
enum InkPointRepr {
    Object {
        x: f64,
        y: f64,
        #[serde(default)]
        pressure: Option<f64>,
        #[serde(default, rename = "pointerType")]
        pointer_type: PointerKind,
    },
    Pair(f64, f64),
}

impl From<InkPointRepr> for InkPoint {
    fn from(repr: InkPointRepr) -> Self {
        match repr {
            InkPointRepr::Object { x, y, pressure, pointer_type } => InkPoint {
                x,
                y,
                pressure: pressure.unwrap_or(DEFAULT_PRESSURE),
                pointer_type,
            },
            InkPointRepr::Pair(x, y) => InkPoint {
                x,
                y,
                pressure: DEFAULT_PRESSURE,
                pointer_type: PointerKind::Mouse,
            },
        }
    }
}

/// A committed ink stroke
///
/// Immutable once committed: strokes leave the layer only by erasure or
/// clearing, never by in-place point edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: AnnotationId,
    /// Ordered samples of one pointer-down-to-up gesture (never empty once committed)
    pub points: Vec<InkPoint>,
    pub color: String,
    #[serde(default, alias = "brush")]
    pub brush_type: BrushType,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub pointer_type: PointerKind,
}

/// Free-standing text placed on the container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingText {
    pub id: AnnotationId,
    pub text: String,
    pub position: ContainerPoint,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_text_size")]
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default)]
    pub timestamp: Timestamp,
}

fn default_font() -> String {
    "sans".to_owned()
}

fn default_text_color() -> String {
    "yellow".to_owned()
}

fn default_text_size() -> f64 {
    16.0
}

/// Every annotation attached to one (document, user) pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotationSet {
    pub highlights: Vec<Highlight>,
    pub notes: Vec<Note>,
    pub drawings: Vec<Drawing>,
    pub floating_texts: Vec<FloatingText>,
}

/// Per-collection entry counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationCounts {
    pub highlights: usize,
    pub notes: usize,
    pub drawings: usize,
    pub floating_texts: usize,
    pub total: usize,
}

/// Borrowed view of any annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationRef<'a> {
    Highlight(&'a Highlight),
    Note(&'a Note),
    Drawing(&'a Drawing),
    FloatingText(&'a FloatingText),
}

impl<'a> AnnotationRef<'a> {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationRef::Highlight(_) => AnnotationKind::Highlight,
            AnnotationRef::Note(_) => AnnotationKind::Note,
            AnnotationRef::Drawing(_) => AnnotationKind::Drawing,
            AnnotationRef::FloatingText(_) => AnnotationKind::FloatingText,
        }
    }

    pub fn id(&self) -> &'a AnnotationId {
        match self {
            AnnotationRef::Highlight(h) => &h.id,
            AnnotationRef::Note(n) => &n.id,
            AnnotationRef::Drawing(d) => &d.id,
            AnnotationRef::FloatingText(t) => &t.id,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            AnnotationRef::Highlight(h) => h.timestamp,
            AnnotationRef::Note(n) => n.timestamp,
            AnnotationRef::Drawing(d) => d.timestamp,
            AnnotationRef::FloatingText(t) => t.timestamp,
        }
    }

    /// Filterable color (notes without an explicit color have none)
    pub fn color(&self) -> Option<&'a str> {
        match self {
            AnnotationRef::Highlight(h) => Some(h.color.as_str()),
            AnnotationRef::Note(n) => n.color.as_deref(),
            AnnotationRef::Drawing(d) => Some(d.color.as_str()),
            AnnotationRef::FloatingText(t) => Some(t.color.as_str()),
        }
    }
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> AnnotationCounts {
        let highlights = self.highlights.len();
        let notes = self.notes.len();
        let drawings = self.drawings.len();
        let floating_texts = self.floating_texts.len();
        AnnotationCounts {
            highlights,
            notes,
            drawings,
            floating_texts,
            total: highlights + notes + drawings + floating_texts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total == 0
    }

    /// Iterate every annotation in collection order
    pub fn iter(&self) -> impl Iterator<Item = AnnotationRef<'_>> {
        self.highlights
            .iter()
            .map(AnnotationRef::Highlight)
            .chain(self.notes.iter().map(AnnotationRef::Note))
            .chain(self.drawings.iter().map(AnnotationRef::Drawing))
            .chain(self.floating_texts.iter().map(AnnotationRef::FloatingText))
    }

    /// Most recent annotations of every kind, newest first
    ///
    /// Equal timestamps keep collection order.
    pub fn recent(&self, limit: usize) -> Vec<AnnotationRef<'_>> {
        let mut all: Vec<AnnotationRef<'_>> = self.iter().collect();
        all.sort_by_key(|a| std::cmp::Reverse(a.timestamp()));
        all.truncate(limit);
        all
    }

    pub fn highlight(&self, id: &AnnotationId) -> Option<&Highlight> {
        self.highlights.iter().find(|h| &h.id == id)
    }

    pub fn note(&self, id: &AnnotationId) -> Option<&Note> {
        self.notes.iter().find(|n| &n.id == id)
    }

    pub fn drawing(&self, id: &AnnotationId) -> Option<&Drawing> {
        self.drawings.iter().find(|d| &d.id == id)
    }

    pub fn floating_text(&self, id: &AnnotationId) -> Option<&FloatingText> {
        self.floating_texts.iter().find(|t| &t.id == id)
    }
}

/// Per-layer visibility preference
///
/// View-local: persisted in the user's local preference store, never with the
/// annotation set itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerVisibility {
    pub highlights: bool,
    pub notes: bool,
    pub drawings: bool,
    pub floating_texts: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self { highlights: true, notes: true, drawings: true, floating_texts: true }
    }
}

impl LayerVisibility {
    pub fn is_visible(&self, kind: AnnotationKind) -> bool {
        match kind {
            AnnotationKind::Highlight => self.highlights,
            AnnotationKind::Note => self.notes,
            AnnotationKind::Drawing => self.drawings,
            AnnotationKind::FloatingText => self.floating_texts,
        }
    }

    pub fn set(&mut self, kind: AnnotationKind, visible: bool) {
        match kind {
            AnnotationKind::Highlight => self.highlights = visible,
            AnnotationKind::Note => self.notes = visible,
            AnnotationKind::Drawing => self.drawings = visible,
            AnnotationKind::FloatingText => self.floating_texts = visible,
        }
    }

    /// Flip one layer and return its new state
    pub fn toggle(&mut self, kind: AnnotationKind) -> bool {
        let visible = !self.is_visible(kind);
        self.set(kind, visible);
        visible
    }
}

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };

    /// Named annotation palette
    pub const PALETTE: [(&'static str, Color); 6] = [
        ("yellow", Color { r: 0xfe, g: 0xf0, b: 0x8a, a: 255 }),
        ("green", Color { r: 0xbb, g: 0xf7, b: 0xd0, a: 255 }),
        ("blue", Color { r: 0xbf, g: 0xdb, b: 0xfe, a: 255 }),
        ("pink", Color { r: 0xfb, g: 0xcf, b: 0xe8, a: 255 }),
        ("purple", Color { r: 0xe9, g: 0xd5, b: 0xff, a: 255 }),
        ("orange", Color { r: 0xfe, g: 0xd7, b: 0xaa, a: 255 }),
    ];

    /// Resolve a palette name or `#rrggbb` / `#rrggbbaa` hex string
    pub fn parse(value: &str) -> Option<Color> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        Self::PALETTE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map(|(_, color)| *color)
    }

    /// Resolve a stroke color, falling back to black for unknown names
    pub fn resolve(value: &str) -> Color {
        Self::parse(value).unwrap_or(Self::BLACK)
    }

    fn from_hex(hex: &str) -> Option<Color> {
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Convert to normalized RGBA values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}
