//! Keyboard shortcut table
//!
//! Maps key chords to surface commands. Keys compare case-insensitively,
//! Ctrl and Meta are interchangeable, and Shift must match exactly so
//! `Ctrl+S` (save) and `Ctrl+Shift+S` (search panel) stay distinct.

use crate::annotation::AnnotationKind;
use crate::surface::Tool;

/// A key press as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// Logical key name (`"z"`, `"Escape"`, `"Delete"`, `"?"`)
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    /// Focus is in a text field; only Ctrl/Meta chords apply there
    pub in_text_input: bool,
}

impl KeyEvent {
    pub fn key(key: &str) -> Self {
        Self { key: key.to_owned(), ..Self::default() }
    }

    pub fn ctrl(key: &str) -> Self {
        Self { key: key.to_owned(), ctrl: true, ..Self::default() }
    }

    pub fn ctrl_shift(key: &str) -> Self {
        Self { key: key.to_owned(), ctrl: true, shift: true, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutCommand {
    SelectTool(Tool),
    ToggleEraser,
    Save,
    Undo,
    Redo,
    Export,
    Search,
    ToggleLayer(AnnotationKind),
    ToggleSearchPanel,
    ToggleLayersPanel,
    ToggleFiltersPanel,
    ClearCanvas,
    Escape,
    Help,
}

#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub command: ShortcutCommand,
    pub description: &'static str,
}

const fn plain(key: &'static str, command: ShortcutCommand, description: &'static str) -> Shortcut {
    Shortcut { key, ctrl: false, shift: false, command, description }
}

const fn ctrl(key: &'static str, command: ShortcutCommand, description: &'static str) -> Shortcut {
    Shortcut { key, ctrl: true, shift: false, command, description }
}

const fn ctrl_shift(key: &'static str, command: ShortcutCommand, description: &'static str) -> Shortcut {
    Shortcut { key, ctrl: true, shift: true, command, description }
}

pub static SHORTCUTS: &[Shortcut] = &[
    plain("v", ShortcutCommand::SelectTool(Tool::Select), "Select tool"),
    plain("h", ShortcutCommand::SelectTool(Tool::Highlight), "Highlight tool"),
    plain("n", ShortcutCommand::SelectTool(Tool::Note), "Note tool"),
    plain("d", ShortcutCommand::SelectTool(Tool::Draw), "Draw tool"),
    plain("t", ShortcutCommand::SelectTool(Tool::Text), "Text tool"),
    plain("r", ShortcutCommand::ToggleEraser, "Toggle eraser"),
    ctrl("s", ShortcutCommand::Save, "Save"),
    ctrl("z", ShortcutCommand::Undo, "Undo"),
    ctrl("y", ShortcutCommand::Redo, "Redo"),
    ctrl("e", ShortcutCommand::Export, "Export"),
    ctrl("f", ShortcutCommand::Search, "Search"),
    ctrl("1", ShortcutCommand::ToggleLayer(AnnotationKind::Highlight), "Toggle highlights"),
    ctrl("2", ShortcutCommand::ToggleLayer(AnnotationKind::Note), "Toggle notes"),
    ctrl("3", ShortcutCommand::ToggleLayer(AnnotationKind::Drawing), "Toggle drawings"),
    ctrl("4", ShortcutCommand::ToggleLayer(AnnotationKind::FloatingText), "Toggle texts"),
    ctrl_shift("s", ShortcutCommand::ToggleSearchPanel, "Toggle search panel"),
    ctrl_shift("l", ShortcutCommand::ToggleLayersPanel, "Toggle layers panel"),
    ctrl_shift("f", ShortcutCommand::ToggleFiltersPanel, "Toggle filters panel"),
    ctrl("delete", ShortcutCommand::ClearCanvas, "Clear canvas"),
    plain("escape", ShortcutCommand::Escape, "Cancel/close"),
    plain("?", ShortcutCommand::Help, "Help"),
];

/// Command bound to `event`, if any
pub fn resolve(event: &KeyEvent) -> Option<ShortcutCommand> {
    let ctrl = event.ctrl || event.meta;
    if event.in_text_input && !ctrl {
        return None;
    }
    let key = event.key.to_lowercase();

    SHORTCUTS
        .iter()
        .find(|s| s.key == key && s.ctrl == ctrl && s.shift == event.shift)
        .or_else(|| {
            // Shifted glyphs such as '?' arrive with shift held
            SHORTCUTS.iter().find(|s| !s.ctrl && !ctrl && s.key == key && !s.key.chars().all(char::is_alphanumeric))
        })
        .map(|s| s.command)
}
