//! Cursor affordance for the diagram wrapper.

use crate::config::ClickDragMode;
use crate::input::Modifiers;

/// Cursor shown over a diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
    ZoomIn,
    ZoomOut,
    NsResize,
}

impl Cursor {
    /// CSS `cursor` value
    pub const fn css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::NsResize => "ns-resize",
        }
    }
}

/// Cursor while no gesture is active
pub fn cursor_for(mode: ClickDragMode, pan_mode: bool, modifiers: Modifiers) -> Cursor {
    if pan_mode {
        return Cursor::Grab;
    }

    match mode {
        ClickDragMode::ModifierRequired => match (modifiers.alt, modifiers.shift) {
            (true, true) => Cursor::ZoomOut,
            (true, false) => Cursor::Grab,
            _ => Cursor::Default,
        },
        ClickDragMode::Always => match (modifiers.alt, modifiers.shift) {
            (true, true) => Cursor::ZoomOut,
            (true, false) => Cursor::ZoomIn,
            _ => Cursor::Grab,
        },
        ClickDragMode::Never => match (modifiers.alt, modifiers.shift) {
            (true, true) => Cursor::ZoomOut,
            (true, false) => Cursor::ZoomIn,
            _ => Cursor::Default,
        },
    }
}
