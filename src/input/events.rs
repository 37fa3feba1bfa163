//! Backend-neutral input events.
//!
//! Backends translate native DOM events into [`DomEvent`] before handing them
//! to the manager; everything downstream is plain data.

use crate::dom::EventKind;
use crate::geometry::Point;

/// Modifier keys held while an event fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        shift: false,
        ctrl: false,
        meta: false,
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    pub const ALT_SHIFT: Modifiers = Modifiers {
        alt: true,
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
}

/// Pointer position and button state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Client coordinates
    pub client: Point,
    /// Button that changed (`MouseEvent.button`)
    pub button: i16,
    /// Buttons currently held (`MouseEvent.buttons`)
    pub buttons: u16,
    pub modifiers: Modifiers,
}

impl PointerInput {
    /// Primary button pressed at `client`
    pub fn primary(client: Point, modifiers: Modifiers) -> Self {
        Self {
            client,
            button: 0,
            buttons: crate::constants::PRIMARY_BUTTON_MASK,
            modifiers,
        }
    }

    /// Pointer at `client` with no buttons held
    pub fn hover(client: Point, modifiers: Modifiers) -> Self {
        Self {
            client,
            button: 0,
            buttons: 0,
            modifiers,
        }
    }

    #[inline]
    pub fn is_primary(&self) -> bool {
        self.button == 0
    }
}

/// Units of `WheelEvent.deltaY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

impl DeltaMode {
    /// From `WheelEvent.deltaMode`
    pub fn from_dom(mode: u32) -> Self {
        match mode {
            1 => Self::Line,
            2 => Self::Page,
            _ => Self::Pixel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub client: Point,
    pub delta_y: f64,
    pub delta_mode: DeltaMode,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyInput {
    /// `KeyboardEvent.key`
    pub key: String,
    /// Modifier state after the key event
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    #[inline]
    pub fn is_escape(&self) -> bool {
        self.key == "Escape"
    }

    /// Alt or Shift, the keys that change the cursor affordance
    #[inline]
    pub fn is_modifier(&self) -> bool {
        matches!(self.key.as_str(), "Alt" | "Shift")
    }
}

/// An input event as seen by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    PointerDown(PointerInput),
    PointerMove(PointerInput),
    PointerUp(PointerInput),
    PointerEnter(PointerInput),
    /// The pointer left the window
    PointerLeave(PointerInput),
    Click(PointerInput),
    Wheel(WheelInput),
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    Resize,
    LostCapture,
}

impl DomEvent {
    /// DOM event type this corresponds to
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerDown(_) => EventKind::PointerDown,
            Self::PointerMove(_) => EventKind::PointerMove,
            Self::PointerUp(_) => EventKind::PointerUp,
            Self::PointerEnter(_) => EventKind::PointerEnter,
            Self::PointerLeave(_) => EventKind::PointerOut,
            Self::Click(_) => EventKind::Click,
            Self::Wheel(_) => EventKind::Wheel,
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::KeyUp(_) => EventKind::KeyUp,
            Self::Resize => EventKind::Resize,
            Self::LostCapture => EventKind::LostCapture,
        }
    }
}
