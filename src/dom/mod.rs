//! The slice of the DOM the viewport controller needs.
//!
//! The controller never touches a browser API directly. It talks to a [`Dom`]
//! implementation through opaque [`NodeId`] handles:
//!
//! - [`memory::MemoryDom`] - headless document with simulated layout, used by
//!   tests and by hosts that drive diagrams without a browser
//! - `web::WebDom` (feature `web`) - `web-sys` elements and `gloo` listeners
//!
//! ## Listener scopes
//!
//! Every listener is registered under a [`ListenerScope`]. A controller owns
//! exactly one scope and releasing it removes every listener the controller
//! ever registered. Events come back to the manager as a [`Dispatch`] naming
//! the scope and the [`Binding`] they were registered through.

pub mod memory;
#[cfg(feature = "web")]
pub mod web;

use crate::geometry::Rect;
use crate::input::DomEvent;

/// Handle to an element owned by a [`Dom`] implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cancellation token covering every listener one controller registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerScope(u64);

impl ListenerScope {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Node(NodeId),
    Document,
    Window,
}

/// DOM event types the controller listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerEnter,
    /// Pointer left an element; delivered as [`DomEvent::PointerLeave`] only
    /// when it left the window
    PointerOut,
    Click,
    Wheel,
    KeyDown,
    KeyUp,
    Resize,
    LostCapture,
}

impl EventKind {
    /// DOM event name
    pub const fn dom_name(self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::PointerMove => "pointermove",
            Self::PointerUp => "pointerup",
            Self::PointerEnter => "pointerenter",
            Self::PointerOut => "pointerout",
            Self::Click => "click",
            Self::Wheel => "wheel",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::Resize => "resize",
            Self::LostCapture => "lostpointercapture",
        }
    }

    /// Wheel listeners must be able to cancel page scrolling
    pub const fn is_passive(self) -> bool {
        !matches!(self, Self::Wheel)
    }

    pub const fn bubbles(self) -> bool {
        !matches!(self, Self::PointerEnter | Self::Resize)
    }
}

/// Which registration an event arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// The diagram wrapper
    Container,
    /// Document-level pointer tracking (drags that leave the wrapper)
    Document,
    /// Window-level keys and resize
    Window,
    ZoomIn,
    ZoomOut,
    Reset,
    PanMode,
    ResizeHandle,
}

/// An event delivered to the listeners of one scope
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub scope: ListenerScope,
    pub binding: Binding,
    pub event: DomEvent,
}

/// What the backend should do with the native event after handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventOutcome {
    /// Let the browser handle the event normally
    pub const IGNORED: EventOutcome = EventOutcome {
        prevent_default: false,
        stop_propagation: false,
    };

    /// The event was fully handled here
    pub const CONSUMED: EventOutcome = EventOutcome {
        prevent_default: true,
        stop_propagation: true,
    };

    /// Suppress the browser default but keep propagating
    pub const PREVENT_DEFAULT: EventOutcome = EventOutcome {
        prevent_default: true,
        stop_propagation: false,
    };

    pub fn merge(self, other: EventOutcome) -> EventOutcome {
        EventOutcome {
            prevent_default: self.prevent_default || other.prevent_default,
            stop_propagation: self.stop_propagation || other.stop_propagation,
        }
    }
}

/// DOM operations used by the viewport controller
pub trait Dom {
    fn head(&self) -> NodeId;
    fn body(&self) -> NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId);
    fn remove_node(&mut self, node: NodeId);
    /// Detach `node` and drop the handles of it and its whole subtree. Those
    /// handles must not be used afterwards.
    fn release_node(&mut self, node: NodeId);
    /// True if the node is attached to the document
    fn is_connected(&self, node: NodeId) -> bool;

    /// Replace the node's children with parsed markup. Handles to the old
    /// children are released.
    fn set_inner_html(&mut self, node: NodeId, markup: &str);
    fn set_text(&mut self, node: NodeId, text: &str);
    /// First `<svg>` element in the node's subtree, including the node itself
    fn find_svg(&self, node: NodeId) -> Option<NodeId>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_class(&mut self, node: NodeId, class: &str, on: bool);
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    fn remove_style(&mut self, node: NodeId, property: &str);
    fn style(&self, node: NodeId, property: &str) -> Option<String>;

    /// Border box in client coordinates, transforms included
    fn bounding_rect(&self, node: NodeId) -> Rect;

    fn listen(&mut self, scope: ListenerScope, target: EventTarget, kind: EventKind, binding: Binding);
    /// Remove every listener registered under `scope`, returning how many
    fn release_scope(&mut self, scope: ListenerScope) -> usize;

    /// Route the active pointer's events to `node` until released, so a drag
    /// keeps reporting outside the window
    fn set_pointer_capture(&mut self, node: NodeId, captured: bool);

    /// Ask for the owning [`crate::DiagramSet::run_frame`] to run after the next layout
    fn request_animation_frame(&mut self);

    /// Convenience: add a class to a freshly created element
    fn create_element_with_class(&mut self, tag: &str, class: &str) -> NodeId {
        let node = self.create_element(tag);
        self.set_class(node, class, true);
        node
    }
}
