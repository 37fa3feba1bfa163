//! Zoom/pan buttons and the resize handle.

use crate::config::ShowControlsMode;
use crate::constants::{ACTIVE_CLASS, CONTROLS_AUTO_HIDE_CLASS, CONTROLS_CLASS, RESIZE_HANDLE_CLASS};
use crate::dom::{Binding, Dom, EventKind, EventTarget, ListenerScope, NodeId};

/// Button class, tooltip, icon and binding, in display order
const BUTTONS: [(&str, &str, &str, Binding); 4] = [
    ("pan-mode-btn", "Toggle Pan Mode", "codicon-move", Binding::PanMode),
    ("zoom-out-btn", "Zoom Out", "codicon-zoom-out", Binding::ZoomOut),
    ("zoom-in-btn", "Zoom In", "codicon-zoom-in", Binding::ZoomIn),
    ("zoom-reset-btn", "Reset Zoom", "codicon-screen-normal", Binding::Reset),
];

/// The button bar of one diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub root: NodeId,
    pub pan_mode: NodeId,
    pub zoom_out: NodeId,
    pub zoom_in: NodeId,
    pub reset: NodeId,
}

impl Controls {
    /// Build the button bar inside `wrapper` and listen for clicks under
    /// `scope`. Returns `None` for [`ShowControlsMode::Never`].
    pub fn create<D: Dom>(
        dom: &mut D,
        wrapper: NodeId,
        mode: ShowControlsMode,
        scope: ListenerScope,
    ) -> Option<Self> {
        if mode == ShowControlsMode::Never {
            return None;
        }

        let root = dom.create_element_with_class("div", CONTROLS_CLASS);
        let mut buttons = [root; 4];
        for (slot, (class, title, icon, binding)) in buttons.iter_mut().zip(BUTTONS) {
            let button = dom.create_element_with_class("button", class);
            dom.set_attribute(button, "title", title);
            let span = dom.create_element("span");
            dom.set_attribute(span, "class", &format!("codicon {icon}"));
            dom.append_child(button, span);
            dom.append_child(root, button);
            dom.listen(scope, EventTarget::Node(button), EventKind::Click, binding);
            *slot = button;
        }
        dom.append_child(wrapper, root);

        let controls = Self {
            root,
            pan_mode: buttons[0],
            zoom_out: buttons[1],
            zoom_in: buttons[2],
            reset: buttons[3],
        };
        controls.set_mode(dom, mode);
        Some(controls)
    }

    /// Switch between always-visible and hover/focus visibility
    pub fn set_mode<D: Dom>(&self, dom: &mut D, mode: ShowControlsMode) {
        dom.set_class(
            self.root,
            CONTROLS_AUTO_HIDE_CLASS,
            mode == ShowControlsMode::OnHoverOrFocus,
        );
    }

    pub fn set_pan_mode<D: Dom>(&self, dom: &mut D, active: bool) {
        dom.set_class(self.pan_mode, ACTIVE_CLASS, active);
    }

    pub fn remove<D: Dom>(&self, dom: &mut D) {
        dom.release_node(self.root);
    }
}

/// Append a resize handle to `wrapper` and listen for presses under `scope`
pub fn create_resize_handle<D: Dom>(dom: &mut D, wrapper: NodeId, scope: ListenerScope) -> NodeId {
    let handle = dom.create_element_with_class("div", RESIZE_HANDLE_CLASS);
    dom.set_attribute(handle, "title", "Drag to resize");
    dom.append_child(wrapper, handle);
    dom.listen(scope, EventTarget::Node(handle), EventKind::PointerDown, Binding::ResizeHandle);
    handle
}
