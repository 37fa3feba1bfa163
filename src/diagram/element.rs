//! Pan/zoom controller for a single rendered diagram.
//!
//! ## DOM structure
//!
//! ```text
//! div.mermaid-wrapper          fixed viewport: overflow hidden, receives input
//! ├── div.mermaid-content      transformed layer (transform-origin 0 0)
//! │   └── <container>          the element holding the rendered <svg>
//! ├── div.mermaid-zoom-controls
//! └── div.mermaid-resize-handle
//! ```
//!
//! The wrapper takes the container's place in the document. Only the content
//! layer is transformed, so the wrapper's box stays put while the diagram moves.
//! Disposing puts the container back where the wrapper was and drops the
//! wrapper, so the same container can be mounted again.

use crate::config::{ShowControlsMode, ViewportConfig};
use crate::constants::{CONTENT_CLASS, DEFAULT_SCALE, STEP_ZOOM_IN, STEP_ZOOM_OUT, WRAPPER_CLASS};
use crate::diagram::controls::{Controls, create_resize_handle};
use crate::dom::{Binding, Dom, EventKind, EventOutcome, EventTarget, ListenerScope, NodeId};
use crate::error::{ViewportError, ViewportResult};
use crate::geometry::{compose_css_transform, css_px};
use crate::input::{Cursor, DomEvent, GestureHandler, GestureResponse, Modifiers};
use crate::types::TransformState;

/// Listeners every controller registers, besides buttons and the resize handle
const LISTENERS: &[(EventTarget, EventKind, Binding)] = &[
    (EventTarget::Document, EventKind::PointerMove, Binding::Document),
    (EventTarget::Document, EventKind::PointerUp, Binding::Document),
    (EventTarget::Document, EventKind::PointerOut, Binding::Document),
    (EventTarget::Window, EventKind::KeyDown, Binding::Window),
    (EventTarget::Window, EventKind::KeyUp, Binding::Window),
    (EventTarget::Window, EventKind::Resize, Binding::Window),
];

/// Listeners on the wrapper itself
const WRAPPER_EVENTS: &[EventKind] = &[
    EventKind::PointerDown,
    EventKind::Click,
    EventKind::Wheel,
    EventKind::PointerMove,
    EventKind::PointerEnter,
    EventKind::LostCapture,
];

/// Interactive viewport around one rendered diagram
#[derive(Debug)]
pub struct DiagramElement {
    container: NodeId,
    wrapper: NodeId,
    content: NodeId,
    state: TransformState,
    gesture: GestureHandler,
    scope: ListenerScope,
    controls: Option<Controls>,
    resize_handle: Option<NodeId>,
    disposed: bool,
}

impl DiagramElement {
    /// Wrap `container` in a viewport and register its listeners under `scope`.
    ///
    /// `initial` is validated and stored but not rendered; call
    /// [`Self::initialize`] once layout is available.
    pub fn mount<D: Dom>(
        dom: &mut D,
        container: NodeId,
        config: &ViewportConfig,
        initial: Option<TransformState>,
        scope: ListenerScope,
    ) -> ViewportResult<Self> {
        let parent = dom.parent(container).ok_or(ViewportError::Detached)?;

        let wrapper = dom.create_element_with_class("div", WRAPPER_CLASS);
        let content = dom.create_element_with_class("div", CONTENT_CLASS);
        dom.insert_before(parent, wrapper, container);
        dom.append_child(content, container);
        dom.append_child(wrapper, content);

        dom.set_style(content, "transform-origin", "0 0");
        dom.set_style(wrapper, "position", "relative");
        dom.set_style(wrapper, "overflow", "hidden");
        dom.set_attribute(wrapper, "tabindex", "0");
        if let Some(max_height) = config.max_height_css() {
            dom.set_style(wrapper, "max-height", &max_height);
        }

        let bounds = config.scale_bounds();
        let state = initial.map(|s| s.sanitized(bounds)).unwrap_or_else(|| TransformState {
            scale: bounds.clamp(DEFAULT_SCALE),
            ..TransformState::default()
        });

        for kind in WRAPPER_EVENTS {
            dom.listen(scope, EventTarget::Node(wrapper), *kind, Binding::Container);
        }
        for (target, kind, binding) in LISTENERS {
            dom.listen(scope, *target, *kind, *binding);
        }

        let controls = Controls::create(dom, wrapper, config.show_controls, scope);
        let resize_handle = config
            .resizable
            .then(|| create_resize_handle(dom, wrapper, scope));

        let element = Self {
            container,
            wrapper,
            content,
            state,
            gesture: GestureHandler::new(config.click_drag, bounds, config.resizable),
            scope,
            controls,
            resize_handle,
            disposed: false,
        };
        element.set_cursor(dom, element.gesture.cursor(Modifiers::NONE));
        Ok(element)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current transform state
    pub fn state(&self) -> TransformState {
        self.state
    }

    /// The element holding the rendered diagram
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    pub fn content(&self) -> NodeId {
        self.content
    }

    pub fn scope(&self) -> ListenerScope {
        self.scope
    }

    pub fn controls(&self) -> Option<&Controls> {
        self.controls.as_ref()
    }

    pub fn resize_handle(&self) -> Option<NodeId> {
        self.resize_handle
    }

    pub fn gesture(&self) -> &GestureHandler {
        &self.gesture
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Apply the stored state: re-center a pristine diagram, otherwise restore
    /// the saved transform and height.
    pub fn initialize<D: Dom>(&mut self, dom: &mut D) {
        if self.state.has_interacted {
            if let Some(height) = self.state.custom_height {
                dom.set_style(self.wrapper, "height", &css_px(height));
            }
            self.render_transform(dom);
        } else {
            self.center(dom);
        }
    }

    /// Fit the wrapper to the diagram's height and center it horizontally at scale 1
    pub fn center<D: Dom>(&mut self, dom: &mut D) {
        let Some(svg) = dom.find_svg(self.content) else {
            tracing::debug!("no svg to center");
            return;
        };

        dom.remove_attribute(svg, "height");

        let previous = dom.style(self.content, "transform");
        dom.set_style(self.content, "transform", "none");
        let svg_rect = dom.bounding_rect(svg);
        match previous {
            Some(transform) => dom.set_style(self.content, "transform", &transform),
            None => dom.remove_style(self.content, "transform"),
        }

        let height = self.state.custom_height.unwrap_or(svg_rect.height);
        dom.set_style(self.wrapper, "height", &css_px(height));

        let wrapper_rect = dom.bounding_rect(self.wrapper);
        self.state.scale = self.gesture.bounds().clamp(DEFAULT_SCALE);
        self.state.translate_x = (wrapper_rect.width - svg_rect.width * self.state.scale) / 2.0;
        self.state.translate_y = 0.0;
        self.render_transform(dom);
    }

    /// Back to the auto-fitted default view, dropping any custom height
    pub fn reset<D: Dom>(&mut self, dom: &mut D) {
        self.state = TransformState {
            scale: self.gesture.bounds().clamp(DEFAULT_SCALE),
            ..TransformState::default()
        };
        self.center(dom);
    }

    pub fn zoom_in<D: Dom>(&mut self, dom: &mut D) {
        self.zoom_about_center(dom, STEP_ZOOM_IN);
    }

    pub fn zoom_out<D: Dom>(&mut self, dom: &mut D) {
        self.zoom_about_center(dom, STEP_ZOOM_OUT);
    }

    fn zoom_about_center<D: Dom>(&mut self, dom: &mut D, factor: f64) {
        let pivot = dom.bounding_rect(self.wrapper).local_center();
        self.state = self.gesture.zoom(&self.state, factor, pivot);
        self.render_transform(dom);
    }

    /// Window resized: keep a pristine diagram centered
    pub fn handle_resize<D: Dom>(&mut self, dom: &mut D) {
        if !self.state.has_interacted {
            self.center(dom);
        }
    }

    /// Release every listener, clear a body cursor left by an active resize
    /// and unwrap the container. Returns the number of listeners released;
    /// later calls are no-ops.
    pub fn dispose<D: Dom>(&mut self, dom: &mut D) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;

        if !self.gesture.state().is_idle() {
            dom.set_pointer_capture(self.wrapper, false);
        }
        let response = self.gesture.cancel(&self.state);
        if let Some(next) = response.transform {
            self.state = next;
        }
        if response.body_cursor.is_some() {
            let body = dom.body();
            dom.remove_style(body, "cursor");
        }

        let released = dom.release_scope(self.scope);
        self.unwrap_container(dom);
        tracing::debug!(scope = self.scope.raw(), released, "diagram disposed");
        released
    }

    /// Move the container back to the wrapper's place and drop the wrapper,
    /// its content layer and its controls
    fn unwrap_container<D: Dom>(&mut self, dom: &mut D) {
        if dom.parent(self.container) == Some(self.content) {
            match dom.parent(self.wrapper) {
                Some(parent) => dom.insert_before(parent, self.container, self.wrapper),
                None => dom.remove_node(self.container),
            }
        }
        dom.release_node(self.wrapper);
        self.controls = None;
        self.resize_handle = None;
    }

    /// Apply new display options without discarding the transform state
    pub fn apply_config<D: Dom>(&mut self, dom: &mut D, config: &ViewportConfig) {
        let bounds = config.scale_bounds();
        self.gesture.set_bounds(bounds);
        self.state.scale = bounds.clamp(self.state.scale);

        match config.max_height_css() {
            Some(max_height) => dom.set_style(self.wrapper, "max-height", &max_height),
            None => dom.remove_style(self.wrapper, "max-height"),
        }

        self.gesture.set_click_drag(config.click_drag);
        self.gesture.set_resizable(config.resizable);

        match (config.resizable, self.resize_handle) {
            (true, None) => self.resize_handle = Some(create_resize_handle(dom, self.wrapper, self.scope)),
            (false, Some(handle)) => {
                dom.release_node(handle);
                self.resize_handle = None;
            }
            _ => {}
        }

        match (&self.controls, config.show_controls) {
            (Some(controls), ShowControlsMode::Never) => {
                controls.remove(dom);
                self.controls = None;
            }
            (Some(controls), mode) => controls.set_mode(dom, mode),
            (None, mode) => {
                self.controls = Controls::create(dom, self.wrapper, mode, self.scope);
                if let Some(controls) = &self.controls {
                    controls.set_pan_mode(dom, self.gesture.pan_mode());
                }
            }
        }

        self.set_cursor(dom, self.gesture.cursor(Modifiers::NONE));
        self.render_transform(dom);
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Handle an event delivered through `binding`
    pub fn handle<D: Dom>(&mut self, dom: &mut D, binding: Binding, event: &DomEvent) -> EventOutcome {
        if self.disposed {
            return EventOutcome::IGNORED;
        }

        let was_idle = self.gesture.state().is_idle();
        let response = match (binding, event) {
            (Binding::Container, DomEvent::PointerDown(input)) => self.gesture.pointer_down(input, &self.state),
            (Binding::Container, DomEvent::PointerMove(input) | DomEvent::PointerEnter(input)) => {
                self.gesture.hover(input.modifiers)
            }
            (Binding::Container, DomEvent::Click(input)) => {
                let rect = dom.bounding_rect(self.wrapper);
                self.gesture.click(input, &self.state, rect)
            }
            (Binding::Container, DomEvent::Wheel(input)) => {
                let rect = dom.bounding_rect(self.wrapper);
                self.gesture.wheel(input, &self.state, rect)
            }
            (Binding::Container, DomEvent::LostCapture) => self.gesture.cancel(&self.state),

            (Binding::Document, DomEvent::PointerMove(input)) => self.gesture.pointer_move(input, &self.state),
            (Binding::Document, DomEvent::PointerUp(_)) => self.gesture.pointer_up(&self.state),
            (Binding::Document, DomEvent::PointerLeave(input)) => self.gesture.pointer_leave(input, &self.state),

            (Binding::Window, DomEvent::KeyDown(key)) => self.gesture.key_down(key, &self.state),
            (Binding::Window, DomEvent::KeyUp(key)) => self.gesture.key_up(key),
            (Binding::Window, DomEvent::Resize) => {
                self.handle_resize(dom);
                GestureResponse::NONE
            }

            (Binding::ZoomIn, DomEvent::Click(_)) => {
                self.zoom_in(dom);
                return EventOutcome::CONSUMED;
            }
            (Binding::ZoomOut, DomEvent::Click(_)) => {
                self.zoom_out(dom);
                return EventOutcome::CONSUMED;
            }
            (Binding::Reset, DomEvent::Click(_)) => {
                self.reset(dom);
                return EventOutcome::CONSUMED;
            }
            (Binding::PanMode, DomEvent::Click(_)) => GestureResponse {
                outcome: EventOutcome::CONSUMED,
                ..self.gesture.toggle_pan_mode()
            },

            (Binding::ResizeHandle, DomEvent::PointerDown(input)) => {
                let height = dom.bounding_rect(self.wrapper).height;
                self.gesture.resize_down(input, height)
            }

            _ => GestureResponse::NONE,
        };

        self.apply(dom, &response);
        let idle = self.gesture.state().is_idle();
        if idle != was_idle {
            dom.set_pointer_capture(self.wrapper, !idle);
        }
        response.outcome
    }

    fn apply<D: Dom>(&mut self, dom: &mut D, response: &GestureResponse) {
        if let Some(next) = response.transform {
            let moved = next.scale != self.state.scale
                || next.translate_x != self.state.translate_x
                || next.translate_y != self.state.translate_y;
            self.state = next;
            if moved {
                self.render_transform(dom);
            }
        }
        if let Some(height) = response.height {
            dom.set_style(self.wrapper, "height", &css_px(height));
        }
        if let Some(cursor) = response.cursor {
            self.set_cursor(dom, cursor);
        }
        if let Some(body_cursor) = response.body_cursor {
            let body = dom.body();
            match body_cursor {
                Some(cursor) => dom.set_style(body, "cursor", cursor.css()),
                None => dom.remove_style(body, "cursor"),
            }
        }
        if let (Some(active), Some(controls)) = (response.pan_mode, &self.controls) {
            controls.set_pan_mode(dom, active);
        }
    }

    fn set_cursor<D: Dom>(&self, dom: &mut D, cursor: Cursor) {
        dom.set_style(self.wrapper, "cursor", cursor.css());
    }

    fn render_transform<D: Dom>(&self, dom: &mut D) {
        dom.set_style(self.content, "transform", &compose_css_transform(&self.state));
    }
}
