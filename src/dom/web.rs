//! Browser [`Dom`] backed by `web-sys`, with `gloo` listeners and frames.
//!
//! Elements are interned into an arena the first time they are seen and
//! tagged with their slot index, so looking one up again is a single attribute
//! read. A slot lives until its element is released with [`Dom::release_node`]
//! or replaced through `set_inner_html`, then it is recycled. Every listener is
//! a [`gloo::events::EventListener`] stored under its [`ListenerScope`];
//! dropping them on [`Dom::release_scope`] removes them from the page.
//!
//! Native events are translated to [`DomEvent`] and handed to the event sink
//! installed by [`attach`], which routes them into the owning [`DiagramSet`].

use crate::config::ViewportConfig;
use crate::diagram::DiagramSet;
use crate::dom::{Binding, Dispatch, Dom, EventKind, EventOutcome, EventTarget, ListenerScope, NodeId};
use crate::error::{ViewportError, ViewportResult};
use crate::geometry::{Point, Rect};
use crate::input::{DeltaMode, DomEvent, KeyInput, Modifiers, PointerInput, WheelInput};
use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo::render::{AnimationFrame, request_animation_frame};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlElement, KeyboardEvent, MouseEvent, PointerEvent, WheelEvent};

/// Attribute holding an interned element's slot index
const NODE_ATTRIBUTE: &str = "data-viewport-node";

type EventSink = Rc<RefCell<Option<Box<dyn FnMut(Dispatch) -> EventOutcome>>>>;
type FrameSink = Rc<RefCell<Option<Box<dyn FnMut()>>>>;

/// The live page as a [`Dom`]
pub struct WebDom {
    window: web_sys::Window,
    document: web_sys::Document,
    /// `None` marks an element that could not be created
    nodes: RefCell<Vec<Option<Element>>>,
    free: RefCell<Vec<u32>>,
    head: NodeId,
    body: NodeId,
    listeners: HashMap<ListenerScope, Vec<(EventTarget, EventListener)>>,
    event_sink: EventSink,
    frame_sink: FrameSink,
    frame_pending: Rc<Cell<bool>>,
    frame: Option<AnimationFrame>,
    /// Pointer of the last pointer event, for capture
    pointer_id: Rc<Cell<Option<i32>>>,
}

impl std::fmt::Debug for WebDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDom")
            .field("nodes", &(self.nodes.borrow().len() - self.free.borrow().len()))
            .field("scopes", &self.listeners.len())
            .finish()
    }
}

impl WebDom {
    /// Wrap the current window's document
    pub fn new() -> ViewportResult<Self> {
        let window = web_sys::window().ok_or(ViewportError::Other("no window".to_string()))?;
        let document = window
            .document()
            .ok_or(ViewportError::Other("no document".to_string()))?;
        let head: Element = document
            .head()
            .ok_or(ViewportError::Other("document has no <head>".to_string()))?
            .into();
        let body: Element = document
            .body()
            .ok_or(ViewportError::Other("document has no <body>".to_string()))?
            .into();

        let dom = Self {
            window,
            document,
            nodes: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
            head: NodeId::from_index(0),
            body: NodeId::from_index(1),
            listeners: HashMap::new(),
            event_sink: Rc::new(RefCell::new(None)),
            frame_sink: Rc::new(RefCell::new(None)),
            frame_pending: Rc::new(Cell::new(false)),
            frame: None,
            pointer_id: Rc::new(Cell::new(None)),
        };
        dom.adopt(head);
        dom.adopt(body);
        Ok(dom)
    }

    /// Handle for an element of the page, e.g. a diagram container found by the host
    pub fn adopt(&self, element: Element) -> NodeId {
        let tagged = element
            .get_attribute(NODE_ATTRIBUTE)
            .and_then(|value| value.parse::<u32>().ok());
        if let Some(index) = tagged {
            let nodes = self.nodes.borrow();
            if nodes.get(index as usize).and_then(Option::as_ref) == Some(&element) {
                return NodeId::from_index(index);
            }
        }

        let node = self.allocate(Some(element.clone()));
        let _ = element.set_attribute(NODE_ATTRIBUTE, &node.index().to_string());
        node
    }

    fn allocate(&self, element: Option<Element>) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        match self.free.borrow_mut().pop() {
            Some(index) => {
                nodes[index as usize] = element;
                NodeId::from_index(index)
            }
            None => {
                nodes.push(element);
                NodeId::from_index((nodes.len() - 1) as u32)
            }
        }
    }

    /// Recycle the slots of `root`'s descendants, and of `root` itself when
    /// `include_root` is set. Head and body are never recycled.
    fn forget(&self, root: &Element, include_root: bool) -> Vec<NodeId> {
        let mut nodes = self.nodes.borrow_mut();
        let mut free = self.free.borrow_mut();
        let mut forgotten = Vec::new();
        for (index, slot) in nodes.iter_mut().enumerate().skip(2) {
            let Some(element) = slot.as_ref() else {
                continue;
            };
            let inside = if element == root {
                include_root
            } else {
                let node: &web_sys::Node = element.as_ref();
                root.contains(Some(node))
            };
            if inside {
                *slot = None;
                free.push(index as u32);
                forgotten.push(NodeId::from_index(index as u32));
            }
        }
        forgotten
    }

    fn drop_listeners_on(&mut self, forgotten: &[NodeId]) {
        if forgotten.is_empty() {
            return;
        }
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(target, _)| match target {
                EventTarget::Node(node) => !forgotten.contains(node),
                EventTarget::Document | EventTarget::Window => true,
            });
        }
    }

    /// The element behind `node`
    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.nodes.borrow().get(node.index()).cloned().flatten()
    }

    fn html(&self, node: NodeId) -> Option<HtmlElement> {
        self.element(node)?.dyn_into::<HtmlElement>().ok()
    }

    fn event_target(&self, target: EventTarget) -> Option<web_sys::EventTarget> {
        match target {
            EventTarget::Node(node) => self.element(node).map(Into::into),
            EventTarget::Document => Some(self.document.clone().into()),
            EventTarget::Window => Some(self.window.clone().into()),
        }
    }
}

impl Dom for WebDom {
    fn head(&self) -> NodeId {
        self.head
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        match self.document.create_element(tag) {
            Ok(element) => self.adopt(element),
            Err(e) => {
                tracing::warn!(tag, "failed to create element: {:?}", e);
                self.allocate(None)
            }
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.document.get_element_by_id(id).map(|e| self.adopt(e))
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.parent_element().map(|e| self.adopt(e))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) else {
            return;
        };
        if let Err(e) = parent.append_child(&child) {
            tracing::debug!("append_child failed: {:?}", e);
        }
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) else {
            return;
        };
        let reference = self.element(reference);
        let reference_node: Option<&web_sys::Node> = reference.as_ref().map(|r| r.as_ref());
        if let Err(e) = parent.insert_before(&child, reference_node) {
            tracing::debug!("insert_before failed: {:?}", e);
        }
    }

    fn remove_node(&mut self, node: NodeId) {
        if let Some(element) = self.element(node) {
            element.remove();
        }
    }

    fn release_node(&mut self, node: NodeId) {
        if node == self.head || node == self.body {
            return;
        }
        let Some(element) = self.element(node) else {
            return;
        };
        element.remove();
        let forgotten = self.forget(&element, true);
        self.drop_listeners_on(&forgotten);
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.is_connected())
    }

    fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        if let Some(element) = self.element(node) {
            let forgotten = self.forget(&element, false);
            self.drop_listeners_on(&forgotten);
            element.set_inner_html(markup);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.element(node) {
            let forgotten = self.forget(&element, false);
            self.drop_listeners_on(&forgotten);
            element.set_text_content(Some(text));
        }
    }

    fn find_svg(&self, node: NodeId) -> Option<NodeId> {
        let element = self.element(node)?;
        if element.tag_name().eq_ignore_ascii_case("svg") {
            return Some(node);
        }
        element
            .query_selector("svg")
            .ok()
            .flatten()
            .map(|svg| self.adopt(svg))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element(node) else {
            return;
        };
        if let Err(e) = element.set_attribute(name, value) {
            tracing::debug!(name, "set_attribute failed: {:?}", e);
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element(node) {
            let _ = element.remove_attribute(name);
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
        if let Some(element) = self.element(node) {
            let _ = element.class_list().toggle_with_force(class, on);
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|e| e.class_list().contains(class))
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(element) = self.html(node) {
            let _ = element.style().set_property(property, value);
        }
    }

    fn remove_style(&mut self, node: NodeId, property: &str) {
        if let Some(element) = self.html(node) {
            let _ = element.style().remove_property(property);
        }
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.html(node)?
            .style()
            .get_property_value(property)
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        match self.element(node) {
            Some(element) => {
                let rect = element.get_bounding_client_rect();
                Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
            }
            None => Rect::default(),
        }
    }

    fn listen(&mut self, scope: ListenerScope, target: EventTarget, kind: EventKind, binding: Binding) {
        let Some(event_target) = self.event_target(target) else {
            return;
        };
        let sink = self.event_sink.clone();
        let pointer_id = self.pointer_id.clone();
        let options = EventListenerOptions {
            phase: EventListenerPhase::Bubble,
            passive: kind.is_passive(),
        };
        let listener = EventListener::new_with_options(&event_target, kind.dom_name(), options, move |event: &Event| {
            if let Some(pointer) = event.dyn_ref::<PointerEvent>() {
                pointer_id.set(Some(pointer.pointer_id()));
            }
            let Some(dom_event) = translate_event(kind, event) else {
                return;
            };
            let Ok(mut sink) = sink.try_borrow_mut() else {
                tracing::trace!(kind = kind.dom_name(), "re-entrant event dropped");
                return;
            };
            let Some(sink) = sink.as_mut() else {
                return;
            };
            let outcome = sink(Dispatch {
                scope,
                binding,
                event: dom_event,
            });
            if outcome.prevent_default {
                event.prevent_default();
            }
            if outcome.stop_propagation {
                event.stop_propagation();
            }
        });
        self.listeners.entry(scope).or_default().push((target, listener));
    }

    fn release_scope(&mut self, scope: ListenerScope) -> usize {
        self.listeners.remove(&scope).map(|listeners| listeners.len()).unwrap_or(0)
    }

    fn set_pointer_capture(&mut self, node: NodeId, captured: bool) {
        let (Some(element), Some(pointer)) = (self.element(node), self.pointer_id.get()) else {
            return;
        };
        let result = if captured {
            element.set_pointer_capture(pointer)
        } else {
            element.release_pointer_capture(pointer)
        };
        if let Err(e) = result {
            tracing::debug!(pointer, captured, "pointer capture failed: {:?}", e);
        }
    }

    fn request_animation_frame(&mut self) {
        if self.frame_pending.replace(true) {
            return;
        }
        let sink = self.frame_sink.clone();
        let pending = self.frame_pending.clone();
        self.frame = Some(request_animation_frame(move |_| {
            pending.set(false);
            if let Ok(mut sink) = sink.try_borrow_mut() {
                if let Some(run) = sink.as_mut() {
                    run();
                }
            }
        }));
    }
}

fn modifiers(alt: bool, shift: bool, ctrl: bool, meta: bool) -> Modifiers {
    Modifiers { alt, shift, ctrl, meta }
}

fn pointer_input(event: &MouseEvent) -> PointerInput {
    PointerInput {
        client: Point::new(f64::from(event.client_x()), f64::from(event.client_y())),
        button: event.button(),
        buttons: event.buttons(),
        modifiers: modifiers(event.alt_key(), event.shift_key(), event.ctrl_key(), event.meta_key()),
    }
}

/// Native event to [`DomEvent`]; `None` if the event is not of the expected type
fn translate_event(kind: EventKind, event: &Event) -> Option<DomEvent> {
    let dom_event = match kind {
        EventKind::PointerDown => DomEvent::PointerDown(pointer_input(event.dyn_ref::<MouseEvent>()?)),
        EventKind::PointerMove => DomEvent::PointerMove(pointer_input(event.dyn_ref::<MouseEvent>()?)),
        EventKind::PointerUp => DomEvent::PointerUp(pointer_input(event.dyn_ref::<MouseEvent>()?)),
        EventKind::PointerEnter => DomEvent::PointerEnter(pointer_input(event.dyn_ref::<MouseEvent>()?)),
        EventKind::PointerOut => {
            let mouse = event.dyn_ref::<MouseEvent>()?;
            // Moving between elements; only leaving the window has no related target
            if mouse.related_target().is_some() {
                return None;
            }
            DomEvent::PointerLeave(pointer_input(mouse))
        }
        EventKind::Click => DomEvent::Click(pointer_input(event.dyn_ref::<MouseEvent>()?)),
        EventKind::Wheel => {
            let wheel = event.dyn_ref::<WheelEvent>()?;
            DomEvent::Wheel(WheelInput {
                client: Point::new(f64::from(wheel.client_x()), f64::from(wheel.client_y())),
                delta_y: wheel.delta_y(),
                delta_mode: DeltaMode::from_dom(wheel.delta_mode()),
                modifiers: modifiers(wheel.alt_key(), wheel.shift_key(), wheel.ctrl_key(), wheel.meta_key()),
            })
        }
        EventKind::KeyDown | EventKind::KeyUp => {
            let key = event.dyn_ref::<KeyboardEvent>()?;
            let input = KeyInput::new(
                key.key(),
                modifiers(key.alt_key(), key.shift_key(), key.ctrl_key(), key.meta_key()),
            );
            if kind == EventKind::KeyDown {
                DomEvent::KeyDown(input)
            } else {
                DomEvent::KeyUp(input)
            }
        }
        EventKind::Resize => DomEvent::Resize,
        EventKind::LostCapture => DomEvent::LostCapture,
    };
    Some(dom_event)
}

/// Build a [`DiagramSet`] over the page and route its listeners and frames into it.
///
/// The configuration is read from `#markdown-mermaid[data-config]` when present.
pub fn attach(dom: WebDom) -> Rc<RefCell<DiagramSet<WebDom>>> {
    let config = ViewportConfig::from_document(&dom);
    let event_sink = dom.event_sink.clone();
    let frame_sink = dom.frame_sink.clone();
    let set = Rc::new(RefCell::new(DiagramSet::new(dom, config)));

    let weak = Rc::downgrade(&set);
    *event_sink.borrow_mut() = Some(Box::new(move |dispatch: Dispatch| {
        let Some(set) = weak.upgrade() else {
            return EventOutcome::IGNORED;
        };
        match set.try_borrow_mut() {
            Ok(mut set) => set.handle(&dispatch),
            Err(_) => {
                tracing::trace!("diagram set busy, dropping event");
                EventOutcome::IGNORED
            }
        }
    }));

    let weak = Rc::downgrade(&set);
    *frame_sink.borrow_mut() = Some(Box::new(move || {
        let Some(set) = weak.upgrade() else {
            return;
        };
        if let Ok(mut set) = set.try_borrow_mut() {
            set.run_frame();
        }
    }));

    set
}
