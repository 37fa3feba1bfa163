//! Headless [`Dom`] with a simulated layout.
//!
//! Nodes live in an arena. Removing a node only detaches it; its slot is
//! recycled once the node is released with [`Dom::release_node`] or its
//! parent's content is replaced. Layout is deliberately simple:
//!
//! - every box starts at its parent's origin unless given an explicit rect
//!   with [`MemoryDom::set_layout`]
//! - width comes from a `px` `width` style, the SVG's intrinsic width, an
//!   explicit rect, or the parent's width (block elements fill their parent)
//! - height comes from a `px` `height` style, the SVG's intrinsic height, an
//!   explicit rect, or the tallest child, then `max-height` (px) is applied
//! - `transform` styles (`translate(..px, ..px) scale(..)`, origin `0 0`) on
//!   the node and its ancestors are applied to the result
//!
//! SVG intrinsic size is read from the `width`/`height` attributes, falling
//! back to the `viewBox` (keeping its aspect ratio when only one side is
//! known) and finally to the CSS default of 300x150.

use crate::dom::{Binding, Dom, EventKind, EventTarget, ListenerScope, NodeId};
use crate::geometry::{Point, Rect};

const DEFAULT_SVG_WIDTH: f64 = 300.0;
const DEFAULT_SVG_HEIGHT: f64 = 150.0;

#[derive(Debug, Clone, Default)]
struct Node {
    live: bool,
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
    text: String,
    layout: Option<Rect>,
}

/// A registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerRecord {
    pub scope: ListenerScope,
    pub target: EventTarget,
    pub kind: EventKind,
    pub binding: Binding,
}

/// In-memory document
#[derive(Debug)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    listeners: Vec<ListenerRecord>,
    frame_requests: usize,
    pointer_capture: Option<NodeId>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Empty `<html><head/><body/></html>` document
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId::from_index(0),
            head: NodeId::from_index(0),
            body: NodeId::from_index(0),
            listeners: Vec::new(),
            frame_requests: 0,
            pointer_capture: None,
        };
        dom.root = dom.create_element("html");
        dom.head = dom.create_element("head");
        dom.body = dom.create_element("body");
        dom.append_child(dom.root, dom.head);
        dom.append_child(dom.root, dom.body);
        dom
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    // ========================================================================
    // Test and host helpers
    // ========================================================================

    /// Give a node an explicit border box (client coordinates, untransformed)
    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        self.node_mut(node).layout = Some(rect);
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.node(node).text
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    /// All nodes in the subtree of `node` (excluding it) carrying `class`
    pub fn find_by_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.node(node).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.has_class(id, class) {
                found.push(id);
            }
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        found
    }

    /// Number of live node handles
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Element holding pointer capture, if any
    pub fn pointer_capture(&self) -> Option<NodeId> {
        self.pointer_capture
    }

    pub fn listeners(&self) -> &[ListenerRecord] {
        &self.listeners
    }

    pub fn listener_count(&self, scope: ListenerScope) -> usize {
        self.listeners.iter().filter(|l| l.scope == scope).count()
    }

    /// Number of animation frames requested and not yet taken
    pub fn pending_frames(&self) -> usize {
        self.frame_requests
    }

    /// Consume the pending frame requests, returning whether there were any
    pub fn take_frame_request(&mut self) -> bool {
        let requested = self.frame_requests > 0;
        self.frame_requests = 0;
        requested
    }

    /// Targets visited by an event of `kind` fired at `target`, innermost first
    pub fn event_path(&self, target: EventTarget, kind: EventKind) -> Vec<EventTarget> {
        let mut path = vec![target];
        if !kind.bubbles() {
            return path;
        }
        if let EventTarget::Node(node) = target {
            let connected = self.is_connected(node);
            let mut current = self.node(node).parent;
            while let Some(id) = current {
                path.push(EventTarget::Node(id));
                current = self.node(id).parent;
            }
            if connected {
                path.push(EventTarget::Document);
            }
        }
        if matches!(path.last(), Some(EventTarget::Document)) {
            path.push(EventTarget::Window);
        }
        path
    }

    /// Listeners registered for `kind` directly on `target`, in registration order
    pub fn listeners_at(&self, target: EventTarget, kind: EventKind) -> Vec<(ListenerScope, Binding)> {
        self.listeners
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .map(|l| (l.scope, l.binding))
            .collect()
    }

    /// Serialize a subtree as markup, for assertions and snapshots
    pub fn markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        if !node.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", node.classes.join(" ")));
        }
        for (name, value) in &node.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        if let Some(style) = self.style_attribute(id) {
            out.push_str(&format!(" style=\"{style}\""));
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            self.write_markup(*child, out);
        }
        out.push_str(&format!("</{}>", node.tag));
    }

    fn style_attribute(&self, id: NodeId) -> Option<String> {
        let styles = &self.node(id).styles;
        if styles.is_empty() {
            return None;
        }
        Some(
            styles
                .iter()
                .map(|(k, v)| format!("{k}: {v};"))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    // ========================================================================
    // Markup parsing
    // ========================================================================

    fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.node_mut(node).children);
        for child in children {
            self.node_mut(child).parent = None;
            self.free_subtree(child);
        }
        self.node_mut(node).text.clear();
    }

    /// Return the slots of a detached subtree to the free list
    fn free_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if !self.node(id).live {
                continue;
            }
            let freed = std::mem::take(self.node_mut(id));
            stack.extend(freed.children);
            if self.pointer_capture == Some(id) {
                self.pointer_capture = None;
            }
            self.listeners.retain(|l| l.target != EventTarget::Node(id));
            self.free.push(id);
        }
    }

    fn build_from_xml(&mut self, parent: NodeId, xml: roxmltree::Node<'_, '_>) {
        for child in xml.children() {
            if child.is_element() {
                let id = self.create_element(child.tag_name().name());
                for attribute in child.attributes() {
                    self.set_attribute(id, attribute.name(), attribute.value());
                }
                self.append_child(parent, id);
                self.build_from_xml(id, child);
            } else if child.is_text() {
                let trimmed = child.text().unwrap_or_default().trim();
                if !trimmed.is_empty() {
                    self.node_mut(parent).text.push_str(trimmed);
                }
            }
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    fn px_style(&self, id: NodeId, property: &str) -> Option<f64> {
        parse_px(self.style(id, property)?.as_str())
    }

    fn svg_intrinsic_size(&self, id: NodeId) -> (f64, f64) {
        let attr = |name: &str| self.attribute(id, name).as_deref().and_then(parse_px);
        let view_box = self.attribute(id, "viewBox").and_then(|v| parse_view_box(&v));

        match (attr("width"), attr("height"), view_box) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((vw, vh))) if vw > 0.0 => (w, w * vh / vw),
            (None, Some(h), Some((vw, vh))) if vh > 0.0 => (h * vw / vh, h),
            (None, None, Some((vw, vh))) => (vw, vh),
            (w, h, _) => (w.unwrap_or(DEFAULT_SVG_WIDTH), h.unwrap_or(DEFAULT_SVG_HEIGHT)),
        }
    }

    fn is_svg(&self, id: NodeId) -> bool {
        self.node(id).tag.eq_ignore_ascii_case("svg")
    }

    fn layout_origin(&self, id: NodeId) -> Point {
        if let Some(rect) = self.node(id).layout {
            return rect.origin();
        }
        match self.node(id).parent {
            Some(parent) => self.layout_origin(parent),
            None => Point::ORIGIN,
        }
    }

    fn layout_width(&self, id: NodeId) -> f64 {
        if let Some(w) = self.px_style(id, "width") {
            return w;
        }
        if self.is_svg(id) {
            return self.svg_intrinsic_size(id).0;
        }
        if let Some(rect) = self.node(id).layout {
            return rect.width;
        }
        match self.node(id).parent {
            Some(parent) => self.layout_width(parent),
            None => 0.0,
        }
    }

    fn layout_height(&self, id: NodeId) -> f64 {
        let height = if let Some(h) = self.px_style(id, "height") {
            h
        } else if self.is_svg(id) {
            self.svg_intrinsic_size(id).1
        } else if let Some(rect) = self.node(id).layout {
            rect.height
        } else {
            self.node(id)
                .children
                .iter()
                .map(|c| self.layout_height(*c))
                .fold(0.0, f64::max)
        };
        match self.px_style(id, "max-height") {
            Some(max) => height.min(max),
            None => height,
        }
    }

    fn transform_of(&self, id: NodeId) -> Option<(Point, f64)> {
        parse_transform(self.style(id, "transform")?.as_str())
    }
}

impl Dom for MemoryDom {
    fn head(&self) -> NodeId {
        self.head
    }

    fn body(&self) -> NodeId {
        self.body
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = Node {
            live: true,
            tag: tag.to_string(),
            ..Node::default()
        };
        match self.free.pop() {
            Some(id) => {
                *self.node_mut(id) = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId::from_index((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id").as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(self.node(node).children.iter().rev().copied());
        }
        None
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.remove_node(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.remove_node(child);
        let index = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(self.node(parent).children.len());
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(index, child);
    }

    fn remove_node(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != node);
        }
    }

    fn release_node(&mut self, node: NodeId) {
        if node == self.root || node == self.head || node == self.body {
            return;
        }
        self.remove_node(node);
        self.free_subtree(node);
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        self.clear_children(node);
        let wrapped = format!("<fragment>{markup}</fragment>");
        match roxmltree::Document::parse(&wrapped) {
            Ok(doc) => self.build_from_xml(node, doc.root_element()),
            Err(e) => {
                tracing::debug!("markup is not well-formed XML, keeping it as text: {}", e);
                self.node_mut(node).text = markup.to_string();
            }
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        self.node_mut(node).text = text.to_string();
    }

    fn find_svg(&self, node: NodeId) -> Option<NodeId> {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if self.is_svg(id) {
                return Some(id);
            }
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        None
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if name == "class" {
            self.node_mut(node).classes = value.split_whitespace().map(str::to_string).collect();
            return;
        }
        if name == "style" {
            self.node_mut(node).styles = value
                .split(';')
                .filter_map(|decl| decl.split_once(':'))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect();
            return;
        }
        let attributes = &mut self.node_mut(node).attributes;
        match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        match name {
            "class" => self.node_mut(node).classes.clear(),
            "style" => self.node_mut(node).styles.clear(),
            _ => self.node_mut(node).attributes.retain(|(k, _)| k != name),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match name {
            "class" => {
                let classes = &self.node(node).classes;
                (!classes.is_empty()).then(|| classes.join(" "))
            }
            "style" => self.style_attribute(node),
            _ => self
                .node(node)
                .attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
        }
    }

    fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
        let classes = &mut self.node_mut(node).classes;
        let present = classes.iter().any(|c| c == class);
        if on && !present {
            classes.push(class.to_string());
        } else if !on && present {
            classes.retain(|c| c != class);
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).classes.iter().any(|c| c == class)
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let styles = &mut self.node_mut(node).styles;
        match styles.iter_mut().find(|(k, _)| k == property) {
            Some((_, v)) => *v = value.to_string(),
            None => styles.push((property.to_string(), value.to_string())),
        }
    }

    fn remove_style(&mut self, node: NodeId, property: &str) {
        self.node_mut(node).styles.retain(|(k, _)| k != property);
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node)
            .styles
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.clone())
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let origin = self.layout_origin(node);
        let mut top_left = origin;
        let mut size = Point::new(self.layout_width(node), self.layout_height(node));

        // Apply the node's own transform, then each ancestor's, innermost first
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some((translate, scale)) = self.transform_of(id) {
                let pivot = self.layout_origin(id);
                top_left = pivot + translate + (top_left - pivot).scale(scale);
                size = size.scale(scale);
            }
            current = self.node(id).parent;
        }

        Rect::new(top_left.x, top_left.y, size.x, size.y)
    }

    fn listen(&mut self, scope: ListenerScope, target: EventTarget, kind: EventKind, binding: Binding) {
        self.listeners.push(ListenerRecord {
            scope,
            target,
            kind,
            binding,
        });
    }

    fn release_scope(&mut self, scope: ListenerScope) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.scope != scope);
        before - self.listeners.len()
    }

    fn set_pointer_capture(&mut self, node: NodeId, captured: bool) {
        if captured {
            self.pointer_capture = Some(node);
        } else if self.pointer_capture == Some(node) {
            self.pointer_capture = None;
        }
    }

    fn request_animation_frame(&mut self) {
        self.frame_requests += 1;
    }
}

/// `"200px"`, `"200"` or `"200.5"` as pixels
fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    number.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `(width, height)` of a `viewBox` attribute
fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [_, _, w, h] => Some((*w, *h)),
        _ => None,
    }
}

/// Translation and uniform scale of a `translate(..) scale(..)` transform.
/// `none` yields `None`.
fn parse_transform(value: &str) -> Option<(Point, f64)> {
    let value = value.trim();
    if value.is_empty() || value == "none" {
        return None;
    }

    let mut translate = Point::ORIGIN;
    let mut scale = 1.0;
    for function in value.split(')').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, args) = function.split_once('(')?;
        let args: Vec<f64> = args.split(',').filter_map(parse_px).collect();
        match (name.trim(), args.as_slice()) {
            ("translate", [x, y]) => translate = translate + Point::new(*x, *y),
            ("translate", [x]) => translate = translate + Point::new(*x, 0.0),
            ("scale", [s]) => scale *= s,
            _ => return None,
        }
    }
    Some((translate, scale))
}
