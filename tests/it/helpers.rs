//! Test helpers and builders for reducing boilerplate in tests.
//!
//! This module provides:
//! - `TestDocumentBuilder` - Builder for a headless document holding rendered diagrams
//! - `StubRenderer` - A `DiagramRenderer` answering from a fixed table
//! - Input shorthands like `press()`, `drag_to()`, `alt_wheel()`
//! - `content_layers()` - the transformed layers wrapping a container

use diagram_viewport::constants::CONTENT_CLASS;
use diagram_viewport::dom::memory::MemoryDom;
use diagram_viewport::geometry::{Point, Rect};
use diagram_viewport::logging;
use diagram_viewport::input::{DeltaMode, DomEvent, KeyInput, Modifiers, PointerInput, WheelInput};
use diagram_viewport::{DiagramId, DiagramRenderer, DiagramSet, Dom, NodeId, RenderOptions, ViewportConfig};
use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::collections::HashMap;

/// Width of the document body every test lays out against
pub const BODY_WIDTH: f64 = 400.0;

/// Markup of a rendered diagram with the given intrinsic size
pub fn svg(width: f64, height: f64) -> String {
    format!(r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}"/>"#)
}

// ============================================================================
// TestDocumentBuilder - Builder for headless documents
// ============================================================================

/// Builder for a document with rendered diagrams laid out in a 400px wide body.
///
/// # Example
/// ```ignore
/// let (mut set, containers) = TestDocumentBuilder::new()
///     .with_diagram(800.0, 200.0)
///     .with_config(ViewportConfig { resizable: false, ..Default::default() })
///     .build();
/// ```
pub struct TestDocumentBuilder {
    diagrams: Vec<(f64, f64)>,
    empty: usize,
    config: ViewportConfig,
}

impl Default for TestDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDocumentBuilder {
    pub fn new() -> Self {
        Self {
            diagrams: Vec::new(),
            empty: 0,
            config: ViewportConfig::default(),
        }
    }

    /// Add a container holding an SVG of the given intrinsic size
    pub fn with_diagram(mut self, width: f64, height: f64) -> Self {
        self.diagrams.push((width, height));
        self
    }

    /// Add empty containers, for render passes to fill
    pub fn with_empty_containers(mut self, count: usize) -> Self {
        self.empty += count;
        self
    }

    pub fn with_config(mut self, config: ViewportConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the document. Containers are returned in document order, the
    /// diagram containers first.
    pub fn build(self) -> (DiagramSet<MemoryDom>, Vec<NodeId>) {
        logging::init();

        let mut dom = MemoryDom::new();
        let body = dom.body();
        dom.set_layout(body, Rect::new(0.0, 0.0, BODY_WIDTH, 1000.0));

        let mut containers = Vec::new();
        for (width, height) in &self.diagrams {
            let container = dom.create_element_with_class("div", "mermaid");
            dom.append_child(body, container);
            dom.set_inner_html(container, &svg(*width, *height));
            containers.push(container);
        }
        for _ in 0..self.empty {
            let container = dom.create_element_with_class("div", "mermaid");
            dom.append_child(body, container);
            containers.push(container);
        }

        (DiagramSet::new(dom, self.config), containers)
    }
}

/// One 800x200 diagram, set up under `id` and initialized
pub fn interactive_diagram(id: &str) -> (DiagramSet<MemoryDom>, NodeId) {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup(id, containers[0]);
    set.flush_frame();
    (set, containers[0])
}

// ============================================================================
// Input shorthands
// ============================================================================

pub fn press(x: f64, y: f64, modifiers: Modifiers) -> DomEvent {
    DomEvent::PointerDown(PointerInput::primary(Point::new(x, y), modifiers))
}

/// Pointer moved with the primary button held
pub fn drag_to(x: f64, y: f64) -> DomEvent {
    DomEvent::PointerMove(PointerInput::primary(Point::new(x, y), Modifiers::NONE))
}

pub fn release(x: f64, y: f64) -> DomEvent {
    DomEvent::PointerUp(PointerInput::hover(Point::new(x, y), Modifiers::NONE))
}

pub fn click(x: f64, y: f64, modifiers: Modifiers) -> DomEvent {
    DomEvent::Click(PointerInput::hover(Point::new(x, y), modifiers))
}

pub fn alt_wheel(x: f64, y: f64, delta_y: f64) -> DomEvent {
    wheel(x, y, delta_y, Modifiers::ALT)
}

pub fn wheel(x: f64, y: f64, delta_y: f64, modifiers: Modifiers) -> DomEvent {
    DomEvent::Wheel(WheelInput {
        client: Point::new(x, y),
        delta_y,
        delta_mode: DeltaMode::Pixel,
        modifiers,
    })
}

pub fn key_down(key: &str, modifiers: Modifiers) -> DomEvent {
    DomEvent::KeyDown(KeyInput::new(key, modifiers))
}

pub fn key_up(key: &str, modifiers: Modifiers) -> DomEvent {
    DomEvent::KeyUp(KeyInput::new(key, modifiers))
}

/// Transforms of every content layer between `container` and the document
/// root, innermost first
pub fn content_layers(dom: &MemoryDom, container: NodeId) -> Vec<Option<String>> {
    let mut layers = Vec::new();
    let mut current = dom.parent(container);
    while let Some(node) = current {
        if dom.has_class(node, CONTENT_CLASS) {
            layers.push(dom.style(node, "transform"));
        }
        current = dom.parent(node);
    }
    layers
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Renderers
// ============================================================================

/// Renders sources found in its table, fails for everything else
#[derive(Default)]
pub struct StubRenderer {
    outputs: HashMap<String, String>,
    calls: RefCell<Vec<(DiagramId, RenderOptions)>>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, source: &str, svg: String) -> Self {
        self.outputs.insert(source.to_string(), svg);
        self
    }

    /// Ids and options of every render call, in call order
    pub fn calls(&self) -> Vec<(DiagramId, RenderOptions)> {
        self.calls.borrow().clone()
    }
}

impl DiagramRenderer for StubRenderer {
    fn render<'a>(
        &'a self,
        id: &'a DiagramId,
        source: &'a str,
        options: &'a RenderOptions,
    ) -> LocalBoxFuture<'a, anyhow::Result<String>> {
        self.calls.borrow_mut().push((id.clone(), options.clone()));
        let result = self
            .outputs
            .get(source)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Syntax error in text: {source}"));
        async move { result }.boxed_local()
    }
}

/// Renderer whose output arrives only when the test sends it
pub struct GatedRenderer {
    gates: RefCell<Vec<oneshot::Receiver<String>>>,
}

impl GatedRenderer {
    /// A renderer for `count` calls and the senders that complete them
    pub fn new(count: usize) -> (Self, Vec<oneshot::Sender<String>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..count).map(|_| oneshot::channel()).unzip();
        let renderer = Self {
            gates: RefCell::new(receivers.into_iter().rev().collect()),
        };
        (renderer, senders)
    }
}

impl DiagramRenderer for GatedRenderer {
    fn render<'a>(
        &'a self,
        _id: &'a DiagramId,
        _source: &'a str,
        _options: &'a RenderOptions,
    ) -> LocalBoxFuture<'a, anyhow::Result<String>> {
        let gate = self.gates.borrow_mut().pop();
        async move {
            match gate {
                Some(gate) => gate.await.map_err(|_| anyhow::anyhow!("render cancelled")),
                None => Err(anyhow::anyhow!("no gate left")),
            }
        }
        .boxed_local()
    }
}
