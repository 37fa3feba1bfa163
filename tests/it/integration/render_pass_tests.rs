//! Render passes: identifiers, failures and cancellation of passes in flight.

use crate::helpers::{GatedRenderer, StubRenderer, TestDocumentBuilder, content_layers, svg};
use diagram_viewport::constants::{CONTAINER_ID_PREFIX, ERROR_CLASS, WRAPPER_CLASS};
use diagram_viewport::dom::memory::MemoryDom;
use diagram_viewport::{
    DiagramBlock, DiagramSet, Dom, IdStrategy, NodeId, ViewportConfig, ViewportError, render_diagrams,
};
use futures::FutureExt;
use futures::executor::block_on;
use std::cell::RefCell;

const FLOW: &str = "graph TD; A-->B";
const SEQUENCE: &str = "sequenceDiagram; Alice->>Bob: Hi";

fn renderer() -> StubRenderer {
    StubRenderer::new()
        .with_output(FLOW, svg(800.0, 200.0))
        .with_output(SEQUENCE, svg(300.0, 150.0))
}

fn document(containers: usize) -> (RefCell<DiagramSet<MemoryDom>>, Vec<NodeId>) {
    let (set, containers) = TestDocumentBuilder::new().with_empty_containers(containers).build();
    (RefCell::new(set), containers)
}

fn blocks(containers: &[NodeId], sources: &[&str]) -> Vec<DiagramBlock> {
    containers
        .iter()
        .zip(sources)
        .map(|(container, source)| DiagramBlock::new(*container, *source))
        .collect()
}

/// Swap the body content for `count` empty containers
fn fresh_containers(set: &RefCell<DiagramSet<MemoryDom>>, count: usize) -> Vec<NodeId> {
    let mut set = set.borrow_mut();
    let dom = set.dom_mut();
    let body = dom.body();
    for child in dom.children(body).to_vec() {
        dom.remove_node(child);
    }
    (0..count)
        .map(|_| {
            let container = dom.create_element_with_class("div", "mermaid");
            dom.append_child(body, container);
            container
        })
        .collect()
}

// ============================================================================
// Successful passes
// ============================================================================

#[test]
fn test_pass_mounts_every_block() {
    let (set, containers) = document(2);
    let report = block_on(render_diagrams(&set, &renderer(), blocks(&containers, &[FLOW, SEQUENCE]))).unwrap();

    assert_eq!(report.generation, 1);
    assert_eq!(report.handles.len(), 2);
    assert!(report.failed.is_empty());

    let mut set = set.borrow_mut();
    assert_eq!(set.len(), 2);
    for (container, handle) in containers.iter().zip(&report.handles) {
        assert!(!handle.is_inert());
        let dom_id = set.dom().attribute(*container, "id").unwrap();
        assert!(dom_id.starts_with(CONTAINER_ID_PREFIX));
        assert_eq!(
            set.dom().attribute(*container, "data-diagram-id").as_deref(),
            Some(handle.id().as_str())
        );
        assert!(set.dom().find_svg(*container).is_some());
    }
    assert_ne!(
        set.dom().attribute(containers[0], "id"),
        set.dom().attribute(containers[1], "id")
    );

    assert_eq!(set.flush_frame(), 2);
    assert_eq!(set.state(report.handles[0].id().as_str()).unwrap().translate_x, -200.0);
    assert_eq!(set.state(report.handles[1].id().as_str()).unwrap().translate_x, 50.0);
}

#[test]
fn test_renderer_gets_theme_and_limit() {
    let (set, containers) = document(1);
    {
        let mut set = set.borrow_mut();
        let body = set.dom().body();
        set.dom_mut().set_class(body, "vscode-dark", true);
    }
    let renderer = renderer();
    block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW]))).unwrap();

    let calls = renderer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.theme, "dark");
    assert_eq!(calls[0].1.max_text_size, 50_000);
}

#[test]
fn test_state_follows_a_diagram_that_moved() {
    let (set, containers) = document(2);
    let renderer = renderer();
    let first = block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW, SEQUENCE]))).unwrap();
    let flow_id = first.handles[0].id().clone();
    let zoomed = {
        let mut set = set.borrow_mut();
        set.flush_frame();
        set.zoom_in(flow_id.as_str());
        set.state(flow_id.as_str()).unwrap()
    };

    let moved = fresh_containers(&set, 2);
    let second = block_on(render_diagrams(&set, &renderer, blocks(&moved, &[SEQUENCE, FLOW]))).unwrap();
    assert_eq!(second.handles[1].id(), &flow_id);

    let mut set = set.borrow_mut();
    set.flush_frame();
    assert_eq!(set.state(flow_id.as_str()), Some(zoomed));
}

#[test]
fn test_repeated_passes_over_the_same_blocks() {
    let (set, containers) = document(1);
    let renderer = renderer();
    block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW]))).unwrap();
    set.borrow_mut().flush_frame();
    let nodes = set.borrow().dom().node_count();

    for _ in 0..5 {
        block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW]))).unwrap();
        set.borrow_mut().flush_frame();
    }

    let set = set.borrow();
    let body = set.dom().body();
    assert_eq!(set.dom().find_by_class(body, WRAPPER_CLASS).len(), 1);
    assert_eq!(
        content_layers(set.dom(), containers[0]),
        vec![Some("translate(-200px, 0px) scale(1)".to_string())]
    );
    assert_eq!(set.dom().listeners().len(), 17);
    assert_eq!(set.dom().node_count(), nodes);
}

#[test]
fn test_edited_source_in_the_same_container() {
    let (set, containers) = document(1);
    let renderer = renderer();
    let first = block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW]))).unwrap();
    set.borrow_mut().flush_frame();

    let second = block_on(render_diagrams(&set, &renderer, blocks(&containers, &[SEQUENCE]))).unwrap();
    assert_ne!(first.handles[0].id(), second.handles[0].id());

    let mut set = set.borrow_mut();
    set.flush_frame();
    assert_eq!(set.len(), 1);
    assert_eq!(set.saved_state(first.handles[0].id().as_str()), None);
    let body = set.dom().body();
    assert_eq!(set.dom().find_by_class(body, WRAPPER_CLASS).len(), 1);
    assert_eq!(
        content_layers(set.dom(), containers[0]),
        vec![Some("translate(50px, 0px) scale(1)".to_string())]
    );
}

#[test]
fn test_positional_ids() {
    let (set, containers) = TestDocumentBuilder::new()
        .with_empty_containers(2)
        .with_config(ViewportConfig {
            id_strategy: IdStrategy::Positional,
            ..ViewportConfig::default()
        })
        .build();
    let set = RefCell::new(set);
    let report = block_on(render_diagrams(&set, &renderer(), blocks(&containers, &[FLOW, FLOW]))).unwrap();

    let ids: Vec<&str> = report.handles.iter().map(|h| h.id().as_str()).collect();
    assert_eq!(ids, ["mermaid-0", "mermaid-1"]);
}

#[test]
fn test_removed_diagram_is_disposed_and_forgotten() {
    let (set, containers) = document(2);
    let renderer = renderer();
    let first = block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW, SEQUENCE]))).unwrap();
    let sequence_id = first.handles[1].id().clone();
    set.borrow_mut().flush_frame();

    let remaining = fresh_containers(&set, 1);
    block_on(render_diagrams(&set, &renderer, blocks(&remaining, &[FLOW]))).unwrap();

    let set = set.borrow();
    assert_eq!(set.len(), 1);
    assert_eq!(set.state(sequence_id.as_str()), None);
    assert_eq!(set.saved_state(sequence_id.as_str()), None);
    assert_eq!(set.dom().listeners().len(), 17);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_render_shows_error_in_place() {
    let (set, containers) = document(2);
    let report = block_on(render_diagrams(&set, &renderer(), blocks(&containers, &[FLOW, "graph ???"]))).unwrap();

    assert_eq!(report.handles.len(), 2);
    assert_eq!(report.failed, vec![report.handles[1].id().clone()]);
    assert!(report.handles[1].is_inert());

    let set = set.borrow();
    assert_eq!(set.len(), 1);
    let errors = set.dom().find_by_class(containers[1], ERROR_CLASS);
    assert_eq!(errors.len(), 1);
    assert_eq!(set.dom().text(errors[0]), "Syntax error in text: graph ???");
}

#[test]
fn test_oversized_source_is_not_rendered() {
    let (set, containers) = TestDocumentBuilder::new()
        .with_empty_containers(2)
        .with_config(ViewportConfig {
            max_text_size: 20,
            ..ViewportConfig::default()
        })
        .build();
    let set = RefCell::new(set);
    let renderer = renderer();
    let report = block_on(render_diagrams(&set, &renderer, blocks(&containers, &[FLOW, SEQUENCE]))).unwrap();

    assert_eq!(report.failed, vec![report.handles[1].id().clone()]);
    assert_eq!(renderer.calls().len(), 1);

    let set = set.borrow();
    let errors = set.dom().find_by_class(containers[1], ERROR_CLASS);
    assert_eq!(set.dom().text(errors[0]), "Maximum text size in diagram exceeded");
}

// ============================================================================
// Passes in flight
// ============================================================================

#[test]
fn test_new_pass_aborts_the_one_in_flight() {
    let (set, containers) = document(1);
    let (gated, senders) = GatedRenderer::new(1);

    let mut first = Box::pin(render_diagrams(&set, &gated, blocks(&containers, &[FLOW])));
    assert!(first.as_mut().now_or_never().is_none());

    let second = block_on(render_diagrams(&set, &renderer(), blocks(&containers, &[SEQUENCE]))).unwrap();
    assert_eq!(second.generation, 2);

    for sender in senders {
        let _ = sender.send(svg(800.0, 200.0));
    }
    assert!(matches!(
        first.as_mut().now_or_never(),
        Some(Err(ViewportError::Aborted(_)))
    ));

    let set = set.borrow();
    assert_eq!(set.len(), 1);
    let svg_node = set.dom().find_svg(containers[0]).unwrap();
    assert_eq!(set.dom().attribute(svg_node, "width").as_deref(), Some("300"));
}

#[test]
fn test_container_removed_while_rendering_is_skipped() {
    let (set, containers) = document(1);
    let (gated, mut senders) = GatedRenderer::new(1);

    let mut pass = Box::pin(render_diagrams(&set, &gated, blocks(&containers, &[FLOW])));
    assert!(pass.as_mut().now_or_never().is_none());

    set.borrow_mut().dom_mut().remove_node(containers[0]);
    senders.remove(0).send(svg(800.0, 200.0)).unwrap();

    let report = pass.as_mut().now_or_never().unwrap().unwrap();
    assert!(report.handles.is_empty());
    assert!(set.borrow().is_empty());
}
