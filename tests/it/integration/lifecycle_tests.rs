//! Setup, disposal and state carried across re-renders.

use crate::helpers::{
    TestDocumentBuilder, alt_wheel, content_layers, drag_to, interactive_diagram, press, release, svg,
};
use diagram_viewport::constants::{CONTROLS_CLASS, WRAPPER_CLASS};
use diagram_viewport::dom::EventTarget;
use diagram_viewport::dom::memory::MemoryDom;
use diagram_viewport::geometry::compose_css_transform;
use diagram_viewport::input::Modifiers;
use diagram_viewport::{
    ClickDragMode, DiagramId, DiagramSet, Dom, EventOutcome, LifecyclePhase, NodeId, ShowControlsMode, ViewportConfig,
};
use serde_json::json;
use std::collections::HashSet;

/// Replace the body content with fresh containers, as the host does on every
/// preview update
fn rerender(set: &mut DiagramSet<MemoryDom>, count: usize) -> Vec<NodeId> {
    let dom = set.dom_mut();
    let body = dom.body();
    for child in dom.children(body).to_vec() {
        dom.remove_node(child);
    }
    (0..count)
        .map(|_| {
            let container = dom.create_element_with_class("div", "mermaid");
            dom.append_child(body, container);
            dom.set_inner_html(container, &svg(800.0, 200.0));
            container
        })
        .collect()
}

fn ids(names: &[&str]) -> HashSet<DiagramId> {
    names.iter().map(|name| DiagramId::new(*name)).collect()
}

// ============================================================================
// Phases
// ============================================================================

#[test]
fn test_initialization_waits_for_a_frame() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup("mermaid-a", containers[0]);

    assert_eq!(set.phase("mermaid-a"), Some(LifecyclePhase::PendingInitialize));
    assert_eq!(set.dom().pending_frames(), 1);
    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    assert_eq!(set.dom().style(wrapper, "height"), None);

    assert_eq!(set.flush_frame(), 1);
    assert_eq!(set.phase("mermaid-a"), Some(LifecyclePhase::Interactive));
    assert_eq!(set.dom().style(wrapper, "height").as_deref(), Some("200px"));
}

#[test]
fn test_replaced_controller_skips_its_frame() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup("mermaid-a", containers[0]);
    let fresh = rerender(&mut set, 1);
    set.setup("mermaid-a", fresh[0]);

    assert_eq!(set.flush_frame(), 1);
    assert_eq!(set.len(), 1);
}

#[test]
fn test_detached_wrapper_skips_its_frame() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup("mermaid-a", containers[0]);
    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    set.dom_mut().remove_node(wrapper);

    assert_eq!(set.flush_frame(), 0);
    assert_eq!(set.phase("mermaid-a"), Some(LifecyclePhase::PendingInitialize));
}

#[test]
fn test_container_without_svg_is_left_alone() {
    let (mut set, containers) = TestDocumentBuilder::new().with_empty_containers(1).build();
    let handle = set.setup("mermaid-a", containers[0]);

    assert!(handle.is_inert());
    assert!(set.is_empty());
    assert_eq!(set.dom().parent(containers[0]), Some(set.dom().body()));
    assert!(set.dom().listeners().is_empty());
}

// ============================================================================
// Listener cleanup
// ============================================================================

#[test]
fn test_dispose_releases_every_listener() {
    let (mut set, containers) = TestDocumentBuilder::new()
        .with_diagram(800.0, 200.0)
        .with_diagram(400.0, 300.0)
        .build();
    let a = set.setup("mermaid-a", containers[0]);
    let b = set.setup("mermaid-b", containers[1]);
    set.flush_frame();
    assert_eq!(set.dom().listener_count(a.scope().unwrap()), 17);
    assert_eq!(set.dom().listeners().len(), 34);

    assert!(set.dispose(&a));
    assert_eq!(set.dom().listener_count(a.scope().unwrap()), 0);
    assert_eq!(set.dom().listeners().len(), 17);

    assert!(set.dispose(&b));
    assert!(set.dom().listeners().is_empty());
    assert!(set.is_empty());
}

#[test]
fn test_repeated_rerenders_do_not_leak_listeners() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup("mermaid-a", containers[0]);
    for _ in 0..25 {
        let fresh = rerender(&mut set, 1);
        set.setup("mermaid-a", fresh[0]);
        set.flush_frame();
    }
    assert_eq!(set.dom().listeners().len(), 17);
}

#[test]
fn test_stale_handle_does_not_dispose_successor() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    let first = set.setup("mermaid-a", containers[0]);
    let fresh = rerender(&mut set, 1);
    let second = set.setup("mermaid-a", fresh[0]);
    assert_ne!(first.scope(), second.scope());

    assert!(!set.dispose(&first));
    assert_eq!(set.len(), 1);
    assert_eq!(set.dom().listener_count(second.scope().unwrap()), 17);

    assert!(set.dispose(&second));
    assert!(!set.dispose(&second));
}

#[test]
fn test_events_after_dispose_are_ignored() {
    let (mut set, _) = interactive_diagram("mermaid-a");
    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    let scope = set.element("mermaid-a").unwrap().scope();
    set.dispose_all();

    assert_eq!(set.dom().listener_count(scope), 0);
    assert_eq!(
        set.fire(EventTarget::Node(wrapper), alt_wheel(10.0, 10.0, -100.0)),
        EventOutcome::IGNORED
    );
}

// ============================================================================
// State across re-renders
// ============================================================================

#[test]
fn test_state_survives_a_rerender() {
    let (mut set, _) = interactive_diagram("mermaid-a");
    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    set.fire(EventTarget::Node(wrapper), alt_wheel(100.0, 60.0, -150.0));
    let zoomed = set.state("mermaid-a").unwrap();

    let fresh = rerender(&mut set, 1);
    set.setup("mermaid-a", fresh[0]);
    assert_eq!(set.saved_state("mermaid-a"), Some(zoomed));
    set.flush_frame();

    assert_eq!(set.state("mermaid-a"), Some(zoomed));
    let element = set.element("mermaid-a").unwrap();
    assert_eq!(
        set.dom().style(element.content(), "transform").as_deref(),
        Some(compose_css_transform(&zoomed).as_str())
    );
}

#[test]
fn test_setup_again_on_the_same_container() {
    let (mut set, container) = interactive_diagram("mermaid-a");
    set.zoom_in("mermaid-a");
    let zoomed = set.state("mermaid-a").unwrap();

    set.setup("mermaid-a", container);
    set.flush_frame();

    let body = set.dom().body();
    assert_eq!(set.dom().find_by_class(body, WRAPPER_CLASS).len(), 1);
    assert_eq!(set.dom().find_by_class(body, CONTROLS_CLASS).len(), 1);
    assert_eq!(
        content_layers(set.dom(), container),
        vec![Some("translate(-300px, -25px) scale(1.25)".to_string())]
    );
    assert_eq!(set.state("mermaid-a"), Some(zoomed));
    assert_eq!(set.dom().listeners().len(), 17);
}

#[test]
fn test_dispose_puts_the_container_back() {
    let (mut set, container) = interactive_diagram("mermaid-a");
    let nodes = set.dom().node_count();
    set.dispose_all();

    let body = set.dom().body();
    assert_eq!(set.dom().parent(container), Some(body));
    assert!(set.dom().find_by_class(body, WRAPPER_CLASS).is_empty());
    assert!(set.dom().find_svg(container).is_some());
    assert_eq!(set.dom().node_count(), nodes - 12);
}

#[test]
fn test_custom_height_survives_a_rerender() {
    let (mut set, _) = interactive_diagram("mermaid-a");
    set.zoom_in("mermaid-a");
    let handle = set.element("mermaid-a").unwrap().resize_handle().unwrap();
    set.fire(EventTarget::Node(handle), press(0.0, 200.0, Modifiers::NONE));
    set.fire(EventTarget::Document, drag_to(0.0, 340.0));
    set.fire(EventTarget::Document, release(0.0, 340.0));

    let fresh = rerender(&mut set, 1);
    set.setup("mermaid-a", fresh[0]);
    set.flush_frame();

    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    assert_eq!(set.dom().style(wrapper, "height").as_deref(), Some("340px"));
    assert_eq!(set.state("mermaid-a").unwrap().custom_height, Some(340.0));
}

#[test]
fn test_untouched_diagram_is_recentered_after_rerender() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    set.setup("mermaid-a", containers[0]);
    set.flush_frame();

    let dom = set.dom_mut();
    let body = dom.body();
    for child in dom.children(body).to_vec() {
        dom.remove_node(child);
    }
    let container = dom.create_element("div");
    dom.append_child(body, container);
    dom.set_inner_html(container, &svg(200.0, 100.0));

    set.setup("mermaid-a", container);
    set.flush_frame();
    assert_eq!(set.state("mermaid-a").unwrap().translate_x, 100.0);
}

#[test]
fn test_removed_diagrams_lose_their_state() {
    let (mut set, containers) = TestDocumentBuilder::new()
        .with_diagram(800.0, 200.0)
        .with_diagram(800.0, 200.0)
        .build();
    set.setup("mermaid-a", containers[0]);
    set.setup("mermaid-b", containers[1]);
    set.flush_frame();
    set.zoom_in("mermaid-a");
    set.zoom_in("mermaid-b");
    set.dispose_all();

    set.retain_states(&ids(&["mermaid-a"]));
    assert!(set.saved_state("mermaid-a").is_some());
    assert_eq!(set.saved_state("mermaid-b"), None);
}

#[test]
fn test_dispose_inactive_keeps_active_diagrams() {
    let (mut set, containers) = TestDocumentBuilder::new()
        .with_diagram(800.0, 200.0)
        .with_diagram(800.0, 200.0)
        .build();
    set.setup("mermaid-a", containers[0]);
    set.setup("mermaid-b", containers[1]);

    assert_eq!(set.dispose_inactive(&ids(&["mermaid-b"])), 1);
    assert_eq!(set.ids().collect::<Vec<_>>(), vec![&DiagramId::new("mermaid-b")]);
    assert!(set.saved_state("mermaid-a").is_some());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_export_merges_live_and_saved_states() {
    let (mut set, containers) = TestDocumentBuilder::new()
        .with_diagram(800.0, 200.0)
        .with_diagram(800.0, 200.0)
        .build();
    let a = set.setup("mermaid-a", containers[0]);
    set.setup("mermaid-b", containers[1]);
    set.flush_frame();
    set.dispose(&a);

    let exported = set.export_states();
    assert_eq!(
        exported,
        json!({
            "mermaid-a": { "scale": 1.0, "translateX": -200.0, "translateY": 0.0, "hasInteracted": false },
            "mermaid-b": { "scale": 1.0, "translateX": -200.0, "translateY": 0.0, "hasInteracted": false },
        })
    );
}

#[test]
fn test_imported_state_is_applied_on_setup() {
    let (mut set, containers) = TestDocumentBuilder::new().with_diagram(800.0, 200.0).build();
    let loaded = set.import_states(&json!({
        "mermaid-a": { "scale": 2.0, "translateX": 12.0, "translateY": -8.0, "hasInteracted": true },
    }));
    assert_eq!(loaded, 1);

    set.setup("mermaid-a", containers[0]);
    set.flush_frame();
    let content = set.element("mermaid-a").unwrap().content();
    assert_eq!(
        set.dom().style(content, "transform").as_deref(),
        Some("translate(12px, -8px) scale(2)")
    );
}

#[test]
fn test_malformed_import_fields_fall_back_individually() {
    let (mut set, _) = TestDocumentBuilder::new().build();
    set.import_states(&json!({
        "mermaid-a": { "scale": "huge", "translateX": 12.0, "translateY": null, "hasInteracted": true, "customHeight": 20.0 },
        "mermaid-b": { "scale": 80.0 },
        "mermaid-c": "not an object",
    }));

    let a = set.saved_state("mermaid-a").unwrap();
    assert_eq!((a.scale, a.translate_x, a.translate_y), (1.0, 12.0, 0.0));
    assert!(a.has_interacted);
    assert_eq!(a.custom_height, None);

    assert_eq!(set.saved_state("mermaid-b").unwrap().scale, 5.0);
    assert_eq!(set.saved_state("mermaid-c").unwrap().scale, 1.0);
    assert_eq!(set.import_states(&json!("nope")), 0);
}

// ============================================================================
// Configuration updates
// ============================================================================

#[test]
fn test_config_update_reaches_live_diagrams() {
    let (mut set, _) = interactive_diagram("mermaid-a");
    let wrapper = set.element("mermaid-a").unwrap().wrapper();
    assert_eq!(set.dom().find_by_class(wrapper, CONTROLS_CLASS).len(), 1);

    set.update_config(ViewportConfig {
        click_drag: ClickDragMode::Always,
        show_controls: ShowControlsMode::Never,
        resizable: false,
        ..ViewportConfig::default()
    });

    let element = set.element("mermaid-a").unwrap();
    assert!(element.controls().is_none());
    assert!(element.resize_handle().is_none());
    assert!(set.dom().find_by_class(wrapper, CONTROLS_CLASS).is_empty());
    assert_eq!(set.dom().style(wrapper, "cursor").as_deref(), Some("grab"));
    assert_eq!(element.state().translate_x, -200.0);

    set.update_config(ViewportConfig::default());
    assert!(set.element("mermaid-a").unwrap().controls().is_some());
    assert_eq!(set.dom().find_by_class(wrapper, CONTROLS_CLASS).len(), 1);
}
