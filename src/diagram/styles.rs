//! Shared stylesheet for diagram wrappers and their controls.

use crate::constants::STYLESHEET_ID;
use crate::dom::{Dom, NodeId};

/// Rules for every diagram in the document
pub const DIAGRAM_STYLES: &str = r#".mermaid-wrapper {
    position: relative;
    overflow: hidden;
    outline: none;
    user-select: none;
}

.mermaid-content {
    transform-origin: 0 0;
}

.mermaid-zoom-controls {
    position: absolute;
    top: 8px;
    right: 8px;
    display: flex;
    gap: 2px;
    z-index: 10;
}

.mermaid-zoom-controls button {
    display: flex;
    align-items: center;
    justify-content: center;
    width: 24px;
    height: 24px;
    padding: 0;
    border: none;
    border-radius: 4px;
    cursor: pointer;
    color: var(--vscode-icon-foreground);
    background: var(--vscode-editorWidget-background);
}

.mermaid-zoom-controls button:hover {
    background: var(--vscode-toolbar-hoverBackground);
}

.mermaid-zoom-controls button.active {
    background: var(--vscode-inputOption-activeBackground);
    outline: 1px solid var(--vscode-inputOption-activeBorder);
}

.mermaid-zoom-controls-auto-hide {
    opacity: 0;
    pointer-events: none;
    transition: opacity 0.15s ease-in-out;
}

.mermaid-wrapper:hover .mermaid-zoom-controls-auto-hide,
.mermaid-wrapper:focus-within .mermaid-zoom-controls-auto-hide {
    opacity: 1;
    pointer-events: auto;
}

.mermaid-resize-handle {
    position: absolute;
    left: 0;
    right: 0;
    bottom: 0;
    height: 6px;
    cursor: ns-resize;
}

.mermaid-resize-handle:hover {
    background: var(--vscode-sash-hoverBorder);
}

.mermaid-error {
    white-space: pre-wrap;
    color: var(--vscode-errorForeground);
}
"#;

/// Append the shared `<style>` element to `<head>`, or return the one already there
pub fn install<D: Dom>(dom: &mut D) -> NodeId {
    if let Some(existing) = dom.element_by_id(STYLESHEET_ID) {
        return existing;
    }

    let style = dom.create_element("style");
    dom.set_attribute(style, "id", STYLESHEET_ID);
    dom.set_attribute(style, "class", "markdown-style mermaid-diagram-styles");
    dom.set_text(style, DIAGRAM_STYLES);
    let head = dom.head();
    dom.append_child(head, style);
    tracing::debug!("installed diagram stylesheet");
    style
}
