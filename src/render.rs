//! Render passes: turn diagram source blocks into interactive diagrams.
//!
//! Layout and SVG generation belong to an external [`DiagramRenderer`]. A pass
//! assigns every block an identifier, renders all blocks concurrently on the
//! current thread, mounts each result and hands it to the [`DiagramSet`].
//!
//! Starting a new pass aborts the one in flight. Every continuation checks
//! that its pass is still current and its container still attached before
//! touching the document, so a slow render from an old pass never overwrites
//! a newer one.

use crate::config::escape_html_attribute;
use crate::constants::{CONTAINER_ID_PREFIX, ERROR_CLASS};
use crate::diagram::{DiagramHandle, DiagramSet};
use crate::dom::{Dom, NodeId};
use crate::error::{ViewportError, ViewportResult};
use crate::types::{DiagramId, IdAllocator};
use futures::future::{AbortHandle, Abortable, LocalBoxFuture, join_all};
use std::cell::RefCell;
use std::collections::HashSet;
use uuid::Uuid;

/// Options handed to the renderer for every diagram of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Renderer theme name
    pub theme: String,
    /// Sources longer than this are rejected without rendering
    pub max_text_size: u32,
}

/// External diagram renderer (parsing, layout, SVG generation)
pub trait DiagramRenderer {
    /// Render `source` to SVG markup. `id` is unique within the document.
    fn render<'a>(
        &'a self,
        id: &'a DiagramId,
        source: &'a str,
        options: &'a RenderOptions,
    ) -> LocalBoxFuture<'a, anyhow::Result<String>>;
}

/// One diagram to render: the element holding it and its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    pub container: NodeId,
    pub source: String,
}

impl DiagramBlock {
    pub fn new(container: NodeId, source: impl Into<String>) -> Self {
        Self {
            container,
            source: source.into(),
        }
    }
}

/// Identity of a render pass
#[derive(Debug, Clone)]
pub struct RenderPass {
    generation: u64,
    abort: AbortHandle,
}

impl RenderPass {
    pub fn new(generation: u64, abort: AbortHandle) -> Self {
        Self { generation, abort }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }
}

/// Result of a completed pass
#[derive(Debug, Default)]
pub struct PassReport {
    pub generation: u64,
    /// Handles for every block, in document order
    pub handles: Vec<DiagramHandle>,
    /// Blocks whose rendering failed
    pub failed: Vec<DiagramId>,
}

enum BlockOutcome {
    Mounted(DiagramHandle),
    Failed(DiagramHandle),
    Stale,
}

/// Markup shown in place of a diagram that failed to render
pub fn error_fragment(message: &str) -> String {
    format!(
        "<pre class=\"{ERROR_CLASS}\">{}</pre>",
        escape_html_attribute(message)
    )
}

/// Render `blocks` and make them interactive.
///
/// Aborts any pass already in flight for `set`. Fails with
/// [`ViewportError::Aborted`] if this pass is aborted while rendering, or
/// [`ViewportError::Superseded`] if a newer pass started before it finished.
pub async fn render_diagrams<D, R>(
    set: &RefCell<DiagramSet<D>>,
    renderer: &R,
    blocks: Vec<DiagramBlock>,
) -> ViewportResult<PassReport>
where
    D: Dom,
    R: DiagramRenderer + ?Sized,
{
    let (pass, registration, options, prepared) = {
        let mut set = set.borrow_mut();
        let (pass, registration) = set.begin_pass();
        let options = set.render_options();
        let mut ids = IdAllocator::new(set.config().id_strategy);

        let dom = set.dom_mut();
        let prepared: Vec<(DiagramId, NodeId, String)> = blocks
            .into_iter()
            .map(|block| {
                let id = ids.next_id(&block.source);
                let container_id = format!("{CONTAINER_ID_PREFIX}{}", Uuid::new_v4());
                dom.set_attribute(block.container, "id", &container_id);
                dom.set_attribute(block.container, "data-diagram-id", id.as_str());
                dom.set_text(block.container, "");
                (id, block.container, block.source)
            })
            .collect();
        (pass, registration, options, prepared)
    };
    tracing::debug!(generation = pass.generation(), blocks = prepared.len(), "rendering diagrams");

    let renders = prepared.iter().map(|(id, container, source)| {
        let pass = &pass;
        let options = &options;
        async move {
            let result = if source.len() > options.max_text_size as usize {
                Err(anyhow::anyhow!("Maximum text size in diagram exceeded"))
            } else {
                renderer.render(id, source, options).await
            };
            mount_block(set, pass, id, *container, result)
        }
    });
    let outcomes = Abortable::new(join_all(renders), registration).await?;

    let mut set = set.borrow_mut();
    if !set.is_current_pass(&pass) {
        tracing::debug!(generation = pass.generation(), "render pass superseded");
        return Err(ViewportError::Superseded(pass.generation()));
    }

    let mut report = PassReport {
        generation: pass.generation(),
        ..PassReport::default()
    };
    for outcome in outcomes {
        match outcome {
            BlockOutcome::Mounted(handle) => report.handles.push(handle),
            BlockOutcome::Failed(handle) => {
                report.failed.push(handle.id().clone());
                report.handles.push(handle);
            }
            BlockOutcome::Stale => {}
        }
    }

    let active: HashSet<DiagramId> = prepared.into_iter().map(|(id, _, _)| id).collect();
    let removed = set.dispose_inactive(&active);
    set.retain_states(&active);
    tracing::debug!(
        generation = report.generation,
        mounted = report.handles.len(),
        failed = report.failed.len(),
        removed,
        "render pass finished"
    );
    Ok(report)
}

fn mount_block<D: Dom>(
    set: &RefCell<DiagramSet<D>>,
    pass: &RenderPass,
    id: &DiagramId,
    container: NodeId,
    result: anyhow::Result<String>,
) -> BlockOutcome {
    let mut set = set.borrow_mut();
    if !set.is_current_pass(pass) {
        tracing::debug!(%id, generation = pass.generation(), "dropping render from stale pass");
        return BlockOutcome::Stale;
    }
    if !set.dom().is_connected(container) {
        tracing::debug!(%id, "dropping render for detached container");
        return BlockOutcome::Stale;
    }

    match result {
        Ok(svg) => {
            set.dom_mut().set_inner_html(container, &svg);
            BlockOutcome::Mounted(set.setup(id.clone(), container))
        }
        Err(e) => {
            tracing::warn!(%id, "diagram failed to render: {:#}", e);
            set.dom_mut().set_inner_html(container, &error_fragment(&e.to_string()));
            BlockOutcome::Failed(set.setup(id.clone(), container))
        }
    }
}
