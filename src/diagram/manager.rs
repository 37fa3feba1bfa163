//! Keyed collection of diagram controllers for one document.
//!
//! `DiagramSet` owns everything that must outlive a single controller: the
//! saved-state map, the listener-scope index and the render-pass generation.
//! Re-rendering a document replaces controllers but keeps their state, keyed
//! by [`DiagramId`].
//!
//! ## Lifecycle
//!
//! ```text
//! (absent) -> Mounting -> PendingInitialize -> Interactive -> Disposing -> (absent)
//! ```
//!
//! `setup` mounts a controller and queues it; `run_frame` (driven by an
//! animation frame) initializes it once layout is available.

use crate::config::ViewportConfig;
use crate::constants::DARK_BODY_CLASSES;
use crate::diagram::element::DiagramElement;
use crate::diagram::styles;
use crate::dom::memory::MemoryDom;
use crate::dom::{Dispatch, Dom, EventOutcome, EventTarget, ListenerScope, NodeId};
use crate::input::DomEvent;
use crate::render::{RenderOptions, RenderPass};
use crate::types::{DiagramId, TransformState};
use futures::future::{AbortHandle, AbortRegistration};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Where a diagram is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Wrapper being built and listeners registered
    Mounting,
    /// Mounted, waiting for the next animation frame
    PendingInitialize,
    /// Initialized and handling input
    Interactive,
    /// State captured, listeners being released
    Disposing,
}

/// Returned by [`DiagramSet::setup`]; disposes exactly the controller it created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramHandle {
    id: DiagramId,
    scope: Option<ListenerScope>,
}

impl DiagramHandle {
    pub fn id(&self) -> &DiagramId {
        &self.id
    }

    pub fn scope(&self) -> Option<ListenerScope> {
        self.scope
    }

    /// True when no controller was created (no SVG, detached container)
    pub fn is_inert(&self) -> bool {
        self.scope.is_none()
    }
}

#[derive(Debug)]
struct Instance {
    element: DiagramElement,
    phase: LifecyclePhase,
}

/// All diagram controllers of one document
#[derive(Debug)]
pub struct DiagramSet<D: Dom> {
    dom: D,
    config: ViewportConfig,
    stylesheet: NodeId,
    instances: HashMap<DiagramId, Instance>,
    saved_states: HashMap<DiagramId, TransformState>,
    scopes: HashMap<ListenerScope, DiagramId>,
    pending: Vec<(DiagramId, ListenerScope)>,
    next_scope: u64,
    generation: u64,
    pass_abort: Option<AbortHandle>,
}

impl<D: Dom> DiagramSet<D> {
    /// Take ownership of the document and install the shared stylesheet
    pub fn new(mut dom: D, config: ViewportConfig) -> Self {
        let stylesheet = styles::install(&mut dom);
        Self {
            dom,
            config: config.sanitized(),
            stylesheet,
            instances: HashMap::new(),
            saved_states: HashMap::new(),
            scopes: HashMap::new(),
            pending: Vec::new(),
            next_scope: 1,
            generation: 0,
            pass_abort: None,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn stylesheet(&self) -> NodeId {
        self.stylesheet
    }

    // ========================================================================
    // Setup & disposal
    // ========================================================================

    /// Make the diagram in `container` interactive under `id`.
    ///
    /// Any controller already registered for `id` or mounted on `container`
    /// is disposed first and its state saved, so a re-rendered diagram picks
    /// up where it left off.
    pub fn setup(&mut self, id: impl Into<DiagramId>, container: NodeId) -> DiagramHandle {
        let id = id.into();
        self.dispose_instance(&id);
        let occupants: Vec<DiagramId> = self
            .instances
            .iter()
            .filter(|(_, instance)| instance.element.container() == container)
            .map(|(other, _)| other.clone())
            .collect();
        for other in &occupants {
            self.dispose_instance(other);
        }

        if self.dom.find_svg(container).is_none() {
            tracing::debug!(%id, "no svg in container, skipping pan/zoom");
            return DiagramHandle { id, scope: None };
        }

        let scope = ListenerScope::new(self.next_scope);
        self.next_scope += 1;

        let initial = self.saved_states.get(&id).copied();
        tracing::debug!(%id, scope = scope.raw(), restored = initial.is_some(), "mounting diagram");

        let element = match DiagramElement::mount(&mut self.dom, container, &self.config, initial, scope) {
            Ok(element) => element,
            Err(e) => {
                tracing::debug!(%id, "not mounting diagram: {}", e);
                self.dom.release_scope(scope);
                return DiagramHandle { id, scope: None };
            }
        };

        self.instances.insert(
            id.clone(),
            Instance {
                element,
                phase: LifecyclePhase::PendingInitialize,
            },
        );
        self.scopes.insert(scope, id.clone());
        self.pending.push((id.clone(), scope));
        self.dom.request_animation_frame();

        DiagramHandle {
            id,
            scope: Some(scope),
        }
    }

    /// Dispose the controller `handle` was issued for. A handle whose
    /// controller has since been replaced does nothing.
    pub fn dispose(&mut self, handle: &DiagramHandle) -> bool {
        let Some(scope) = handle.scope else {
            return false;
        };
        let current = self
            .instances
            .get(handle.id.as_str())
            .map(|instance| instance.element.scope());
        if current != Some(scope) {
            tracing::debug!(id = %handle.id, scope = scope.raw(), "ignoring stale diagram handle");
            return false;
        }
        self.dispose_instance(&handle.id).is_some()
    }

    /// Save the state of `id`'s controller, then dispose it
    fn dispose_instance(&mut self, id: &DiagramId) -> Option<TransformState> {
        let mut instance = self.instances.remove(id)?;
        instance.phase = LifecyclePhase::Disposing;

        let state = instance.element.state();
        self.saved_states.insert(id.clone(), state);
        instance.element.dispose(&mut self.dom);
        self.scopes.remove(&instance.element.scope());
        Some(state)
    }

    /// Dispose every controller whose id is not in `active`
    pub fn dispose_inactive(&mut self, active: &HashSet<DiagramId>) -> usize {
        let stale: Vec<DiagramId> = self
            .instances
            .keys()
            .filter(|id| !active.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.dispose_instance(id);
        }
        stale.len()
    }

    /// Dispose every controller, keeping their saved states
    pub fn dispose_all(&mut self) {
        let ids: Vec<DiagramId> = self.instances.keys().cloned().collect();
        for id in &ids {
            self.dispose_instance(id);
        }
        self.pending.clear();
    }

    /// Drop saved states for diagrams that are no longer in the document
    pub fn retain_states(&mut self, active: &HashSet<DiagramId>) {
        let before = self.saved_states.len();
        self.saved_states.retain(|id, _| active.contains(id));
        let pruned = before - self.saved_states.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned saved diagram states");
        }
    }

    // ========================================================================
    // Frames & events
    // ========================================================================

    /// Initialize controllers queued by [`Self::setup`]. Entries whose
    /// controller was replaced or whose wrapper left the document are dropped.
    pub fn run_frame(&mut self) -> usize {
        let mut initialized = 0;
        for (id, scope) in std::mem::take(&mut self.pending) {
            let Some(instance) = self.instances.get_mut(&id) else {
                tracing::debug!(%id, "dropping frame for disposed diagram");
                continue;
            };
            if instance.element.scope() != scope || instance.phase != LifecyclePhase::PendingInitialize {
                tracing::debug!(%id, "dropping stale frame");
                continue;
            }
            if !self.dom.is_connected(instance.element.wrapper()) {
                tracing::debug!(%id, "dropping frame for detached diagram");
                continue;
            }
            instance.element.initialize(&mut self.dom);
            instance.phase = LifecyclePhase::Interactive;
            initialized += 1;
        }
        initialized
    }

    /// Route an event to the controller owning its scope
    pub fn handle(&mut self, dispatch: &Dispatch) -> EventOutcome {
        let Some(id) = self.scopes.get(&dispatch.scope) else {
            tracing::trace!(scope = dispatch.scope.raw(), "event for released scope");
            return EventOutcome::IGNORED;
        };
        let Some(instance) = self.instances.get_mut(id) else {
            return EventOutcome::IGNORED;
        };
        if instance.phase == LifecyclePhase::Disposing {
            return EventOutcome::IGNORED;
        }
        tracing::trace!(%id, binding = ?dispatch.binding, kind = ?dispatch.event.kind(), "dispatch");
        instance
            .element
            .handle(&mut self.dom, dispatch.binding, &dispatch.event)
    }

    // ========================================================================
    // Programmatic control
    // ========================================================================

    /// Store new options and push them to every live controller
    pub fn update_config(&mut self, config: ViewportConfig) {
        self.config = config.sanitized();
        for instance in self.instances.values_mut() {
            instance.element.apply_config(&mut self.dom, &self.config);
        }
    }

    pub fn zoom_in(&mut self, id: &str) -> bool {
        self.with_element(id, |element, dom| element.zoom_in(dom))
    }

    pub fn zoom_out(&mut self, id: &str) -> bool {
        self.with_element(id, |element, dom| element.zoom_out(dom))
    }

    pub fn reset(&mut self, id: &str) -> bool {
        self.with_element(id, |element, dom| element.reset(dom))
    }

    fn with_element(&mut self, id: &str, f: impl FnOnce(&mut DiagramElement, &mut D)) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) => {
                f(&mut instance.element, &mut self.dom);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Live state of a mounted diagram
    pub fn state(&self, id: &str) -> Option<TransformState> {
        self.instances.get(id).map(|instance| instance.element.state())
    }

    /// State captured when the diagram's last controller was disposed
    pub fn saved_state(&self, id: &str) -> Option<TransformState> {
        self.saved_states.get(id).copied()
    }

    pub fn phase(&self, id: &str) -> Option<LifecyclePhase> {
        self.instances.get(id).map(|instance| instance.phase)
    }

    pub fn element(&self, id: &str) -> Option<&DiagramElement> {
        self.instances.get(id).map(|instance| &instance.element)
    }

    /// Ids of mounted diagrams
    pub fn ids(&self) -> impl Iterator<Item = &DiagramId> {
        self.instances.keys()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Saved states merged with the live state of mounted diagrams, as a JSON
    /// object keyed by diagram id
    pub fn export_states(&self) -> Value {
        let mut states: HashMap<&DiagramId, TransformState> =
            self.saved_states.iter().map(|(id, state)| (id, *state)).collect();
        for (id, instance) in &self.instances {
            states.insert(id, instance.element.state());
        }

        let mut map = Map::new();
        for (id, state) in states {
            match serde_json::to_value(state) {
                Ok(value) => {
                    map.insert(id.to_string(), value);
                }
                Err(e) => tracing::warn!(%id, "failed to serialize diagram state: {}", e),
            }
        }
        Value::Object(map)
    }

    /// Load states persisted by [`Self::export_states`]. Each field of each
    /// entry is validated on its own. Returns the number of entries loaded.
    pub fn import_states(&mut self, value: &Value) -> usize {
        let Some(map) = value.as_object() else {
            tracing::warn!("ignoring persisted diagram states: not an object");
            return 0;
        };
        let bounds = self.config.scale_bounds();
        for (id, state) in map {
            self.saved_states
                .insert(DiagramId::new(id.as_str()), TransformState::from_json(state, bounds));
        }
        map.len()
    }

    // ========================================================================
    // Render passes
    // ========================================================================

    /// Start a render pass, aborting the one in flight
    pub fn begin_pass(&mut self) -> (RenderPass, AbortRegistration) {
        if let Some(previous) = self.pass_abort.take() {
            previous.abort();
        }
        self.generation += 1;
        let (handle, registration) = AbortHandle::new_pair();
        self.pass_abort = Some(handle.clone());
        tracing::debug!(generation = self.generation, "render pass started");
        (RenderPass::new(self.generation, handle), registration)
    }

    /// True while `pass` is the newest pass and has not been aborted
    pub fn is_current_pass(&self, pass: &RenderPass) -> bool {
        pass.generation() == self.generation && !pass.is_aborted()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Renderer options for the document's current colour scheme
    pub fn render_options(&self) -> RenderOptions {
        let body = self.dom.body();
        let dark = DARK_BODY_CLASSES.iter().any(|class| self.dom.has_class(body, class));
        RenderOptions {
            theme: self.config.mermaid_theme(dark).to_string(),
            max_text_size: self.config.max_text_size,
        }
    }
}

impl DiagramSet<MemoryDom> {
    /// Fire `event` at `target` and deliver it to every listener along its
    /// propagation path, honouring `stop_propagation`
    pub fn fire(&mut self, target: EventTarget, event: DomEvent) -> EventOutcome {
        let kind = event.kind();
        let mut outcome = EventOutcome::IGNORED;
        for level in self.dom.event_path(target, kind) {
            for (scope, binding) in self.dom.listeners_at(level, kind) {
                let dispatch = Dispatch {
                    scope,
                    binding,
                    event: event.clone(),
                };
                outcome = outcome.merge(self.handle(&dispatch));
            }
            if outcome.stop_propagation {
                break;
            }
        }
        outcome
    }

    /// Run the pending animation frame, if one was requested
    pub fn flush_frame(&mut self) -> usize {
        if self.dom.take_frame_request() {
            self.run_frame()
        } else {
            0
        }
    }
}
