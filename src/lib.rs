//! Interactive pan/zoom/resize viewports for rendered diagrams.
//!
//! Diagrams arrive as SVG markup from an external renderer. Each one is
//! wrapped in a fixed-size viewport whose content layer can be dragged,
//! zoomed and resized, with its view kept across re-renders of the document.
//!
//! The entry points are [`DiagramSet`] (one per document) and
//! [`render::render_diagrams`].

pub mod config;
pub mod constants;
pub mod diagram;
pub mod dom;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod render;
pub mod types;

pub use config::{ClickDragMode, ShowControlsMode, ViewportConfig};
pub use diagram::{DiagramElement, DiagramHandle, DiagramSet, LifecyclePhase};
pub use dom::{Binding, Dispatch, Dom, EventOutcome, ListenerScope, NodeId};
pub use error::{ViewportError, ViewportResult};
pub use render::{DiagramBlock, DiagramRenderer, PassReport, RenderOptions, render_diagrams};
pub use types::{DiagramId, IdStrategy, TransformState};
