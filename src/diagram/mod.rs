//! Diagram controllers and the set that owns them.
//!
//! - `element` - pan/zoom controller for one diagram
//! - `controls` - zoom/pan buttons and the resize handle
//! - `manager` - keyed set of controllers with saved state
//! - `styles` - shared stylesheet

pub mod controls;
pub mod element;
pub mod manager;
pub mod styles;

pub use controls::Controls;
pub use element::DiagramElement;
pub use manager::{DiagramHandle, DiagramSet, LifecyclePhase};
