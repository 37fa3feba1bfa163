//! Pointer, wheel and keyboard input handling for diagrams.
//!
//! ## Architecture
//!
//! The input system uses an explicit state machine (`GestureState`) to track
//! the active gesture. `GestureHandler` wraps it with the activation policy
//! and turns events into `GestureResponse` values; it never writes to the DOM.
//!
//! ## Modules
//!
//! - `events` - Backend-neutral event types
//! - `state` - Gesture state machine enum and helper methods
//! - `gesture` - Event handling (pan, resize, wheel/click zoom, keys)
//! - `cursor` - Cursor affordance rules

mod cursor;
mod events;
mod gesture;
mod state;

pub use cursor::{Cursor, cursor_for};
pub use events::{DeltaMode, DomEvent, KeyInput, Modifiers, PointerInput, WheelInput};
pub use gesture::{GestureHandler, GestureResponse};
pub use state::GestureState;
