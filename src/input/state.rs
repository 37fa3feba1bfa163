//! Gesture state machine for one diagram.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Panning      (primary button down on the wrapper, drag allowed)
//! Idle -> Resizing     (primary button down on the resize handle)
//!
//! Panning  -> Idle     (pointer up, buttons == 0, lost capture, Escape)
//! Resizing -> Idle     (pointer up, buttons == 0, lost capture, Escape)
//! ```

use crate::constants::{DRAG_THRESHOLD, MIN_CONTAINER_HEIGHT};
use crate::geometry::Point;

/// Active pointer gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    /// No gesture in progress
    #[default]
    Idle,

    /// Dragging the content layer
    Panning {
        /// Client position of the pointer-down
        start_pointer: Point,
        /// Translation when the drag started
        start_translate: Point,
        /// Pointer travelled past the drag threshold
        dragged: bool,
    },

    /// Dragging the resize handle
    Resizing {
        /// Client Y of the pointer-down
        start_y: f64,
        /// Wrapper height when the drag started
        start_height: f64,
    },
}

impl GestureState {
    /// Returns true if the state is Idle
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_panning(&self) -> bool {
        matches!(self, Self::Panning { .. })
    }

    pub fn is_resizing(&self) -> bool {
        matches!(self, Self::Resizing { .. })
    }

    /// True once a pan moved far enough to count as a drag
    pub fn has_dragged(&self) -> bool {
        matches!(self, Self::Panning { dragged: true, .. })
    }

    /// Reset to Idle state
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    pub fn start_panning(&mut self, start_pointer: Point, start_translate: Point) {
        *self = Self::Panning {
            start_pointer,
            start_translate,
            dragged: false,
        };
    }

    pub fn start_resizing(&mut self, start_y: f64, start_height: f64) {
        *self = Self::Resizing { start_y, start_height };
    }

    /// Follow the pointer during a pan.
    ///
    /// Returns the new translation, or `None` when not panning.
    pub fn pan_to(&mut self, pointer: Point) -> Option<Point> {
        match self {
            Self::Panning {
                start_pointer,
                start_translate,
                dragged,
            } => {
                let delta = pointer - *start_pointer;
                if delta.x.abs() > DRAG_THRESHOLD || delta.y.abs() > DRAG_THRESHOLD {
                    *dragged = true;
                }
                Some(*start_translate + delta)
            }
            _ => None,
        }
    }

    /// Height the wrapper should take for a pointer at client Y `y`
    pub fn resize_to(&self, y: f64) -> Option<f64> {
        match self {
            Self::Resizing { start_y, start_height } => {
                Some((start_height + (y - start_y)).max(MIN_CONTAINER_HEIGHT))
            }
            _ => None,
        }
    }
}
