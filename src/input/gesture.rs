//! Pointer, wheel and keyboard handling for one diagram.
//!
//! [`GestureHandler`] owns the [`GestureState`] machine and the activation
//! policy. It never touches the DOM: every handler takes the current
//! [`TransformState`] and returns a [`GestureResponse`] describing what the
//! controller should write back.

use crate::config::ClickDragMode;
use crate::constants::{
    LINE_DELTA_PX, PINCH_ZOOM_MULTIPLIER, STEP_ZOOM_IN, STEP_ZOOM_OUT, WHEEL_ZOOM_FACTOR,
};
use crate::dom::EventOutcome;
use crate::geometry::{Point, Rect, ScaleBounds, scale_about_point};
use crate::input::cursor::{Cursor, cursor_for};
use crate::input::events::{DeltaMode, KeyInput, Modifiers, PointerInput, WheelInput};
use crate::input::state::GestureState;
use crate::types::TransformState;

/// Changes requested by one input event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureResponse {
    /// New transform state to store and render
    pub transform: Option<TransformState>,
    /// New wrapper height in pixels
    pub height: Option<f64>,
    /// New wrapper cursor
    pub cursor: Option<Cursor>,
    /// `Some(None)` clears the body cursor, `Some(Some(_))` sets it
    pub body_cursor: Option<Option<Cursor>>,
    /// Pan mode changed to this value
    pub pan_mode: Option<bool>,
    pub outcome: EventOutcome,
}

impl GestureResponse {
    pub const NONE: GestureResponse = GestureResponse {
        transform: None,
        height: None,
        cursor: None,
        body_cursor: None,
        pan_mode: None,
        outcome: EventOutcome::IGNORED,
    };

    pub fn is_noop(&self) -> bool {
        *self == Self::NONE
    }
}

/// Gesture state machine plus activation policy for one diagram
#[derive(Debug, Clone)]
pub struct GestureHandler {
    state: GestureState,
    click_drag: ClickDragMode,
    bounds: ScaleBounds,
    resizable: bool,
    pan_mode: bool,
    /// The last pan moved past the drag threshold; the click that follows
    /// its pointer-up must not zoom
    last_drag: bool,
}

impl GestureHandler {
    pub fn new(click_drag: ClickDragMode, bounds: ScaleBounds, resizable: bool) -> Self {
        Self {
            state: GestureState::Idle,
            click_drag,
            bounds,
            resizable,
            pan_mode: false,
            last_drag: false,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn pan_mode(&self) -> bool {
        self.pan_mode
    }

    pub fn bounds(&self) -> ScaleBounds {
        self.bounds
    }

    pub fn click_drag(&self) -> ClickDragMode {
        self.click_drag
    }

    pub fn set_click_drag(&mut self, mode: ClickDragMode) {
        self.click_drag = mode;
    }

    pub fn set_bounds(&mut self, bounds: ScaleBounds) {
        self.bounds = bounds;
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    /// Cursor for the current policy with the given modifiers held
    pub fn cursor(&self, modifiers: Modifiers) -> Cursor {
        if self.state.is_panning() {
            Cursor::Grabbing
        } else {
            cursor_for(self.click_drag, self.pan_mode, modifiers)
        }
    }

    fn drag_allowed(&self, modifiers: Modifiers) -> bool {
        self.pan_mode
            || match self.click_drag {
                ClickDragMode::Always => true,
                ClickDragMode::ModifierRequired => modifiers.alt,
                ClickDragMode::Never => false,
            }
    }

    // ========================================================================
    // Pan
    // ========================================================================

    /// Primary button pressed on the wrapper
    pub fn pointer_down(&mut self, input: &PointerInput, current: &TransformState) -> GestureResponse {
        if !input.is_primary() || !self.state.is_idle() {
            return GestureResponse::NONE;
        }
        self.last_drag = false;
        if !self.drag_allowed(input.modifiers) {
            return GestureResponse::NONE;
        }

        self.state.start_panning(input.client, current.translate());
        GestureResponse {
            cursor: Some(Cursor::Grabbing),
            outcome: EventOutcome::CONSUMED,
            ..GestureResponse::NONE
        }
    }

    /// Pointer moved anywhere in the document
    pub fn pointer_move(&mut self, input: &PointerInput, current: &TransformState) -> GestureResponse {
        if self.state.is_idle() {
            return GestureResponse::NONE;
        }
        // The button was released outside the window
        if input.buttons == 0 {
            return self.finish(current);
        }

        match self.state {
            GestureState::Panning { .. } => {
                let Some(translate) = self.state.pan_to(input.client) else {
                    return GestureResponse::NONE;
                };
                let mut next = *current;
                next.set_translate(translate);
                GestureResponse {
                    transform: Some(next),
                    ..GestureResponse::NONE
                }
            }
            GestureState::Resizing { .. } => {
                let Some(height) = self.state.resize_to(input.client.y) else {
                    return GestureResponse::NONE;
                };
                GestureResponse {
                    transform: Some(TransformState {
                        custom_height: Some(height),
                        ..*current
                    }),
                    height: Some(height),
                    ..GestureResponse::NONE
                }
            }
            GestureState::Idle => GestureResponse::NONE,
        }
    }

    /// Pointer released anywhere in the document
    pub fn pointer_up(&mut self, current: &TransformState) -> GestureResponse {
        self.finish(current)
    }

    /// Pointer left the document. Only ends a gesture when no button is held.
    pub fn pointer_leave(&mut self, input: &PointerInput, current: &TransformState) -> GestureResponse {
        if input.buttons == 0 {
            self.finish(current)
        } else {
            GestureResponse::NONE
        }
    }

    /// Abort any active gesture (lost capture, Escape, disposal)
    pub fn cancel(&mut self, current: &TransformState) -> GestureResponse {
        self.finish(current)
    }

    fn finish(&mut self, current: &TransformState) -> GestureResponse {
        match self.state {
            GestureState::Idle => GestureResponse::NONE,
            GestureState::Panning { dragged, .. } => {
                self.state.reset();
                self.last_drag = dragged;
                tracing::trace!(dragged, "pan finished");
                GestureResponse {
                    transform: dragged.then_some(TransformState {
                        has_interacted: true,
                        ..*current
                    }),
                    cursor: Some(self.cursor(Modifiers::NONE)),
                    ..GestureResponse::NONE
                }
            }
            GestureState::Resizing { .. } => {
                self.state.reset();
                tracing::trace!(height = ?current.custom_height, "resize finished");
                GestureResponse {
                    cursor: Some(self.cursor(Modifiers::NONE)),
                    body_cursor: Some(None),
                    ..GestureResponse::NONE
                }
            }
        }
    }

    // ========================================================================
    // Resize handle
    // ========================================================================

    /// Primary button pressed on the resize handle
    pub fn resize_down(&mut self, input: &PointerInput, wrapper_height: f64) -> GestureResponse {
        if !self.resizable || !input.is_primary() || !self.state.is_idle() {
            return GestureResponse::NONE;
        }
        self.state.start_resizing(input.client.y, wrapper_height);
        GestureResponse {
            body_cursor: Some(Some(Cursor::NsResize)),
            outcome: EventOutcome::CONSUMED,
            ..GestureResponse::NONE
        }
    }

    // ========================================================================
    // Zoom
    // ========================================================================

    /// Zoom by `factor` about a wrapper-local pivot
    pub fn zoom(&self, current: &TransformState, factor: f64, pivot: Point) -> TransformState {
        TransformState {
            has_interacted: true,
            ..scale_about_point(current, factor, pivot, self.bounds)
        }
    }

    /// Wheel over the wrapper. Zooms with Alt or a pinch (Ctrl), otherwise
    /// the page scrolls as usual.
    pub fn wheel(&mut self, input: &WheelInput, current: &TransformState, wrapper: Rect) -> GestureResponse {
        let pinch = input.modifiers.ctrl;
        if !pinch && !input.modifiers.alt {
            return GestureResponse::NONE;
        }

        let delta_px = match input.delta_mode {
            DeltaMode::Pixel => input.delta_y,
            DeltaMode::Line => input.delta_y * LINE_DELTA_PX,
            DeltaMode::Page => input.delta_y * wrapper.height,
        };
        let multiplier = if pinch { PINCH_ZOOM_MULTIPLIER } else { 1.0 };
        let factor = 1.0 - delta_px * WHEEL_ZOOM_FACTOR * multiplier;
        let pivot = wrapper.to_local(input.client);

        GestureResponse {
            transform: Some(self.zoom(current, factor, pivot)),
            outcome: EventOutcome::CONSUMED,
            ..GestureResponse::NONE
        }
    }

    /// Click on the wrapper. Alt zooms in, Alt+Shift zooms out, unless the
    /// click ends a drag.
    pub fn click(&mut self, input: &PointerInput, current: &TransformState, wrapper: Rect) -> GestureResponse {
        if !input.modifiers.alt || self.last_drag {
            return GestureResponse::NONE;
        }
        let factor = if input.modifiers.shift {
            STEP_ZOOM_OUT
        } else {
            STEP_ZOOM_IN
        };
        GestureResponse {
            transform: Some(self.zoom(current, factor, wrapper.to_local(input.client))),
            outcome: EventOutcome::CONSUMED,
            ..GestureResponse::NONE
        }
    }

    // ========================================================================
    // Cursor & keys
    // ========================================================================

    /// Pointer entered or moved over the wrapper
    pub fn hover(&self, modifiers: Modifiers) -> GestureResponse {
        if self.state.is_panning() {
            return GestureResponse::NONE;
        }
        GestureResponse {
            cursor: Some(self.cursor(modifiers)),
            ..GestureResponse::NONE
        }
    }

    pub fn key_down(&mut self, key: &KeyInput, current: &TransformState) -> GestureResponse {
        if key.is_escape() {
            if !self.state.is_idle() {
                return GestureResponse {
                    outcome: EventOutcome::PREVENT_DEFAULT,
                    ..self.cancel(current)
                };
            }
            if self.pan_mode {
                return self.toggle_pan_mode();
            }
            return GestureResponse::NONE;
        }
        self.key_change(key)
    }

    pub fn key_up(&mut self, key: &KeyInput) -> GestureResponse {
        self.key_change(key)
    }

    fn key_change(&self, key: &KeyInput) -> GestureResponse {
        if !key.is_modifier() || self.state.is_panning() {
            return GestureResponse::NONE;
        }
        GestureResponse {
            cursor: Some(self.cursor(key.modifiers)),
            outcome: EventOutcome::PREVENT_DEFAULT,
            ..GestureResponse::NONE
        }
    }

    /// Flip the pan-mode toggle
    pub fn toggle_pan_mode(&mut self) -> GestureResponse {
        self.pan_mode = !self.pan_mode;
        tracing::debug!(pan_mode = self.pan_mode, "pan mode toggled");
        GestureResponse {
            cursor: Some(self.cursor(Modifiers::NONE)),
            pan_mode: Some(self.pan_mode),
            ..GestureResponse::NONE
        }
    }
}
