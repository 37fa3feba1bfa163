//! Pure transform math: clamping, pivot zoom and CSS transform composition.
//!
//! Coordinates come in two spaces:
//! - *container-local*: pixels relative to the wrapper's top-left corner
//! - *content*: pixels in the untransformed content layer
//!
//! A content point `c` is displayed at `translate + c * scale`.

use crate::constants::{MAX_SCALE, MIN_SCALE};
use crate::types::TransformState;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A 2-D coordinate or displacement in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale both components
    #[inline]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned rectangle in client pixels, as reported by `getBoundingClientRect`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Convert a client position to container-local coordinates
    #[inline]
    pub fn to_local(&self, client: Point) -> Point {
        client - self.origin()
    }

    /// Midpoint of the rectangle in its own local coordinates
    #[inline]
    pub fn local_center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Allowed scale range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min: MIN_SCALE,
            max: MAX_SCALE,
        }
    }
}

impl ScaleBounds {
    /// Build bounds, falling back to the defaults when the pair is unusable
    /// (non-positive, non-finite or inverted).
    pub fn new(min: f64, max: f64) -> Self {
        let valid = min.is_finite() && max.is_finite() && min > 0.0 && min <= max;
        if valid {
            Self { min, max }
        } else {
            tracing::warn!(min, max, "invalid scale bounds, using defaults");
            Self::default()
        }
    }

    #[inline]
    pub fn clamp(&self, scale: f64) -> f64 {
        clamp(scale, self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale <= self.max
    }
}

/// Bound a value to an interval. NaN maps to `min`.
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Content-space coordinate currently displayed at container-local `pivot`
#[inline]
pub fn content_point(state: &TransformState, pivot: Point) -> Point {
    (pivot - state.translate()).scale(1.0 / state.scale)
}

/// Scale by `factor` while keeping the content under `pivot` fixed.
///
/// The new scale is clamped to `bounds`; zero or negative factors therefore
/// land on `bounds.min`. A non-finite factor leaves the state untouched.
pub fn scale_about_point(
    state: &TransformState,
    factor: f64,
    pivot: Point,
    bounds: ScaleBounds,
) -> TransformState {
    if !factor.is_finite() {
        return *state;
    }

    let old_scale = if state.scale > 0.0 {
        state.scale
    } else {
        bounds.min
    };
    let new_scale = bounds.clamp(old_scale * factor);
    let ratio = new_scale / old_scale;
    let translate = pivot - (pivot - state.translate()).scale(ratio);

    TransformState {
        scale: new_scale,
        translate_x: translate.x,
        translate_y: translate.y,
        ..*state
    }
}

/// CSS `transform` value for the content layer
pub fn compose_css_transform(state: &TransformState) -> String {
    format!(
        "translate({}px, {}px) scale({})",
        css_number(state.translate_x),
        css_number(state.translate_y),
        css_number(state.scale)
    )
}

/// Format a CSS pixel length (`"200px"`)
pub fn css_px(value: f64) -> String {
    format!("{}px", css_number(value))
}

/// Shortest decimal form, with negative zero folded to zero
fn css_number(value: f64) -> f64 {
    value + 0.0
}
