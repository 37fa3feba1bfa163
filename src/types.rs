//! Core types shared by the controller and the set manager.
//!
//! This module defines the persisted transform state and the identifiers used
//! to match diagrams across re-renders.

use crate::constants::{DEFAULT_SCALE, DIAGRAM_ID_PREFIX, MIN_CONTAINER_HEIGHT};
use crate::geometry::{Point, ScaleBounds};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Transform State
// ============================================================================

/// Pan/zoom state of one diagram.
///
/// `translate_*` are in content-layer pixels relative to the untransformed
/// content origin. `scale` is kept within the configured [`ScaleBounds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformState {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    /// False while the diagram still shows its auto-fitted default view
    pub has_interacted: bool,
    /// Height chosen with the resize handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_height: Option<f64>,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            translate_x: 0.0,
            translate_y: 0.0,
            has_interacted: false,
            custom_height: None,
        }
    }
}

impl TransformState {
    #[inline]
    pub fn translate(&self) -> Point {
        Point::new(self.translate_x, self.translate_y)
    }

    #[inline]
    pub fn set_translate(&mut self, translate: Point) {
        self.translate_x = translate.x;
        self.translate_y = translate.y;
    }

    /// Repair every field independently: an out-of-range scale is clamped,
    /// non-finite translations become 0 and an unusable custom height is dropped.
    pub fn sanitized(self, bounds: ScaleBounds) -> Self {
        let defaults = Self::default();
        Self {
            scale: if self.scale.is_finite() {
                bounds.clamp(self.scale)
            } else {
                bounds.clamp(defaults.scale)
            },
            translate_x: finite_or(self.translate_x, defaults.translate_x),
            translate_y: finite_or(self.translate_y, defaults.translate_y),
            has_interacted: self.has_interacted,
            custom_height: self
                .custom_height
                .filter(|h| h.is_finite() && *h >= MIN_CONTAINER_HEIGHT),
        }
    }

    /// Restore from persisted JSON.
    ///
    /// Each field is validated on its own; a missing or malformed field takes
    /// its default instead of rejecting the whole object.
    pub fn from_json(value: &Value, bounds: ScaleBounds) -> Self {
        let defaults = Self::default();
        let number = |key: &str| value.get(key).and_then(Value::as_f64);

        Self {
            scale: number("scale").unwrap_or(defaults.scale),
            translate_x: number("translateX").unwrap_or(defaults.translate_x),
            translate_y: number("translateY").unwrap_or(defaults.translate_y),
            has_interacted: value
                .get("hasInteracted")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.has_interacted),
            custom_height: number("customHeight"),
        }
        .sanitized(bounds)
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

// ============================================================================
// Diagram Identifiers
// ============================================================================

/// Identifier of a logical diagram, stable across re-renders
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(String);

impl DiagramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DiagramId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DiagramId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for DiagramId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How diagrams are matched between render passes.
///
/// - `ContentHash` survives reordering and insertion of other diagrams, but an
///   edit to a diagram's own source gives it a fresh identity. Identical
///   sources are told apart by their occurrence order within the pass.
/// - `Positional` survives edits to a diagram's text, but every diagram after
///   an inserted, removed or moved one picks up its neighbour's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdStrategy {
    #[default]
    ContentHash,
    Positional,
}

/// Hands out identifiers for one render pass using a single strategy
#[derive(Debug)]
pub struct IdAllocator {
    strategy: IdStrategy,
    position: usize,
    occurrences: HashMap<String, usize>,
}

impl IdAllocator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            position: 0,
            occurrences: HashMap::new(),
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Identifier for the next diagram in document order
    pub fn next_id(&mut self, source: &str) -> DiagramId {
        let position = self.position;
        self.position += 1;

        match self.strategy {
            IdStrategy::Positional => DiagramId(format!("{DIAGRAM_ID_PREFIX}{position}")),
            IdStrategy::ContentHash => {
                let hash = content_hash(source);
                let occurrence = self.occurrences.entry(hash.clone()).or_insert(0);
                let id = DiagramId(format!("{DIAGRAM_ID_PREFIX}{hash}-{occurrence}"));
                *occurrence += 1;
                id
            }
        }
    }
}

/// First 8 bytes of the SHA-256 of `source`, hex encoded
fn content_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
