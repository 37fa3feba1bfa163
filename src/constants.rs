//! Crate-wide constants.
//!
//! Centralizes zoom factors, thresholds and the class names shared between the
//! controller and the injected stylesheet.

// ============================================================================
// Zoom & Pan
// ============================================================================

/// Minimum zoom level
pub const MIN_SCALE: f64 = 0.1;

/// Maximum zoom level
pub const MAX_SCALE: f64 = 5.0;

/// Default zoom level
pub const DEFAULT_SCALE: f64 = 1.0;

/// Scale change per pixel of wheel delta
pub const WHEEL_ZOOM_FACTOR: f64 = 0.002;

/// Pinch gestures report much smaller deltas than a scroll wheel
pub const PINCH_ZOOM_MULTIPLIER: f64 = 10.0;

/// Factor applied by the zoom-in button and Alt+click
pub const STEP_ZOOM_IN: f64 = 1.25;

/// Factor applied by the zoom-out button and Alt+Shift+click
pub const STEP_ZOOM_OUT: f64 = 0.8;

/// Pointer travel (px, per axis) after which a press counts as a drag
pub const DRAG_THRESHOLD: f64 = 3.0;

/// Pixels per line for `DOM_DELTA_LINE` wheel events
pub const LINE_DELTA_PX: f64 = 16.0;

// ============================================================================
// Layout
// ============================================================================

/// Smallest height the resize handle can shrink a diagram to
pub const MIN_CONTAINER_HEIGHT: f64 = 100.0;

/// Bit set in `MouseEvent.buttons` while the primary button is held
pub const PRIMARY_BUTTON_MASK: u16 = 1;

// ============================================================================
// DOM class names and ids
// ============================================================================

pub const WRAPPER_CLASS: &str = "mermaid-wrapper";
pub const CONTENT_CLASS: &str = "mermaid-content";
pub const CONTROLS_CLASS: &str = "mermaid-zoom-controls";
pub const CONTROLS_AUTO_HIDE_CLASS: &str = "mermaid-zoom-controls-auto-hide";
pub const RESIZE_HANDLE_CLASS: &str = "mermaid-resize-handle";
pub const ERROR_CLASS: &str = "mermaid-error";
pub const ACTIVE_CLASS: &str = "active";

/// Id of the shared stylesheet element
pub const STYLESHEET_ID: &str = "mermaid-diagram-styles";

/// Id of the element carrying the host configuration in `data-config`
pub const CONFIG_HOST_ID: &str = "markdown-mermaid";

/// Prefix for the DOM id given to each diagram container
pub const CONTAINER_ID_PREFIX: &str = "mermaid-container-";

/// Prefix for diagram identifiers
pub const DIAGRAM_ID_PREFIX: &str = "mermaid-";

/// Body classes that mark a dark preview theme
pub const DARK_BODY_CLASSES: &[&str] = &["vscode-dark", "vscode-high-contrast"];

// ============================================================================
// Renderer defaults
// ============================================================================

/// Theme used when the configured one is not recognised
pub const DEFAULT_MERMAID_THEME: &str = "default";

/// Themes the renderer understands
pub const VALID_MERMAID_THEMES: &[&str] = &["base", "forest", "dark", "default", "neutral"];

/// Default `maxTextSize` handed to the renderer
pub const DEFAULT_MAX_TEXT_SIZE: u32 = 50_000;
