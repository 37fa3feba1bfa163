//! Host-facing configuration.
//!
//! The host embeds the configuration as HTML-escaped JSON in the `data-config`
//! attribute of `<span id="markdown-mermaid">`. Every field is optional; values
//! that fail validation are replaced by their defaults with a warning.

use crate::constants::{
    CONFIG_HOST_ID, DEFAULT_MAX_TEXT_SIZE, DEFAULT_MERMAID_THEME, MAX_SCALE, MIN_SCALE, VALID_MERMAID_THEMES,
};
use crate::dom::Dom;
use crate::error::{ViewportError, ViewportResult};
use crate::geometry::ScaleBounds;
use crate::types::IdStrategy;
use serde::{Deserialize, Serialize};

/// When a plain primary-button drag pans the diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickDragMode {
    /// Plain drag always pans
    Always,
    /// Drag pans only while Alt is held
    #[default]
    #[serde(alias = "alt")]
    ModifierRequired,
    /// Only the pan-mode toggle enables drag-pan
    Never,
}

/// Visibility policy for the zoom/pan buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShowControlsMode {
    Never,
    Always,
    #[default]
    OnHoverOrFocus,
}

/// Display options for every diagram in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    /// Renderer theme when the preview is dark
    pub dark_mode_theme: String,
    /// Renderer theme when the preview is light
    pub light_mode_theme: String,
    /// Largest diagram source the renderer accepts
    pub max_text_size: u32,
    pub click_drag: ClickDragMode,
    pub show_controls: ShowControlsMode,
    /// Show a drag handle on the bottom edge of each diagram
    pub resizable: bool,
    /// CSS length capping the diagram height, empty for none
    pub max_height: String,
    pub min_scale: f64,
    pub max_scale: f64,
    pub id_strategy: IdStrategy,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            dark_mode_theme: "dark".to_string(),
            light_mode_theme: DEFAULT_MERMAID_THEME.to_string(),
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
            click_drag: ClickDragMode::default(),
            show_controls: ShowControlsMode::default(),
            resizable: true,
            max_height: String::new(),
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            id_strategy: IdStrategy::default(),
        }
    }
}

impl ViewportConfig {
    /// Parse configuration JSON and sanitize it
    pub fn from_json(json: &str) -> ViewportResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Parse the HTML-escaped JSON found in a `data-config` attribute
    pub fn from_data_attribute(attribute: &str) -> ViewportResult<Self> {
        Self::from_json(&unescape_html_attribute(attribute))
    }

    /// Like [`Self::from_data_attribute`], falling back to defaults on error
    pub fn from_data_attribute_or_default(attribute: &str) -> Self {
        Self::from_data_attribute(attribute).unwrap_or_else(|e| {
            tracing::warn!("Unreadable diagram config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Read the configuration the host embedded in the document. A missing
    /// host element or attribute yields the defaults.
    pub fn from_document<D: Dom>(dom: &D) -> Self {
        let attribute = dom
            .element_by_id(CONFIG_HOST_ID)
            .and_then(|host| dom.attribute(host, "data-config"));
        match attribute {
            Some(attribute) => Self::from_data_attribute_or_default(&attribute),
            None => {
                tracing::debug!("no diagram config in document, using defaults");
                Self::default()
            }
        }
    }

    /// Serialize into an escaped `data-config` attribute value
    pub fn to_data_attribute(&self) -> ViewportResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(escape_html_attribute(&json))
    }

    /// Replace invalid values with their defaults
    pub fn sanitized(mut self) -> Self {
        self.dark_mode_theme = sanitize_mermaid_theme(&self.dark_mode_theme).to_string();
        self.light_mode_theme = sanitize_mermaid_theme(&self.light_mode_theme).to_string();

        if !self.max_height.trim().is_empty() {
            match sanitize_css_length(&self.max_height) {
                Ok(length) => self.max_height = length,
                Err(e) => {
                    tracing::warn!("Ignoring maxHeight: {}", e);
                    self.max_height.clear();
                }
            }
        } else {
            self.max_height.clear();
        }

        let bounds = ScaleBounds::new(self.min_scale, self.max_scale);
        self.min_scale = bounds.min;
        self.max_scale = bounds.max;
        self
    }

    pub fn scale_bounds(&self) -> ScaleBounds {
        ScaleBounds::new(self.min_scale, self.max_scale)
    }

    /// Sanitized `max-height` value, if one is configured
    pub fn max_height_css(&self) -> Option<String> {
        if self.max_height.trim().is_empty() {
            return None;
        }
        sanitize_css_length(&self.max_height).ok()
    }

    /// Renderer theme for the current preview colour scheme
    pub fn mermaid_theme(&self, dark: bool) -> &str {
        if dark {
            sanitize_mermaid_theme(&self.dark_mode_theme)
        } else {
            sanitize_mermaid_theme(&self.light_mode_theme)
        }
    }
}

/// Map unknown theme names to the default theme
pub fn sanitize_mermaid_theme(theme: &str) -> &str {
    if VALID_MERMAID_THEMES.contains(&theme) {
        theme
    } else {
        DEFAULT_MERMAID_THEME
    }
}

const CSS_LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "vh", "vw", "vmin", "vmax", "%", "pt", "pc", "cm", "mm", "in", "ch", "ex",
];

/// Validate a non-negative CSS length and return its normalized form.
///
/// Accepts a plain decimal followed by a unit (`"400px"`, `" 50vh "`) or a
/// bare `0`.
pub fn sanitize_css_length(value: &str) -> ViewportResult<String> {
    let trimmed = value.trim().to_ascii_lowercase();
    let invalid = || ViewportError::InvalidCssLength(value.to_string());

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: f64 = number.parse().map_err(|_| invalid())?;
    if !number.is_finite() || number < 0.0 {
        return Err(invalid());
    }

    if unit.is_empty() {
        return if number == 0.0 { Ok("0".to_string()) } else { Err(invalid()) };
    }
    if !CSS_LENGTH_UNITS.contains(&unit) {
        return Err(invalid());
    }
    Ok(format!("{number}{unit}"))
}

/// Escape a string for use inside a double-quoted HTML attribute
pub fn escape_html_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_html_attribute`]
pub fn unescape_html_attribute(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
