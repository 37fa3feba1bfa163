//! Host configuration: the `data-config` attribute and its sanitizing.

use diagram_viewport::config::sanitize_css_length;
use diagram_viewport::dom::memory::MemoryDom;
use diagram_viewport::{ClickDragMode, Dom, IdStrategy, ShowControlsMode, ViewportConfig};

fn host_document(data_config: &str) -> MemoryDom {
    let mut dom = MemoryDom::new();
    let host = dom.create_element("span");
    dom.set_attribute(host, "id", "markdown-mermaid");
    dom.set_attribute(host, "data-config", data_config);
    dom.append_child(dom.body(), host);
    dom
}

#[test]
fn test_config_survives_the_host_attribute() {
    let config = ViewportConfig {
        click_drag: ClickDragMode::Never,
        show_controls: ShowControlsMode::Always,
        resizable: false,
        max_height: "60vh".to_string(),
        min_scale: 0.5,
        max_scale: 3.0,
        id_strategy: IdStrategy::Positional,
        ..ViewportConfig::default()
    };
    let attribute = config.to_data_attribute().unwrap();
    assert!(!attribute.contains('"'));

    let dom = host_document(&attribute);
    assert_eq!(ViewportConfig::from_document(&dom), config);
}

#[test]
fn test_missing_host_gives_defaults() {
    let dom = MemoryDom::new();
    assert_eq!(ViewportConfig::from_document(&dom), ViewportConfig::default());
}

#[test]
fn test_garbage_attribute_gives_defaults() {
    let dom = host_document("{not json");
    assert_eq!(ViewportConfig::from_document(&dom), ViewportConfig::default());
}

#[test]
fn test_alt_is_an_alias_for_modifier_required() {
    let config = ViewportConfig::from_json(r#"{"clickDrag":"alt"}"#).unwrap();
    assert_eq!(config.click_drag, ClickDragMode::ModifierRequired);
}

#[test]
fn test_each_field_is_sanitized_on_its_own() {
    let config = ViewportConfig::from_json(
        r#"{"darkModeTheme":"neon","maxHeight":"calc(100% - 4px)","minScale":4,"maxScale":2,"showControls":"always"}"#,
    )
    .unwrap();

    assert_eq!(config.dark_mode_theme, "default");
    assert_eq!(config.max_height, "");
    assert_eq!(config.max_height_css(), None);
    assert_eq!(config.min_scale, 0.1);
    assert_eq!(config.max_scale, 5.0);
    assert_eq!(config.show_controls, ShowControlsMode::Always);
}

#[test]
fn test_theme_follows_colour_scheme() {
    let config = ViewportConfig {
        dark_mode_theme: "forest".to_string(),
        light_mode_theme: "neutral".to_string(),
        ..ViewportConfig::default()
    };
    assert_eq!(config.mermaid_theme(true), "forest");
    assert_eq!(config.mermaid_theme(false), "neutral");
}

#[test]
fn test_css_lengths() {
    assert_eq!(sanitize_css_length(" 400PX ").unwrap(), "400px");
    assert_eq!(sanitize_css_length("50%").unwrap(), "50%");
    assert_eq!(sanitize_css_length("0").unwrap(), "0");
    assert!(sanitize_css_length("400").is_err());
    assert!(sanitize_css_length("-2px").is_err());
    assert!(sanitize_css_length("10px; color: red").is_err());
}
