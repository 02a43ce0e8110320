use ratatui::style::Color;
use storedash::config::{AppConfig, ColorParser, Theme};

// Helper to ensure NO_COLOR is not set for color parsing tests
fn ensure_colors_enabled() {
    std::env::remove_var("NO_COLOR");
}

#[test]
fn test_parse_named_and_indexed_colors() {
    ensure_colors_enabled();
    let parser = ColorParser::new();

    assert_eq!(parser.parse("red").unwrap(), Color::Red);
    assert_eq!(parser.parse("Cyan").unwrap(), Color::Cyan);
    assert_eq!(parser.parse("dark_gray").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("bright_green").unwrap(), Color::Indexed(10));
    assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
    assert_eq!(parser.parse("reset").unwrap(), Color::Reset);
}

#[test]
fn test_parse_invalid_colors() {
    ensure_colors_enabled();
    let parser = ColorParser::new();

    assert!(parser.parse("not_a_color").is_err());
    assert!(parser.parse("indexed(300)").is_err());
    assert!(parser.parse("#GGHHII").is_err());
}

#[test]
fn test_hex_colors_follow_terminal_support() {
    ensure_colors_enabled();
    let parser = ColorParser::new();
    // Depends on the terminal running the tests; every outcome is a concrete colour.
    let color = parser.parse("#FC6736").unwrap();
    assert_ne!(color, Color::Reset);
}

#[test]
fn test_theme_from_default_config() {
    ensure_colors_enabled();
    let config = AppConfig::default();
    let theme = Theme::from_config(&config.theme).expect("default theme");

    for name in [
        "primary",
        "secondary",
        "error",
        "controls_bg",
        "table_border",
        "tab_active",
        "modal_border_error",
        "chart_primary",
        "chart_secondary",
    ] {
        assert!(theme.colors.contains_key(name), "missing {}", name);
    }
    assert_eq!(theme.get("error"), Color::Red);
    assert_eq!(theme.get("controls_bg"), Color::Indexed(236));
    assert_eq!(theme.get("no_such_slot"), Color::Reset);
}

#[test]
fn test_theme_with_custom_colors() {
    ensure_colors_enabled();
    let mut config = AppConfig::default();
    config.theme.colors.error = "bright_red".to_string();
    config.theme.colors.modal_border = "indexed(33)".to_string();

    let theme = Theme::from_config(&config.theme).unwrap();
    assert_eq!(theme.get("error"), Color::Indexed(9));
    assert_eq!(theme.get("modal_border"), Color::Indexed(33));
}

#[test]
fn test_invalid_theme_color_fails_validation() {
    ensure_colors_enabled();
    let mut config = AppConfig::default();
    config.theme.colors.tab_active = "sparkly".to_string();
    assert!(Theme::from_config(&config.theme).is_err());
    assert!(config.validate().is_err());
}
