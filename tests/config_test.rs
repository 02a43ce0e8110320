use std::fs;
use std::path::PathBuf;
use storedash::config::{AppConfig, ConfigManager, DisplayConfig, CONFIG_VERSION};
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.dataset.path, None);
    assert_eq!(config.currency.code, "AUD");
    assert_eq!(config.currency.locale, "es_CO");
    assert_eq!(config.display.top_n, 5);
    assert!(!config.display.dense_daily);
    assert_eq!(config.performance.event_poll_interval_ms, 25);
    assert_eq!(config.chart_export.dir, PathBuf::from("charts"));
    assert_eq!(config.chart_export.width, 1200);
    assert_eq!(config.chart_export.height, 700);
    assert_eq!(config.theme.colors.chart_primary, "#FC6736");
    assert_eq!(config.theme.colors.chart_secondary, "#FFDD95");
    assert!(!config.debug.enabled);
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    for section in [
        "[dataset]",
        "[currency]",
        "[display]",
        "[performance]",
        "[chart_export]",
        "[theme.colors]",
        "[debug]",
    ] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains(&format!("version = \"{}\"", CONFIG_VERSION)));
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");
    assert!(config_path.exists());

    let loaded = AppConfig::load_from(&config_manager).expect("template should load");
    assert_eq!(loaded.display.top_n, 5);
    assert_eq!(loaded.currency.locale, "es_CO");
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager
        .write_default_config(false)
        .expect("First write should succeed");

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("already exists"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let first_path = config_manager
        .write_default_config(false)
        .expect("First write should succeed");
    fs::write(&first_path, "garbage = [").unwrap();

    let second_path = config_manager
        .write_default_config(true)
        .expect("Second write with force should succeed");

    assert_eq!(first_path, second_path);
    assert!(AppConfig::load_from(&config_manager).is_ok());
}

#[test]
fn test_load_without_file_gives_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).expect("Should load default config");
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.display.top_n, 5);
}

#[test]
fn test_load_minimal_user_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager
        .ensure_config_dir()
        .expect("Failed to create config dir");

    let minimal_config = r#"
[dataset]
path = "/data/all_data.csv"
delimiter = ";"

[display]
top_n = 10
"#;
    fs::write(config_manager.config_path("config.toml"), minimal_config).unwrap();

    let config = AppConfig::load_from(&config_manager).expect("Failed to load config");
    assert_eq!(
        config.dataset.path,
        Some(PathBuf::from("/data/all_data.csv"))
    );
    assert_eq!(config.dataset.delimiter, Some(';'));
    assert_eq!(config.display.top_n, 10);
    // unspecified values keep their defaults
    assert_eq!(config.currency.code, "AUD");
    assert_eq!(config.chart_export.width, 1200);
}

#[test]
fn test_load_rejects_invalid_user_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        "[currency]\nlocale = \"xx_YY\"\n",
    )
    .unwrap();
    assert!(AppConfig::load_from(&config_manager).is_err());

    fs::write(config_manager.config_path("config.toml"), "[display\n").unwrap();
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut override_config = AppConfig::default();

    override_config.display.top_n = 8;
    override_config.currency.code = "USD".to_string();
    override_config.chart_export.width = 800;
    override_config.theme.colors.chart_primary = "blue".to_string();

    base.merge(override_config);

    assert_eq!(base.display.top_n, 8);
    assert_eq!(base.currency.code, "USD");
    assert_eq!(base.chart_export.width, 800);
    assert_eq!(base.theme.colors.chart_primary, "blue");

    // unmodified values remain default
    assert_eq!(base.currency.locale, "es_CO");
    assert_eq!(base.chart_export.height, 700);
}

#[test]
fn test_merge_does_not_override_with_defaults() {
    let mut base = DisplayConfig {
        top_n: 3,
        dense_daily: true,
        logo: Some(PathBuf::from("logo.png")),
    };

    base.merge(DisplayConfig::default());

    assert_eq!(base.top_n, 3);
    assert!(base.dense_daily);
    assert_eq!(base.logo, Some(PathBuf::from("logo.png")));
}

#[test]
fn test_validate_config_errors() {
    let config = AppConfig {
        version: "9.0".to_string(),
        ..Default::default()
    };
    assert!(config
        .validate()
        .unwrap_err()
        .to_string()
        .contains("Unsupported config version"));

    let mut config = AppConfig::default();
    config.display.top_n = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.performance.event_poll_interval_ms = 0;
    assert!(config
        .validate()
        .unwrap_err()
        .to_string()
        .contains("event_poll_interval_ms must be greater than 0"));

    let mut config = AppConfig::default();
    config.chart_export.height = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.dataset.compression = Some("rar".to_string());
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.currency.code = "dollars".to_string();
    assert!(config.validate().is_err());
}
