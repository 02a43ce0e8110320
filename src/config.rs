use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

use crate::currency::{CurrencyFormatter, DEFAULT_CURRENCY, DEFAULT_LOCALE};
use crate::CompressionFormat;

pub const CONFIG_VERSION: &str = "0.1";

/// Owns the config directory and the files inside it
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Use a fixed directory instead of the platform one (tests)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the commented default template to config.toml
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read config.toml from this directory; a missing file yields defaults
    pub fn load_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub dataset: DatasetConfig,
    pub currency: CurrencyConfig,
    pub display: DisplayConfig,
    pub performance: PerformanceConfig,
    pub chart_export: ChartExportConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: Option<PathBuf>,
    /// Field delimiter as a single character
    pub delimiter: Option<char>,
    /// "gzip", "zstd", "bzip2" or "xz"
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub code: String,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub top_n: usize,
    pub dense_daily: bool,
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartExportConfig {
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub text_inverse: String,
    pub table_header: String,
    pub table_border: String,
    pub tab_active: String,
    pub modal_border: String,
    pub modal_border_active: String,
    pub modal_border_error: String,
    pub chart_primary: String,
    pub chart_secondary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            dataset: DatasetConfig::default(),
            currency: CurrencyConfig::default(),
            display: DisplayConfig::default(),
            performance: PerformanceConfig::default(),
            chart_export: ChartExportConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: DEFAULT_CURRENCY.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            dense_daily: false,
            logo: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ChartExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("charts"),
            width: 1200,
            height: 700,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "#FC6736".to_string(),
            secondary: "#FFDD95".to_string(),
            error: "red".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            text_inverse: "black".to_string(),
            table_header: "white".to_string(),
            table_border: "#FC6736".to_string(),
            tab_active: "#FFDD95".to_string(),
            modal_border: "cyan".to_string(),
            modal_border_active: "yellow".to_string(),
            modal_border_error: "red".to_string(),
            chart_primary: "#FC6736".to_string(),
            chart_secondary: "#FFDD95".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid by the user's config.toml, then validated
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.load_config()?);
        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != CONFIG_VERSION {
            self.version = other.version;
        }
        self.dataset.merge(other.dataset);
        self.currency.merge(other.currency);
        self.display.merge(other.display);
        self.performance.merge(other.performance);
        self.chart_export.merge(other.chart_export);
        self.theme.colors.merge(other.theme.colors);
        self.debug.merge(other.debug);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with(CONFIG_VERSION) {
            return Err(eyre!(
                "Unsupported config version: {}. Expected {}.x",
                self.version,
                CONFIG_VERSION
            ));
        }

        if self.display.top_n == 0 {
            return Err(eyre!("display.top_n must be greater than 0"));
        }

        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        if self.chart_export.width == 0 || self.chart_export.height == 0 {
            return Err(eyre!("chart_export width and height must be greater than 0"));
        }

        if let Some(delimiter) = self.dataset.delimiter {
            if !delimiter.is_ascii() {
                return Err(eyre!(
                    "dataset.delimiter must be a single ASCII character, got '{}'",
                    delimiter
                ));
            }
        }

        if let Some(name) = &self.dataset.compression {
            if CompressionFormat::from_name(name).is_none() {
                return Err(eyre!(
                    "Invalid dataset.compression: {}. Must be gzip, zstd, bzip2 or xz",
                    name
                ));
            }
        }

        CurrencyFormatter::new(&self.currency.code, &self.currency.locale)?;

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }

    pub fn compression(&self) -> Option<CompressionFormat> {
        self.dataset
            .compression
            .as_deref()
            .and_then(CompressionFormat::from_name)
    }

    pub fn currency_formatter(&self) -> Result<CurrencyFormatter> {
        CurrencyFormatter::new(&self.currency.code, &self.currency.locale)
    }
}

impl DatasetConfig {
    pub fn merge(&mut self, other: Self) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl CurrencyConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CurrencyConfig::default();
        if other.code != default.code {
            self.code = other.code;
        }
        if other.locale != default.locale {
            self.locale = other.locale;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.top_n != default.top_n {
            self.top_n = other.top_n;
        }
        if other.dense_daily != default.dense_daily {
            self.dense_daily = other.dense_daily;
        }
        if other.logo.is_some() {
            self.logo = other.logo;
        }
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        if other.event_poll_interval_ms != PerformanceConfig::default().event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl ChartExportConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartExportConfig::default();
        if other.dir != default.dir {
            self.dir = other.dir;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = true;
        }
    }
}

/// Visits every colour slot by name.
macro_rules! for_each_color {
    ($config:expr, $visit:expr) => {{
        let c = $config;
        let mut visit = $visit;
        visit("primary", &c.primary)?;
        visit("secondary", &c.secondary)?;
        visit("error", &c.error)?;
        visit("dimmed", &c.dimmed)?;
        visit("controls_bg", &c.controls_bg)?;
        visit("text_primary", &c.text_primary)?;
        visit("text_secondary", &c.text_secondary)?;
        visit("text_inverse", &c.text_inverse)?;
        visit("table_header", &c.table_header)?;
        visit("table_border", &c.table_border)?;
        visit("tab_active", &c.tab_active)?;
        visit("modal_border", &c.modal_border)?;
        visit("modal_border_active", &c.modal_border_active)?;
        visit("modal_border_error", &c.modal_border_error)?;
        visit("chart_primary", &c.chart_primary)?;
        visit("chart_secondary", &c.chart_secondary)?;
    }};
}

impl ColorConfig {
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for_each_color!(self, |name: &str, value: &String| -> Result<()> {
            parser
                .parse(value)
                .map(|_| ())
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))
        });
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let pick = |mine: &mut String, theirs: String, def: &str| {
            if theirs != def {
                *mine = theirs;
            }
        };
        pick(&mut self.primary, other.primary, &default.primary);
        pick(&mut self.secondary, other.secondary, &default.secondary);
        pick(&mut self.error, other.error, &default.error);
        pick(&mut self.dimmed, other.dimmed, &default.dimmed);
        pick(&mut self.controls_bg, other.controls_bg, &default.controls_bg);
        pick(&mut self.text_primary, other.text_primary, &default.text_primary);
        pick(
            &mut self.text_secondary,
            other.text_secondary,
            &default.text_secondary,
        );
        pick(&mut self.text_inverse, other.text_inverse, &default.text_inverse);
        pick(&mut self.table_header, other.table_header, &default.table_header);
        pick(&mut self.table_border, other.table_border, &default.table_border);
        pick(&mut self.tab_active, other.tab_active, &default.tab_active);
        pick(&mut self.modal_border, other.modal_border, &default.modal_border);
        pick(
            &mut self.modal_border_active,
            other.modal_border_active,
            &default.modal_border_active,
        );
        pick(
            &mut self.modal_border_error,
            other.modal_border_error,
            &default.modal_border_error,
        );
        pick(&mut self.chart_primary, other.chart_primary, &default.chart_primary);
        pick(
            &mut self.chart_secondary,
            other.chart_secondary,
            &default.chart_secondary,
        );
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse "#rrggbb", "indexed(n)" or a named colour for this terminal
    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }

        let trimmed = s.trim();

        if trimmed.starts_with('#') && trimmed.len() == 7 {
            let (r, g, b) = parse_hex(trimmed)?;
            return Ok(self.convert_rgb_to_terminal_color(r, g, b));
        }

        let lower = trimmed.to_lowercase();
        if let Some(inner) = lower
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let num = inner.parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            return Ok(Color::Indexed(num));
        }

        match lower.replace(' ', "_").as_str() {
            "black" => Ok(Color::Black),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "cyan" => Ok(Color::Cyan),
            "white" => Ok(Color::White),
            "bright_black" | "gray" | "grey" | "dark_gray" | "dark_grey" => Ok(Color::Indexed(8)),
            "bright_red" => Ok(Color::Indexed(9)),
            "bright_green" => Ok(Color::Indexed(10)),
            "bright_yellow" => Ok(Color::Indexed(11)),
            "bright_blue" => Ok(Color::Indexed(12)),
            "bright_magenta" => Ok(Color::Indexed(13)),
            "bright_cyan" => Ok(Color::Indexed(14)),
            "bright_white" => Ok(Color::Indexed(15)),
            "light_gray" | "light_grey" => Ok(Color::Indexed(7)),
            "reset" => Ok(Color::Reset),
            _ => Err(eyre!(
                "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                 bright variants (bright_red, etc.), indexed(n), or hex colors (#ff0000)",
                trimmed
            )),
        }
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse "#rrggbb" into its components
pub fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 || !s.is_ascii() {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let component = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| eyre!("Invalid {} component in hex color: {}", name, s))
    };

    Ok((
        component(1..3, "red")?,
        component(3..5, "green")?,
        component(5..7, "blue")?,
    ))
}

/// Nearest xterm 256-colour palette index
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // grayscale ramp 232-255
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        if gray < 8 {
            return 16;
        } else if gray > 247 {
            return 231;
        } else {
            return 232 + ((gray - 8) * 24 / 240) as u8;
        }
    }

    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Nearest of the eight basic ANSI colours
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }

    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Parsed theme colours, looked up by slot name
#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();
        for_each_color!(&config.colors, |name: &str, value: &String| -> Result<()> {
            colors.insert(name.to_string(), parser.parse(value)?);
            Ok(())
        });
        Ok(Self { colors })
    }

    /// Color::Reset for unknown names
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
