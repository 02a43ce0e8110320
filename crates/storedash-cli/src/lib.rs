//! Shared CLI definitions for storedash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Compression format for the dataset file
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz)
    Gzip,
    /// Zstandard compression (.zst)
    Zstd,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// XZ compression (.xz)
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext.to_lowercase().as_str() {
            "gz" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Parse the name used in the config file ("gzip", "zstd", "bzip2", "xz").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gzip" | "gz" => Some(Self::Gzip),
            "zstd" | "zst" => Some(Self::Zstd),
            "bzip2" | "bz2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Command-line arguments for storedash
#[derive(Clone, Parser, Debug)]
#[command(
    name = "storedash",
    version,
    about = "E-commerce Sales Dashboard in the Terminal",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the order dataset (CSV). Falls back to [dataset] path in the config file
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// First day of the date range, inclusive (YYYY-MM-DD). Default: first purchase day in the data
    #[arg(long = "start", value_name = "DATE")]
    pub start: Option<String>,

    /// Last day of the date range, inclusive (YYYY-MM-DD). Default: last purchase day in the data
    #[arg(long = "end", value_name = "DATE")]
    pub end: Option<String>,

    /// Print the dashboard for the selected range to stdout and exit
    #[arg(long = "report", action)]
    pub report: bool,

    /// With --report, print JSON instead of text tables
    #[arg(long = "json", requires = "report", action)]
    pub json: bool,

    /// Write PNG charts for the selected range into DIR and exit
    #[arg(long = "export-charts", value_name = "DIR")]
    pub export_charts: Option<PathBuf>,

    /// Fill days without orders with zero rows in the daily orders table
    #[arg(long = "dense-daily", action)]
    pub dense_daily: bool,

    /// Number of rows in top/bottom views (default: 5)
    #[arg(long = "top-n", value_name = "N")]
    pub top_n: Option<usize>,

    /// Currency code used when formatting money (default: AUD)
    #[arg(long = "currency", value_name = "CODE")]
    pub currency: Option<String>,

    /// Locale used when formatting money (es_CO, en_US, en_AU, pt_BR, id_ID, de_DE; default: es_CO)
    #[arg(long = "locale", value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Field delimiter of the dataset file (default: ',')
    #[arg(long = "delimiter")]
    pub delimiter: Option<char>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz).
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write log output to this file (level from RUST_LOG, default: info)
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Generate default configuration file at ~/.config/storedash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    out.push_str(&cmd.render_usage().to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
