//! Short, user-facing messages for load and compute failures.
//!
//! Matches on PolarsError variants and io::ErrorKind instead of parsing
//! error strings.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// One-line message for a PolarsError raised while reading or aggregating.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. The dataset must contain every order column.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Out of bounds: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        _ => err.to_string(),
    }
}

/// One-line message for an io::Error, optionally followed by `context`.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => {
            "Unexpected end of file. The file may be truncated.".to_string()
        }
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => {
            let msg = err.to_string();
            if msg.contains("No space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            msg
        }
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Walk the cause chain of `report` for a polars or io error; otherwise use
/// the report's first line. `path` prefixes the message when given.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let message = report
        .chain()
        .find_map(|cause| {
            if let Some(pe) = cause.downcast_ref::<PolarsError>() {
                Some(user_message_from_polars(pe))
            } else {
                cause
                    .downcast_ref::<io::Error>()
                    .map(|io_err| user_message_from_io(io_err, None))
            }
        })
        .unwrap_or_else(|| {
            report
                .to_string()
                .lines()
                .next()
                .map(str::trim)
                .unwrap_or("An error occurred")
                .to_string()
        });

    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), message),
        None => message,
    }
}

/// Drop polars' hints that refer to its own API.
fn simplify_compute_message(msg: &str) -> String {
    let first = msg.lines().next().unwrap_or(msg).trim();
    match first.find("; try ") {
        Some(idx) => first[..idx].to_string(),
        None => first.to_string(),
    }
}
