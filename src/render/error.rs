//! Error rendering for cloudcost.
//!
//! Terminal errors go to stderr as a short colored line; robot formats get
//! a structured JSON object instead.

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::error::CostError;

// =============================================================================
// Public API
// =============================================================================

/// Render an error for the given output format.
///
/// Color is used only for table output when `no_color` is unset and
/// stderr is a TTY.
#[must_use]
pub fn render_error(error: &CostError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    if format.is_robot() {
        return render_error_json(error, pretty);
    }

    let use_color =
        crate::util::env::should_use_color(no_color) && crate::util::env::stderr_is_tty();
    if use_color {
        render_colored(error)
    } else {
        render_simple(error)
    }
}

/// Render error as structured JSON for machine consumption.
#[must_use]
pub fn render_error_json(error: &CostError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Text Rendering
// =============================================================================

fn render_colored(error: &CostError) -> String {
    format!(
        "{} {}",
        format!("Error [{}]:", error.error_code()).red().bold(),
        error
    )
}

fn render_simple(error: &CostError) -> String {
    format!("Error [{}]: {}", error.error_code(), error)
}

// =============================================================================
// JSON Rendering
// =============================================================================

#[derive(serde::Serialize)]
struct ErrorJson {
    error_code: String,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &CostError) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            source: error.source_name().map(String::from),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
