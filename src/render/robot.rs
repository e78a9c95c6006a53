//! Robot-mode output (JSON envelope and NDJSON).
//!
//! Provides stable, line-oriented output for scripts and agents.

use serde::Serialize;

use crate::core::models::{ResourceError, RobotOutput};
use crate::error::Result;

/// Render any value as JSON.
pub fn render_json<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Render any value as pretty JSON.
pub fn render_json_pretty<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}

/// Wrap `data` in the versioned envelope and serialize it.
pub fn render_envelope<T: Serialize>(
    command: &str,
    data: T,
    errors: &[ResourceError],
    pretty: bool,
) -> Result<String> {
    let output = RobotOutput::new(command, data, errors.to_vec());
    if pretty {
        render_json_pretty(&output)
    } else {
        render_json(&output)
    }
}

/// One NDJSON line: the item's fields plus a `kind` tag.
#[derive(Serialize)]
struct Line<'a, T> {
    kind: &'static str,
    #[serde(flatten)]
    item: &'a T,
}

/// Render items one JSON object per line, then one line per error.
///
/// Items must serialize to JSON objects.
pub fn render_ndjson<T: Serialize>(
    kind: &'static str,
    items: &[T],
    errors: &[ResourceError],
) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(&Line { kind, item })?);
        out.push('\n');
    }
    for error in errors {
        out.push_str(&serde_json::to_string(&Line {
            kind: "error",
            item: error,
        })?);
        out.push('\n');
    }
    Ok(out)
}
