//! Output rendering for table and robot modes.

pub mod error;
pub mod robot;
pub mod table;

use colored::Colorize;

use crate::cli::args::OutputFormat;
use crate::core::aggregate::{AggregatedResults, CrossProviderAggregation};
use crate::core::filter::FilterCheck;
use crate::core::group_by::ResultGroup;
use crate::core::models::{CostResultWithErrors, RecommendationsResult, ResourceError};
use crate::error::Result;

/// How to render a command's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub color: bool,
}

/// Render per-row cost results.
pub fn render_costs(
    command: &str,
    result: &CostResultWithErrors,
    actual: bool,
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => Ok(table::render_costs(result, actual, opts.color)),
        OutputFormat::Json => {
            robot::render_envelope(command, &result.results, &result.errors, opts.pretty)
        }
        OutputFormat::Ndjson => robot::render_ndjson("cost", &result.results, &result.errors),
    }
}

/// Render grouped results.
pub fn render_groups(
    command: &str,
    groups: &[ResultGroup],
    errors: &[ResourceError],
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => Ok(table::render_groups(groups, errors, opts.color)),
        OutputFormat::Json => robot::render_envelope(command, groups, errors, opts.pretty),
        OutputFormat::Ndjson => robot::render_ndjson("group", groups, errors),
    }
}

/// Render a summary rollup.
pub fn render_summary(
    command: &str,
    aggregated: &AggregatedResults,
    errors: &[ResourceError],
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => Ok(table::render_summary(aggregated, errors, opts.color)),
        OutputFormat::Json => robot::render_envelope(command, aggregated, errors, opts.pretty),
        OutputFormat::Ndjson => {
            robot::render_ndjson("summary", std::slice::from_ref(&aggregated.summary), errors)
        }
    }
}

/// Render cross-provider calendar buckets.
pub fn render_aggregations(
    command: &str,
    buckets: &[CrossProviderAggregation],
    errors: &[ResourceError],
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => Ok(table::render_aggregations(buckets, errors, opts.color)),
        OutputFormat::Json => robot::render_envelope(command, buckets, errors, opts.pretty),
        OutputFormat::Ndjson => robot::render_ndjson("period", buckets, errors),
    }
}

/// Render recommendations.
pub fn render_recommendations(
    command: &str,
    result: &RecommendationsResult,
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => Ok(table::render_recommendations(result, opts.color)),
        OutputFormat::Json => robot::render_envelope(
            command,
            &result.recommendations,
            &result.errors,
            opts.pretty,
        ),
        OutputFormat::Ndjson => {
            robot::render_ndjson("recommendation", &result.recommendations, &result.errors)
        }
    }
}

/// Render filter expression checks.
pub fn render_filter_checks(
    command: &str,
    checks: &[FilterCheck],
    opts: RenderOptions,
) -> Result<String> {
    match opts.format {
        OutputFormat::Table => {
            let mut out = String::new();
            for check in checks {
                let status = match (check.valid, opts.color) {
                    (true, true) => "ok".green().to_string(),
                    (true, false) => "ok".to_string(),
                    (false, true) => "invalid".red().to_string(),
                    (false, false) => "invalid".to_string(),
                };
                out.push_str(&format!("{status:<7}  {}", check.expression));
                if let Some(error) = &check.error {
                    out.push_str(&format!("  ({error})"));
                }
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => robot::render_envelope(command, checks, &[], opts.pretty),
        OutputFormat::Ndjson => robot::render_ndjson("filter", checks, &[]),
    }
}
