//! `actual` command implementation.

use chrono::Utc;

use crate::cli::args::ActualArgs;
use crate::cli::sources::{build_dispatcher, cancel_on_ctrl_c, emit, render_options, select_resources};
use crate::core::aggregate::aggregate_cross_provider;
use crate::core::group_by::{GroupBy, group_results};
use crate::core::period::parse_date;
use crate::error::{CostError, Result};
use crate::render;
use crate::storage::ResolvedConfig;

const COMMAND: &str = "actual";

/// Execute the actual command.
///
/// `daily` and `monthly` bucket the rows by calendar period across providers;
/// other dimensions group rows. Aggregation failures are command errors.
pub async fn execute(args: &ActualArgs, config: &ResolvedConfig) -> Result<()> {
    let from = parse_date(&args.from)?;
    let to = args.to.as_deref().map(parse_date).transpose()?.unwrap_or_else(Utc::now);
    if to <= from {
        return Err(CostError::ConfigInvalid {
            key: "--to".to_string(),
            value: to.to_rfc3339(),
            message: "window end must be after --from".to_string(),
        });
    }

    let group_by = args
        .group_by
        .as_deref()
        .map(GroupBy::from_arg)
        .transpose()?;

    let resources = select_resources(&args.sources)?;
    let dispatcher = build_dispatcher(config)?;

    tracing::debug!(
        resources = resources.len(),
        %from,
        %to,
        ?group_by,
        "Starting actual cost resolution"
    );

    let result = dispatcher
        .resolve_actual_cost_with_cancel(&resources, from, to, &cancel_on_ctrl_c())
        .await;
    if result.has_errors() {
        tracing::warn!("{}", result.error_summary().trim_end());
    }

    let opts = render_options(config);
    let output = match group_by {
        Some(g) if g.is_time_based() => {
            let buckets = aggregate_cross_provider(&result.results, g)?;
            render::render_aggregations(COMMAND, &buckets, &result.errors, opts)?
        }
        Some(g) if g != GroupBy::None => {
            let groups = group_results(&result.results, g)?;
            render::render_groups(COMMAND, &groups, &result.errors, opts)?
        }
        _ => render::render_costs(COMMAND, &result, true, opts)?,
    };

    emit(&output)
}
