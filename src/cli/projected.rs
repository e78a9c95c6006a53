//! `projected` command implementation.

use crate::cli::args::ProjectedArgs;
use crate::cli::sources::{build_dispatcher, cancel_on_ctrl_c, emit, render_options, select_resources};
use crate::core::aggregate::summarize;
use crate::core::group_by::{GroupBy, group_results};
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

const COMMAND: &str = "projected";

/// Execute the projected command.
///
/// Source failures land in the output's error section and do not fail the command.
pub async fn execute(args: &ProjectedArgs, config: &ResolvedConfig) -> Result<()> {
    let group_by = args
        .group_by
        .as_deref()
        .map(GroupBy::from_arg)
        .transpose()?;

    let resources = select_resources(&args.sources)?;
    let dispatcher = build_dispatcher(config)?;

    tracing::debug!(
        resources = resources.len(),
        plugins = dispatcher.remote_sources().len(),
        ?group_by,
        summary = args.summary,
        "Starting projected cost resolution"
    );

    let result = dispatcher
        .resolve_projected_cost_with_cancel(&resources, &cancel_on_ctrl_c())
        .await;
    if result.has_errors() {
        tracing::warn!("{}", result.error_summary().trim_end());
    }

    let opts = render_options(config);
    let output = if args.summary {
        render::render_summary(COMMAND, &summarize(&result.results), &result.errors, opts)?
    } else if let Some(group_by) = group_by.filter(|g| *g != GroupBy::None) {
        let groups = group_results(&result.results, group_by)?;
        render::render_groups(COMMAND, &groups, &result.errors, opts)?
    } else {
        render::render_costs(COMMAND, &result, false, opts)?
    };

    emit(&output)
}
