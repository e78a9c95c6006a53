//! `recommendations` command implementation.

use crate::cli::args::RecommendationsArgs;
use crate::cli::sources::{build_dispatcher, cancel_on_ctrl_c, emit, render_options, select_resources};
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the recommendations command.
pub async fn execute(args: &RecommendationsArgs, config: &ResolvedConfig) -> Result<()> {
    let resources = select_resources(&args.sources)?;
    let dispatcher = build_dispatcher(config)?;

    if dispatcher.remote_sources().is_empty() {
        tracing::info!("No plugins configured; nothing can produce recommendations");
    }

    let result = dispatcher
        .resolve_recommendations_with_cancel(&resources, &cancel_on_ctrl_c())
        .await;
    if result.has_errors() {
        tracing::warn!("{}", result.error_summary().trim_end());
    }

    let output = render::render_recommendations("recommendations", &result, render_options(config))?;
    emit(&output)
}
