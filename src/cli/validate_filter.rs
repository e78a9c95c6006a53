//! `validate-filter` command implementation.

use crate::cli::args::ValidateFilterArgs;
use crate::cli::sources::{emit, render_options};
use crate::core::filter::{check_filters, validate_filter};
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Execute the validate-filter command.
///
/// Every expression is reported; the command fails with the first
/// invalid expression's error after printing the report.
pub fn execute(args: &ValidateFilterArgs, config: &ResolvedConfig) -> Result<()> {
    let checks = check_filters(&args.expressions);
    let output = render::render_filter_checks("validate-filter", &checks, render_options(config))?;
    emit(&output)?;

    checks
        .iter()
        .filter(|c| !c.valid)
        .try_for_each(|c| validate_filter(&c.expression))
}
