//! cloudcost - Cloud cost resolution and aggregation
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use cloudcost::cli::{Cli, Commands, OutputFormat};
use cloudcost::core::logging;
use cloudcost::storage::{Config, ResolvedConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_level = Config::load_active()
        .ok()
        .and_then(|config| config.general.log_level);
    logging::init(&logging::LogSettings::resolve(
        cli.log_level.as_deref(),
        config_level.as_deref(),
        cli.json_output,
        cli.verbose,
    ));

    let config = match ResolvedConfig::resolve(&cli, cli.command.source_args()) {
        Ok(config) => config,
        Err(e) => {
            let format = if cli.json {
                OutputFormat::Json
            } else {
                cli.format.unwrap_or_default()
            };
            return fail(&e, format, cli.no_color, cli.pretty);
        }
    };

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, config.format, config.no_color, config.pretty),
    }
}

fn fail(error: &cloudcost::CostError, format: OutputFormat, no_color: bool, pretty: bool) -> ExitCode {
    tracing::error!(error_code = error.error_code(), "{}", error);
    let output = cloudcost::render::error::render_error(error, format, no_color, pretty);
    eprintln!("{output}");
    ExitCode::from(error.exit_code() as u8)
}

async fn run(cli: &Cli, config: &ResolvedConfig) -> cloudcost::Result<()> {
    match &cli.command {
        Commands::Projected(args) => cloudcost::cli::projected::execute(args, config).await,
        Commands::Actual(args) => cloudcost::cli::actual::execute(args, config).await,
        Commands::Recommendations(args) => {
            cloudcost::cli::recommendations::execute(args, config).await
        }
        Commands::ValidateFilter(args) => cloudcost::cli::validate_filter::execute(args, config),
    }
}
