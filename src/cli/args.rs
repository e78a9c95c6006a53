//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::{CostError, Result};

/// Cloud cost resolution and aggregation.
#[derive(Parser, Debug)]
#[command(name = "cloudcost")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format [default: table]
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Log every source call at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Projected monthly and hourly cost of each resource
    Projected(ProjectedArgs),

    /// Actual cost of each resource over a date window
    Actual(ActualArgs),

    /// Cost optimization recommendations
    Recommendations(RecommendationsArgs),

    /// Check filter expressions without running a query
    ValidateFilter(ValidateFilterArgs),
}

/// Where resources come from and which sources price them.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON file holding an array of resource descriptors
    #[arg(long, short = 'r', value_name = "FILE")]
    pub resources: PathBuf,

    /// Resource filter `key=value` (repeatable, combined with AND)
    #[arg(long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Local pricing catalog (JSON)
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Remote plugin `NAME=URL` (repeatable)
    #[arg(long = "plugin", value_name = "NAME=URL", value_parser = parse_plugin_spec)]
    pub plugins: Vec<PluginSpec>,

    /// Per-source timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Maximum concurrent source calls (0 = CPU count)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Arguments for the `projected` command.
#[derive(Args, Debug, Clone)]
pub struct ProjectedArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Group rows by resource, type, or provider
    #[arg(long, value_name = "DIMENSION")]
    pub group_by: Option<String>,

    /// Show totals by provider, service, and adapter instead of rows
    #[arg(long, conflicts_with = "group_by")]
    pub summary: bool,
}

/// Arguments for the `actual` command.
#[derive(Args, Debug, Clone)]
pub struct ActualArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Window start (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "DATE")]
    pub from: String,

    /// Window end, exclusive [default: now]
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Bucket by daily or monthly period, or group by resource, type, provider
    #[arg(long, value_name = "DIMENSION")]
    pub group_by: Option<String>,
}

/// Arguments for the `recommendations` command.
#[derive(Args, Debug, Clone)]
pub struct RecommendationsArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
}

/// Arguments for the `validate-filter` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateFilterArgs {
    /// Filter expressions to check
    #[arg(required = true, value_name = "EXPR")]
    pub expressions: Vec<String>,
}

/// A plugin given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    pub name: String,
    pub url: String,
}

/// Parse `NAME=URL`.
///
/// # Errors
///
/// Returns a message when either side is empty.
pub fn parse_plugin_spec(s: &str) -> std::result::Result<PluginSpec, String> {
    let (name, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got '{s}'"))?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return Err(format!("expected NAME=URL, got '{s}'"));
    }
    Ok(PluginSpec {
        name: name.to_string(),
        url: url.to_string(),
    })
}

impl Commands {
    /// Name used in the JSON envelope.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Projected(_) => "projected",
            Self::Actual(_) => "actual",
            Self::Recommendations(_) => "recommendations",
            Self::ValidateFilter(_) => "validate-filter",
        }
    }

    /// Source arguments of commands that query sources.
    #[must_use]
    pub const fn source_args(&self) -> Option<&SourceArgs> {
        match self {
            Self::Projected(args) => Some(&args.sources),
            Self::Actual(args) => Some(&args.sources),
            Self::Recommendations(args) => Some(&args.sources),
            Self::ValidateFilter(_) => None,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned table
    #[default]
    Table,
    /// JSON envelope
    Json,
    /// One JSON object per line
    Ndjson,
}

impl OutputFormat {
    /// Parse a config or environment value (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`CostError::Config`] for an unknown format.
    pub fn from_arg(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            _ => Err(CostError::Config(format!(
                "Invalid format '{s}'. Valid formats: table, json, ndjson"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }

    /// Whether output is machine-readable.
    #[must_use]
    pub const fn is_robot(self) -> bool {
        matches!(self, Self::Json | Self::Ndjson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_actual_command() {
        let cli = Cli::try_parse_from([
            "cloudcost",
            "actual",
            "--resources",
            "plan.json",
            "--from",
            "2024-01-01",
            "--group-by",
            "daily",
            "--plugin",
            "aws=http://localhost:9000",
            "--filter",
            "provider=aws",
            "--filter",
            "tag:env=prod",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Actual(args) = &cli.command else {
            panic!("expected actual command");
        };
        assert_eq!(args.from, "2024-01-01");
        assert_eq!(args.group_by.as_deref(), Some("daily"));
        assert_eq!(args.sources.filters.len(), 2);
        assert_eq!(args.sources.plugins[0].name, "aws");
        assert_eq!(cli.command.name(), "actual");
    }

    #[test]
    fn plugin_spec_requires_both_sides() {
        assert!(parse_plugin_spec("aws=http://x").is_ok());
        assert!(parse_plugin_spec("aws").is_err());
        assert!(parse_plugin_spec("=http://x").is_err());
        assert!(parse_plugin_spec("aws=").is_err());
    }

    #[test]
    fn summary_conflicts_with_group_by() {
        let result = Cli::try_parse_from([
            "cloudcost",
            "projected",
            "-r",
            "plan.json",
            "--summary",
            "--group-by",
            "type",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn output_format_from_arg() {
        assert_eq!(OutputFormat::from_arg("NDJSON").unwrap(), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::from_arg("jsonl").unwrap(), OutputFormat::Ndjson);
        assert!(OutputFormat::from_arg("md").is_err());
        assert!(OutputFormat::Json.is_robot());
        assert!(!OutputFormat::Table.is_robot());
    }
}
