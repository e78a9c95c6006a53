//! Diagnostic logging for cost resolution.
//!
//! Events go to stderr, or to `CLOUDCOST_LOG_FILE`, never to stdout. Each
//! source call runs inside a `source_call` span carrying `resource_id` and
//! `adapter`; JSON logs attach that span to every event and report its
//! timing when the call completes.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const ENV_LOG_LEVEL: &str = "CLOUDCOST_LOG";
pub const ENV_LOG_FORMAT: &str = "CLOUDCOST_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "CLOUDCOST_LOG_FILE";

/// Targets emitting per-source call diagnostics.
const SOURCE_TARGETS: [&str; 2] = ["cloudcost::core::dispatch", "cloudcost::core::plugin"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field lines without timestamps.
    #[default]
    Human,
    /// Single terse line per event, with target.
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" => Ok(Self::Human),
            "compact" => Ok(Self::Compact),
            "json" | "jsonl" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Parse a level name, accepting `warning` and `verbose` as aliases.
#[must_use]
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "warning" => Some(LevelFilter::WARN),
        "verbose" => Some(LevelFilter::DEBUG),
        other => LevelFilter::from_str(other).ok(),
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Where, how, and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    /// Log every source call at `debug`, whatever `level` says.
    pub trace_sources: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::ERROR,
            format: LogFormat::Human,
            file: None,
            trace_sources: false,
        }
    }
}

impl LogSettings {
    /// Resolve settings from flags, environment, and the config file's level.
    ///
    /// The level comes from the first of `--log-level`, `CLOUDCOST_LOG`, and
    /// the config file that parses; otherwise `error`. `--json-output` wins
    /// over `CLOUDCOST_LOG_FORMAT`.
    #[must_use]
    pub fn resolve(
        cli_level: Option<&str>,
        config_level: Option<&str>,
        json_output: bool,
        verbose: bool,
    ) -> Self {
        let env_level = env_value(ENV_LOG_LEVEL);
        let level = [cli_level, env_level.as_deref(), config_level]
            .into_iter()
            .flatten()
            .find_map(parse_level)
            .unwrap_or(LevelFilter::ERROR);

        let format = if json_output {
            LogFormat::Json
        } else {
            env_value(ENV_LOG_FORMAT)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default()
        };

        Self {
            level,
            format,
            file: env_value(ENV_LOG_FILE).map(PathBuf::from),
            trace_sources: verbose,
        }
    }

    /// Filter directives applied when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(&self) -> String {
        let mut directives = vec![format!(
            "cloudcost={}",
            self.level.to_string().to_ascii_lowercase()
        )];
        if self.trace_sources && self.level < LevelFilter::DEBUG {
            directives.extend(SOURCE_TARGETS.iter().map(|target| format!("{target}=debug")));
        }
        directives.join(",")
    }

    fn writer(&self) -> BoxMakeWriter {
        let file = self
            .file
            .as_ref()
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
        match file {
            Some(file) => BoxMakeWriter::new(Mutex::new(file)),
            None => BoxMakeWriter::new(std::io::stderr),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the computed directives when set. A log file that
/// cannot be opened falls back to stderr. A second call is a no-op.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.directives()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(settings.writer());

    let installed = match settings.format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .try_init(),
        LogFormat::Compact => builder.compact().with_target(true).try_init(),
        LogFormat::Human => builder.with_target(false).without_time().try_init(),
    };
    installed.ok();
}
