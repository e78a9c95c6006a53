//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/cloudcost/config.toml`
//! - macOS: `~/Library/Application Support/dev.cloudcost.cloudcost/config.toml`
//! - Windows: `%APPDATA%/cloudcost/config/config.toml`
//!
//! ```toml
//! [general]
//! timeout_seconds = 30
//! concurrency = 0          # 0 = one call per CPU
//!
//! [catalog]
//! path = "/etc/cloudcost/catalog.json"
//!
//! [[plugins]]
//! name = "aws-public"
//! url = "http://localhost:9000"
//! timeout_seconds = 10
//!
//! [output]
//! format = "table"
//! ```
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `CLOUDCOST_FORMAT`: Output format (table, json, ndjson)
//! - `CLOUDCOST_TIMEOUT`: Per-source timeout in seconds
//! - `CLOUDCOST_CONCURRENCY`: Maximum concurrent source calls
//! - `CLOUDCOST_CATALOG`: Local pricing catalog path
//! - `CLOUDCOST_NO_COLOR` or `NO_COLOR`: Disable colors (1, true, yes)
//! - `CLOUDCOST_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `CLOUDCOST_CONFIG`: Override config file path

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat, SourceArgs};
use crate::core::dispatch::default_concurrency;
use crate::error::{CostError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for output format.
pub const ENV_FORMAT: &str = "CLOUDCOST_FORMAT";
/// Environment variable for timeout in seconds.
pub const ENV_TIMEOUT: &str = "CLOUDCOST_TIMEOUT";
/// Environment variable for concurrent source calls.
pub const ENV_CONCURRENCY: &str = "CLOUDCOST_CONCURRENCY";
/// Environment variable for the catalog path.
pub const ENV_CATALOG: &str = "CLOUDCOST_CATALOG";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "CLOUDCOST_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "CLOUDCOST_PRETTY";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "CLOUDCOST_CONFIG";

/// Accepted range for timeouts, in seconds.
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Output format.
    pub format: OutputFormat,
    /// Default per-source timeout.
    pub timeout: Duration,
    /// Maximum concurrent source calls.
    pub concurrency: usize,
    /// Local pricing catalog, if any.
    pub catalog: Option<PathBuf>,
    /// Enabled remote plugins, in query order.
    pub plugins: Vec<PluginConfig>,
    /// Whether to disable colored output.
    pub no_color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub format: ConfigSource,
    pub timeout: ConfigSource,
    pub concurrency: ConfigSource,
    pub catalog: ConfigSource,
    pub no_color: ConfigSource,
    pub pretty: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// `source_args` is present for commands that query cost sources.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but is invalid
    /// - Any resolved value is invalid (e.g., unknown format, timeout out of range)
    pub fn resolve(cli: &Cli, source_args: Option<&SourceArgs>) -> Result<Self> {
        let config = Config::load_active()?;
        config.validate()?;

        let mut sources = ConfigSources::default();

        let format = Self::resolve_format(cli, &config, &mut sources.format)?;
        let timeout = Self::resolve_timeout(source_args, &config, &mut sources.timeout)?;
        let concurrency =
            Self::resolve_concurrency(source_args, &config, &mut sources.concurrency);
        let catalog = Self::resolve_catalog(source_args, &config, &mut sources.catalog);
        let plugins = Self::resolve_plugins(source_args, &config);
        let no_color = Self::resolve_no_color(cli, &config, &mut sources.no_color);
        let pretty = Self::resolve_pretty(cli, &config, &mut sources.pretty);

        tracing::debug!(
            format = format.as_str(),
            timeout_secs = timeout.as_secs(),
            concurrency,
            plugins = plugins.len(),
            catalog = ?catalog,
            "Resolved configuration"
        );

        Ok(Self {
            format,
            timeout,
            concurrency,
            catalog,
            plugins,
            no_color,
            pretty,
            sources,
        })
    }

    /// Resolve output format setting.
    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        // 1. CLI --json flag (shorthand), then --format
        if cli.json {
            *source = ConfigSource::Cli;
            return Ok(OutputFormat::Json);
        }
        if let Some(format) = cli.format {
            *source = ConfigSource::Cli;
            return Ok(format);
        }

        // 2. Environment variable
        if let Ok(format_env) = std::env::var(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return OutputFormat::from_arg(&format_env);
        }

        // 3. Config file
        if let Some(ref format_str) = config.output.format {
            *source = ConfigSource::ConfigFile;
            return OutputFormat::from_arg(format_str);
        }

        // 4. Default
        *source = ConfigSource::Default;
        Ok(OutputFormat::Table)
    }

    /// Resolve timeout setting.
    fn resolve_timeout(
        source_args: Option<&SourceArgs>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<Duration> {
        // 1. CLI --timeout flag
        if let Some(timeout) = source_args.and_then(|args| args.timeout) {
            *source = ConfigSource::Cli;
            return check_timeout("--timeout", timeout).map(Duration::from_secs);
        }

        // 2. Environment variable
        if let Ok(timeout_env) = std::env::var(ENV_TIMEOUT)
            && let Ok(timeout) = timeout_env.trim().parse::<u64>()
        {
            *source = ConfigSource::Env;
            return check_timeout(ENV_TIMEOUT, timeout).map(Duration::from_secs);
        }

        // 3. Config file (defaults to 30s when absent)
        *source = ConfigSource::ConfigFile;
        Ok(Duration::from_secs(config.general.timeout_seconds))
    }

    /// Resolve concurrency setting; zero means one call per CPU.
    fn resolve_concurrency(
        source_args: Option<&SourceArgs>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> usize {
        let requested = if let Some(n) = source_args.and_then(|args| args.concurrency) {
            *source = ConfigSource::Cli;
            n
        } else if let Some(n) = std::env::var(ENV_CONCURRENCY)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            *source = ConfigSource::Env;
            n
        } else if config.general.concurrency > 0 {
            *source = ConfigSource::ConfigFile;
            config.general.concurrency
        } else {
            *source = ConfigSource::Default;
            0
        };

        if requested == 0 {
            default_concurrency()
        } else {
            requested
        }
    }

    /// Resolve the catalog path.
    fn resolve_catalog(
        source_args: Option<&SourceArgs>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Option<PathBuf> {
        if let Some(path) = source_args.and_then(|args| args.catalog.clone()) {
            *source = ConfigSource::Cli;
            return Some(path);
        }

        if let Ok(path) = std::env::var(ENV_CATALOG)
            && !path.trim().is_empty()
        {
            *source = ConfigSource::Env;
            return Some(PathBuf::from(path.trim()));
        }

        if let Some(path) = config.catalog.path.clone() {
            *source = ConfigSource::ConfigFile;
            return Some(path);
        }

        *source = ConfigSource::Default;
        None
    }

    /// Enabled config-file plugins, then CLI plugins.
    ///
    /// A CLI plugin replaces a config-file plugin of the same name in place.
    fn resolve_plugins(source_args: Option<&SourceArgs>, config: &Config) -> Vec<PluginConfig> {
        let mut plugins: Vec<PluginConfig> = config
            .plugins
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect();

        for spec in source_args.map_or(&[][..], |args| args.plugins.as_slice()) {
            let plugin = PluginConfig {
                name: spec.name.clone(),
                url: spec.url.clone(),
                timeout_seconds: None,
                enabled: true,
            };
            match plugins.iter_mut().find(|p| p.name == spec.name) {
                Some(existing) => *existing = plugin,
                None => plugins.push(plugin),
            }
        }

        plugins
    }

    /// Resolve `no_color` setting.
    fn resolve_no_color(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        // 1. CLI --no-color flag
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        // 2. Environment variable (CLOUDCOST_NO_COLOR or standard NO_COLOR)
        if Self::is_env_truthy(ENV_NO_COLOR) || std::env::var(ENV_NO_COLOR_STD).is_ok() {
            *source = ConfigSource::Env;
            return true;
        }

        // 3. Config file (inverted: config.output.color = false means no_color = true)
        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        // 4. Default
        *source = ConfigSource::Default;
        false
    }

    /// Resolve pretty setting.
    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        // 1. CLI --pretty flag
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }

        // 2. Environment variable
        if Self::is_env_truthy(ENV_PRETTY) {
            *source = ConfigSource::Env;
            return true;
        }

        // 3. Config file
        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        // 4. Default
        *source = ConfigSource::Default;
        false
    }

    /// Check if an environment variable is set to a truthy value.
    fn is_env_truthy(var: &str) -> bool {
        std::env::var(var)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

fn check_timeout(key: &str, seconds: u64) -> Result<u64> {
    if TIMEOUT_RANGE.contains(&seconds) {
        Ok(seconds)
    } else {
        Err(CostError::ConfigInvalid {
            key: key.to_string(),
            value: seconds.to_string(),
            message: "Timeout must be between 1 and 300 seconds".to_string(),
        })
    }
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Local pricing catalog.
    pub catalog: CatalogConfig,
    /// Remote cost plugins, queried in this order.
    pub plugins: Vec<PluginConfig>,
    /// Output settings.
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default per-source timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum concurrent source calls; 0 = CPU count.
    pub concurrency: usize,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Local catalog settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// One remote plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Adapter name stamped on this plugin's rows.
    pub name: String,
    /// Base URL (http or https).
    pub url: String,
    /// Overrides the general timeout for this plugin.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl PluginConfig {
    /// Timeout for this plugin, falling back to `default`.
    #[must_use]
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_seconds.map_or(default, Duration::from_secs)
    }
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (table, json, ndjson).
    pub format: Option<String>,
    /// Whether to use colors in output.
    pub color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            concurrency: 0,
            log_level: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load the config file, respecting the `CLOUDCOST_CONFIG` override.
    pub fn load_active() -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            Self::load_from(Path::new(&path))
        } else {
            Self::load()
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CostError::Config(format!("Invalid config file: {e}")))?;

        Ok(config)
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Output format is valid (table, json, ndjson)
    /// - Timeouts are within reasonable bounds (1-300 seconds)
    /// - Plugin names are non-empty and unique
    /// - Plugin URLs are http(s)
    pub fn validate(&self) -> Result<()> {
        if let Some(format) = &self.output.format {
            OutputFormat::from_arg(format).map_err(|_| {
                CostError::Config(format!(
                    "Invalid format \"{format}\". Valid formats: table, json, ndjson"
                ))
            })?;
        }

        if !TIMEOUT_RANGE.contains(&self.general.timeout_seconds) {
            return Err(CostError::Config(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for plugin in &self.plugins {
            if plugin.name.trim().is_empty() {
                return Err(CostError::Config("Plugin name must not be empty".to_string()));
            }
            if !seen.insert(plugin.name.as_str()) {
                return Err(CostError::Config(format!(
                    "Duplicate plugin name \"{}\"",
                    plugin.name
                )));
            }
            if !(plugin.url.starts_with("http://") || plugin.url.starts_with("https://")) {
                return Err(CostError::ConfigInvalid {
                    key: format!("plugins.{}.url", plugin.name),
                    value: plugin.url.clone(),
                    message: "Plugin URL must start with http:// or https://".to_string(),
                });
            }
            if let Some(timeout) = plugin.timeout_seconds {
                check_timeout(&format!("plugins.{}.timeout_seconds", plugin.name), timeout)?;
            }
        }

        Ok(())
    }
}
