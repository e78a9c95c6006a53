//! Configuration storage and platform paths.

pub mod config;
pub mod paths;

pub use config::{
    CatalogConfig, Config, ConfigSource, ConfigSources, ENV_CATALOG, ENV_CONCURRENCY, ENV_CONFIG,
    ENV_FORMAT, ENV_NO_COLOR, ENV_NO_COLOR_STD, ENV_PRETTY, ENV_TIMEOUT, GeneralConfig,
    OutputConfig, PluginConfig, ResolvedConfig,
};
pub use paths::AppPaths;
