//! Cost resolution engine: sources, dispatch, filtering, and aggregation.

pub mod aggregate;
pub mod catalog;
pub mod dispatch;
pub mod filter;
pub mod group_by;
pub mod logging;
pub mod models;
pub mod period;
pub mod plugin;
pub mod source;

pub use aggregate::{
    AggregatedResults, CrossProviderAggregation, Summary, aggregate_cross_provider, summarize,
};
pub use catalog::{CatalogEntry, LocalCatalog, LocalCatalogSource};
pub use dispatch::Dispatcher;
pub use filter::{
    FilterCheck, FilterKey, ResourceFilter, apply_filters, check_filters, filter_resources,
    validate_filter,
};
pub use group_by::{GroupBy, ResultGroup, group_results};
pub use models::{
    ActionType, CostResult, CostResultWithErrors, Recommendation, RecommendationsResult,
    ResourceDescriptor, ResourceError, RobotOutput,
};
pub use plugin::HttpPluginSource;
pub use source::{CostQuery, CostSource, NoneFallback, SourceKind};
