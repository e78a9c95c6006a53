//! Cost dispatch across all configured sources.
//!
//! For every resource the dispatcher asks every remote source concurrently
//! and keeps every answer. Resources no remote source could price fall back
//! to the local catalog, then to a `none` placeholder, so each resource ends
//! up with at least one row.
//!
//! Every (resource, source) call is isolated: errors, timeouts, panics and
//! cancellation become [`ResourceError`] entries instead of aborting the batch.
//! Cancellation is scoped to a single resolve call; a dispatcher carries no
//! state from one call to the next.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::models::{
    CostResult, CostResultWithErrors, DEFAULT_CURRENCY, NOTE_NO_ACTUAL, NOTE_NO_PRICING,
    Recommendation, RecommendationsResult, ResourceDescriptor, ResourceError,
};
use super::source::{CostQuery, CostSource, NoneFallback};
use crate::error::{CostError, Result};

/// Default per-call timeout when a source does not set its own.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of in-flight source calls: one per CPU.
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

/// Outcome of one (resource, source) call, tagged for deterministic reassembly.
type Tagged<T> = (usize, usize, Result<T>);

/// Fans resource queries out to cost sources and merges the answers.
#[derive(Clone)]
pub struct Dispatcher {
    remote: Vec<Arc<dyn CostSource>>,
    catalog: Option<Arc<dyn CostSource>>,
    fallback: Arc<dyn CostSource>,
    default_timeout: Duration,
    concurrency: usize,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remote: Vec<&str> = self.remote.iter().map(|s| s.name()).collect();
        f.debug_struct("Dispatcher")
            .field("remote", &remote)
            .field("catalog", &self.catalog.as_ref().map(|s| s.name()))
            .field("default_timeout", &self.default_timeout)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// A dispatcher with no sources: every resource resolves to a placeholder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remote: Vec::new(),
            catalog: None,
            fallback: Arc::new(NoneFallback),
            default_timeout: DEFAULT_SOURCE_TIMEOUT,
            concurrency: default_concurrency(),
        }
    }

    /// Add a remote source. Sources are consulted, and their rows ordered, in insertion order.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn CostSource>) -> Self {
        self.remote.push(source);
        self
    }

    /// Set the local catalog tier.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CostSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Timeout for sources that do not declare their own.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Upper bound on in-flight source calls (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn remote_sources(&self) -> &[Arc<dyn CostSource>] {
        &self.remote
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Projected cost for every resource.
    pub async fn resolve_projected_cost(
        &self,
        resources: &[ResourceDescriptor],
    ) -> CostResultWithErrors {
        self.resolve_projected_cost_with_cancel(resources, &CancellationToken::new())
            .await
    }

    /// Projected cost, abandoning outstanding calls once `cancel` fires.
    pub async fn resolve_projected_cost_with_cancel(
        &self,
        resources: &[ResourceDescriptor],
        cancel: &CancellationToken,
    ) -> CostResultWithErrors {
        self.resolve_cost(resources, CostQuery::Projected, cancel)
            .await
    }

    /// Actual cost for every resource over `[from, to)`.
    pub async fn resolve_actual_cost(
        &self,
        resources: &[ResourceDescriptor],
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> CostResultWithErrors {
        self.resolve_actual_cost_with_cancel(resources, from, to, &CancellationToken::new())
            .await
    }

    /// Actual cost, abandoning outstanding calls once `cancel` fires.
    pub async fn resolve_actual_cost_with_cancel(
        &self,
        resources: &[ResourceDescriptor],
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
        cancel: &CancellationToken,
    ) -> CostResultWithErrors {
        self.resolve_cost(resources, CostQuery::Actual { from, to }, cancel)
            .await
    }

    /// Recommendations from every remote source.
    ///
    /// Only remote sources are asked; there is no fallback tier and no placeholder.
    pub async fn resolve_recommendations(
        &self,
        resources: &[ResourceDescriptor],
    ) -> RecommendationsResult {
        self.resolve_recommendations_with_cancel(resources, &CancellationToken::new())
            .await
    }

    /// Recommendations, abandoning outstanding calls once `cancel` fires.
    pub async fn resolve_recommendations_with_cancel(
        &self,
        resources: &[ResourceDescriptor],
        cancel: &CancellationToken,
    ) -> RecommendationsResult {
        let pending: Vec<(usize, &ResourceDescriptor)> = resources.iter().enumerate().collect();
        let outcomes = self
            .fan_out(&pending, &self.remote, cancel, |source, resource| {
                source.recommendations(resource)
            })
            .await;

        let mut result = RecommendationsResult::default();
        for (ri, si, outcome) in outcomes {
            let resource = &resources[ri];
            let source_name = self.remote[si].name();
            match outcome {
                Ok(recommendations) => {
                    result
                        .recommendations
                        .extend(recommendations.into_iter().map(|rec| {
                            stamp_recommendation(rec, resource, source_name)
                        }));
                }
                Err(e) => result
                    .errors
                    .push(ResourceError::new(resource, source_name, &e)),
            }
        }

        tracing::info!(
            resources = resources.len(),
            recommendations = result.recommendations.len(),
            errors = result.errors.len(),
            "Recommendations resolved"
        );
        result
    }

    async fn resolve_cost(
        &self,
        resources: &[ResourceDescriptor],
        query: CostQuery,
        cancel: &CancellationToken,
    ) -> CostResultWithErrors {
        let mut rows: Vec<Vec<CostResult>> = vec![Vec::new(); resources.len()];
        let mut errors: Vec<Vec<ResourceError>> = vec![Vec::new(); resources.len()];

        // (sources, whether a skipped call is reported)
        let tiers: [(&[Arc<dyn CostSource>], bool); 3] = [
            (&self.remote, true),
            (self.catalog.as_slice(), true),
            (std::slice::from_ref(&self.fallback), false),
        ];

        for (sources, report_skipped) in tiers {
            let pending: Vec<(usize, &ResourceDescriptor)> = resources
                .iter()
                .enumerate()
                .filter(|(ri, _)| rows[*ri].is_empty())
                .collect();
            if pending.is_empty() || sources.is_empty() {
                continue;
            }

            if cancel.is_cancelled() {
                if report_skipped {
                    for &(ri, resource) in &pending {
                        errors[ri].extend(
                            sources
                                .iter()
                                .map(|s| ResourceError::new(resource, s.name(), &CostError::Cancelled)),
                        );
                    }
                }
                continue;
            }

            let outcomes = self
                .fan_out(&pending, sources, cancel, |source, resource| {
                    source.cost(resource, query)
                })
                .await;

            for (ri, si, outcome) in outcomes {
                let resource = &resources[ri];
                let source_name = sources[si].name();
                match outcome {
                    Ok(Some(row)) => rows[ri].push(stamp_row(row, resource, source_name, query)),
                    Ok(None) => tracing::debug!(
                        resource_id = %resource.id,
                        adapter = source_name,
                        "Source does not support resource"
                    ),
                    Err(e) => errors[ri].push(ResourceError::new(resource, source_name, &e)),
                }
            }
        }

        // Every resource owns at least one row, even when the chain was cut short.
        for (ri, resource) in resources.iter().enumerate() {
            if rows[ri].is_empty() {
                rows[ri].push(placeholder(resource, query));
            }
        }

        let result = CostResultWithErrors {
            results: rows.into_iter().flatten().collect(),
            errors: errors.into_iter().flatten().collect(),
        };

        tracing::info!(
            query = query.label(),
            resources = resources.len(),
            rows = result.results.len(),
            errors = result.errors.len(),
            "Cost resolved"
        );
        result
    }

    /// Run `call` for every (resource, source) pair with bounded concurrency.
    ///
    /// Outcomes are sorted by resource index, then source index.
    async fn fan_out<'a, T, F>(
        &'a self,
        pending: &[(usize, &'a ResourceDescriptor)],
        sources: &'a [Arc<dyn CostSource>],
        cancel: &'a CancellationToken,
        call: F,
    ) -> Vec<Tagged<T>>
    where
        F: Fn(&'a dyn CostSource, &'a ResourceDescriptor) -> BoxFuture<'a, Result<T>>,
    {
        let calls = pending.iter().flat_map(|&(ri, resource)| {
            sources
                .iter()
                .enumerate()
                .map(move |(si, source)| (ri, si, resource, source.as_ref()))
        });

        let mut outcomes: Vec<Tagged<T>> = stream::iter(calls)
            .map(|(ri, si, resource, source)| {
                let future = call(source, resource);
                async move { (ri, si, self.guarded(source, resource, cancel, future).await) }
            })
            .buffer_unordered(self.concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|(ri, si, _)| (*ri, *si));
        outcomes
    }

    /// Await one source call under the timeout, panic, and cancellation guards.
    async fn guarded<T>(
        &self,
        source: &dyn CostSource,
        resource: &ResourceDescriptor,
        cancel: &CancellationToken,
        call: BoxFuture<'_, Result<T>>,
    ) -> Result<T> {
        let limit = source.timeout().unwrap_or(self.default_timeout);
        let span = tracing::debug_span!(
            "source_call",
            resource_id = %resource.id,
            adapter = source.name(),
            kind = %source.kind(),
        );

        async move {
            let start = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(CostError::Cancelled),
                finished = tokio::time::timeout(limit, AssertUnwindSafe(call).catch_unwind()) => {
                    match finished {
                        Err(_) => Err(CostError::SourceTimeout {
                            source_name: source.name().to_string(),
                            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        }),
                        Ok(Err(payload)) => Err(CostError::SourcePanicked {
                            source_name: source.name().to_string(),
                            message: panic_message(payload.as_ref()),
                        }),
                        Ok(Ok(result)) => result,
                    }
                }
            };

            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &outcome {
                Ok(_) => tracing::debug!(
                    resource_id = %resource.id,
                    adapter = source.name(),
                    duration_ms,
                    "Source call finished"
                ),
                Err(e) => tracing::warn!(
                    resource_id = %resource.id,
                    adapter = source.name(),
                    duration_ms,
                    error = %e,
                    "Source call failed"
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Tag a row with the answering source and fill identity gaps.
fn stamp_row(
    mut row: CostResult,
    resource: &ResourceDescriptor,
    source_name: &str,
    query: CostQuery,
) -> CostResult {
    source_name.clone_into(&mut row.adapter);
    if row.resource_id.is_empty() {
        row.resource_id.clone_from(&resource.id);
    }
    if row.resource_type.is_empty() {
        row.resource_type.clone_from(&resource.resource_type);
    }
    if row.currency.is_empty() {
        row.currency = DEFAULT_CURRENCY.to_string();
    }
    if let CostQuery::Actual { from, to } = query {
        let start = *row.start_date.get_or_insert(from);
        if row.end_date.is_none() && start < to {
            row.end_date = Some(to);
        }
    }
    row
}

fn stamp_recommendation(
    mut rec: Recommendation,
    resource: &ResourceDescriptor,
    source_name: &str,
) -> Recommendation {
    source_name.clone_into(&mut rec.adapter);
    if rec.resource_id.is_empty() {
        rec.resource_id.clone_from(&resource.id);
    }
    if rec.currency.is_empty() {
        rec.currency = DEFAULT_CURRENCY.to_string();
    }
    rec
}

fn placeholder(resource: &ResourceDescriptor, query: CostQuery) -> CostResult {
    match query {
        CostQuery::Projected => CostResult::placeholder(resource, NOTE_NO_PRICING),
        CostQuery::Actual { from, to } => CostResult {
            start_date: Some(from),
            end_date: Some(to),
            ..CostResult::placeholder(resource, NOTE_NO_ACTUAL)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_float_eq;
    use crate::test_utils::{MockSource, make_test_resource};
    use tracing_test::traced_test;

    fn resources() -> Vec<ResourceDescriptor> {
        vec![
            make_test_resource("vm-1", "aws:ec2/instance:Instance"),
            make_test_resource("db-1", "azure:sql:Database"),
        ]
    }

    #[test]
    fn panic_message_extraction() {
        let s: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(s.as_ref()), "static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(owned.as_ref()), "owned message");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }

    #[test]
    fn concurrency_has_floor_of_one() {
        assert_eq!(Dispatcher::new().with_concurrency(0).concurrency(), 1);
        assert!(default_concurrency() >= 1);
    }

    #[tokio::test]
    async fn no_sources_yields_placeholders() {
        let result = Dispatcher::new().resolve_projected_cost(&resources()).await;
        assert_eq!(result.results.len(), 2);
        assert!(result.results.iter().all(CostResult::is_placeholder));
        assert!(!result.has_errors());
    }

    #[tokio::test]
    async fn rows_follow_resource_then_source_order() {
        let slow = MockSource::found("slow", 5.0).with_delay(Duration::from_millis(30));
        let fast = MockSource::found("fast", 7.0);
        let dispatcher = Dispatcher::new()
            .with_source(Arc::new(slow))
            .with_source(Arc::new(fast));

        let result = dispatcher.resolve_projected_cost(&resources()).await;
        let order: Vec<(&str, &str)> = result
            .results
            .iter()
            .map(|r| (r.resource_id.as_str(), r.adapter.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("vm-1", "slow"),
                ("vm-1", "fast"),
                ("db-1", "slow"),
                ("db-1", "fast"),
            ]
        );
    }

    #[tokio::test]
    async fn actual_rows_without_dates_get_the_window() {
        let from = crate::core::period::parse_date("2024-01-01").unwrap();
        let to = crate::core::period::parse_date("2024-01-08").unwrap();
        let dispatcher = Dispatcher::new().with_source(Arc::new(MockSource::found("p", 1.0)));

        let result = dispatcher
            .resolve_actual_cost(&resources()[..1], from, to)
            .await;
        assert_eq!(result.results[0].start_date, Some(from));
        assert_eq!(result.results[0].end_date, Some(to));
        assert_float_eq!(result.results[0].monthly, 1.0);
    }

    #[test]
    fn actual_rows_with_open_end_are_closed_at_window_end() {
        use crate::core::aggregate::aggregate_cross_provider;
        use crate::core::group_by::GroupBy;

        let from = crate::core::period::parse_date("2024-01-01").unwrap();
        let to = crate::core::period::parse_date("2024-01-08").unwrap();
        let resource = make_test_resource("vm-1", "aws:ec2/instance:Instance");
        let row = CostResult {
            start_date: Some(from),
            total_cost: 70.0,
            ..CostResult::for_resource(&resource, "p")
        };

        let row = stamp_row(row, &resource, "p", CostQuery::Actual { from, to });
        assert_eq!(row.end_date, Some(to));

        let buckets = aggregate_cross_provider(&[row], GroupBy::Daily).unwrap();
        assert_eq!(buckets.len(), 7);
        assert!(buckets.iter().all(|b| (b.total - 10.0).abs() < 1e-9));
    }

    #[test]
    fn actual_rows_starting_after_window_keep_open_end() {
        let from = crate::core::period::parse_date("2024-01-01").unwrap();
        let to = crate::core::period::parse_date("2024-01-08").unwrap();
        let late = crate::core::period::parse_date("2024-02-01").unwrap();
        let resource = make_test_resource("vm-1", "aws:ec2/instance:Instance");
        let row = CostResult {
            start_date: Some(late),
            ..CostResult::for_resource(&resource, "p")
        };

        let row = stamp_row(row, &resource, "p", CostQuery::Actual { from, to });
        assert_eq!(row.start_date, Some(late));
        assert_eq!(row.end_date, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_calls_are_logged_with_adapter() {
        let dispatcher =
            Dispatcher::new().with_source(Arc::new(MockSource::failing("flaky", "503 from upstream")));

        let result = dispatcher.resolve_projected_cost(&resources()[..1]).await;
        assert_eq!(result.errors.len(), 1);
        assert!(logs_contain("Source call failed"));
        assert!(logs_contain("flaky"));
        assert!(logs_contain("503 from upstream"));
        assert!(logs_contain("source_call"));
    }
}
