//! Cost rollups.
//!
//! Two views over a flat list of [`CostResult`] rows:
//! - [`summarize`]: totals by provider, service, and adapter;
//! - [`aggregate_cross_provider`]: calendar-day or calendar-month buckets
//!   with a per-provider split.
//!
//! Both are pure functions: every call builds fresh output from its input.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::group_by::GroupBy;
use super::models::{CostResult, DEFAULT_CURRENCY};
use super::period::{AVG_DAYS_PER_MONTH, day_key, day_span, days_from, month_key};
use crate::error::{CostError, Result};

// =============================================================================
// Summary Rollup
// =============================================================================

/// Totals across a result list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_monthly: f64,
    pub total_hourly: f64,
    pub currency: String,
    pub by_provider: BTreeMap<String, f64>,
    pub by_service: BTreeMap<String, f64>,
    pub by_adapter: BTreeMap<String, f64>,
}

/// A summary plus the rows it was computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResults {
    pub summary: Summary,
    pub resources: Vec<CostResult>,
}

/// Roll monthly and hourly costs up by provider, service, and adapter.
///
/// Bucket values are monthly amounts. The currency is the first non-empty
/// row currency, or USD for empty input.
#[must_use]
pub fn summarize(results: &[CostResult]) -> AggregatedResults {
    let mut summary = Summary {
        currency: results
            .iter()
            .map(|r| r.currency.as_str())
            .find(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string(),
        ..Summary::default()
    };

    for row in results {
        summary.total_monthly += row.monthly;
        summary.total_hourly += row.hourly;

        let service = match row.service() {
            "" => "unknown",
            service => service,
        };
        *summary
            .by_provider
            .entry(row.provider().to_string())
            .or_default() += row.monthly;
        *summary.by_service.entry(service.to_string()).or_default() += row.monthly;
        *summary.by_adapter.entry(row.adapter.clone()).or_default() += row.monthly;
    }

    AggregatedResults {
        summary,
        resources: results.to_vec(),
    }
}

// =============================================================================
// Cross-Provider Aggregation
// =============================================================================

/// Cost of one calendar period, split by provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrossProviderAggregation {
    /// `YYYY-MM-DD` for daily buckets, `YYYY-MM` for monthly buckets.
    pub period: String,
    pub total: f64,
    pub currency: String,
    pub providers: BTreeMap<String, f64>,
}

/// Bucket actual-cost rows by calendar day or month.
///
/// Preconditions are checked in order: non-empty input, time-based
/// `group_by`, valid date range on every row, one currency across rows.
/// Buckets come back sorted by period, which is chronological.
///
/// # Errors
///
/// - [`CostError::EmptyResults`] for an empty list;
/// - [`CostError::InvalidGroupBy`] for a dimension that is not daily or monthly;
/// - [`CostError::InvalidDateRange`] for a row without a start date or ending before it starts;
/// - [`CostError::MixedCurrencies`] naming the first currency and the first one that differs.
pub fn aggregate_cross_provider(
    results: &[CostResult],
    group_by: GroupBy,
) -> Result<Vec<CrossProviderAggregation>> {
    if results.is_empty() {
        return Err(CostError::EmptyResults);
    }
    if !group_by.is_time_based() {
        return Err(CostError::InvalidGroupBy(group_by.to_string()));
    }

    for row in results {
        check_date_range(row)?;
    }

    let currency = results[0].effective_currency();
    if let Some(other) = results
        .iter()
        .map(CostResult::effective_currency)
        .find(|c| *c != currency)
    {
        return Err(CostError::MixedCurrencies {
            expected: currency.to_string(),
            found: other.to_string(),
        });
    }

    let monthly = group_by.canonical() == GroupBy::Monthly;
    let mut buckets: BTreeMap<String, CrossProviderAggregation> = BTreeMap::new();

    for row in results {
        for (day, amount) in daily_contributions(row) {
            let period = if monthly { month_key(day) } else { day_key(day) };
            let bucket = buckets
                .entry(period)
                .or_insert_with_key(|period| CrossProviderAggregation {
                    period: period.clone(),
                    currency: currency.to_string(),
                    ..CrossProviderAggregation::default()
                });
            bucket.total += amount;
            *bucket
                .providers
                .entry(row.provider().to_string())
                .or_default() += amount;
        }
    }

    tracing::debug!(
        rows = results.len(),
        buckets = buckets.len(),
        group_by = %group_by,
        "Aggregated cross-provider costs"
    );

    Ok(buckets.into_values().collect())
}

fn check_date_range(row: &CostResult) -> Result<()> {
    let invalid = |start: String, end: String| CostError::InvalidDateRange {
        resource_id: row.resource_id.clone(),
        start,
        end,
    };
    let end_text = || row.end_date.map_or_else(|| "<none>".to_string(), |d| d.to_rfc3339());

    match row.start_date {
        None => Err(invalid("<none>".to_string(), end_text())),
        Some(start) if row.end_date.is_some_and(|end| end < start) => {
            Err(invalid(start.to_rfc3339(), end_text()))
        }
        Some(_) => Ok(()),
    }
}

/// Per-day amounts attributed to a row.
///
/// Explicit daily costs win; otherwise `total_cost`, or failing that the
/// monthly rate, is spread evenly over `[start, end)`. A missing end date
/// means a single day.
fn daily_contributions(row: &CostResult) -> Vec<(NaiveDate, f64)> {
    let Some(start) = row.start_date else {
        return Vec::new();
    };
    let first_day = start.date_naive();

    if !row.daily_costs.is_empty() {
        return days_from(first_day, row.daily_costs.len())
            .zip(row.daily_costs.iter().copied())
            .collect();
    }

    let span = row.end_date.map_or(1, |end| day_span(start, end));
    let per_day = if row.total_cost.abs() < f64::EPSILON {
        row.monthly / AVG_DAYS_PER_MONTH
    } else {
        row.total_cost / span as f64
    };

    days_from(first_day, usize::try_from(span).unwrap_or(1))
        .map(|day| (day, per_day))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_float_eq;
    use crate::test_utils::{make_test_actual_result, make_test_cost_result};

    fn ec2(id: &str, start: &str, end: &str, total: f64) -> CostResult {
        make_test_actual_result(id, "aws:ec2/instance:Instance", start, end, total)
    }

    #[test]
    fn summarize_empty_is_zero_usd() {
        let aggregated = summarize(&[]);
        assert_float_eq!(aggregated.summary.total_monthly, 0.0);
        assert_float_eq!(aggregated.summary.total_hourly, 0.0);
        assert_eq!(aggregated.summary.currency, "USD");
        assert!(aggregated.resources.is_empty());
    }

    #[test]
    fn summarize_buckets_by_provider_service_adapter() {
        let mut rows = vec![
            make_test_cost_result("i-1", "aws:ec2/instance:Instance", 10.0),
            make_test_cost_result("b-1", "aws:s3/bucket:Bucket", 5.0),
            make_test_cost_result("i-2", "aws:ec2/instance:Instance", 3.0),
        ];
        rows[2].adapter = "local-spec".to_string();
        rows[1].breakdown = None;

        let summary = summarize(&rows).summary;
        assert_float_eq!(summary.total_monthly, 18.0);
        assert_float_eq!(summary.by_service["ec2"], 13.0);
        assert_float_eq!(summary.by_service["s3"], 5.0);
        assert_float_eq!(summary.by_provider["aws"], 18.0);
        assert_float_eq!(summary.by_adapter["local-spec"], 3.0);
    }

    #[test]
    fn summarize_takes_first_non_empty_currency() {
        let mut rows = vec![
            make_test_cost_result("a", "gcp:compute/instance:Instance", 1.0),
            make_test_cost_result("b", "gcp:compute/instance:Instance", 1.0),
        ];
        rows[0].currency = String::new();
        rows[1].currency = "EUR".to_string();
        assert_eq!(summarize(&rows).summary.currency, "EUR");
    }

    #[test]
    fn non_time_group_by_is_rejected() {
        let rows = vec![ec2("a", "2024-01-01", "2024-01-02", 1.0)];
        for group_by in [GroupBy::Resource, GroupBy::Type, GroupBy::Provider, GroupBy::None] {
            let err = aggregate_cross_provider(&rows, group_by).unwrap_err();
            assert!(matches!(err, CostError::InvalidGroupBy(_)), "{group_by}");
        }
    }

    #[test]
    fn empty_check_precedes_group_by_check() {
        let err = aggregate_cross_provider(&[], GroupBy::Type).unwrap_err();
        assert!(matches!(err, CostError::EmptyResults));
    }

    #[test]
    fn missing_start_date_is_invalid_range() {
        let mut row = ec2("a", "2024-01-01", "2024-01-02", 1.0);
        row.start_date = None;
        let err = aggregate_cross_provider(&[row], GroupBy::Daily).unwrap_err();
        assert!(matches!(err, CostError::InvalidDateRange { .. }));
    }

    #[test]
    fn date_range_checked_before_currency() {
        let good = ec2("a", "2024-01-01", "2024-01-02", 1.0);
        let mut bad = ec2("b", "2024-01-05", "2024-01-01", 1.0);
        bad.currency = "EUR".to_string();
        let err = aggregate_cross_provider(&[good, bad], GroupBy::Daily).unwrap_err();
        assert!(matches!(err, CostError::InvalidDateRange { .. }));
    }

    #[test]
    fn empty_currency_counts_as_usd() {
        let usd = ec2("a", "2024-01-01", "2024-01-02", 1.0);
        let mut blank = ec2("b", "2024-01-01", "2024-01-02", 2.0);
        blank.currency = String::new();
        let buckets = aggregate_cross_provider(&[usd, blank], GroupBy::Daily).unwrap();
        assert_eq!(buckets[0].currency, "USD");
        assert_float_eq!(buckets[0].total, 3.0);
    }

    #[test]
    fn daily_costs_are_attributed_verbatim() {
        let mut row = ec2("a", "2024-01-30", "2024-02-02", 0.0);
        row.daily_costs = vec![1.0, 2.0, 4.0];

        let buckets = aggregate_cross_provider(&[row], GroupBy::Daily).unwrap();
        let periods: Vec<_> = buckets.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, ["2024-01-30", "2024-01-31", "2024-02-01"]);
        assert_float_eq!(buckets[2].total, 4.0);
    }

    #[test]
    fn total_cost_spreads_evenly() {
        let row = make_test_actual_result(
            "a",
            "azure:compute:VM",
            "2024-01-01",
            "2024-01-05",
            100.0,
        );
        let buckets = aggregate_cross_provider(&[row], GroupBy::Daily).unwrap();
        assert_eq!(buckets.len(), 4);
        for bucket in &buckets {
            assert_float_eq!(bucket.total, 25.0);
            assert_float_eq!(bucket.providers["azure"], 25.0);
        }
    }

    #[test]
    fn monthly_grouping_sums_days_into_months() {
        let row = ec2("a", "2024-01-30", "2024-02-03", 40.0);
        let buckets = aggregate_cross_provider(&[row], GroupBy::Monthly).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period, "2024-01");
        assert_float_eq!(buckets[0].total, 20.0);
        assert_eq!(buckets[1].period, "2024-02");
        assert_float_eq!(buckets[1].total, 20.0);
    }

    #[test]
    fn date_alias_behaves_like_daily() {
        let row = ec2("a", "2024-03-01", "2024-03-02", 7.0);
        let daily = aggregate_cross_provider(std::slice::from_ref(&row), GroupBy::Daily).unwrap();
        let date = aggregate_cross_provider(&[row], GroupBy::Date).unwrap();
        assert_eq!(daily, date);
    }

    #[test]
    fn missing_end_date_means_one_day() {
        let mut row = ec2("a", "2024-03-01", "2024-03-09", 9.0);
        row.end_date = None;
        let buckets = aggregate_cross_provider(&[row], GroupBy::Daily).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_float_eq!(buckets[0].total, 9.0);
    }
}
