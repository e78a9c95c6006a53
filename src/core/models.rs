//! Core data models.
//!
//! These types are the engine's produced interface: CLI output formats are
//! derived by serializing them directly, so field names are stable.
//!
//! A resource owns zero, one, or many [`CostResult`] rows (one per source
//! that answered). Results are kept as an ordered sequence of rows carrying
//! a resource id, never as a map keyed by resource id.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::period;

/// Currency assumed when a source leaves it empty.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Adapter name for rows produced by the local pricing catalog.
pub const ADAPTER_LOCAL_SPEC: &str = "local-spec";

/// Adapter name for synthesized placeholder rows.
pub const ADAPTER_NONE: &str = "none";

/// Placeholder note for projected cost.
pub const NOTE_NO_PRICING: &str = "No pricing information available";

/// Placeholder note for actual cost.
pub const NOTE_NO_ACTUAL: &str = "No actual cost data";

/// Maximum number of errors listed individually in an error summary.
const MAX_ERRORS_IN_SUMMARY: usize = 5;

// =============================================================================
// Resource Descriptor
// =============================================================================

/// One infrastructure resource handed to the engine by ingestion.
///
/// # Fields
/// - `id`: Unique resource identifier (URN, ARN, ...).
/// - `resource_type`: Provider-qualified type, e.g. `aws:ec2/instance:Instance`.
/// - `provider`: Provider name as reported by ingestion.
/// - `properties`: Free-form inputs; tags live under the `tags` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl ResourceDescriptor {
    /// Create a descriptor with no properties.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            provider: provider.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a property (builder style).
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Tags, if the `tags` property is an object.
    #[must_use]
    pub fn tags(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.properties.get("tags").and_then(serde_json::Value::as_object)
    }

    /// Service segment of the resource type (`ec2` for `aws:ec2/instance:Instance`).
    #[must_use]
    pub fn service(&self) -> &str {
        period::service_from_type(&self.resource_type)
    }
}

// =============================================================================
// Cost Result
// =============================================================================

/// One source's cost answer for one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CostResult {
    pub resource_type: String,
    pub resource_id: String,

    /// Which source produced this row: a plugin name, `local-spec`, or `none`.
    pub adapter: String,

    pub currency: String,
    pub monthly: f64,
    pub hourly: f64,

    /// Total for the requested window (actual-cost mode).
    pub total_cost: f64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cost_period: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<BTreeMap<String, f64>>,

    /// Per-day amounts starting at `start_date`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub daily_costs: Vec<f64>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl CostResult {
    /// Create an empty row for a resource, tagged with an adapter.
    #[must_use]
    pub fn for_resource(resource: &ResourceDescriptor, adapter: impl Into<String>) -> Self {
        Self {
            resource_type: resource.resource_type.clone(),
            resource_id: resource.id.clone(),
            adapter: adapter.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            ..Self::default()
        }
    }

    /// Placeholder row used when no source has data for a resource.
    #[must_use]
    pub fn placeholder(resource: &ResourceDescriptor, notes: &str) -> Self {
        Self {
            notes: notes.to_string(),
            ..Self::for_resource(resource, ADAPTER_NONE)
        }
    }

    /// Currency with empty normalized to USD.
    #[must_use]
    pub fn effective_currency(&self) -> &str {
        if self.currency.is_empty() {
            DEFAULT_CURRENCY
        } else {
            &self.currency
        }
    }

    /// Provider prefix of the resource type.
    #[must_use]
    pub fn provider(&self) -> &str {
        period::provider_from_type(&self.resource_type)
    }

    /// Service segment of the resource type.
    #[must_use]
    pub fn service(&self) -> &str {
        period::service_from_type(&self.resource_type)
    }

    /// Whether this row is a synthesized placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.adapter == ADAPTER_NONE
    }
}

// =============================================================================
// Resource Error
// =============================================================================

/// A source-local failure for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceError {
    pub resource_id: String,
    pub resource_type: String,

    /// Name of the source that failed.
    #[serde(rename = "source")]
    pub source_name: String,

    pub message: String,
}

impl ResourceError {
    /// Build from a resource, a source name, and an error.
    #[must_use]
    pub fn new(
        resource: &ResourceDescriptor,
        source_name: impl Into<String>,
        error: &impl fmt::Display,
    ) -> Self {
        Self {
            resource_id: resource.id.clone(),
            resource_type: resource.resource_type.clone(),
            source_name: source_name.into(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) via {}: {}",
            self.resource_id, self.resource_type, self.source_name, self.message
        )
    }
}

fn summarize_errors(errors: &[ResourceError]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut summary = format!("{} resource error(s):\n", errors.len());
    for err in errors.iter().take(MAX_ERRORS_IN_SUMMARY) {
        summary.push_str(&format!("  - {err}\n"));
    }
    if errors.len() > MAX_ERRORS_IN_SUMMARY {
        summary.push_str(&format!(
            "  ... and {} more\n",
            errors.len() - MAX_ERRORS_IN_SUMMARY
        ));
    }
    summary
}

// =============================================================================
// Dispatch Results
// =============================================================================

/// Primary return type of cost dispatch: rows plus per-source failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostResultWithErrors {
    pub results: Vec<CostResult>,

    #[serde(default)]
    pub errors: Vec<ResourceError>,
}

impl CostResultWithErrors {
    /// Whether any source failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Multi-line summary of failures, empty when there are none.
    #[must_use]
    pub fn error_summary(&self) -> String {
        summarize_errors(&self.errors)
    }

    /// Rows belonging to one resource.
    pub fn rows_for<'a>(&'a self, resource_id: &'a str) -> impl Iterator<Item = &'a CostResult> {
        self.results
            .iter()
            .filter(move |r| r.resource_id == resource_id)
    }
}

// =============================================================================
// Recommendations
// =============================================================================

/// Kind of optimization a source recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Rightsize,
    Terminate,
    PurchaseCommitment,
    AdjustRequests,
    Modify,
    DeleteUnused,
    Migrate,
    Consolidate,
    Schedule,
    Refactor,
    #[default]
    #[serde(other)]
    Other,
}

impl ActionType {
    /// Label for table output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rightsize => "RIGHTSIZE",
            Self::Terminate => "TERMINATE",
            Self::PurchaseCommitment => "PURCHASE_COMMITMENT",
            Self::AdjustRequests => "ADJUST_REQUESTS",
            Self::Modify => "MODIFY",
            Self::DeleteUnused => "DELETE_UNUSED",
            Self::Migrate => "MIGRATE",
            Self::Consolidate => "CONSOLIDATE",
            Self::Schedule => "SCHEDULE",
            Self::Refactor => "REFACTOR",
            Self::Other => "OTHER",
        }
    }
}

/// A cost optimization suggestion for one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub resource_id: String,
    pub action_type: ActionType,
    pub description: String,
    pub estimated_savings: f64,
    pub currency: String,

    /// Source that produced the recommendation.
    pub adapter: String,
}

/// Recommendations from every source plus per-source failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResult {
    pub recommendations: Vec<Recommendation>,

    #[serde(default)]
    pub errors: Vec<ResourceError>,
}

impl RecommendationsResult {
    /// Whether any source failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Multi-line summary of failures, empty when there are none.
    #[must_use]
    pub fn error_summary(&self) -> String {
        summarize_errors(&self.errors)
    }

    /// Sum of estimated savings across all recommendations.
    #[must_use]
    pub fn total_savings(&self) -> f64 {
        self.recommendations.iter().map(|r| r.estimated_savings).sum()
    }
}

// =============================================================================
// Robot Output Envelope
// =============================================================================

/// Top-level JSON envelope for machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,

    #[serde(default)]
    pub errors: Vec<ResourceError>,

    pub meta: RobotMeta,
}

/// Metadata for robot output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotMeta {
    pub format: String,
    pub runtime: String,
}

impl<T> RobotOutput<T> {
    /// Create a new envelope.
    pub fn new(command: impl Into<String>, data: T, errors: Vec<ResourceError>) -> Self {
        Self {
            schema_version: "cloudcost.v1".to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors,
            meta: RobotMeta {
                format: "json".to_string(),
                runtime: "cli".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_test_cost_result, make_test_resource};
    use crate::{assert_contains, assert_json_valid};

    #[test]
    fn empty_currency_is_usd() {
        let mut row = make_test_cost_result("r1", "aws:ec2/instance:Instance", 10.0);
        row.currency = String::new();
        assert_eq!(row.effective_currency(), "USD");
        row.currency = "EUR".to_string();
        assert_eq!(row.effective_currency(), "EUR");
    }

    #[test]
    fn placeholder_row_shape() {
        let resource = make_test_resource("r1", "aws:s3/bucket:Bucket");
        let row = CostResult::placeholder(&resource, NOTE_NO_PRICING);
        assert_eq!(row.adapter, "none");
        assert_eq!(row.currency, "USD");
        assert!(row.monthly.abs() < f64::EPSILON);
        assert!(row.hourly.abs() < f64::EPSILON);
        assert!(row.total_cost.abs() < f64::EPSILON);
        assert_eq!(row.notes, "No pricing information available");
        assert!(row.is_placeholder());
    }

    #[test]
    fn resource_descriptor_decodes_type_field() {
        let json = r#"{
            "id": "urn:bucket",
            "type": "aws:s3/bucket:Bucket",
            "provider": "aws",
            "properties": {"tags": {"env": "prod"}, "acl": "private"}
        }"#;
        let resource: ResourceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(resource.resource_type, "aws:s3/bucket:Bucket");
        assert_eq!(resource.service(), "s3");
        let tags = resource.tags().unwrap();
        assert_eq!(tags.get("env").and_then(|v| v.as_str()), Some("prod"));
    }

    #[test]
    fn cost_result_tolerates_sparse_plugin_json() {
        let json = r#"{"monthly": 12.5, "currency": "USD"}"#;
        let row: CostResult = serde_json::from_str(json).unwrap();
        assert!((row.monthly - 12.5).abs() < f64::EPSILON);
        assert!(row.breakdown.is_none());
        assert!(row.daily_costs.is_empty());
    }

    #[test]
    fn error_summary_truncates() {
        let resource = make_test_resource("r", "aws:ec2/instance:Instance");
        let errors: Vec<_> = (0..7)
            .map(|i| ResourceError::new(&resource, format!("plugin-{i}"), &"boom"))
            .collect();
        let result = CostResultWithErrors {
            results: Vec::new(),
            errors,
        };

        assert!(result.has_errors());
        let summary = result.error_summary();
        assert_contains!(&summary, "7 resource error(s)");
        assert_contains!(&summary, "plugin-4");
        assert!(!summary.contains("plugin-5"));
        assert_contains!(&summary, "and 2 more");
    }

    #[test]
    fn no_errors_means_empty_summary() {
        let result = CostResultWithErrors::default();
        assert!(!result.has_errors());
        assert!(result.error_summary().is_empty());
    }

    #[test]
    fn action_type_unknown_maps_to_other() {
        let action: ActionType = serde_json::from_str(r#""SOMETHING_NEW""#).unwrap();
        assert_eq!(action, ActionType::Other);
        let action: ActionType = serde_json::from_str(r#""PURCHASE_COMMITMENT""#).unwrap();
        assert_eq!(action, ActionType::PurchaseCommitment);
    }

    #[test]
    fn robot_output_serializes() {
        let output = RobotOutput::new("projected", vec!["row"], Vec::new());
        let json = serde_json::to_string(&output).unwrap();
        assert_json_valid!(&json);
        assert_contains!(&json, "cloudcost.v1");
        assert_contains!(&json, "schemaVersion");
    }
}
