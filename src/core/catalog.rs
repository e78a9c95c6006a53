//! Local pricing catalog.
//!
//! A JSON file mapping resource type strings to fixed prices. It backs the
//! `local-spec` tier of the fallback chain: consulted only for resources no
//! plugin could price.
//!
//! ```json
//! {
//!   "aws:ec2/instance:Instance": { "monthly": 70.08, "hourly": 0.096, "currency": "USD" },
//!   "aws:s3/bucket:Bucket": { "monthly": 2.3, "notes": "standard tier, 100 GB" }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{ADAPTER_LOCAL_SPEC, CostResult, DEFAULT_CURRENCY, ResourceDescriptor};
use super::source::{CostSource, SourceKind};
use crate::error::{CostError, Result};

/// Fixed price for one resource type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogEntry {
    pub monthly: f64,
    pub hourly: f64,
    pub currency: String,
    pub notes: String,
    pub breakdown: Option<BTreeMap<String, f64>>,
}

/// Resource type to price mapping (type keys normalized to lowercase).
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl LocalCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, CatalogEntry> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (resource_type, entry) in raw {
            catalog.insert(&resource_type, entry);
        }
        Ok(catalog)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| CostError::InvalidInput {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, resource_type: &str, entry: CatalogEntry) {
        self.entries.insert(resource_type.to_lowercase(), entry);
    }

    /// Look up the price of a resource type, ignoring case.
    #[must_use]
    pub fn lookup(&self, resource_type: &str) -> Option<&CatalogEntry> {
        self.entries.get(&resource_type.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known resource types, sorted.
    #[must_use]
    pub fn known_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// The `local-spec` cost source.
#[derive(Debug, Clone)]
pub struct LocalCatalogSource {
    catalog: LocalCatalog,
}

impl LocalCatalogSource {
    #[must_use]
    pub const fn new(catalog: LocalCatalog) -> Self {
        Self { catalog }
    }

    /// Row for a resource priced from the catalog, if its type is known.
    fn priced_row(&self, resource: &ResourceDescriptor) -> Option<CostResult> {
        let entry = self.catalog.lookup(&resource.resource_type)?;
        let currency = if entry.currency.is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            entry.currency.clone()
        };

        Some(CostResult {
            currency,
            monthly: entry.monthly,
            hourly: entry.hourly,
            breakdown: entry.breakdown.clone(),
            notes: entry.notes.clone(),
            ..CostResult::for_resource(resource, ADAPTER_LOCAL_SPEC)
        })
    }
}

#[async_trait]
impl CostSource for LocalCatalogSource {
    fn name(&self) -> &str {
        ADAPTER_LOCAL_SPEC
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LocalCatalog
    }

    async fn projected_cost(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        Ok(self.priced_row(resource))
    }

    /// The catalog only knows rates, so the row carries the window and a
    /// zero total; aggregation derives daily amounts from `monthly`.
    async fn actual_cost(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        Ok(self.priced_row(resource).map(|row| CostResult {
            start_date: Some(from),
            end_date: Some(to),
            total_cost: 0.0,
            ..row
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_float_eq;
    use crate::core::period::parse_date;
    use crate::test_utils::{TestDir, make_test_resource};

    const CATALOG_JSON: &str = r#"{
        "aws:ec2/instance:Instance": {"monthly": 70.08, "hourly": 0.096, "currency": "USD"},
        "azure:storage:Account": {"monthly": 20.0, "currency": "EUR", "notes": "hot tier"}
    }"#;

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = LocalCatalog::from_json(CATALOG_JSON).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.lookup("AWS:EC2/Instance:Instance").is_some());
        assert!(catalog.lookup("gcp:compute/instance:Instance").is_none());
    }

    #[test]
    fn malformed_catalog_is_invalid_input() {
        let dir = TestDir::new();
        let path = dir.create_file("catalog.json", "{ not json");
        let err = LocalCatalog::load(&path).unwrap_err();
        assert!(matches!(err, CostError::InvalidInput { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = TestDir::new();
        let path = dir.create_file("catalog.json", CATALOG_JSON);
        let catalog = LocalCatalog::load(&path).unwrap();
        assert_eq!(
            catalog.known_types(),
            vec!["aws:ec2/instance:instance", "azure:storage:account"]
        );
    }

    #[tokio::test]
    async fn projected_row_is_tagged_local_spec() {
        let source = LocalCatalogSource::new(LocalCatalog::from_json(CATALOG_JSON).unwrap());
        let resource = make_test_resource("vm-1", "aws:ec2/instance:Instance");

        let row = source.projected_cost(&resource).await.unwrap().unwrap();
        assert_eq!(row.adapter, "local-spec");
        assert_eq!(row.resource_id, "vm-1");
        assert_eq!(row.resource_type, "aws:ec2/instance:Instance");
        assert_float_eq!(row.monthly, 70.08);
    }

    #[tokio::test]
    async fn unknown_type_is_not_supported() {
        let source = LocalCatalogSource::new(LocalCatalog::new());
        let resource = make_test_resource("vm-1", "aws:ec2/instance:Instance");
        assert!(source.projected_cost(&resource).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn actual_row_carries_window_and_zero_total() {
        let source = LocalCatalogSource::new(LocalCatalog::from_json(CATALOG_JSON).unwrap());
        let resource = make_test_resource("sa-1", "azure:storage:Account");
        let from = parse_date("2024-01-01").unwrap();
        let to = parse_date("2024-01-31").unwrap();

        let row = source.actual_cost(&resource, from, to).await.unwrap().unwrap();
        assert_eq!(row.start_date, Some(from));
        assert_eq!(row.end_date, Some(to));
        assert_float_eq!(row.total_cost, 0.0);
        assert_float_eq!(row.monthly, 20.0);
        assert_eq!(row.currency, "EUR");
        assert_eq!(row.notes, "hot tier");
    }
}
