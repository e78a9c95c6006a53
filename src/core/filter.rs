//! Resource filter expressions.
//!
//! Grammar: `key=value`, split at the first `=`.
//!
//! | Key | Match |
//! |---|---|
//! | `provider` | exact, against the resource provider |
//! | `type` | substring of the type string |
//! | `service` | substring of the service segment of the type |
//! | `id` | exact |
//! | `tag:<name>` | exact, against the tag's value |
//! | anything else | property: substring for strings, equality otherwise |
//!
//! All matching is case-sensitive.

use std::fmt;
use std::str::FromStr;

use super::models::ResourceDescriptor;
use super::period::provider_from_type;
use crate::error::{CostError, Result};

/// Which attribute of a resource a filter inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKey {
    Provider,
    Type,
    Service,
    Id,
    Tag(String),
    Property(String),
}

impl FilterKey {
    fn parse(key: &str) -> Self {
        match key {
            "provider" => Self::Provider,
            "type" => Self::Type,
            "service" => Self::Service,
            "id" => Self::Id,
            _ => key.strip_prefix("tag:").map_or_else(
                || Self::Property(key.to_string()),
                |name| Self::Tag(name.to_string()),
            ),
        }
    }
}

/// A parsed `key=value` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub key: FilterKey,
    pub value: String,
}

impl ResourceFilter {
    /// Parse and validate an expression.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::InvalidFilter`] when the expression has no `=`,
    /// or when the key or the value is empty.
    pub fn parse(expression: &str) -> Result<Self> {
        let invalid = |reason: &str| CostError::InvalidFilter {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let (key, value) = expression
            .split_once('=')
            .ok_or_else(|| invalid("expected key=value"))?;
        let key = key.trim();
        let value = value.trim();

        if key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if value.is_empty() {
            return Err(invalid("value is empty"));
        }
        if key == "tag:" {
            return Err(invalid("tag name is empty"));
        }

        Ok(Self {
            key: FilterKey::parse(key),
            value: value.to_string(),
        })
    }

    /// Whether a resource satisfies this filter.
    #[must_use]
    pub fn matches(&self, resource: &ResourceDescriptor) -> bool {
        let value = self.value.as_str();
        match &self.key {
            FilterKey::Provider => effective_provider(resource) == value,
            FilterKey::Type => resource.resource_type.contains(value),
            FilterKey::Service => resource.service().contains(value),
            FilterKey::Id => resource.id == value,
            FilterKey::Tag(name) => resource
                .tags()
                .and_then(|tags| tags.get(name))
                .is_some_and(|tag| property_text(tag) == value),
            FilterKey::Property(name) => {
                resource
                    .properties
                    .get(name)
                    .is_some_and(|property| match property {
                        serde_json::Value::String(s) => s.contains(value),
                        other => property_text(other) == value,
                    })
            }
        }
    }
}

impl FromStr for ResourceFilter {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            FilterKey::Provider => write!(f, "provider={}", self.value),
            FilterKey::Type => write!(f, "type={}", self.value),
            FilterKey::Service => write!(f, "service={}", self.value),
            FilterKey::Id => write!(f, "id={}", self.value),
            FilterKey::Tag(name) => write!(f, "tag:{name}={}", self.value),
            FilterKey::Property(name) => write!(f, "{name}={}", self.value),
        }
    }
}

fn effective_provider(resource: &ResourceDescriptor) -> &str {
    if resource.provider.is_empty() {
        provider_from_type(&resource.resource_type)
    } else {
        &resource.provider
    }
}

/// Strings compare by content, everything else by its JSON text.
fn property_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check an expression without applying it.
///
/// # Errors
///
/// Returns [`CostError::InvalidFilter`] describing what is wrong.
pub fn validate_filter(expression: &str) -> Result<()> {
    ResourceFilter::parse(expression).map(|_| ())
}

/// Outcome of checking one expression.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCheck {
    pub expression: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Check each expression independently.
#[must_use]
pub fn check_filters<S: AsRef<str>>(expressions: &[S]) -> Vec<FilterCheck> {
    expressions
        .iter()
        .map(|e| {
            let expression = e.as_ref().to_string();
            match validate_filter(&expression) {
                Ok(()) => FilterCheck {
                    expression,
                    valid: true,
                    error: None,
                },
                Err(err) => FilterCheck {
                    expression,
                    valid: false,
                    error: Some(err.to_string()),
                },
            }
        })
        .collect()
}

/// Keep the resources matching `expression`.
///
/// A malformed expression filters nothing and returns the input unchanged;
/// call [`validate_filter`] first to reject it instead.
#[must_use]
pub fn filter_resources(
    resources: &[ResourceDescriptor],
    expression: &str,
) -> Vec<ResourceDescriptor> {
    match ResourceFilter::parse(expression) {
        Ok(filter) => resources
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed filter");
            resources.to_vec()
        }
    }
}

/// Validate every expression, then apply them left to right (logical AND).
///
/// # Errors
///
/// Returns the first [`CostError::InvalidFilter`]; no filter is applied in that case.
pub fn apply_filters<S: AsRef<str>>(
    resources: &[ResourceDescriptor],
    expressions: &[S],
) -> Result<Vec<ResourceDescriptor>> {
    let filters = expressions
        .iter()
        .map(|e| ResourceFilter::parse(e.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let mut remaining = resources.to_vec();
    for filter in &filters {
        remaining.retain(|r| filter.matches(r));
        tracing::debug!(filter = %filter, remaining = remaining.len(), "Applied filter");
    }
    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fleet() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new("web-1", "aws:ec2/instance:Instance", "aws")
                .with_property("tags", json!({"env": "prod", "team": "web"}))
                .with_property("instanceType", json!("t3.micro")),
            ResourceDescriptor::new("logs", "aws:s3/bucket:Bucket", "aws")
                .with_property("tags", json!({"env": "dev"}))
                .with_property("versioning", json!(true)),
            ResourceDescriptor::new("vm-1", "azure:compute:VirtualMachine", "azure")
                .with_property("size", json!(4)),
        ]
    }

    fn ids(resources: &[ResourceDescriptor]) -> Vec<&str> {
        resources.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn validation_rejects_malformed_expressions() {
        for bad in ["provider", "=aws", "provider=", "=", "tag:=prod"] {
            let err = validate_filter(bad).unwrap_err();
            assert!(matches!(err, CostError::InvalidFilter { .. }), "{bad}");
        }
        assert!(validate_filter("provider=aws").is_ok());
        assert!(validate_filter("note=a=b").is_ok());
    }

    #[test]
    fn malformed_filter_is_a_no_op() {
        let resources = fleet();
        assert_eq!(filter_resources(&resources, "provider"), resources);
        assert_eq!(filter_resources(&resources, "type="), resources);
    }

    #[test]
    fn builtin_keys() {
        let resources = fleet();
        assert_eq!(ids(&filter_resources(&resources, "provider=aws")), ["web-1", "logs"]);
        assert_eq!(ids(&filter_resources(&resources, "type=Bucket")), ["logs"]);
        assert_eq!(ids(&filter_resources(&resources, "service=comp")), ["vm-1"]);
        assert_eq!(ids(&filter_resources(&resources, "id=vm-1")), ["vm-1"]);
        assert!(filter_resources(&resources, "id=vm").is_empty());
    }

    #[test]
    fn provider_match_is_exact_and_case_sensitive() {
        let resources = fleet();
        assert!(filter_resources(&resources, "provider=aw").is_empty());
        assert!(filter_resources(&resources, "provider=AWS").is_empty());
    }

    #[test]
    fn tag_and_property_keys() {
        let resources = fleet();
        assert_eq!(ids(&filter_resources(&resources, "tag:env=prod")), ["web-1"]);
        assert!(filter_resources(&resources, "tag:env=pro").is_empty());
        assert_eq!(ids(&filter_resources(&resources, "instanceType=t3")), ["web-1"]);
        assert_eq!(ids(&filter_resources(&resources, "versioning=true")), ["logs"]);
        assert_eq!(ids(&filter_resources(&resources, "size=4")), ["vm-1"]);
        assert!(filter_resources(&resources, "size=40").is_empty());
    }

    #[test]
    fn filtering_twice_is_idempotent() {
        let resources = fleet();
        let once = filter_resources(&resources, "provider=aws");
        let twice = filter_resources(&once, "provider=aws");
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_filters_ands_left_to_right() {
        let resources = fleet();
        let kept = apply_filters(&resources, &["provider=aws", "tag:env=dev"]).unwrap();
        assert_eq!(ids(&kept), ["logs"]);

        let none: [&str; 0] = [];
        assert_eq!(apply_filters(&resources, &none).unwrap(), resources);
    }

    #[test]
    fn apply_filters_rejects_any_invalid_expression() {
        let err = apply_filters(&fleet(), &["provider=aws", "oops"]).unwrap_err();
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn display_round_trips_expression() {
        let filter: ResourceFilter = "tag:env=prod".parse().unwrap();
        assert_eq!(filter.key, FilterKey::Tag("env".to_string()));
        assert_eq!(filter.to_string(), "tag:env=prod");
    }

    #[test]
    fn check_filters_reports_each_expression() {
        let checks = check_filters(&["provider=aws", "=x", "tag:=v"]);
        assert_eq!(checks.len(), 3);
        assert!(checks[0].valid);
        assert!(checks[0].error.is_none());
        assert!(!checks[1].valid);
        assert!(checks[2].error.as_deref().unwrap().contains("tag name"));
    }
}
