//! Grouping dimensions for cost results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::CostResult;
use crate::error::{CostError, Result};

/// Dimension used to bucket results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Resource,
    Type,
    Provider,
    Daily,
    Monthly,
    /// Deprecated alias of `Daily`.
    Date,
    #[default]
    None,
}

impl GroupBy {
    /// All values, in CLI help order.
    pub const ALL: &'static [Self] = &[
        Self::Resource,
        Self::Type,
        Self::Provider,
        Self::Daily,
        Self::Monthly,
        Self::Date,
        Self::None,
    ];

    /// Parse from CLI argument (case-insensitive). An empty string means `None`.
    pub fn from_arg(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "resource" => Ok(Self::Resource),
            "type" => Ok(Self::Type),
            "provider" => Ok(Self::Provider),
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "date" => Ok(Self::Date),
            "" | "none" => Ok(Self::None),
            other => Err(CostError::InvalidGroupBy(other.to_string())),
        }
    }

    /// CLI spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Type => "type",
            Self::Provider => "provider",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Date => "date",
            Self::None => "none",
        }
    }

    /// Whether `s` names a known dimension.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        Self::from_arg(s).is_ok()
    }

    /// Whether this dimension buckets by calendar period.
    #[must_use]
    pub const fn is_time_based(self) -> bool {
        matches!(self, Self::Daily | Self::Monthly | Self::Date)
    }

    /// Resolve deprecated aliases.
    #[must_use]
    pub const fn canonical(self) -> Self {
        match self {
            Self::Date => Self::Daily,
            other => other,
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bucket of rows sharing one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultGroup {
    pub key: String,
    pub total_monthly: f64,
    pub total_cost: f64,
    pub results: Vec<CostResult>,
}

/// Bucket rows by a non-time dimension.
///
/// Buckets appear in first-seen order and keep their rows' input order.
/// `GroupBy::None` yields a single `all` bucket (or nothing for empty input).
pub fn group_results(results: &[CostResult], group_by: GroupBy) -> Result<Vec<ResultGroup>> {
    if group_by.is_time_based() {
        return Err(CostError::InvalidGroupBy(format!(
            "{group_by} is time-based; use cross-provider aggregation"
        )));
    }

    let mut groups: Vec<ResultGroup> = Vec::new();

    for row in results {
        let key = match group_by {
            GroupBy::Resource => row.resource_id.as_str(),
            GroupBy::Type => row.resource_type.as_str(),
            GroupBy::Provider => row.provider(),
            _ => "all",
        };

        let index = match groups.iter().position(|g| g.key == key) {
            Some(index) => index,
            None => {
                groups.push(ResultGroup {
                    key: key.to_string(),
                    total_monthly: 0.0,
                    total_cost: 0.0,
                    results: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.total_monthly += row.monthly;
        group.total_cost += row.total_cost;
        group.results.push(row.clone());
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_float_eq;
    use crate::test_utils::make_test_cost_result;

    #[test]
    fn parse_group_by_values() {
        assert_eq!(GroupBy::from_arg("Daily").unwrap(), GroupBy::Daily);
        assert_eq!(GroupBy::from_arg("monthly").unwrap(), GroupBy::Monthly);
        assert_eq!(GroupBy::from_arg("").unwrap(), GroupBy::None);
        assert!(matches!(
            GroupBy::from_arg("weekly"),
            Err(CostError::InvalidGroupBy(_))
        ));
        assert!(GroupBy::is_valid("provider"));
        assert!(!GroupBy::is_valid("region"));
    }

    #[test]
    fn time_based_predicate() {
        for group_by in GroupBy::ALL {
            let expected = matches!(group_by, GroupBy::Daily | GroupBy::Monthly | GroupBy::Date);
            assert_eq!(group_by.is_time_based(), expected, "{group_by}");
        }
        assert_eq!(GroupBy::Date.canonical(), GroupBy::Daily);
    }

    #[test]
    fn group_by_provider_keeps_first_seen_order() {
        let rows = vec![
            make_test_cost_result("r1", "gcp:compute/instance:Instance", 7.0),
            make_test_cost_result("r2", "aws:ec2/instance:Instance", 10.0),
            make_test_cost_result("r3", "gcp:storage/bucket:Bucket", 3.0),
        ];

        let groups = group_results(&rows, GroupBy::Provider).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "gcp");
        assert_float_eq!(groups[0].total_monthly, 10.0);
        assert_eq!(groups[0].results.len(), 2);
        assert_eq!(groups[1].key, "aws");
    }

    #[test]
    fn group_by_resource_keeps_multi_source_rows() {
        let mut second = make_test_cost_result("r1", "aws:ec2/instance:Instance", 8.0);
        second.adapter = "spot-plugin".to_string();
        let rows = vec![
            make_test_cost_result("r1", "aws:ec2/instance:Instance", 10.0),
            second,
        ];

        let groups = group_results(&rows, GroupBy::Resource).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].results.len(), 2);
    }

    #[test]
    fn group_none_is_single_bucket() {
        let rows = vec![
            make_test_cost_result("r1", "aws:ec2/instance:Instance", 1.0),
            make_test_cost_result("r2", "azure:compute:VM", 2.0),
        ];
        let groups = group_results(&rows, GroupBy::None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "all");
        assert!(group_results(&[], GroupBy::None).unwrap().is_empty());
    }

    #[test]
    fn time_based_grouping_is_rejected() {
        assert!(matches!(
            group_results(&[], GroupBy::Monthly),
            Err(CostError::InvalidGroupBy(_))
        ));
    }
}
