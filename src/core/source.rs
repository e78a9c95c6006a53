//! Cost sources and the fallback tiers they belong to.
//!
//! Every source (remote plugin, local catalog, synthesized placeholder)
//! implements [`CostSource`], so the dispatcher walks its fallback chain
//! without branching on the concrete source type.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{
    ADAPTER_NONE, CostResult, NOTE_NO_ACTUAL, NOTE_NO_PRICING, Recommendation, ResourceDescriptor,
};
use crate::error::Result;

// =============================================================================
// Source Kind
// =============================================================================

/// Position of a source in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A plugin reached over RPC. All remote answers are kept.
    Remote,
    /// The local pricing catalog, consulted only when no plugin answered.
    LocalCatalog,
    /// Placeholder of last resort.
    None,
}

impl SourceKind {
    /// Label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::LocalCatalog => "local-catalog",
            Self::None => "none",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Cost Query
// =============================================================================

/// What a dispatch batch asks every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostQuery {
    /// Forward-looking estimate.
    Projected,
    /// Incurred cost over `[from, to)`.
    Actual {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl CostQuery {
    /// Label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Projected => "projected",
            Self::Actual { .. } => "actual",
        }
    }
}

// =============================================================================
// Cost Source
// =============================================================================

/// A capability that prices resources.
///
/// `Ok(None)` means "not supported for this resource" and is not an error.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Adapter name stamped on every row this source produces.
    fn name(&self) -> &str;

    /// Fallback tier of this source.
    fn kind(&self) -> SourceKind;

    /// Per-call timeout override; the dispatcher default applies when `None`.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Projected (monthly/hourly) cost of a resource.
    async fn projected_cost(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>>;

    /// Actual cost of a resource over `[from, to)`.
    async fn actual_cost(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>>;

    /// Optimization suggestions for a resource. Sources without any return nothing.
    async fn recommendations(&self, _resource: &ResourceDescriptor) -> Result<Vec<Recommendation>> {
        Ok(Vec::new())
    }

    /// Answer a [`CostQuery`].
    async fn cost(
        &self,
        resource: &ResourceDescriptor,
        query: CostQuery,
    ) -> Result<Option<CostResult>> {
        match query {
            CostQuery::Projected => self.projected_cost(resource).await,
            CostQuery::Actual { from, to } => self.actual_cost(resource, from, to).await,
        }
    }
}

// =============================================================================
// None Fallback
// =============================================================================

/// Last tier of the chain: answers every resource with a zero-cost placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneFallback;

#[async_trait]
impl CostSource for NoneFallback {
    fn name(&self) -> &str {
        ADAPTER_NONE
    }

    fn kind(&self) -> SourceKind {
        SourceKind::None
    }

    async fn projected_cost(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        Ok(Some(CostResult::placeholder(resource, NOTE_NO_PRICING)))
    }

    async fn actual_cost(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        Ok(Some(CostResult {
            start_date: Some(from),
            end_date: Some(to),
            ..CostResult::placeholder(resource, NOTE_NO_ACTUAL)
        }))
    }
}
