//! Test utilities for cloudcost.
//!
//! Provides shared helpers, test data factories, a scriptable cost source,
//! and assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cloudcost::test_utils::*;
//!
//! let resource = make_test_resource("vm-1", "aws:ec2/instance:Instance");
//! let source = MockSource::found("aws-plugin", 70.0);
//! let dir = TestDir::new();
//! dir.create_file("resources.json", "[]");
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::models::{CostResult, Recommendation, ResourceDescriptor};
use crate::core::period::{parse_date, provider_from_type};
use crate::core::source::{CostSource, SourceKind};
use crate::error::{CostError, Result};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a resource whose provider is taken from the type prefix.
///
/// # Examples
///
/// ```rust,ignore
/// let r = make_test_resource("vm-1", "aws:ec2/instance:Instance");
/// assert_eq!(r.provider, "aws");
/// ```
#[must_use]
pub fn make_test_resource(id: &str, resource_type: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(id, resource_type, provider_from_type(resource_type))
}

/// Create a projected cost row in USD from a plugin called `test-plugin`.
///
/// Hourly is derived from monthly using 730 hours per month.
#[must_use]
pub fn make_test_cost_result(id: &str, resource_type: &str, monthly: f64) -> CostResult {
    CostResult {
        resource_type: resource_type.to_string(),
        resource_id: id.to_string(),
        adapter: "test-plugin".to_string(),
        currency: "USD".to_string(),
        monthly,
        hourly: monthly / 730.0,
        ..CostResult::default()
    }
}

/// Create an actual cost row covering `[start, end)` with the given total.
///
/// # Panics
///
/// Panics if either date does not parse.
#[must_use]
pub fn make_test_actual_result(
    id: &str,
    resource_type: &str,
    start: &str,
    end: &str,
    total_cost: f64,
) -> CostResult {
    CostResult {
        resource_type: resource_type.to_string(),
        resource_id: id.to_string(),
        adapter: "test-plugin".to_string(),
        currency: "USD".to_string(),
        total_cost,
        start_date: Some(parse_date(start).expect("valid start date")),
        end_date: Some(parse_date(end).expect("valid end date")),
        ..CostResult::default()
    }
}

/// Create a recommendation for a resource.
#[must_use]
pub fn make_test_recommendation(resource_id: &str, savings: f64) -> Recommendation {
    Recommendation {
        resource_id: resource_id.to_string(),
        description: format!("Rightsize {resource_id}"),
        estimated_savings: savings,
        currency: "USD".to_string(),
        ..Recommendation::default()
    }
}

// =============================================================================
// Mock Cost Source
// =============================================================================

#[derive(Debug, Clone)]
enum Behavior {
    Found(f64),
    NotSupported,
    Fail(String),
    Panic(String),
}

/// A scriptable [`CostSource`] that counts its calls.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    kind: SourceKind,
    behavior: Behavior,
    currency: String,
    delay: Option<Duration>,
    timeout: Option<Duration>,
    recommendations: Vec<Recommendation>,
    calls: AtomicUsize,
}

impl MockSource {
    fn with_behavior(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            kind: SourceKind::Remote,
            behavior,
            currency: "USD".to_string(),
            delay: None,
            timeout: None,
            recommendations: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answers every resource with `monthly` (and the same total for actual queries).
    #[must_use]
    pub fn found(name: &str, monthly: f64) -> Self {
        Self::with_behavior(name, Behavior::Found(monthly))
    }

    /// Reports every resource as unsupported.
    #[must_use]
    pub fn not_supported(name: &str) -> Self {
        Self::with_behavior(name, Behavior::NotSupported)
    }

    /// Fails every call with [`CostError::SourceFailed`].
    #[must_use]
    pub fn failing(name: &str, message: &str) -> Self {
        Self::with_behavior(name, Behavior::Fail(message.to_string()))
    }

    /// Panics on every call.
    #[must_use]
    pub fn panicking(name: &str, message: &str) -> Self {
        Self::with_behavior(name, Behavior::Panic(message.to_string()))
    }

    #[must_use]
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Per-source timeout override.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.recommendations = recommendations;
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Found(monthly) => Ok(Some(CostResult {
                currency: self.currency.clone(),
                monthly: *monthly,
                hourly: monthly / 730.0,
                ..CostResult::for_resource(resource, self.name.clone())
            })),
            Behavior::NotSupported => Ok(None),
            Behavior::Fail(message) => Err(CostError::SourceFailed {
                source_name: self.name.clone(),
                message: message.clone(),
            }),
            Behavior::Panic(message) => panic!("{message}"),
        }
    }
}

#[async_trait]
impl CostSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn projected_cost(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        self.answer(resource).await
    }

    async fn actual_cost(
        &self,
        resource: &ResourceDescriptor,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        Ok(self.answer(resource).await?.map(|row| CostResult {
            total_cost: row.monthly,
            ..row
        }))
    }

    async fn recommendations(&self, resource: &ResourceDescriptor) -> Result<Vec<Recommendation>> {
        self.answer(resource).await?;
        Ok(self
            .recommendations
            .iter()
            .filter(|r| r.resource_id.is_empty() || r.resource_id == resource.id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content and return its path.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
///
/// # Examples
///
/// ```rust,ignore
/// use cloudcost::assert_contains;
///
/// let text = "Hello, world!";
/// assert_contains!(text, "world");
/// ```
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
    ($haystack:expr, $needle:expr, $($arg:tt)*) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            $($arg)*
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(_) => {}
            Err(e) => {
                panic!(
                    "Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}",
                    e, json
                );
            }
        }
    };
}

/// Assert that a string does NOT contain ANSI escape codes.
#[macro_export]
macro_rules! assert_no_ansi_codes {
    ($text:expr) => {
        let text = $text;
        assert!(
            !text.contains('\x1b'),
            "Expected string to NOT contain ANSI escape codes.\n\nActual string:\n{:?}",
            text
        );
    };
}

/// Assert approximate floating point equality.
///
/// # Examples
///
/// ```rust,ignore
/// use cloudcost::assert_float_eq;
///
/// assert_float_eq!(70.0, 70.0000001, 1e-3);
/// assert_float_eq!(250.0, 100.0 + 150.0);
/// ```
#[macro_export]
macro_rules! assert_float_eq {
    ($left:expr, $right:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = f64::EPSILON * 100.0;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
    ($left:expr, $right:expr, $epsilon:expr) => {
        let left: f64 = $left;
        let right: f64 = $right;
        let epsilon: f64 = $epsilon;
        assert!(
            (left - right).abs() < epsilon,
            "Float equality assertion failed: {} != {} (epsilon: {})",
            left,
            right,
            epsilon
        );
    };
}
