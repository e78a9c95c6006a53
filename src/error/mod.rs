//! Error types for cloudcost.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Source**: a single cost source failed, timed out, or panicked for one resource
//! - **Aggregation**: a precondition of cross-provider aggregation was violated
//! - **Filter**: a resource filter expression is malformed
//! - **Configuration**: config file parsing, validation, or bad CLI input
//! - **Network**: transport-level failures talking to a plugin
//! - **Internal**: I/O, serialization, or unclassified errors
//!
//! Source errors never escape a dispatch call: the dispatcher turns them into
//! [`ResourceError`](crate::core::models::ResourceError) rows. Aggregation errors
//! always abort the aggregation call.
//!
//! Each error has a stable error code (e.g., `CC-G001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A cost source failed for one resource.
    Source,
    /// Aggregation precondition violated.
    Aggregation,
    /// Malformed filter expression.
    Filter,
    /// Configuration or input issues.
    Configuration,
    /// Network issues reaching a plugin.
    Network,
    /// Internal errors (I/O, serialization, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Source => "Cost source error",
            Self::Aggregation => "Aggregation error",
            Self::Filter => "Filter error",
            Self::Configuration => "Configuration error",
            Self::Network => "Network error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Source => "S",
            Self::Aggregation => "G",
            Self::Filter => "F",
            Self::Configuration => "C",
            Self::Network => "N",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success (including runs where some sources failed)
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Bad configuration, filter, or input file
    InvalidInput = 2,
    /// Aggregation precondition violated
    AggregationFailed = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for cloudcost operations.
#[derive(Error, Debug)]
pub enum CostError {
    // ==========================================================================
    // Source errors (Category: Source)
    // ==========================================================================
    /// A cost source returned an error for a resource.
    #[error("source {source_name} failed: {message}")]
    SourceFailed {
        source_name: String,
        message: String,
    },

    /// A cost source did not answer within its timeout.
    #[error("source {source_name} timed out after {timeout_ms}ms")]
    SourceTimeout {
        source_name: String,
        timeout_ms: u64,
    },

    /// A cost source panicked while handling a resource.
    #[error("source {source_name} panicked: {message}")]
    SourcePanicked {
        source_name: String,
        message: String,
    },

    /// The caller cancelled the batch before the call finished.
    #[error("operation cancelled")]
    Cancelled,

    // ==========================================================================
    // Aggregation errors (Category: Aggregation)
    // ==========================================================================
    /// Aggregation was asked to bucket an empty result list.
    #[error("cannot aggregate empty results")]
    EmptyResults,

    /// Group-by value is not valid for the requested operation.
    #[error("invalid group-by: {0}")]
    InvalidGroupBy(String),

    /// Results disagree on currency.
    #[error("mixed currencies: expected {expected}, found {found}")]
    MixedCurrencies {
        expected: String,
        found: String,
    },

    /// A result's end date precedes its start date (or it has no start date).
    #[error("invalid date range for {resource_id}: {start} to {end}")]
    InvalidDateRange {
        resource_id: String,
        start: String,
        end: String,
    },

    // ==========================================================================
    // Filter errors (Category: Filter)
    // ==========================================================================
    /// Filter expression is malformed.
    #[error("invalid filter '{expression}': {reason}")]
    InvalidFilter {
        expression: String,
        reason: String,
    },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Input file could not be parsed.
    #[error("invalid input {path}: {message}")]
    InvalidInput {
        path: String,
        message: String,
    },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Generic network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Failed to parse a plugin response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CostError {
    /// Map error to a CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_)
            | Self::ConfigInvalid { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidFilter { .. } => ExitCode::InvalidInput,

            Self::EmptyResults
            | Self::InvalidGroupBy(_)
            | Self::MixedCurrencies { .. }
            | Self::InvalidDateRange { .. } => ExitCode::AggregationFailed,

            Self::Timeout(_) | Self::SourceTimeout { .. } => ExitCode::Timeout,

            Self::SourceFailed { .. }
            | Self::SourcePanicked { .. }
            | Self::Cancelled
            | Self::Network(_)
            | Self::ParseResponse(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceFailed { .. }
            | Self::SourceTimeout { .. }
            | Self::SourcePanicked { .. }
            | Self::Cancelled => ErrorCategory::Source,

            Self::EmptyResults
            | Self::InvalidGroupBy(_)
            | Self::MixedCurrencies { .. }
            | Self::InvalidDateRange { .. } => ErrorCategory::Aggregation,

            Self::InvalidFilter { .. } => ErrorCategory::Filter,

            Self::Config(_) | Self::ConfigInvalid { .. } | Self::InvalidInput { .. } => {
                ErrorCategory::Configuration
            }

            Self::Network(_) | Self::Timeout(_) | Self::ParseResponse(_) => ErrorCategory::Network,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `CC-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SourceFailed { .. } => "CC-S001",
            Self::SourceTimeout { .. } => "CC-S002",
            Self::SourcePanicked { .. } => "CC-S003",
            Self::Cancelled => "CC-S004",

            Self::EmptyResults => "CC-G001",
            Self::InvalidGroupBy(_) => "CC-G002",
            Self::MixedCurrencies { .. } => "CC-G003",
            Self::InvalidDateRange { .. } => "CC-G004",

            Self::InvalidFilter { .. } => "CC-F001",

            Self::Config(_) => "CC-C001",
            Self::ConfigInvalid { .. } => "CC-C002",
            Self::InvalidInput { .. } => "CC-C003",

            Self::Network(_) => "CC-N001",
            Self::Timeout(_) => "CC-N002",
            Self::ParseResponse(_) => "CC-N003",

            Self::Io(_) => "CC-X001",
            Self::Json(_) => "CC-X002",
            Self::Other(_) => "CC-X099",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    ///
    /// The engine never retries; this is for callers layering their own policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::SourceTimeout { .. } | Self::Network(_)
        )
    }

    /// Returns the source name if this error is tied to one cost source.
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::SourceFailed { source_name, .. }
            | Self::SourceTimeout { source_name, .. }
            | Self::SourcePanicked { source_name, .. } => Some(source_name),
            _ => None,
        }
    }
}

/// Result type alias using `CostError`.
pub type Result<T> = std::result::Result<T, CostError>;
