//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: Resource and catalog fixtures written to temp files
//! - `log_capture`: Thread-local capture of tracing events
//! - `logger`: Phase-tagged test progress output

pub mod fixtures;
pub mod log_capture;
pub mod logger;
