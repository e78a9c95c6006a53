//! CLI argument parsing and command dispatch.

pub mod actual;
pub mod args;
pub mod projected;
pub mod recommendations;
pub mod sources;
pub mod validate_filter;

pub use args::{Cli, Commands, OutputFormat};
