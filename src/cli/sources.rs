//! Shared plumbing for commands that query cost sources.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::cli::args::SourceArgs;
use crate::core::catalog::{LocalCatalog, LocalCatalogSource};
use crate::core::dispatch::Dispatcher;
use crate::core::filter::apply_filters;
use crate::core::models::ResourceDescriptor;
use crate::core::plugin::HttpPluginSource;
use crate::error::{CostError, Result};
use crate::render::RenderOptions;
use crate::storage::{AppPaths, ResolvedConfig};
use crate::util::env::should_use_color;

/// Read a JSON array of resource descriptors.
///
/// # Errors
///
/// Returns [`CostError::InvalidInput`] when the file is unreadable or not a descriptor array.
pub fn load_resources(path: &Path) -> Result<Vec<ResourceDescriptor>> {
    let invalid = |message: String| CostError::InvalidInput {
        path: path.display().to_string(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let resources: Vec<ResourceDescriptor> =
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

    tracing::debug!(path = %path.display(), count = resources.len(), "Loaded resources");
    Ok(resources)
}

/// Load resources and apply the command's filters.
///
/// # Errors
///
/// Returns an error for unreadable input or any malformed filter.
pub fn select_resources(args: &SourceArgs) -> Result<Vec<ResourceDescriptor>> {
    let resources = load_resources(&args.resources)?;
    let selected = apply_filters(&resources, &args.filters)?;
    if selected.len() != resources.len() {
        tracing::info!(
            total = resources.len(),
            selected = selected.len(),
            "Filtered resources"
        );
    }
    Ok(selected)
}

/// Build a dispatcher from resolved configuration.
///
/// The catalog comes from configuration, else from the default data
/// directory when a catalog file exists there.
///
/// # Errors
///
/// Returns an error when a plugin client cannot be built or the catalog does not parse.
pub fn build_dispatcher(config: &ResolvedConfig) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new()
        .with_timeout(config.timeout)
        .with_concurrency(config.concurrency);

    for plugin in &config.plugins {
        let source =
            HttpPluginSource::new(&plugin.name, &plugin.url, plugin.timeout_or(config.timeout))?;
        tracing::debug!(name = %plugin.name, url = %plugin.url, "Registered plugin");
        dispatcher = dispatcher.with_source(Arc::new(source));
    }

    let catalog_path = config.catalog.clone().or_else(|| {
        let fallback = AppPaths::new().default_catalog_file();
        fallback.exists().then_some(fallback)
    });
    if let Some(path) = catalog_path {
        let catalog = LocalCatalog::load(&path)?;
        tracing::debug!(path = %path.display(), entries = catalog.len(), "Loaded catalog");
        dispatcher = dispatcher.with_catalog(Arc::new(LocalCatalogSource::new(catalog)));
    }

    Ok(dispatcher)
}

/// A token cancelled on Ctrl-C.
#[must_use]
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding source calls");
            child.cancel();
        }
    });
    token
}

/// Rendering options from resolved configuration.
#[must_use]
pub fn render_options(config: &ResolvedConfig) -> RenderOptions {
    RenderOptions {
        format: config.format,
        pretty: config.pretty,
        color: should_use_color(config.no_color),
    }
}

/// Write rendered output to stdout, ending with a newline.
///
/// # Errors
///
/// Returns an error when stdout is closed or unwritable.
pub fn emit(output: &str) -> Result<()> {
    write_output(&mut std::io::stdout().lock(), output)
}

fn write_output(out: &mut impl Write, output: &str) -> Result<()> {
    out.write_all(output.as_bytes())
        .and_then(|()| {
            if output.ends_with('\n') {
                Ok(())
            } else {
                out.write_all(b"\n")
            }
        })
        .and_then(|()| out.flush())
        .context("failed to write command output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDir;

    #[test]
    fn load_resources_reads_descriptor_array() {
        let dir = TestDir::new();
        let path = dir.create_file(
            "resources.json",
            r#"[
                {"id": "vm-1", "type": "aws:ec2/instance:Instance", "provider": "aws",
                 "properties": {"tags": {"env": "prod"}}},
                {"id": "db-1", "type": "azure:sql:Database"}
            ]"#,
        );

        let resources = load_resources(&path).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].tags().unwrap()["env"], "prod");
        assert_eq!(resources[1].provider, "");
    }

    #[test]
    fn load_resources_rejects_bad_json() {
        let dir = TestDir::new();
        let path = dir.create_file("resources.json", "{not json");
        let err = load_resources(&path).unwrap_err();
        assert!(matches!(err, CostError::InvalidInput { .. }));
    }

    #[test]
    fn load_resources_missing_file_is_invalid_input() {
        let dir = TestDir::new();
        let err = load_resources(&dir.file_path("absent.json")).unwrap_err();
        assert!(matches!(err, CostError::InvalidInput { .. }));
    }

    #[test]
    fn select_resources_applies_filters() {
        let dir = TestDir::new();
        let path = dir.create_file(
            "resources.json",
            r#"[{"id": "a", "type": "aws:ec2/instance:Instance", "provider": "aws"},
                {"id": "b", "type": "gcp:compute/instance:Instance", "provider": "gcp"}]"#,
        );
        let args = SourceArgs {
            resources: path,
            filters: vec!["provider=gcp".to_string()],
            ..SourceArgs::default()
        };
        let selected = select_resources(&args).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "b");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_gains_trailing_newline() {
        let mut buf = Vec::new();
        write_output(&mut buf, "a\nb").unwrap();
        write_output(&mut buf, "c\n").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn unwritable_stdout_is_an_internal_error() {
        let err = write_output(&mut ClosedPipe, "rows").unwrap_err();
        assert!(matches!(err, CostError::Other(_)));
        assert!(err.to_string().contains("failed to write command output"));
        assert_eq!(err.error_code(), "CC-X099");
    }
}
