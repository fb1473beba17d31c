//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use skinforge_build::{Pipeline, ReloadSink, RunReport};
use skinforge_components::Catalog;
use skinforge_config::BuildConfig;

pub mod build;
pub mod init;
pub mod run;
pub mod serve;
pub mod watch;

/// Global flags shared by every subcommand.
pub struct Options {
    pub config: PathBuf,
    pub production: bool,
}

impl Options {
    /// Load and normalize the config, applying `--production`.
    pub fn load_config(&self) -> Result<BuildConfig> {
        let config = skinforge_config::load(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?
            .with_production(self.production);

        tracing::debug!(
            "Loaded {} sites from {} (production: {})",
            config.sites.len(),
            self.config.display(),
            config.production
        );

        Ok(config)
    }
}

/// Pipeline over the Foundation catalog, optionally sending reload events.
pub fn pipeline(config: BuildConfig, sink: Option<Arc<dyn ReloadSink>>) -> Result<Pipeline> {
    let pipeline = Pipeline::new(config, Catalog::foundation())?;
    Ok(match sink {
        Some(sink) => pipeline.with_sink(sink),
        None => pipeline,
    })
}

/// Log a run summary. Returns the number of site failures.
pub fn summarize(report: &RunReport) -> usize {
    for phase in &report.phases {
        tracing::debug!(
            "{}: {} files, {} failures, {} skipped",
            phase.phase,
            phase.built.len(),
            phase.failures.len(),
            phase.skipped.len()
        );
    }

    let failures = report.failures().count();
    if failures > 0 {
        for failure in report.failures() {
            tracing::warn!("{}", failure);
        }
    }
    failures
}
