//! Full build command.

use std::time::Instant;

use anyhow::Result;

use super::{pipeline, summarize, Options};

/// Run the `default` task.
pub async fn run(options: &Options) -> Result<()> {
    let config = options.load_config()?;
    tracing::info!(
        "Building {} sites{}...",
        config.sites.len(),
        if config.production { " for production" } else { "" }
    );

    let start = Instant::now();
    let report = pipeline(config, None)?.run_default().await?;
    let failures = summarize(&report);

    tracing::info!("Finished in {}ms", start.elapsed().as_millis());

    if failures > 0 {
        anyhow::bail!("{} site failures", failures);
    }

    Ok(())
}
