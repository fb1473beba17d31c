//! Named task invocation.

use anyhow::Result;

use super::{pipeline, serve, summarize, watch, Options};

/// Run each named task in order. `serve` and `watch` run until interrupted.
pub async fn run(options: &Options, tasks: &[String]) -> Result<()> {
    let pipeline = pipeline(options.load_config()?, None)?;
    let mut failures = 0;

    for task in tasks {
        match task.as_str() {
            "serve" => return serve::run(options).await,
            "watch" => return watch::run(options).await,
            name => {
                tracing::info!("Running {}...", name);
                failures += summarize(&pipeline.run(name).await?);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} site failures", failures);
    }

    Ok(())
}
