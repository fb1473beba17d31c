//! Watch command: serve, then rebuild on changes.

use std::sync::Arc;

use anyhow::Result;
use skinforge_server::{serve_sites, FileWatcher, HubSet, WatchReactor};

use super::{pipeline, serve, Options};

/// Serve every site and react to source changes until interrupted.
pub async fn run(options: &Options) -> Result<()> {
    let config = options.load_config()?;
    let hubs = HubSet::new(&config);
    let servers = serve_sites(&config, &hubs).await?;

    let reactor = WatchReactor::new(pipeline(config, Some(Arc::new(hubs)))?)?;
    let roots = reactor.table().watch_roots();
    let (watcher, events) = FileWatcher::new(&roots)?;
    tracing::info!("Watching {} locations", roots.len());

    let reactor_task = tokio::spawn(reactor.run(events));
    let result = serve::wait(servers).await;

    reactor_task.abort();
    drop(watcher);
    result
}
