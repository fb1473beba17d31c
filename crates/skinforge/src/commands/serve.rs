//! Live reload server command.

use anyhow::Result;
use skinforge_server::{serve_sites, HubSet, RunningServer};

use super::Options;

/// Serve every site until interrupted.
pub async fn run(options: &Options) -> Result<()> {
    let config = options.load_config()?;
    let hubs = HubSet::new(&config);
    let servers = serve_sites(&config, &hubs).await?;

    wait(servers).await
}

/// Block until Ctrl-C or until a server stops.
pub async fn wait(servers: Vec<RunningServer>) -> Result<()> {
    if servers.is_empty() {
        tracing::warn!("No sites configured, nothing to serve");
        return Ok(());
    }

    let mut handles = tokio::task::JoinSet::new();
    for server in servers {
        let label = server.label;
        let handle = server.handle;
        handles.spawn(async move { (label, handle.await) });
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        }
        Some(joined) = handles.join_next() => {
            let (label, result) = joined?;
            result??;
            tracing::warn!("Server for {} stopped", label);
        }
    }

    Ok(())
}
