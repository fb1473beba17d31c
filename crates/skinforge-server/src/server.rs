//! Live reload server, one per site.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use skinforge_build::{ReloadEvent, ReloadSink};
use skinforge_config::{BuildConfig, SiteConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::websocket::{client_script, LiveReloadHub, ReloadMessage, CLIENT_SCRIPT_PATH, LIVERELOAD_PATH};

/// Ports tried, counting up from the configured one, before giving up.
const PORT_ATTEMPTS: u16 = 10;

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Invalid watch pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },
}

/// One live reload hub per site, addressed by site label.
///
/// Build phases send through this as their reload sink.
#[derive(Debug, Clone, Default)]
pub struct HubSet {
    hubs: HashMap<String, LiveReloadHub>,
}

impl HubSet {
    pub fn new(config: &BuildConfig) -> Self {
        let hubs = config
            .sites
            .iter()
            .map(|site| (site.label(), LiveReloadHub::new()))
            .collect();
        Self { hubs }
    }

    pub fn get(&self, label: &str) -> Option<&LiveReloadHub> {
        self.hubs.get(label)
    }
}

impl ReloadSink for HubSet {
    fn send(&self, site: &str, event: ReloadEvent) {
        match self.hubs.get(site) {
            Some(hub) => hub.send(event.into()),
            None => tracing::debug!("No live reload hub for {}", site),
        }
    }
}

struct ServerState {
    hub: LiveReloadHub,
    ws_url: String,
}

/// Static file server with a live reload endpoint for one site.
pub struct LiveReloadServer {
    label: String,
    addr: SocketAddr,
    root: PathBuf,
    open: bool,
    hub: LiveReloadHub,
}

/// A server accepting connections in the background.
#[derive(Debug)]
pub struct RunningServer {
    pub label: String,
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl LiveReloadServer {
    /// Server for `site`, serving its `server.root` (default: the project
    /// root).
    pub fn new(config: &BuildConfig, site: &SiteConfig, hub: LiveReloadHub) -> Result<Self, ServerError> {
        let address = format!("{}:{}", site.server.host, site.server.port);
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(address.clone()))?;
        let root = match &site.server.root {
            Some(root) => config.resolve(root),
            None => config.root.clone(),
        };

        Ok(Self {
            label: site.label(),
            addr,
            root,
            open: site.server.open,
            hub,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self, addr: SocketAddr) -> Router {
        let state = Arc::new(ServerState {
            hub: self.hub.clone(),
            ws_url: format!("ws://{}{}", addr, LIVERELOAD_PATH),
        });

        Router::new()
            .route(LIVERELOAD_PATH, get(ws_handler))
            .route(CLIENT_SCRIPT_PATH, get(client_script_handler))
            .fallback_service(ServeDir::new(&self.root))
            .with_state(state)
    }

    /// Bind and start serving in the background.
    ///
    /// A port already in use falls through to the next one.
    pub async fn listen(self) -> Result<RunningServer, ServerError> {
        let listener = bind_available(self.addr).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(self.addr, e.to_string()))?;
        let app = self.router(addr);

        tracing::info!(
            "Serving {} from {} at http://{}",
            self.label,
            self.root.display(),
            addr
        );

        if self.open {
            if let Err(e) = open::that(format!("http://{}", addr)) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .map_err(|e| ServerError::BindError(addr, e.to_string()))
        });

        Ok(RunningServer {
            label: self.label,
            addr,
            handle,
        })
    }
}

async fn bind_available(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let mut last_error = None;

    for offset in 0..PORT_ATTEMPTS {
        let Some(port) = addr.port().checked_add(offset) else {
            break;
        };
        let candidate = SocketAddr::new(addr.ip(), port);

        match TcpListener::bind(candidate).await {
            Ok(listener) => {
                if offset > 0 {
                    tracing::warn!("{} is in use, using {} instead", addr, candidate);
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && addr.port() != 0 => {
                tracing::debug!("{} is in use", candidate);
                last_error = Some(e);
            }
            Err(e) => return Err(ServerError::BindError(candidate, e.to_string())),
        }
    }

    let message = match last_error {
        Some(e) => e.to_string(),
        None => "no free port".to_string(),
    };
    Err(ServerError::BindError(addr, message))
}

/// Start a live reload server for every site.
///
/// Sites sharing a port get the next free one. If any site fails to start,
/// the servers already running are stopped.
pub async fn serve_sites(config: &BuildConfig, hubs: &HubSet) -> Result<Vec<RunningServer>, ServerError> {
    let mut running: Vec<RunningServer> = Vec::with_capacity(config.sites.len());

    for site in &config.sites {
        let hub = hubs.get(&site.label()).cloned().unwrap_or_default();
        let started = match LiveReloadServer::new(config, site, hub) {
            Ok(server) => server.listen().await,
            Err(e) => Err(e),
        };

        match started {
            Ok(server) => running.push(server),
            Err(e) => {
                for server in &running {
                    server.handle.abort();
                }
                return Err(e);
            }
        }
    }

    Ok(running)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

async fn client_script_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        client_script(&state.ws_url),
    )
}
