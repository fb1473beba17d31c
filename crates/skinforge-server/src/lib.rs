//! Live reload and watch support for skinforge.
//!
//! Serves each site with a websocket reload endpoint, and maps filesystem
//! changes to the phases that need to run again.

pub mod reactor;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use reactor::{Reaction, WatchReactor, WatchScope, WatchTable};
pub use server::{serve_sites, HubSet, LiveReloadServer, RunningServer, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{LiveReloadHub, ReloadMessage};
