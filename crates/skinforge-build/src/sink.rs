//! Reload notifications emitted by build phases.
//!
//! Compile tasks push events to a sink after writing output. The sink is a
//! broadcast target: tasks never wait on it and never own it.

use std::sync::Mutex;

/// What connected browsers should do after a phase wrote output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Full page reload
    Reload,

    /// Swap a stylesheet in place (URL path from the served root)
    InjectCss(String),

    /// Non-fatal notice, e.g. a compiler error
    Notice(String),
}

/// Receiver of reload events, keyed by site label.
pub trait ReloadSink: Send + Sync {
    fn send(&self, site: &str, event: ReloadEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReloadSink for NullSink {
    fn send(&self, _site: &str, _event: ReloadEvent) {}
}

/// Sink that keeps every event, for inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, ReloadEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<(String, ReloadEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ReloadSink for RecordingSink {
    fn send(&self, site: &str, event: ReloadEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((site.to_string(), event));
        }
    }
}
