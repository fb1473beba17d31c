//! Live reload messages and the per-site broadcast hub.

use serde::{Deserialize, Serialize};
use skinforge_build::ReloadEvent;
use tokio::sync::broadcast;

/// Path of the websocket endpoint.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Path of the client script.
pub const CLIENT_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Replace the stylesheet at `href` without reloading
    InjectCss { href: String },

    /// Show a build notice in the console
    Notice { message: String },
}

impl From<ReloadEvent> for ReloadMessage {
    fn from(event: ReloadEvent) -> Self {
        match event {
            ReloadEvent::Reload => ReloadMessage::Reload,
            ReloadEvent::InjectCss(href) => ReloadMessage::InjectCss { href },
            ReloadEvent::Notice(message) => ReloadMessage::Notice { message },
        }
    }
}

/// Broadcasts reload messages to every browser connected to one site.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser script that connects to the reload endpoint.
pub fn client_script(ws_url: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var attempts = 0;

  function connect() {{
    var ws = new WebSocket('{}');

    ws.onopen = function() {{
      attempts = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);

      switch (msg.type) {{
        case 'reload':
          location.reload();
          break;

        case 'inject_css':
          var links = document.querySelectorAll('link[rel="stylesheet"]');
          var found = false;
          links.forEach(function(link) {{
            var url = new URL(link.href, location.href);
            if (url.pathname === msg.href) {{
              url.searchParams.set('livereload', Date.now());
              link.href = url.toString();
              found = true;
            }}
          }});
          if (!found) {{
            location.reload();
          }}
          break;

        case 'notice':
          console.warn('[skinforge]', msg.message);
          break;

        case 'connected':
          console.log('[skinforge] live reload connected');
          break;
      }}
    }};

    ws.onclose = function() {{
      if (attempts < 10) {{
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        ws_url
    )
}
