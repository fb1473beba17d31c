//! Write an example config.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub fn run(path: &Path, yes: bool) -> Result<()> {
    if path.exists() && !yes {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }

    let example = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => DEFAULT_TOML,
        _ => DEFAULT_JSON,
    };

    fs::write(path, example).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    tracing::info!("Run 'skinforge build' to compile every site.");

    Ok(())
}

const DEFAULT_JSON: &str = r#"{
  "production": false,
  "sites": [
    {
      "package": "acme",
      "theme": "default",
      "components": ["accordion", "orbit", "reveal"],
      "compilation": {
        "stylesheets": [],
        "javascripts": [],
        "images": [],
        "includePaths": []
      },
      "watch": {
        "stylesheets": [],
        "javascripts": [],
        "images": [],
        "others": []
      },
      "server": {
        "host": "127.0.0.1",
        "port": 3000
      }
    }
  ],
  "custom": []
}
"#;

const DEFAULT_TOML: &str = r#"production = false

[[sites]]
package = "acme"
theme = "default"
components = ["accordion", "orbit", "reveal"]

[sites.compilation]
includePaths = []

[sites.server]
host = "127.0.0.1"
port = 3000
"#;
