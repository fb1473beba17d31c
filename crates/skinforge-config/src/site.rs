//! Per-site configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One themed destination of the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Design package (e.g. "rwd")
    #[serde(default)]
    pub package: String,

    /// Theme within the package
    #[serde(default)]
    pub theme: String,

    /// Optional components selected by this site, in order
    #[serde(default)]
    pub components: Vec<String>,

    /// Extra sources fed to the compilers
    #[serde(default)]
    pub compilation: Compilation,

    /// Extra globs watched for changes
    #[serde(default)]
    pub watch: WatchGlobs,

    /// Live reload server options
    #[serde(default)]
    pub server: ServerOptions,
}

impl SiteConfig {
    /// Create a site with empty overrides.
    pub fn new(package: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            theme: theme.into(),
            components: Vec::new(),
            compilation: Compilation::default(),
            watch: WatchGlobs::default(),
            server: ServerOptions::default(),
        }
    }

    /// Human-readable label, "package/theme".
    pub fn label(&self) -> String {
        format!("{}/{}", self.package, self.theme)
    }

    /// Template directory, relative to the project root.
    pub fn template_path(&self) -> PathBuf {
        PathBuf::from("app/design/frontend")
            .join(&self.package)
            .join(&self.theme)
    }

    /// Skin directory, relative to the project root. Sources live under
    /// `assets/`, compiled output beside it.
    pub fn skin_path(&self) -> PathBuf {
        PathBuf::from("skin/frontend")
            .join(&self.package)
            .join(&self.theme)
    }
}

/// Site-specific compilation inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    #[serde(default)]
    pub stylesheets: Vec<String>,

    #[serde(default)]
    pub javascripts: Vec<String>,

    #[serde(default)]
    pub images: Vec<String>,

    /// Extra stylesheet include directories
    #[serde(default)]
    pub include_paths: Vec<String>,
}

/// Site-specific watch globs, added to each scope's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchGlobs {
    #[serde(default)]
    pub stylesheets: Vec<String>,

    #[serde(default)]
    pub javascripts: Vec<String>,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub others: Vec<String>,
}

/// Options for the site's live reload server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served statically (defaults to the project root)
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Open a browser on start
    #[serde(default)]
    pub open: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            root: None,
            open: false,
        }
    }
}
