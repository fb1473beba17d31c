//! Build configuration loading and normalization.
//!
//! User configuration is merged with defaults and validated once at startup.
//! The resulting [`BuildConfig`] is immutable for the rest of the process.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::site::SiteConfig;

/// Validated build configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Production mode: minified output and a fingerprint manifest
    pub production: bool,

    /// Sites to build, in order
    pub sites: Vec<SiteConfig>,

    /// Project root every relative path resolves against
    pub root: PathBuf,

    /// Boilerplate package directory, relative to the root
    pub vendor_dir: PathBuf,

    /// External commands run during the custom phase
    pub custom: Vec<CustomTask>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            production: false,
            sites: Vec::new(),
            root: PathBuf::from("."),
            vendor_dir: PathBuf::from(DEFAULT_VENDOR_DIR),
            custom: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Force production mode on.
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = self.production || production;
        self
    }

    /// Resolve a project-relative path against the root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }
}

/// An external command registered as a task during the custom phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTask {
    /// Task name
    pub name: String,

    /// Program to run
    pub command: String,

    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,
}

const DEFAULT_VENDOR_DIR: &str = "node_modules/magento-boilerplate";

/// Configuration as written by the user, before defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    production: Option<bool>,
    sites: Option<Vec<SiteConfig>>,
    root: Option<PathBuf>,
    vendor_dir: Option<PathBuf>,
    #[serde(default)]
    custom: Vec<CustomTask>,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Site #{site} is missing required field `{field}`")]
    MissingField { site: usize, field: &'static str },

    #[error("Custom task #{index} has an empty {field}")]
    InvalidCustomTask { index: usize, field: &'static str },

    #[error("Unsupported config format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// Load configuration from a `.json` or `.toml` file.
///
/// A relative `root` in the file resolves against the file's directory.
pub fn load(path: &Path) -> Result<BuildConfig, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut config = match ext {
        "json" => from_json_str(&content),
        "toml" => from_toml_str(&content),
        _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
    .map_err(|e| match e {
        ConfigError::ParseError { message, .. } => ConfigError::ParseError {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })?;

    if config.root.is_relative() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            config.root = dir.join(&config.root);
        }
    }

    Ok(config)
}

/// Parse and normalize a JSON configuration document.
pub fn from_json_str(content: &str) -> Result<BuildConfig, ConfigError> {
    let raw: RawConfig = serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<json>".to_string(),
        message: e.to_string(),
    })?;
    normalize(raw)
}

/// Parse and normalize a TOML configuration document.
pub fn from_toml_str(content: &str) -> Result<BuildConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<toml>".to_string(),
        message: e.to_string(),
    })?;
    normalize(raw)
}

/// Merge defaults and validate required fields.
fn normalize(raw: RawConfig) -> Result<BuildConfig, ConfigError> {
    let defaults = BuildConfig::default();
    let sites = raw.sites.unwrap_or_default();

    for (index, site) in sites.iter().enumerate() {
        if site.package.trim().is_empty() {
            return Err(ConfigError::MissingField {
                site: index,
                field: "package",
            });
        }
        if site.theme.trim().is_empty() {
            return Err(ConfigError::MissingField {
                site: index,
                field: "theme",
            });
        }
    }

    for (index, task) in raw.custom.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(ConfigError::InvalidCustomTask {
                index,
                field: "name",
            });
        }
        if task.command.trim().is_empty() {
            return Err(ConfigError::InvalidCustomTask {
                index,
                field: "command",
            });
        }
    }

    Ok(BuildConfig {
        production: raw.production.unwrap_or(defaults.production),
        sites,
        root: raw.root.unwrap_or(defaults.root),
        vendor_dir: raw.vendor_dir.unwrap_or(defaults.vendor_dir),
        custom: raw.custom,
    })
}
