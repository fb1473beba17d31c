//! Build configuration for skinforge.
//!
//! Loads the site list from JSON or TOML, fills defaults and validates the
//! shape before any build phase runs.

pub mod config;
pub mod site;

pub use config::{from_json_str, from_toml_str, load, BuildConfig, ConfigError, CustomTask};
pub use site::{Compilation, ServerOptions, SiteConfig, WatchGlobs};
