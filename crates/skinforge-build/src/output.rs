//! Output layout under a site's skin directory.

use std::path::PathBuf;

use skinforge_config::SiteConfig;

/// Compiled stylesheet, relative to the skin directory.
pub const STYLESHEET: &str = "css/styles.css";

/// Compiled script bundle, relative to the skin directory.
pub const SCRIPTS: &str = "js/scripts.js";

/// Vendor detection script, relative to the skin directory.
pub const MODERNIZR: &str = "js/modernizr.js";

pub const IMAGES_DIR: &str = "images";

pub const FONTS_DIR: &str = "fonts";

/// Fingerprint manifest, relative to the skin directory.
pub const MANIFEST: &str = "rev-manifest.json";

/// Generated directories removed by the clean phase.
pub const GENERATED_DIRS: &[&str] = &["css", FONTS_DIR, IMAGES_DIR, "js"];

/// Path of a generated file, relative to the project root.
pub fn skin_file(site: &SiteConfig, name: &str) -> PathBuf {
    site.skin_path().join(name)
}

/// URL path of a generated file when the project root is served.
pub fn url_path(site: &SiteConfig, name: &str) -> String {
    let path = skin_file(site, name);
    let segments: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_url_paths() {
        let site = SiteConfig::new("acme", "default");

        assert_eq!(
            url_path(&site, STYLESHEET),
            "/skin/frontend/acme/default/css/styles.css"
        );
    }
}
