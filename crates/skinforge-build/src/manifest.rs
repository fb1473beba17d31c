//! Fingerprinted copies and the rev manifest.
//!
//! Production builds write `css/styles-<fp>.css` and `js/scripts-<fp>.js`
//! next to the plain outputs, plus `rev-manifest.json` mapping each logical
//! path (relative to the skin directory) to its fingerprinted name:
//!
//! ```json
//! {
//!   "css/styles.css": "css/styles-3f2a9c01be.css",
//!   "js/scripts.js": "js/scripts-b81d0e4471.js"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use skinforge_config::SiteConfig;

use crate::error::BuildError;
use crate::output::{MANIFEST, SCRIPTS, STYLESHEET};

/// Hex characters kept from the content digest.
const FINGERPRINT_LEN: usize = 10;

/// Logical outputs that get fingerprinted.
const REVISIONED: &[&str] = &[STYLESHEET, SCRIPTS];

/// Logical name to fingerprinted name, relative to the skin directory.
pub type RevManifest = BTreeMap<String, String>;

/// Content fingerprint of a file's bytes.
pub fn fingerprint(content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    digest[..FINGERPRINT_LEN].to_string()
}

/// `css/styles.css` + `abc` -> `css/styles-abc.css`
pub fn revisioned_name(logical: &str, fingerprint: &str) -> String {
    let path = Path::new(logical);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(logical);
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, fingerprint, ext),
        None => format!("{}-{}", stem, fingerprint),
    };

    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), file),
        None => file,
    }
}

/// Fingerprint a site's compiled outputs and write the manifest.
///
/// Outputs that do not exist are skipped; with none present no manifest is
/// written and `None` is returned.
pub fn write_manifest(root: &Path, site: &SiteConfig) -> Result<Option<(PathBuf, RevManifest)>, BuildError> {
    let skin = root.join(site.skin_path());
    let mut manifest = RevManifest::new();

    for logical in REVISIONED {
        let source = skin.join(logical);
        let content = match fs::read(&source) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{}: nothing to fingerprint at {}", site.label(), source.display());
                continue;
            }
            Err(e) => {
                return Err(BuildError::ReadError(format!("{}: {}", source.display(), e)));
            }
        };

        let revisioned = revisioned_name(logical, &fingerprint(&content));
        fs::write(skin.join(&revisioned), &content)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", revisioned, e)))?;
        manifest.insert(logical.to_string(), revisioned);
    }

    if manifest.is_empty() {
        return Ok(None);
    }

    let path = skin.join(MANIFEST);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| BuildError::WriteError(e.to_string()))?;
    fs::write(&path, json).map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))?;

    Ok(Some((path, manifest)))
}
