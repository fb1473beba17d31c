//! Removal of previously generated output.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use skinforge_config::SiteConfig;

use crate::error::BuildError;
use crate::output::{GENERATED_DIRS, MANIFEST};

/// Delete every site's generated directories and manifest.
///
/// Blocking. Targets that do not exist are not an error. Returns the paths
/// that were actually removed.
pub fn clean<'a>(
    root: &Path,
    sites: impl IntoIterator<Item = &'a SiteConfig>,
) -> Result<Vec<PathBuf>, BuildError> {
    let mut removed = Vec::new();

    for site in sites {
        let skin = root.join(site.skin_path());

        for dir in GENERATED_DIRS {
            let target = skin.join(dir);
            if remove(&target, fs::remove_dir_all(&target))? {
                removed.push(target);
            }
        }

        let manifest = skin.join(MANIFEST);
        if remove(&manifest, fs::remove_file(&manifest))? {
            removed.push(manifest);
        }

        tracing::debug!("Cleaned {}", site.label());
    }

    Ok(removed)
}

fn remove(target: &Path, result: std::io::Result<()>) -> Result<bool, BuildError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::CleanError(format!("{}: {}", target.display(), e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_outputs_are_not_an_error() {
        let temp = tempdir().unwrap();
        let site = SiteConfig::new("acme", "default");

        let removed = clean(temp.path(), [&site]).unwrap();

        assert!(removed.is_empty());
    }

    #[test]
    fn removes_generated_output_only() {
        let temp = tempdir().unwrap();
        let site = SiteConfig::new("acme", "default");
        let skin = temp.path().join(site.skin_path());
        fs::create_dir_all(skin.join("css")).unwrap();
        fs::create_dir_all(skin.join("images/icons")).unwrap();
        fs::create_dir_all(skin.join("assets/stylesheets")).unwrap();
        fs::write(skin.join("css/styles.css"), "a{}").unwrap();
        fs::write(skin.join("rev-manifest.json"), "{}").unwrap();
        fs::write(skin.join("assets/stylesheets/styles.scss"), "").unwrap();

        let removed = clean(temp.path(), [&site]).unwrap();

        assert_eq!(removed.len(), 3);
        assert!(!skin.join("css").exists());
        assert!(!skin.join("images").exists());
        assert!(!skin.join("rev-manifest.json").exists());
        assert!(skin.join("assets/stylesheets/styles.scss").exists());
    }
}
