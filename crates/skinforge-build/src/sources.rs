//! Resolution of asset list entries to files on disk.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use glob::glob;

use crate::error::BuildError;

/// A file matched by an asset list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// File on disk
    pub path: PathBuf,

    /// Directory the entry is relative to: the glob base, or the file's parent
    pub base: PathBuf,
}

impl ResolvedSource {
    /// Path below the entry's base, used to lay out copied files.
    pub fn relative(&self) -> PathBuf {
        match self.path.strip_prefix(&self.base) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => self
                .path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default(),
        }
    }
}

/// Whether a path segment contains glob metacharacters.
pub fn is_glob(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

/// Leading components of a glob that contain no metacharacters.
pub fn glob_base(pattern: &Path) -> PathBuf {
    let mut base = PathBuf::new();
    for component in pattern.components() {
        if let Component::Normal(segment) = component {
            if is_glob(Path::new(segment)) {
                break;
            }
        }
        base.push(component);
    }
    base
}

/// Resolve entries against `root`, preserving entry order.
///
/// Globs expand in sorted order. Literal entries that do not exist are
/// skipped with a warning. A file matched twice keeps its first position.
pub fn resolve_sources(root: &Path, entries: &[PathBuf]) -> Result<Vec<ResolvedSource>, BuildError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for entry in entries {
        let full = root.join(entry);

        let matches: Vec<ResolvedSource> = if is_glob(entry) {
            expand(&full)?
        } else if full.is_file() {
            let base = full.parent().map(Path::to_path_buf).unwrap_or_default();
            vec![ResolvedSource { path: full, base }]
        } else {
            tracing::warn!("Source not found: {}", full.display());
            continue;
        };

        for source in matches {
            if seen.insert(source.path.clone()) {
                resolved.push(source);
            }
        }
    }

    Ok(resolved)
}

fn expand(pattern: &Path) -> Result<Vec<ResolvedSource>, BuildError> {
    let pattern_str = pattern.to_string_lossy();
    let base = glob_base(pattern);

    let paths = glob(&pattern_str).map_err(|e| BuildError::PatternError {
        pattern: pattern_str.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Error reading path: {}", e),
        }
    }
    files.sort();

    Ok(files
        .into_iter()
        .map(|path| ResolvedSource {
            path,
            base: base.clone(),
        })
        .collect())
}
