//! Routing of filesystem changes to rebuild phases.
//!
//! Every site gets four watch scopes. A changed path is matched against the
//! dispatch table; the matching scopes decide which phases rebuild for the
//! owning site, or whether connected browsers just reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use skinforge_build::sources::glob_base;
use skinforge_build::{BuildError, Phase, PhaseReport, Pipeline, ReloadEvent};
use skinforge_config::{BuildConfig, SiteConfig};
use tokio::sync::mpsc;

use crate::server::ServerError;
use crate::watcher::WatchEvent;

/// A group of watched locations that trigger the same reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchScope {
    Stylesheets,
    Scripts,
    Images,
    Others,
}

impl WatchScope {
    pub const ALL: [WatchScope; 4] = [
        WatchScope::Stylesheets,
        WatchScope::Scripts,
        WatchScope::Images,
        WatchScope::Others,
    ];

    /// Phases re-run on a change. Empty means reload only.
    pub fn phases(self) -> &'static [Phase] {
        match self {
            WatchScope::Stylesheets => &[Phase::Stylesheets],
            WatchScope::Scripts => &[Phase::Javascripts, Phase::Modernizr],
            WatchScope::Images => &[Phase::Images],
            WatchScope::Others => &[],
        }
    }

    /// The site's own globs for this scope, relative to the root, followed
    /// by the configured extras.
    fn globs(self, site: &SiteConfig) -> Vec<String> {
        let skin = site.skin_path();
        let (own, extra) = match self {
            WatchScope::Stylesheets => (
                skin.join("assets/stylesheets/**/*.scss"),
                &site.watch.stylesheets,
            ),
            WatchScope::Scripts => (skin.join("assets/javascripts/**/*.js"), &site.watch.javascripts),
            WatchScope::Images => (skin.join("assets/images/**/*"), &site.watch.images),
            WatchScope::Others => (site.template_path().join("**/*"), &site.watch.others),
        };

        std::iter::once(own.to_string_lossy().into_owned())
            .chain(extra.iter().cloned())
            .collect()
    }
}

/// What to do for one matched scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Rebuild {
        site: usize,
        phases: &'static [Phase],
    },
    Reload {
        site: usize,
    },
}

#[derive(Debug)]
struct ScopeEntry {
    site: usize,
    scope: WatchScope,
    patterns: Vec<Pattern>,

    /// Literal directory each pattern can match under
    bases: Vec<PathBuf>,
}

/// Dispatch table from watched paths to reactions.
#[derive(Debug)]
pub struct WatchTable {
    root: PathBuf,
    entries: Vec<ScopeEntry>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl WatchTable {
    pub fn new(config: &BuildConfig) -> Result<Self, ServerError> {
        let root = std::fs::canonicalize(&config.root).unwrap_or_else(|_| config.root.clone());
        let mut entries = Vec::new();

        for (site_index, site) in config.sites.iter().enumerate() {
            for scope in WatchScope::ALL {
                let globs = scope.globs(site);
                let patterns = globs
                    .iter()
                    .map(|glob| rooted_pattern(&root, glob))
                    .collect::<Result<Vec<_>, _>>()?;
                let bases = globs
                    .iter()
                    .map(|glob| root.join(glob_base(Path::new(glob))))
                    .collect();

                entries.push(ScopeEntry {
                    site: site_index,
                    scope,
                    patterns,
                    bases,
                });
            }
        }

        Ok(Self { root, entries })
    }

    /// Reactions for a changed path, one per matching scope, in table order.
    pub fn dispatch(&self, path: &Path) -> Vec<Reaction> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .patterns
                    .iter()
                    .any(|pattern| pattern.matches_path_with(&path, MATCH_OPTIONS))
            })
            .map(|entry| match entry.scope.phases() {
                [] => Reaction::Reload { site: entry.site },
                phases => Reaction::Rebuild {
                    site: entry.site,
                    phases,
                },
            })
            .collect()
    }

    /// Directories to hand to the filesystem watcher.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for base in self.entries.iter().flat_map(|entry| entry.bases.iter()) {
            if !roots.iter().any(|root| base.starts_with(root)) {
                roots.retain(|root| !root.starts_with(base));
                roots.push(base.clone());
            }
        }
        roots
    }
}

/// Pattern for `glob` under `root`. Metacharacters in the root itself match
/// literally.
fn rooted_pattern(root: &Path, glob: &str) -> Result<Pattern, ServerError> {
    let full = if Path::new(glob).is_absolute() {
        glob.to_string()
    } else {
        format!("{}/{}", Pattern::escape(&root.to_string_lossy()), glob)
    };

    Pattern::new(&full).map_err(|e| ServerError::PatternError {
        pattern: glob.to_string(),
        message: e.to_string(),
    })
}

/// Re-runs phases in response to watch events.
#[derive(Clone)]
pub struct WatchReactor {
    pipeline: Pipeline,
    table: Arc<WatchTable>,
}

impl WatchReactor {
    pub fn new(pipeline: Pipeline) -> Result<Self, ServerError> {
        let table = WatchTable::new(pipeline.config())?;
        Ok(Self {
            pipeline,
            table: Arc::new(table),
        })
    }

    pub fn table(&self) -> &WatchTable {
        &self.table
    }

    /// React to one changed path. Rebuilds only the owning site.
    pub async fn handle(&self, path: &Path) -> Result<Vec<PhaseReport>, BuildError> {
        let mut reports = Vec::new();

        for reaction in self.table.dispatch(path) {
            match reaction {
                Reaction::Rebuild { site, phases } => {
                    for &phase in phases {
                        tracing::info!(
                            "{} changed, rebuilding {} for {}",
                            path.display(),
                            phase,
                            self.label(site)
                        );
                        reports.push(self.pipeline.run_phase(phase, &[site]).await?);
                    }
                }
                Reaction::Reload { site } => {
                    tracing::info!("{} changed, reloading {}", path.display(), self.label(site));
                    self.pipeline
                        .sink()
                        .send(&self.label(site), ReloadEvent::Reload);
                }
            }
        }

        Ok(reports)
    }

    /// Handle events until the channel closes. Each event runs on its own
    /// task; overlapping rebuilds are not coordinated.
    pub async fn run(self, mut events: mpsc::Receiver<WatchEvent>) {
        while let Some(event) = events.recv().await {
            let reactor = self.clone();
            tokio::spawn(async move {
                if let Err(e) = reactor.handle(event.path()).await {
                    tracing::error!("Rebuild after {} failed: {}", event.path().display(), e);
                }
            });
        }
    }

    fn label(&self, site: usize) -> String {
        self.pipeline
            .config()
            .sites
            .get(site)
            .map(SiteConfig::label)
            .unwrap_or_default()
    }
}
