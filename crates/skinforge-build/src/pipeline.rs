//! Build phases and the default task graph.
//!
//! `default` is Clean, then the five compile phases concurrently, then
//! Manifest, then Custom. Each compile phase builds its sites in parallel on
//! the rayon pool from inside a blocking task.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use skinforge_components::{Catalog, ComponentResolver};
use skinforge_config::{BuildConfig, SiteConfig};
use tempfile::TempDir;

use crate::clean::clean;
use crate::error::{BuildError, SiteFailure};
use crate::hooks::CommandExtension;
use crate::phases::{self, SiteJob, SiteOutcome};
use crate::sink::{NullSink, ReloadEvent, ReloadSink};
use crate::tasks::{lock, Extension, TaskGraph, TaskSpec};

/// A fixed build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Clean,
    Stylesheets,
    Javascripts,
    Modernizr,
    Images,
    Fonts,
    Manifest,
}

type SiteRunner = fn(&SiteJob<'_>) -> Result<SiteOutcome, BuildError>;

impl Phase {
    /// Phases with no dependency on one another.
    pub const COMPILE_GROUP: [Phase; 5] = [
        Phase::Stylesheets,
        Phase::Javascripts,
        Phase::Modernizr,
        Phase::Images,
        Phase::Fonts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Clean => "clean",
            Phase::Stylesheets => "stylesheets",
            Phase::Javascripts => "javascripts",
            Phase::Modernizr => "modernizr",
            Phase::Images => "images",
            Phase::Fonts => "fonts",
            Phase::Manifest => "manifest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clean" => Some(Phase::Clean),
            "stylesheets" => Some(Phase::Stylesheets),
            "javascripts" => Some(Phase::Javascripts),
            "modernizr" => Some(Phase::Modernizr),
            "images" => Some(Phase::Images),
            "fonts" => Some(Phase::Fonts),
            "manifest" => Some(Phase::Manifest),
            _ => None,
        }
    }

    fn runner(self) -> Option<SiteRunner> {
        match self {
            Phase::Clean => None,
            Phase::Stylesheets => Some(phases::stylesheets),
            Phase::Javascripts => Some(phases::javascripts),
            Phase::Modernizr => Some(phases::modernizr),
            Phase::Images => Some(phases::images),
            Phase::Fonts => Some(phases::fonts),
            Phase::Manifest => Some(phases::manifest),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What one phase did across its sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,

    /// Files written or removed
    pub built: Vec<PathBuf>,

    /// Sites that produced nothing, and why
    pub failures: Vec<SiteFailure>,

    /// Labels of sites the phase did not apply to
    pub skipped: Vec<String>,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            built: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a named run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Reports in completion order
    pub phases: Vec<PhaseReport>,

    /// Task names of each executed wave
    pub waves: Vec<Vec<String>>,

    /// Sites left out because their components did not resolve
    pub excluded: Vec<SiteFailure>,
}

impl RunReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|report| report.phase == phase)
    }

    /// Every site failure, including excluded sites.
    pub fn failures(&self) -> impl Iterator<Item = &SiteFailure> {
        self.excluded
            .iter()
            .chain(self.phases.iter().flat_map(|report| report.failures.iter()))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Drives build phases for every configured site.
///
/// Cheap to clone; clones share the configuration, sink and scratch
/// directory holding the variable documents.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<BuildConfig>,
    catalog: Arc<Catalog>,
    sink: Arc<dyn ReloadSink>,
    extension: Arc<dyn Extension>,
    scratch: Arc<TempDir>,
}

impl Pipeline {
    /// Create a pipeline. Custom command tasks from the config are installed
    /// as the extension.
    pub fn new(config: BuildConfig, catalog: Catalog) -> Result<Self, BuildError> {
        let scratch = tempfile::Builder::new()
            .prefix("skinforge-")
            .tempdir()
            .map_err(|e| BuildError::WriteError(format!("scratch directory: {}", e)))?;

        Ok(Self {
            extension: Arc::new(CommandExtension::from_config(&config)),
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            sink: Arc::new(NullSink),
            scratch: Arc::new(scratch),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReloadSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extension = extension;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn ReloadSink> {
        &self.sink
    }

    /// Directory holding the per-site variable documents.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Indices of every configured site.
    pub fn all_sites(&self) -> Vec<usize> {
        (0..self.config.sites.len()).collect()
    }

    /// Resolve every site's components before anything is written.
    ///
    /// Returns the indices of sites that resolved and the failures of those
    /// that did not. Failures are logged and sent to the sink.
    pub fn preflight(&self) -> (Vec<usize>, Vec<SiteFailure>) {
        let resolver = ComponentResolver::new(&self.catalog);
        let mut ready = Vec::new();
        let mut excluded = Vec::new();

        for (index, site) in self.config.sites.iter().enumerate() {
            match resolver.resolve(&site.components) {
                Ok(_) => ready.push(index),
                Err(source) => {
                    let failure = SiteFailure::Component {
                        site: site.label(),
                        source,
                    };
                    tracing::error!("{}; site excluded from the build", failure);
                    self.sink
                        .send(&site.label(), ReloadEvent::Notice(failure.to_string()));
                    excluded.push(failure);
                }
            }
        }

        (ready, excluded)
    }

    /// Remove generated output of the given sites. Blocking.
    pub fn clean(&self, sites: &[usize]) -> Result<PhaseReport, BuildError> {
        let removed = clean(&self.config.root, self.sites(sites))?;
        tracing::info!("Cleaned {} paths", removed.len());

        let mut report = PhaseReport::new(Phase::Clean);
        report.built = removed;
        Ok(report)
    }

    /// Run one phase for the given sites. Blocking.
    pub fn run_phase_blocking(&self, phase: Phase, sites: &[usize]) -> Result<PhaseReport, BuildError> {
        let Some(runner) = phase.runner() else {
            return self.clean(sites);
        };

        let selected: Vec<&SiteConfig> = self.sites(sites).collect();
        let outcomes: Vec<(String, Result<SiteOutcome, BuildError>)> = selected
            .par_iter()
            .map(|site| (site.label(), runner(&self.job(site))))
            .collect();

        let mut report = PhaseReport::new(phase);
        for (label, outcome) in outcomes {
            match outcome? {
                SiteOutcome::Built(paths) => report.built.extend(paths),
                SiteOutcome::Failed(failure) => report.failures.push(failure),
                SiteOutcome::Skipped => report.skipped.push(label),
            }
        }

        Ok(report)
    }

    /// Run one phase for the given sites on the blocking pool.
    pub async fn run_phase(&self, phase: Phase, sites: &[usize]) -> Result<PhaseReport, BuildError> {
        let pipeline = self.clone();
        let sites = sites.to_vec();
        tokio::task::spawn_blocking(move || pipeline.run_phase_blocking(phase, &sites))
            .await
            .map_err(|e| BuildError::TaskPanicked(e.to_string()))?
    }

    /// Clean, compile group, manifest, custom.
    pub async fn run_default(&self) -> Result<RunReport, BuildError> {
        let (sites, excluded) = self.preflight();
        let reports = Arc::new(Mutex::new(Vec::new()));

        let mut graph = TaskGraph::new();
        graph.add(self.phase_task(Phase::Clean, &[], &sites, &reports))?;
        for phase in Phase::COMPILE_GROUP {
            graph.add(self.phase_task(phase, &[Phase::Clean.name()], &sites, &reports))?;
        }
        let group: Vec<&str> = Phase::COMPILE_GROUP.iter().map(|p| p.name()).collect();
        graph.add(self.phase_task(Phase::Manifest, &group, &sites, &reports))?;
        graph.add(self.custom_task(&[Phase::Manifest.name()]))?;

        let waves = graph.run().await?;
        let phases = std::mem::take(&mut *lock(&reports));

        Ok(RunReport {
            phases,
            waves,
            excluded,
        })
    }

    /// Run a task by name: `default`, `custom` or a phase name.
    pub async fn run(&self, name: &str) -> Result<RunReport, BuildError> {
        match name {
            "default" => self.run_default().await,
            "custom" => {
                let mut graph = TaskGraph::new();
                graph.add(self.custom_task(&[]))?;
                let waves = graph.run().await?;
                Ok(RunReport {
                    waves,
                    ..RunReport::default()
                })
            }
            _ => {
                let phase =
                    Phase::from_name(name).ok_or_else(|| BuildError::UnknownTask(name.to_string()))?;
                let (sites, excluded) = match phase {
                    Phase::Clean => (self.all_sites(), Vec::new()),
                    _ => self.preflight(),
                };
                let report = self.run_phase(phase, &sites).await?;
                Ok(RunReport {
                    phases: vec![report],
                    waves: vec![vec![phase.name().to_string()]],
                    excluded,
                })
            }
        }
    }

    fn sites<'s>(&'s self, indices: &'s [usize]) -> impl Iterator<Item = &'s SiteConfig> + 's {
        indices.iter().filter_map(|&index| self.config.sites.get(index))
    }

    fn job<'s>(&'s self, site: &'s SiteConfig) -> SiteJob<'s> {
        SiteJob {
            config: &self.config,
            catalog: &self.catalog,
            site,
            scratch_dir: self.scratch.path(),
            sink: self.sink.as_ref(),
        }
    }

    fn phase_task(
        &self,
        phase: Phase,
        deps: &[&str],
        sites: &[usize],
        reports: &Arc<Mutex<Vec<PhaseReport>>>,
    ) -> TaskSpec {
        let pipeline = self.clone();
        let sites = sites.to_vec();
        let reports = Arc::clone(reports);

        TaskSpec::new(phase.name(), deps, move |_| {
            let pipeline = pipeline.clone();
            let sites = sites.clone();
            let reports = Arc::clone(&reports);
            async move {
                let report = pipeline.run_phase(phase, &sites).await?;
                lock(&reports).push(report);
                Ok(())
            }
        })
    }

    fn custom_task(&self, deps: &[&str]) -> TaskSpec {
        let extension = Arc::clone(&self.extension);
        TaskSpec::new("custom", deps, move |handle| {
            let extension = Arc::clone(&extension);
            async move {
                extension.extend(&handle);
                Ok(())
            }
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("scratch", &self.scratch.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::sink::RecordingSink;
    use crate::tasks::TaskHandle;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project(root: &Path, production: bool, sites: Vec<SiteConfig>) -> BuildConfig {
        for site in &sites {
            let skin = site.skin_path();
            let skin = skin.to_str().unwrap();
            write(
                root,
                &format!("{skin}/assets/stylesheets/styles.scss"),
                "@if $include-grid-component { .row { width: 100%; } }\n",
            );
            write(
                root,
                &format!("{skin}/assets/javascripts/app.js"),
                "window.app = function (x) { return x + 1; };\n",
            );
            write(root, &format!("{skin}/assets/images/logo.png"), "png");
        }
        BuildConfig {
            production,
            sites,
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn phase_names_round_trip() {
        for phase in [Phase::Clean, Phase::Manifest]
            .into_iter()
            .chain(Phase::COMPILE_GROUP)
        {
            assert_eq!(Phase::from_name(phase.name()), Some(phase));
        }
        assert_eq!(Phase::from_name("serve"), None);
    }

    #[tokio::test]
    async fn default_runs_phases_in_order() {
        let temp = tempdir().unwrap();
        let config = project(temp.path(), false, vec![SiteConfig::new("acme", "default")]);
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        let report = pipeline.run_default().await.unwrap();

        let names = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(
            report.waves,
            vec![
                names(&["clean"]),
                names(&["fonts", "images", "javascripts", "modernizr", "stylesheets"]),
                names(&["manifest"]),
                names(&["custom"]),
            ]
        );
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn development_build_writes_no_manifest() {
        let temp = tempdir().unwrap();
        let config = project(temp.path(), false, vec![SiteConfig::new("acme", "default")]);
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        let report = pipeline.run_default().await.unwrap();

        let skin = temp.path().join("skin/frontend/acme/default");
        assert!(skin.join("css/styles.css").exists());
        assert!(skin.join("js/scripts.js").exists());
        assert!(skin.join("images/logo.png").exists());
        assert!(!skin.join("rev-manifest.json").exists());

        let manifest = report.phase(Phase::Manifest).unwrap();
        assert!(manifest.built.is_empty());
        assert_eq!(manifest.skipped, vec!["acme/default".to_string()]);
    }

    #[tokio::test]
    async fn production_build_fingerprints_outputs() {
        let temp = tempdir().unwrap();
        let config = project(temp.path(), true, vec![SiteConfig::new("acme", "default")]);
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        pipeline.run_default().await.unwrap();

        let skin = temp.path().join("skin/frontend/acme/default");
        let manifest: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(skin.join("rev-manifest.json")).unwrap())
                .unwrap();
        let keys: Vec<&str> = manifest.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["css/styles.css", "js/scripts.js"]);
        for revisioned in manifest.values() {
            assert!(skin.join(revisioned).exists());
        }
    }

    #[tokio::test]
    async fn sites_build_with_their_own_configuration() {
        let temp = tempdir().unwrap();
        let mut first = SiteConfig::new("acme", "default");
        first.components = vec!["orbit".to_string()];
        let second = SiteConfig::new("acme", "outlet");
        let vendor = "node_modules/magento-boilerplate/node_modules/foundation-sites/js/foundation";
        write(temp.path(), &format!("{vendor}/foundation.orbit.js"), "var orbit = 1;");
        let config = project(temp.path(), false, vec![first, second]);
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        pipeline.run("javascripts").await.unwrap();

        let bundle = |theme: &str| {
            fs::read_to_string(temp.path().join(format!("skin/frontend/acme/{theme}/js/scripts.js")))
                .unwrap()
        };
        assert!(bundle("default").contains("var orbit = 1;"));
        assert!(!bundle("outlet").contains("var orbit = 1;"));
    }

    #[tokio::test]
    async fn stylesheets_build_with_their_own_components() {
        let temp = tempdir().unwrap();
        let mut first = SiteConfig::new("acme", "default");
        first.components = vec!["orbit".to_string()];
        let second = SiteConfig::new("acme", "outlet");
        let config = project(temp.path(), false, vec![first, second]);
        for theme in ["default", "outlet"] {
            write(
                temp.path(),
                &format!("skin/frontend/acme/{theme}/assets/stylesheets/styles.scss"),
                "@if $include-orbit-component { .orbit { color: blue; } }\n.page { margin: 0; }\n",
            );
        }
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        let report = pipeline.run("stylesheets").await.unwrap();

        assert!(report.is_success());
        let css = |theme: &str| {
            fs::read_to_string(temp.path().join(format!("skin/frontend/acme/{theme}/css/styles.css")))
                .unwrap()
        };
        assert!(css("default").contains(".orbit"));
        assert!(!css("outlet").contains(".orbit"));
        assert!(css("outlet").contains(".page"));
    }

    #[tokio::test]
    async fn stylesheet_error_stays_with_its_site() {
        let temp = tempdir().unwrap();
        let config = project(
            temp.path(),
            false,
            vec![SiteConfig::new("acme", "broken"), SiteConfig::new("acme", "default")],
        );
        write(
            temp.path(),
            "skin/frontend/acme/broken/assets/stylesheets/styles.scss",
            ".a { color: $undefined-color; }\n",
        );
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        let report = pipeline.run_default().await.unwrap();

        let failures: Vec<&SiteFailure> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            SiteFailure::Compile(CompileError::Stylesheet { site, .. }) if site == "acme/broken"
        ));
        let skin = |theme: &str| temp.path().join(format!("skin/frontend/acme/{theme}"));
        assert!(!skin("broken").join("css/styles.css").exists());
        assert!(skin("broken").join("js/scripts.js").exists());
        assert!(skin("broken").join("images/logo.png").exists());
        assert!(skin("default").join("css/styles.css").exists());
        assert_eq!(report.waves.last().unwrap(), &vec!["custom".to_string()]);
    }

    #[tokio::test]
    async fn unknown_component_excludes_only_that_site() {
        let temp = tempdir().unwrap();
        let mut broken = SiteConfig::new("acme", "broken");
        broken.components = vec!["carousel".to_string()];
        let config = project(
            temp.path(),
            false,
            vec![broken, SiteConfig::new("acme", "default")],
        );
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(config, Catalog::foundation())
            .unwrap()
            .with_sink(sink.clone());

        let report = pipeline.run_default().await.unwrap();

        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].site(), "acme/broken");
        assert!(!report.is_success());
        assert!(!temp.path().join("skin/frontend/acme/broken/css").exists());
        assert!(!temp.path().join("skin/frontend/acme/broken/images").exists());
        assert!(temp.path().join("skin/frontend/acme/default/css/styles.css").exists());
        assert!(sink
            .events()
            .iter()
            .any(|(site, event)| site == "acme/broken" && matches!(event, ReloadEvent::Notice(_))));
    }

    #[tokio::test]
    async fn extension_tasks_run_after_custom() {
        struct Marker(PathBuf);

        impl Extension for Marker {
            fn extend(&self, tasks: &TaskHandle) {
                let path = self.0.clone();
                tasks.register(TaskSpec::new("mark", &[], move |_| {
                    let path = path.clone();
                    async move {
                        fs::write(&path, "done").map_err(|e| BuildError::WriteError(e.to_string()))
                    }
                }));
            }
        }

        let temp = tempdir().unwrap();
        let config = project(temp.path(), false, vec![SiteConfig::new("acme", "default")]);
        let marker = temp.path().join("marker");
        let pipeline = Pipeline::new(config, Catalog::foundation())
            .unwrap()
            .with_extension(Arc::new(Marker(marker.clone())));

        let report = pipeline.run_default().await.unwrap();

        assert_eq!(report.waves.last().unwrap(), &vec!["mark".to_string()]);
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn unknown_task_name_is_rejected() {
        let pipeline = Pipeline::new(BuildConfig::default(), Catalog::foundation()).unwrap();

        assert!(matches!(
            pipeline.run("deploy").await,
            Err(BuildError::UnknownTask(name)) if name == "deploy"
        ));
    }

    #[tokio::test]
    async fn clean_task_succeeds_on_fresh_project() {
        let temp = tempdir().unwrap();
        let config = project(temp.path(), false, vec![SiteConfig::new("acme", "default")]);
        let pipeline = Pipeline::new(config, Catalog::foundation()).unwrap();

        let report = pipeline.run("clean").await.unwrap();

        assert_eq!(report.phases[0].phase, Phase::Clean);
        assert!(report.phases[0].built.is_empty());
    }
}
