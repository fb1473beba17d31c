//! Per-site work for each build phase.
//!
//! Every function here handles one site and writes only below that site's
//! skin directory, so phases for different sites and different asset
//! classes never touch the same files.

use std::fs;
use std::path::{Path, PathBuf};

use skinforge_components::{Catalog, ComponentError};
use skinforge_config::{BuildConfig, SiteConfig};

use crate::assets::{AssetList, AssetListBuilder};
use crate::compile::AssetPipeline;
use crate::error::{BuildError, CompileError, SiteFailure};
use crate::manifest::write_manifest;
use crate::output::{self, FONTS_DIR, IMAGES_DIR, MODERNIZR, SCRIPTS, STYLESHEET};
use crate::sink::{ReloadEvent, ReloadSink};
use crate::sources::resolve_sources;

/// Everything a phase needs to build one site.
pub struct SiteJob<'a> {
    pub config: &'a BuildConfig,
    pub catalog: &'a Catalog,
    pub site: &'a SiteConfig,
    pub scratch_dir: &'a Path,
    pub sink: &'a dyn ReloadSink,
}

/// Result of a phase for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Files written
    Built(Vec<PathBuf>),

    /// Nothing written; the failure was already reported
    Failed(SiteFailure),

    /// The phase does not apply
    Skipped,
}

impl<'a> SiteJob<'a> {
    fn builder(&self) -> AssetListBuilder<'a> {
        AssetListBuilder::new(self.catalog, &self.config.vendor_dir, self.scratch_dir)
    }

    fn label(&self) -> String {
        self.site.label()
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.config.resolve(output::skin_file(self.site, name))
    }

    /// Report a failure through the sink and the log.
    fn fail(&self, failure: SiteFailure) -> SiteOutcome {
        tracing::error!("{}", failure);
        self.sink.send(&self.label(), ReloadEvent::Notice(failure.to_string()));
        SiteOutcome::Failed(failure)
    }

    fn list(&self, result: Result<AssetList, ComponentError>) -> Result<AssetList, SiteOutcome> {
        result.map_err(|source| {
            self.fail(SiteFailure::Component {
                site: self.label(),
                source,
            })
        })
    }
}

/// Compile the site's stylesheet to `css/styles.css`.
pub fn stylesheets(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    let list = match job.list(job.builder().stylesheets(job.site)) {
        Ok(list) => list,
        Err(outcome) => return Ok(outcome),
    };

    if let (Some(document), Some(location)) = (&list.variables, list.sources.first()) {
        write_file(location, document.as_bytes())?;
    }

    let sources = resolve_sources(&job.config.root, &list.sources)?;
    let include_paths: Vec<PathBuf> = list
        .include_paths
        .iter()
        .map(|path| job.config.resolve(path))
        .collect();

    let source = AssetPipeline::concat(&sources)?;
    let production = job.config.production;
    let css = match AssetPipeline::compile_scss(&source, &include_paths, production)
        .and_then(|css| AssetPipeline::postprocess_css(&css, production))
    {
        Ok(css) => css,
        Err(message) => {
            return Ok(job.fail(
                CompileError::Stylesheet {
                    site: job.label(),
                    message,
                }
                .into(),
            ))
        }
    };

    let output = job.output_path(STYLESHEET);
    write_file(&output, css.as_bytes())?;

    tracing::info!("{}: compiled stylesheets", job.label());
    job.sink.send(
        &job.label(),
        ReloadEvent::InjectCss(output::url_path(job.site, STYLESHEET)),
    );

    Ok(SiteOutcome::Built(vec![output]))
}

/// Bundle the site's scripts to `js/scripts.js`.
pub fn javascripts(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    let list = match job.list(job.builder().javascripts(job.site)) {
        Ok(list) => list,
        Err(outcome) => return Ok(outcome),
    };

    bundle(job, &list, SCRIPTS)
}

/// Copy the vendor detection script to `js/modernizr.js`.
pub fn modernizr(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    bundle(job, &job.builder().modernizr(), MODERNIZR)
}

/// Copy image sources into `images/`.
pub fn images(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    copy_tree(job, &job.builder().images(job.site), IMAGES_DIR)
}

/// Copy font sources into `fonts/`.
pub fn fonts(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    copy_tree(job, &job.builder().fonts(job.site), FONTS_DIR)
}

/// Fingerprint compiled outputs. Only runs in production.
pub fn manifest(job: &SiteJob<'_>) -> Result<SiteOutcome, BuildError> {
    if !job.config.production {
        return Ok(SiteOutcome::Skipped);
    }

    match write_manifest(&job.config.root, job.site)? {
        Some((path, manifest)) => {
            tracing::info!("{}: wrote manifest with {} entries", job.label(), manifest.len());
            let skin = job.config.resolve(job.site.skin_path());
            let mut built: Vec<PathBuf> = manifest.values().map(|name| skin.join(name)).collect();
            built.push(path);
            Ok(SiteOutcome::Built(built))
        }
        None => Ok(SiteOutcome::Skipped),
    }
}

fn bundle(job: &SiteJob<'_>, list: &AssetList, name: &str) -> Result<SiteOutcome, BuildError> {
    let sources = resolve_sources(&job.config.root, &list.sources)?;
    let mut script = AssetPipeline::concat(&sources)?;

    if job.config.production {
        script = match AssetPipeline::minify_js(&script) {
            Ok(minified) => minified,
            Err(message) => {
                return Ok(job.fail(
                    CompileError::Script {
                        site: job.label(),
                        message,
                    }
                    .into(),
                ))
            }
        };
    }

    let output = job.output_path(name);
    write_file(&output, script.as_bytes())?;

    tracing::info!("{}: compiled {}", job.label(), name);
    job.sink.send(&job.label(), ReloadEvent::Reload);

    Ok(SiteOutcome::Built(vec![output]))
}

fn copy_tree(job: &SiteJob<'_>, list: &AssetList, dir: &str) -> Result<SiteOutcome, BuildError> {
    let sources = resolve_sources(&job.config.root, &list.sources)?;
    let destination = job.output_path(dir);

    let mut built = Vec::with_capacity(sources.len());
    for source in &sources {
        let target = destination.join(source.relative());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        fs::copy(&source.path, &target)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", target.display(), e)))?;
        built.push(target);
    }

    tracing::info!("{}: copied {} files to {}", job.label(), built.len(), dir);
    if !built.is_empty() {
        job.sink.send(&job.label(), ReloadEvent::Reload);
    }

    Ok(SiteOutcome::Built(built))
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }
    fs::write(path, content)
        .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use tempfile::tempdir;

    struct Fixture {
        temp: tempfile::TempDir,
        config: BuildConfig,
        catalog: Catalog,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new(production: bool) -> Self {
            let temp = tempdir().unwrap();
            let mut site = SiteConfig::new("acme", "default");
            site.components = vec!["tabs".to_string()];
            let config = BuildConfig {
                production,
                sites: vec![site],
                root: temp.path().to_path_buf(),
                ..Default::default()
            };
            Self {
                temp,
                config,
                catalog: Catalog::foundation(),
                sink: RecordingSink::new(),
            }
        }

        fn job(&self) -> SiteJob<'_> {
            SiteJob {
                config: &self.config,
                catalog: &self.catalog,
                site: &self.config.sites[0],
                scratch_dir: self.temp.path(),
                sink: &self.sink,
            }
        }

        fn write(&self, relative: &str, content: &str) {
            let path = self.temp.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn skin(&self, relative: &str) -> PathBuf {
            self.temp
                .path()
                .join("skin/frontend/acme/default")
                .join(relative)
        }
    }

    #[test]
    fn compiles_stylesheet_with_component_flags() {
        let fixture = Fixture::new(false);
        fixture.write(
            "skin/frontend/acme/default/assets/stylesheets/styles.scss",
            "@if $include-tabs-component { .tabs { color: red; } }\n@if $include-orbit-component { .orbit { color: blue; } }\n",
        );

        let outcome = stylesheets(&fixture.job()).unwrap();

        assert!(matches!(outcome, SiteOutcome::Built(_)));
        let css = fs::read_to_string(fixture.skin("css/styles.css")).unwrap();
        assert!(css.contains(".tabs"));
        assert!(!css.contains(".orbit"));
        assert_eq!(
            fixture.sink.events(),
            vec![(
                "acme/default".to_string(),
                ReloadEvent::InjectCss("/skin/frontend/acme/default/css/styles.css".to_string())
            )]
        );
    }

    #[test]
    fn stylesheet_errors_are_reported_not_raised() {
        let fixture = Fixture::new(false);
        fixture.write(
            "skin/frontend/acme/default/assets/stylesheets/styles.scss",
            ".a { color: $undefined-color; }",
        );

        let outcome = stylesheets(&fixture.job()).unwrap();

        assert!(matches!(
            outcome,
            SiteOutcome::Failed(SiteFailure::Compile(CompileError::Stylesheet { .. }))
        ));
        assert!(!fixture.skin("css/styles.css").exists());
        assert!(matches!(
            fixture.sink.events().as_slice(),
            [(_, ReloadEvent::Notice(_))]
        ));
    }

    #[test]
    fn unknown_component_writes_nothing() {
        let mut fixture = Fixture::new(false);
        fixture.config.sites[0].components.push("carousel".to_string());

        let outcome = javascripts(&fixture.job()).unwrap();

        assert!(matches!(
            outcome,
            SiteOutcome::Failed(SiteFailure::Component { .. })
        ));
        assert!(!fixture.skin("js").exists());
    }

    #[test]
    fn bundles_scripts_in_list_order() {
        let fixture = Fixture::new(false);
        let vendor = "node_modules/magento-boilerplate";
        fixture.write(
            &format!("{vendor}/node_modules/foundation-sites/js/vendor/jquery.js"),
            "var jquery = 1;",
        );
        fixture.write(
            &format!("{vendor}/node_modules/foundation-sites/js/foundation/foundation.tab.js"),
            "var tab = 1;",
        );
        fixture.write(
            "skin/frontend/acme/default/assets/javascripts/app.js",
            "var app = 1;",
        );

        javascripts(&fixture.job()).unwrap();

        let bundle = fs::read_to_string(fixture.skin("js/scripts.js")).unwrap();
        assert_eq!(bundle, "var jquery = 1;\nvar tab = 1;\nvar app = 1;");
    }

    #[test]
    fn production_script_errors_are_reported_not_raised() {
        let fixture = Fixture::new(true);
        fixture.write(
            "skin/frontend/acme/default/assets/javascripts/app.js",
            "window.app = function (",
        );

        let outcome = javascripts(&fixture.job()).unwrap();

        assert!(matches!(
            outcome,
            SiteOutcome::Failed(SiteFailure::Compile(CompileError::Script { ref site, .. }))
                if site == "acme/default"
        ));
        assert!(!fixture.skin("js/scripts.js").exists());
        assert!(matches!(
            fixture.sink.events().as_slice(),
            [(_, ReloadEvent::Notice(_))]
        ));
    }

    #[test]
    fn copies_images_preserving_layout() {
        let fixture = Fixture::new(false);
        fixture.write("skin/frontend/acme/default/assets/images/icons/cart.svg", "<svg/>");

        let outcome = images(&fixture.job()).unwrap();

        assert_eq!(
            outcome,
            SiteOutcome::Built(vec![fixture.skin("images/icons/cart.svg")])
        );
    }

    #[test]
    fn manifest_is_skipped_outside_production() {
        let fixture = Fixture::new(false);
        fixture.write("skin/frontend/acme/default/css/styles.css", "a{}");

        assert_eq!(manifest(&fixture.job()).unwrap(), SiteOutcome::Skipped);
        assert!(!fixture.skin("rev-manifest.json").exists());
    }
}
