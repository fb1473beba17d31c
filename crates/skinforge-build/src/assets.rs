//! Asset list composition.
//!
//! Each asset class gets an ordered, deduplicated list of source locations
//! for a site. Lists are recomputed on every phase run and are a pure
//! function of the site, the catalog and the vendor layout, so the same
//! inputs always produce the same list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use skinforge_components::{synthesize, Catalog, ComponentError, ComponentResolver};
use skinforge_config::SiteConfig;

use crate::manifest::fingerprint;

/// Font extensions copied by the fonts phase.
const FONT_EXTENSIONS: &[&str] = &["eot", "otf", "svg", "ttf", "woff", "woff2"];

/// Asset classes built per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Stylesheets,
    Javascripts,
    Modernizr,
    Images,
    Fonts,
}

/// Ordered sources for one asset class of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetList {
    pub class: AssetClass,

    /// Source files or globs, relative to the project root unless absolute
    pub sources: Vec<PathBuf>,

    /// Stylesheet include directories (stylesheets only)
    pub include_paths: Vec<PathBuf>,

    /// Variable document text, to be written to `sources[0]` (stylesheets only)
    pub variables: Option<String>,
}

impl AssetList {
    fn new(class: AssetClass, sources: Vec<PathBuf>) -> Self {
        Self {
            class,
            sources,
            include_paths: Vec::new(),
            variables: None,
        }
    }
}

/// Directory layout of the boilerplate package and its bundled vendors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorLayout {
    root: PathBuf,
}

impl VendorLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Boilerplate's own assets.
    pub fn assets(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// Foundation framework.
    pub fn foundation(&self) -> PathBuf {
        self.root.join("node_modules/foundation-sites")
    }

    /// Font Awesome icon font.
    pub fn font_awesome(&self) -> PathBuf {
        self.root.join("node_modules/font-awesome")
    }

    /// Foundation plugin script for an auxiliary script id.
    pub fn foundation_plugin(&self, script: &str) -> PathBuf {
        self.foundation()
            .join("js/foundation")
            .join(format!("foundation.{}.js", script))
    }
}

/// Composes per-class asset lists for sites.
#[derive(Debug, Clone)]
pub struct AssetListBuilder<'a> {
    catalog: &'a Catalog,
    vendor: VendorLayout,
    scratch_dir: PathBuf,
}

impl<'a> AssetListBuilder<'a> {
    /// `scratch_dir` holds the transient variable documents.
    pub fn new(
        catalog: &'a Catalog,
        vendor_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            vendor: VendorLayout::new(vendor_dir),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Build the list for any asset class.
    pub fn build(&self, site: &SiteConfig, class: AssetClass) -> Result<AssetList, ComponentError> {
        match class {
            AssetClass::Stylesheets => self.stylesheets(site),
            AssetClass::Javascripts => self.javascripts(site),
            AssetClass::Modernizr => Ok(self.modernizr()),
            AssetClass::Images => Ok(self.images(site)),
            AssetClass::Fonts => Ok(self.fonts(site)),
        }
    }

    /// Where a site's variable document is written before compilation.
    ///
    /// The name carries a digest of the exact package and theme, so sites
    /// whose sanitized names coincide still get distinct files.
    pub fn variable_document_path(&self, site: &SiteConfig) -> PathBuf {
        let identity = format!("{}\0{}", site.package, site.theme);
        self.scratch_dir.join(format!(
            "{}-{}-{}-variables.scss",
            sanitize(&site.package),
            sanitize(&site.theme),
            fingerprint(identity.as_bytes())
        ))
    }

    /// Variable document, site stylesheets, then the skin's entry stylesheet.
    pub fn stylesheets(&self, site: &SiteConfig) -> Result<AssetList, ComponentError> {
        let active = ComponentResolver::new(self.catalog).resolve(&site.components)?;
        let variables = synthesize(&active, self.catalog.registry());
        let skin_stylesheets = site.skin_path().join("assets/stylesheets");

        let sources = unique(
            std::iter::once(self.variable_document_path(site))
                .chain(site.compilation.stylesheets.iter().map(PathBuf::from))
                .chain(std::iter::once(skin_stylesheets.join("styles.scss"))),
        );

        let include_paths = unique(
            [
                self.vendor.foundation().join("scss"),
                self.vendor.font_awesome().join("scss"),
                self.vendor.assets().join("stylesheets"),
            ]
            .into_iter()
            .chain(site.compilation.include_paths.iter().map(PathBuf::from))
            .chain(std::iter::once(skin_stylesheets)),
        );

        Ok(AssetList {
            class: AssetClass::Stylesheets,
            sources,
            include_paths,
            variables: Some(variables),
        })
    }

    /// Framework runtime, component plugins, site scripts, boilerplate,
    /// then everything in the skin's script tree.
    pub fn javascripts(&self, site: &SiteConfig) -> Result<AssetList, ComponentError> {
        let resolver = ComponentResolver::new(self.catalog);
        let active = resolver.resolve(&site.components)?;

        let base = [
            self.vendor.foundation().join("js/vendor/jquery.js"),
            self.vendor.assets().join("javascripts/no-conflict.js"),
            self.vendor.foundation().join("js/foundation/foundation.js"),
        ];

        let vendor = &self.vendor;
        let plugins = resolver.descriptors(&active).flat_map(move |descriptor| {
            descriptor
                .javascripts
                .iter()
                .map(move |script| vendor.foundation_plugin(script))
        });

        let sources = unique(
            base.into_iter()
                .chain(plugins)
                .chain(site.compilation.javascripts.iter().map(PathBuf::from))
                .chain([
                    self.vendor.assets().join("javascripts/magento-boilerplate.js"),
                    site.skin_path().join("assets/javascripts/**/*.js"),
                ]),
        );

        Ok(AssetList::new(AssetClass::Javascripts, sources))
    }

    /// The vendor detection script. Identical for every site.
    pub fn modernizr(&self) -> AssetList {
        AssetList::new(
            AssetClass::Modernizr,
            vec![self.vendor.foundation().join("js/vendor/modernizr.js")],
        )
    }

    pub fn images(&self, site: &SiteConfig) -> AssetList {
        let sources = unique(
            std::iter::once(self.vendor.assets().join("images/**/*"))
                .chain(site.compilation.images.iter().map(PathBuf::from))
                .chain(std::iter::once(site.skin_path().join("assets/images/**/*"))),
        );

        AssetList::new(AssetClass::Images, sources)
    }

    pub fn fonts(&self, site: &SiteConfig) -> AssetList {
        let vendor_fonts = self.vendor.font_awesome().join("fonts");
        let skin_fonts = site.skin_path().join("assets/fonts");

        let sources = unique(font_globs(&vendor_fonts).chain(font_globs(&skin_fonts)));

        AssetList::new(AssetClass::Fonts, sources)
    }
}

fn font_globs(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    FONT_EXTENSIONS
        .iter()
        .map(move |ext| dir.join(format!("*.{}", ext)))
}

/// Remove duplicates, keeping the first occurrence in place.
pub fn unique(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
