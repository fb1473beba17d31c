//! Stylesheet and script compilation.
//!
//! SCSS goes through grass, then lightningcss for vendor prefixes and
//! minification. Scripts are concatenated and minified with oxc.

use std::fs;
use std::path::PathBuf;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::BuildError;
use crate::sources::ResolvedSource;

/// Browsers targeted for vendor prefixing.
const BROWSER_TARGETS: &str = "last 2 versions";

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Read and concatenate sources in order.
    pub fn concat(sources: &[ResolvedSource]) -> Result<String, BuildError> {
        let mut parts = Vec::with_capacity(sources.len());
        for source in sources {
            let content = fs::read_to_string(&source.path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", source.path.display(), e)))?;
            parts.push(content);
        }
        Ok(parts.join("\n"))
    }

    /// Compile concatenated SCSS.
    pub fn compile_scss(
        source: &str,
        include_paths: &[PathBuf],
        production: bool,
    ) -> Result<String, String> {
        let style = if production {
            grass::OutputStyle::Compressed
        } else {
            grass::OutputStyle::Expanded
        };
        let options = grass::Options::default()
            .style(style)
            .load_paths(include_paths);

        grass::from_string(source.to_string(), &options).map_err(|e| e.to_string())
    }

    /// Add vendor prefixes and optionally minify compiled CSS.
    pub fn postprocess_css(css: &str, minify: bool) -> Result<String, String> {
        let browsers = Browsers::from_browserslist([BROWSER_TARGETS])
            .map_err(|e| format!("Invalid browser targets: {}", e))?;
        let targets = Targets {
            browsers,
            ..Targets::default()
        };

        let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        stylesheet
            .minify(MinifyOptions {
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify,
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS print error: {}", e))?;

        Ok(printed.code)
    }

    /// Minify a classic (non-module) script.
    pub fn minify_js(source: &str) -> Result<String, String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
        if let Some(error) = ret.errors.first() {
            return Err(format!("JavaScript parse error: {}", error));
        }

        let mut program = ret.program;
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        let ret = Minifier::new(options).minify(&allocator, &mut program);

        Ok(Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code)
    }
}
