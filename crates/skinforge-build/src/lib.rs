//! Asset build pipeline for skinforge.
//!
//! Composes per-site asset lists from the component catalog, compiles and
//! copies them into each site's skin directory, and sequences the phases as a
//! small task graph.

pub mod assets;
pub mod clean;
pub mod compile;
pub mod error;
pub mod hooks;
pub mod manifest;
pub mod output;
pub mod phases;
pub mod pipeline;
pub mod sink;
pub mod sources;
pub mod tasks;

pub use assets::{AssetClass, AssetList, AssetListBuilder, VendorLayout};
pub use error::{BuildError, CompileError, SiteFailure};
pub use hooks::CommandExtension;
pub use pipeline::{Phase, PhaseReport, Pipeline, RunReport};
pub use sink::{NullSink, RecordingSink, ReloadEvent, ReloadSink};
pub use tasks::{Extension, NoExtension, TaskGraph, TaskHandle, TaskSpec};
