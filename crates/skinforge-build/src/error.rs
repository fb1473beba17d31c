//! Build errors.

use skinforge_components::ComponentError;

/// Errors that abort a phase.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read: {0}")]
    ReadError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to clean: {0}")]
    CleanError(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task registered twice: {0}")]
    DuplicateTask(String),

    #[error("Tasks with missing or cyclic dependencies: {}", .0.join(", "))]
    UnresolvableTasks(Vec<String>),

    #[error("Task {name} failed: {message}")]
    Task { name: String, message: String },

    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

/// A stylesheet or script compiler failure.
///
/// Never aborts a phase: it is reported through the reload sink and the
/// phase report so sibling asset classes and sites keep building.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("Stylesheet compilation failed for {site}: {message}")]
    Stylesheet { site: String, message: String },

    #[error("Script compilation failed for {site}: {message}")]
    Script { site: String, message: String },
}

/// Why a single site produced no output for a phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteFailure {
    #[error("{site}: {source}")]
    Component {
        site: String,
        #[source]
        source: ComponentError,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl SiteFailure {
    /// Label of the failing site.
    pub fn site(&self) -> &str {
        match self {
            SiteFailure::Component { site, .. } => site,
            SiteFailure::Compile(CompileError::Stylesheet { site, .. })
            | SiteFailure::Compile(CompileError::Script { site, .. }) => site,
        }
    }
}
