//! External commands registered as custom tasks.

use std::path::PathBuf;

use skinforge_config::{BuildConfig, CustomTask};
use tokio::process::Command;

use crate::error::BuildError;
use crate::tasks::{Extension, TaskHandle, TaskSpec};

/// Registers each configured command as a task, chained in order after the
/// custom phase.
#[derive(Debug, Clone, Default)]
pub struct CommandExtension {
    root: PathBuf,
    commands: Vec<CustomTask>,
}

impl CommandExtension {
    pub fn new(root: impl Into<PathBuf>, commands: Vec<CustomTask>) -> Self {
        Self {
            root: root.into(),
            commands,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.root.clone(), config.custom.clone())
    }
}

impl Extension for CommandExtension {
    fn extend(&self, tasks: &TaskHandle) {
        let mut previous: Option<&str> = None;

        for command in &self.commands {
            let deps: Vec<&str> = previous.into_iter().collect();
            let root = self.root.clone();
            let command_spec = command.clone();
            tasks.register(TaskSpec::new(command.name.clone(), &deps, move |_| {
                run_command(root.clone(), command_spec.clone())
            }));
            previous = Some(command.name.as_str());
        }
    }
}

async fn run_command(root: PathBuf, task: CustomTask) -> Result<(), BuildError> {
    tracing::info!("`{}` running", task.name);

    let output = Command::new(&task.command)
        .args(&task.args)
        .current_dir(&root)
        .output()
        .await
        .map_err(|e| BuildError::Task {
            name: task.name.clone(),
            message: format!("failed to start {}: {}", task.command, e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        tracing::info!("{}: {}", task.name, stdout);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::Task {
            name: task.name,
            message: format!("{} ({})", output.status, stderr.trim()),
        });
    }

    Ok(())
}
