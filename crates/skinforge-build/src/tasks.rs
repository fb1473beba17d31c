//! Task graph scheduler.
//!
//! Tasks are named and declare the names they depend on. The scheduler
//! starts every task whose dependencies have completed, waits for that whole
//! wave to finish, then computes the next wave. A failing task lets its wave
//! finish and stops the run before the next one.
//!
//! Running tasks may register more tasks through their [`TaskHandle`]; those
//! join the graph before the next wave is computed.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use crate::error::BuildError;

/// Boxed future returned by a task action.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), BuildError>> + Send>>;

type TaskAction = Arc<dyn Fn(TaskHandle) -> TaskFuture + Send + Sync>;

/// A named unit of work with dependencies.
pub struct TaskSpec {
    name: String,
    deps: Vec<String>,
    action: TaskAction,
}

impl TaskSpec {
    pub fn new<F, Fut>(name: impl Into<String>, deps: &[&str], action: F) -> Self
    where
        F: Fn(TaskHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BuildError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            action: Arc::new(move |handle| Box::pin(action(handle))),
        }
    }
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish()
    }
}

/// Handle given to a running task for registering further tasks.
#[derive(Clone)]
pub struct TaskHandle {
    origin: String,
    pending: Arc<Mutex<Vec<TaskSpec>>>,
}

impl TaskHandle {
    /// Add a task to the running graph. A task without dependencies runs
    /// after the registering task.
    pub fn register(&self, mut spec: TaskSpec) {
        if spec.deps.is_empty() {
            spec.deps.push(self.origin.clone());
        }
        tracing::debug!("{} registered task {}", self.origin, spec.name);
        lock(&self.pending).push(spec);
    }
}

/// Extension point invoked during the custom phase.
pub trait Extension: Send + Sync {
    fn extend(&self, tasks: &TaskHandle);
}

/// Extension that registers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtension;

impl Extension for NoExtension {
    fn extend(&self, _tasks: &TaskHandle) {}
}

/// A set of tasks to run in dependency order.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<TaskSpec>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Names must be unique.
    pub fn add(&mut self, spec: TaskSpec) -> Result<(), BuildError> {
        if self.tasks.iter().any(|t| t.name == spec.name) {
            return Err(BuildError::DuplicateTask(spec.name));
        }
        self.tasks.push(spec);
        Ok(())
    }

    /// Run every task. Returns the names of each executed wave, in order.
    pub async fn run(self) -> Result<Vec<Vec<String>>, BuildError> {
        let pending: Arc<Mutex<Vec<TaskSpec>>> = Arc::new(Mutex::new(Vec::new()));
        let mut remaining = self.tasks;
        let mut done: HashSet<String> = HashSet::new();
        let mut waves = Vec::new();

        loop {
            for spec in lock(&pending).drain(..) {
                if done.contains(&spec.name) || remaining.iter().any(|t| t.name == spec.name) {
                    return Err(BuildError::DuplicateTask(spec.name));
                }
                remaining.push(spec);
            }

            if remaining.is_empty() {
                break;
            }

            let (ready, blocked): (Vec<TaskSpec>, Vec<TaskSpec>) = remaining
                .into_iter()
                .partition(|spec| spec.deps.iter().all(|dep| done.contains(dep)));
            remaining = blocked;

            if ready.is_empty() {
                return Err(BuildError::UnresolvableTasks(
                    remaining.into_iter().map(|spec| spec.name).collect(),
                ));
            }

            let mut wave: Vec<String> = ready.iter().map(|spec| spec.name.clone()).collect();
            wave.sort();
            tracing::debug!("Starting tasks: {}", wave.join(", "));

            let mut set = JoinSet::new();
            for spec in ready {
                let handle = TaskHandle {
                    origin: spec.name.clone(),
                    pending: Arc::clone(&pending),
                };
                let future = (spec.action)(handle);
                let name = spec.name;
                set.spawn(async move { (name, future.await) });
            }

            let mut first_error = None;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => {
                        done.insert(name);
                    }
                    Ok((name, Err(e))) => {
                        tracing::error!("Task {} failed: {}", name, e);
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        first_error.get_or_insert(BuildError::TaskPanicked(e.to_string()));
                    }
                }
            }

            waves.push(wave);

            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(waves)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop(name: &str, deps: &[&str]) -> TaskSpec {
        TaskSpec::new(name, deps, |_| async { Ok(()) })
    }

    fn recording(name: &'static str, deps: &[&str], log: &Arc<Mutex<Vec<String>>>) -> TaskSpec {
        let log = Arc::clone(log);
        TaskSpec::new(name, deps, move |_| {
            let log = Arc::clone(&log);
            async move {
                lock(&log).push(name.to_string());
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn runs_in_dependency_waves() {
        let mut graph = TaskGraph::new();
        graph.add(noop("clean", &[])).unwrap();
        graph.add(noop("images", &["clean"])).unwrap();
        graph.add(noop("fonts", &["clean"])).unwrap();
        graph.add(noop("manifest", &["images", "fonts"])).unwrap();

        let waves = graph.run().await.unwrap();

        assert_eq!(
            waves,
            vec![
                vec!["clean".to_string()],
                vec!["fonts".to_string(), "images".to_string()],
                vec!["manifest".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn rejects_duplicate_names() {
        let mut graph = TaskGraph::new();
        graph.add(noop("clean", &[])).unwrap();

        assert!(matches!(
            graph.add(noop("clean", &[])),
            Err(BuildError::DuplicateTask(name)) if name == "clean"
        ));
    }

    #[tokio::test]
    async fn reports_missing_dependencies() {
        let mut graph = TaskGraph::new();
        graph.add(noop("clean", &[])).unwrap();
        graph.add(noop("manifest", &["stylesheets"])).unwrap();

        let result = graph.run().await;

        assert!(matches!(
            result,
            Err(BuildError::UnresolvableTasks(names)) if names == vec!["manifest".to_string()]
        ));
    }

    #[tokio::test]
    async fn failure_completes_wave_and_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = TaskGraph::new();
        graph
            .add(TaskSpec::new("stylesheets", &[], |_| async {
                Err(BuildError::WriteError("disk full".to_string()))
            }))
            .unwrap();
        graph.add(recording("images", &[], &log)).unwrap();
        graph.add(recording("manifest", &["stylesheets", "images"], &log)).unwrap();

        let result = graph.run().await;

        assert!(matches!(result, Err(BuildError::WriteError(_))));
        assert_eq!(*lock(&log), vec!["images".to_string()]);
    }

    #[tokio::test]
    async fn registered_tasks_run_after_their_origin() {
        struct Deploy(Arc<Mutex<Vec<String>>>);

        impl Extension for Deploy {
            fn extend(&self, tasks: &TaskHandle) {
                tasks.register(recording("deploy", &[], &self.0));
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let extension: Arc<dyn Extension> = Arc::new(Deploy(Arc::clone(&log)));
        let mut graph = TaskGraph::new();
        graph.add(recording("manifest", &[], &log)).unwrap();
        graph
            .add(TaskSpec::new("custom", &["manifest"], move |handle| {
                let extension = Arc::clone(&extension);
                async move {
                    extension.extend(&handle);
                    Ok(())
                }
            }))
            .unwrap();

        let waves = graph.run().await.unwrap();

        assert_eq!(waves.len(), 3);
        assert_eq!(waves[2], vec!["deploy".to_string()]);
        assert_eq!(
            *lock(&log),
            vec!["manifest".to_string(), "deploy".to_string()]
        );
    }

    #[tokio::test]
    async fn no_extension_registers_nothing() {
        let mut graph = TaskGraph::new();
        graph
            .add(TaskSpec::new("custom", &[], |handle| async move {
                NoExtension.extend(&handle);
                Ok(())
            }))
            .unwrap();

        assert_eq!(graph.run().await.unwrap().len(), 1);
    }
}
