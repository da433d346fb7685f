use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Atomic reference-counted string type used for identifiers.
pub(crate) type ArcStr = Arc<str>;

/// Identifier of a build taking part in a composite build.
///
/// Either the root build or any included build. Identifiers are compared by
/// value and are cheap to clone, so they can be freely passed between worker
/// threads.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildId(ArcStr);

impl BuildId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BuildId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for BuildId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuildId({})", self.0)
    }
}

impl From<&str> for BuildId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reference to a named task within a specific build.
///
/// Task names are unique within a build, so the pair is globally unique. A
/// `TaskRef` does not own the task's definition or its execution state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskRef {
    pub build: BuildId,
    pub name: Arc<str>,
}

impl TaskRef {
    pub fn new(build: BuildId, name: impl AsRef<str>) -> Self {
        Self {
            build,
            name: Arc::from(name.as_ref()),
        }
    }
}

impl Display for TaskRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.build, self.name)
    }
}

/// Terminal result reported by an execution engine for a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
}

impl TaskOutcome {
    /// Converts the result of running a task into its outcome, keeping the
    /// error chain as the failure cause.
    pub fn from_result<T>(result: &anyhow::Result<T>) -> Self {
        match result {
            Ok(_) => TaskOutcome::Completed,
            Err(err) => TaskOutcome::Failed(format!("{err:#}")),
        }
    }
}

/// Lifecycle of a requested task as seen by the coordinator.
///
/// Serialized as `"status": "failed", "cause": "..."`, the cause only being
/// present for failed tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "cause", rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    Running,
    Completed,
    Failed(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed(_))
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed(_) => "failed",
        }
    }
}

impl From<TaskOutcome> for TaskStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Completed => TaskStatus::Completed,
            TaskOutcome::Failed(cause) => TaskStatus::Failed(cause),
        }
    }
}

/// Settings for classpath resolution.
///
/// These can be deserialized from any format supported by `serde`, which
/// lets the surrounding build tool keep them next to the rest of its own
/// configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Await cross-build artifacts concurrently on the rayon pool.
    ///
    /// Waiting blocks the calling worker thread, so this should only be
    /// enabled when the execution engines do not run their tasks on the same
    /// rayon pool.
    pub parallel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ref_display() {
        let task = TaskRef::new(BuildId::new("libA"), "jar");
        assert_eq!(task.to_string(), "libA:jar");
    }

    #[test]
    fn test_build_id_compares_by_value() {
        assert_eq!(BuildId::new("root"), BuildId::from("root"));
        assert_ne!(BuildId::new("root"), BuildId::new("libA"));
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: anyhow::Result<()> = Ok(());
        assert_eq!(TaskOutcome::from_result(&ok), TaskOutcome::Completed);

        let err: anyhow::Result<()> = Err(anyhow::anyhow!("compile error"));
        assert_eq!(
            TaskOutcome::from_result(&err),
            TaskOutcome::Failed("compile error".into())
        );
    }

    #[test]
    fn test_terminal_status() {
        assert!(!TaskStatus::NotStarted.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed("boom".into()).is_terminal());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: Settings = serde_json::from_str(r#"{"parallel":true}"#).unwrap();
        assert!(settings.parallel);

        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(!settings.parallel);
    }
}
