//! Seams to the rest of the build tool.
//!
//! The coordinator never runs tasks or resolves dependencies itself. These
//! traits are everything it needs from the outside world.

use std::collections::HashSet;

use crate::artifact::ResolvedArtifact;
use crate::core::{BuildId, TaskRef};

/// The task execution engine of the participating builds.
///
/// Completion is reported back asynchronously through
/// [`Coordinator::on_task_terminal`](crate::Coordinator::on_task_terminal).
pub trait ExecutionEngine: Send + Sync {
    /// Adds `task` to the task graph of its build, so that it eventually
    /// runs. This is a registration, it must not wait for the task.
    fn schedule_task(&self, task: &TaskRef) -> anyhow::Result<()>;
}

/// Knows which builds take part in the composite build.
pub trait BuildRegistry: Send + Sync {
    /// The build whose classpath is being resolved.
    fn current_build(&self) -> BuildId;

    /// The root build of the composite.
    fn root_build(&self) -> BuildId;

    /// Builds included in the composite, the root build excluded.
    fn included_builds(&self) -> HashSet<BuildId>;
}

/// Turns a classpath configuration into the list of artifacts on it.
pub trait DependencyResolver: Send + Sync {
    type Configuration;

    fn resolve_artifacts(
        &self,
        configuration: &Self::Configuration,
    ) -> anyhow::Result<Vec<ResolvedArtifact>>;
}
