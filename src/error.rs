use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::core::{BuildId, TaskRef};

/// Chain of builds waiting on each other, starting and ending with the same
/// build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPath(pub Vec<BuildId>);

impl Display for BuildPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, build) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{build}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("Task '{task}' failed: {cause}")]
    DependencyFailed { task: TaskRef, cause: String },

    #[error("Cyclic dependency between builds: {0}")]
    CyclicBuildDependency(BuildPath),

    #[error("Build was cancelled")]
    Cancelled,

    #[error("Build '{0}' is not part of the composite")]
    UnknownBuild(BuildId),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Could not resolve artifact '{artifact}':\n{source}")]
    Artifact {
        artifact: String,
        source: CoordinationError,
    },

    #[error("Could not resolve artifacts.\n{0}")]
    Resolution(anyhow::Error),
}

impl ResolveError {
    /// The coordination failure behind this error, if any.
    pub fn coordination(&self) -> Option<&CoordinationError> {
        match self {
            ResolveError::Artifact { source, .. } => Some(source),
            ResolveError::Resolution(_) => None,
        }
    }
}
