#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod artifact;
mod coordinator;
mod core;
mod error;
pub mod external;
mod resolver;
#[cfg(test)]
mod testing;
mod utils;

pub use crate::artifact::{ArtifactOrigin, Classification, CrossBuild, ResolvedArtifact, classify};
pub use crate::coordinator::{Coordinator, Diagnostics, TaskReport, WaitReport};
pub use crate::core::{BuildId, Settings, TaskOutcome, TaskRef, TaskStatus};
pub use crate::error::*;
pub use crate::external::{BuildRegistry, DependencyResolver, ExecutionEngine};
pub use crate::resolver::{Classpath, ClasspathResolver, FileSet};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
