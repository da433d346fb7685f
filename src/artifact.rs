//! Resolved artifacts and their classification.
//!
//! The dependency resolution engine hands us a flat list of artifacts. Some
//! of them are plain files, others are produced by a different build of the
//! composite and only exist once that build has run the right tasks. The
//! [`classify`] function tells the two apart once, up front, so the rest of
//! the pipeline can simply match on [`Classification`].

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::{BuildId, TaskRef};

/// Where an artifact comes from, as reported by dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// The file is directly resolvable, nothing has to run first.
    Local,
    /// The file is produced by `build` once every task in `tasks` has run.
    Composite {
        build: BuildId,
        tasks: BTreeSet<String>,
    },
}

/// A single artifact handed out by the dependency resolution engine.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    name: String,
    file: Utf8PathBuf,
    origin: ArtifactOrigin,
}

impl ResolvedArtifact {
    pub fn local(name: impl Into<String>, file: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            origin: ArtifactOrigin::Local,
        }
    }

    pub fn composite<I, S>(
        name: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        build: BuildId,
        tasks: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            file: file.into(),
            origin: ArtifactOrigin::Composite {
                build,
                tasks: tasks.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Human readable name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the file backing this artifact. The file is only
    /// guaranteed to exist once the producing tasks have completed.
    pub fn backing_file(&self) -> &Utf8Path {
        &self.file
    }

    pub fn origin(&self) -> &ArtifactOrigin {
        &self.origin
    }
}

/// Tasks of a producing build which have to complete before an artifact can
/// be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossBuild {
    pub build: BuildId,
    pub tasks: BTreeSet<String>,
}

impl CrossBuild {
    pub fn task_refs(&self) -> impl Iterator<Item = TaskRef> + '_ {
        self.tasks
            .iter()
            .map(|name| TaskRef::new(self.build.clone(), name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Local,
    CrossBuild(CrossBuild),
}

/// Decides whether an artifact needs coordination with another build.
///
/// An artifact that claims to come from another build but lists no tasks is
/// treated as local: there is nothing to wait for.
pub fn classify(artifact: &ResolvedArtifact) -> Classification {
    match artifact.origin() {
        ArtifactOrigin::Local => Classification::Local,
        ArtifactOrigin::Composite { tasks, .. } if tasks.is_empty() => Classification::Local,
        ArtifactOrigin::Composite { build, tasks } => Classification::CrossBuild(CrossBuild {
            build: build.clone(),
            tasks: tasks.clone(),
        }),
    }
}
