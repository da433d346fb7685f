//! Classpath resolution across the builds of a composite build.

use std::collections::HashSet;
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::artifact::{Classification, CrossBuild, ResolvedArtifact, classify};
use crate::coordinator::Coordinator;
use crate::core::{BuildId, Settings};
use crate::error::{CoordinationError, ResolveError};
use crate::external::{BuildRegistry, DependencyResolver};

/// Ordered set of artifact files, duplicates removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<Utf8PathBuf>,
    seen: HashSet<Utf8PathBuf>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file unless it is already present. Returns `true` if added.
    pub fn insert(&mut self, file: impl Into<Utf8PathBuf>) -> bool {
        let file = file.into();
        if self.seen.contains(&file) {
            return false;
        }

        self.seen.insert(file.clone());
        self.files.push(file);
        true
    }

    pub fn contains(&self, file: impl AsRef<Utf8Path>) -> bool {
        self.seen.contains(file.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.iter().map(Utf8PathBuf::as_path)
    }
}

impl<P: Into<Utf8PathBuf>> FromIterator<P> for FileSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for file in iter {
            set.insert(file);
        }
        set
    }
}

/// Result of resolving a classpath.
#[derive(Debug)]
pub enum Classpath<'c, C> {
    /// No builds are included, the configuration is handed back untouched.
    Unresolved(&'c C),
    /// Every cross-build artifact has been built, these are the files.
    Files(FileSet),
}

/// Resolves classpaths, making sure artifacts produced by other builds of
/// the composite exist before their files are handed out.
pub struct ClasspathResolver<'a, R: DependencyResolver> {
    registry: &'a dyn BuildRegistry,
    dependencies: &'a R,
    coordinator: &'a Coordinator,
    settings: Settings,
    current: OnceLock<BuildId>,
}

impl<'a, R: DependencyResolver> ClasspathResolver<'a, R> {
    pub fn new(
        registry: &'a dyn BuildRegistry,
        dependencies: &'a R,
        coordinator: &'a Coordinator,
        settings: Settings,
    ) -> Self {
        Self {
            registry,
            dependencies,
            coordinator,
            settings,
            current: OnceLock::new(),
        }
    }

    /// The build resolving classpaths, looked up once.
    fn current_build(&self) -> &BuildId {
        self.current.get_or_init(|| self.registry.current_build())
    }

    /// Resolves `configuration` into the files on it.
    ///
    /// Every artifact produced by another build is only included once the
    /// tasks producing it have completed. On failure no files are returned.
    pub fn resolve<'c>(
        &self,
        configuration: &'c R::Configuration,
    ) -> Result<Classpath<'c, R::Configuration>, ResolveError> {
        let mut builds = self.registry.included_builds();
        if builds.is_empty() {
            return Ok(Classpath::Unresolved(configuration));
        }
        builds.insert(self.registry.root_build());

        let artifacts = self
            .dependencies
            .resolve_artifacts(configuration)
            .map_err(ResolveError::Resolution)?;

        let requester = self.current_build();
        let pending = self.classify_all(&artifacts, requester, &builds)?;

        tracing::debug!(
            requester = %requester,
            artifacts = artifacts.len(),
            pending = pending.len(),
            "resolving classpath"
        );

        let build = |(artifact, request): &(&ResolvedArtifact, CrossBuild)| {
            self.coordinator
                .register_and_await(requester, request)
                .map_err(|source| ResolveError::Artifact {
                    artifact: artifact.name().to_string(),
                    source,
                })
        };

        if self.settings.parallel {
            pending.par_iter().try_for_each(build)?;
        } else {
            pending.iter().try_for_each(build)?;
        }

        let files = artifacts
            .iter()
            .map(|artifact| artifact.backing_file().to_owned())
            .collect();

        Ok(Classpath::Files(files))
    }

    /// Picks out the artifacts which need coordination, rejecting any that
    /// claim to come from a build outside of the composite.
    fn classify_all<'r>(
        &self,
        artifacts: &'r [ResolvedArtifact],
        requester: &BuildId,
        builds: &HashSet<BuildId>,
    ) -> Result<Vec<(&'r ResolvedArtifact, CrossBuild)>, ResolveError> {
        let mut pending = Vec::new();

        for artifact in artifacts {
            match classify(artifact) {
                Classification::Local => {}
                Classification::CrossBuild(request) => {
                    if request.build != *requester && !builds.contains(&request.build) {
                        return Err(ResolveError::Artifact {
                            artifact: artifact.name().to_string(),
                            source: CoordinationError::UnknownBuild(request.build),
                        });
                    }
                    pending.push((artifact, request));
                }
            }
        }

        Ok(pending)
    }
}
