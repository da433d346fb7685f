//! Test doubles for the collaborators of the coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::artifact::{CrossBuild, ResolvedArtifact};
use crate::coordinator::Coordinator;
use crate::core::{BuildId, TaskOutcome, TaskRef};
use crate::external::{BuildRegistry, DependencyResolver, ExecutionEngine};

pub(crate) fn cross(build: &str, tasks: &[&str]) -> CrossBuild {
    CrossBuild {
        build: build.into(),
        tasks: tasks.iter().map(|task| task.to_string()).collect(),
    }
}

/// Polls `condition` until it holds or a few seconds have passed.
pub(crate) fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Records every scheduled task and leaves completion to the test.
#[derive(Default)]
pub(crate) struct RecordingEngine {
    scheduled: Mutex<Vec<TaskRef>>,
    refusal: Option<String>,
}

impl RecordingEngine {
    pub(crate) fn refusing(reason: &str) -> Self {
        Self {
            refusal: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn scheduled(&self) -> Vec<TaskRef> {
        self.scheduled.lock().clone()
    }
}

impl ExecutionEngine for RecordingEngine {
    fn schedule_task(&self, task: &TaskRef) -> anyhow::Result<()> {
        self.scheduled.lock().push(task.clone());
        match &self.refusal {
            Some(reason) => Err(anyhow::anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}

/// Runs every scheduled task on the spot and reports its outcome.
#[derive(Default)]
pub(crate) struct CompletingEngine {
    coordinator: OnceLock<Weak<Coordinator>>,
    failures: Mutex<HashMap<TaskRef, String>>,
    scheduled: Mutex<Vec<TaskRef>>,
}

impl CompletingEngine {
    pub(crate) fn attach(&self, coordinator: &Arc<Coordinator>) {
        let _ = self.coordinator.set(Arc::downgrade(coordinator));
    }

    pub(crate) fn fail(&self, build: &str, task: &str, cause: &str) {
        self.failures
            .lock()
            .insert(TaskRef::new(build.into(), task), cause.to_string());
    }

    pub(crate) fn scheduled(&self) -> Vec<TaskRef> {
        self.scheduled.lock().clone()
    }
}

impl ExecutionEngine for CompletingEngine {
    fn schedule_task(&self, task: &TaskRef) -> anyhow::Result<()> {
        self.scheduled.lock().push(task.clone());

        let coordinator = self
            .coordinator
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| anyhow::anyhow!("engine is not attached to a coordinator"))?;

        coordinator.on_task_started(task);
        let outcome = match self.failures.lock().get(task) {
            Some(cause) => TaskOutcome::Failed(cause.clone()),
            None => TaskOutcome::Completed,
        };
        coordinator.on_task_terminal(task, outcome);

        Ok(())
    }
}

/// A composite rooted at `root`, seen from `current`.
pub(crate) struct StaticRegistry {
    current: BuildId,
    included: HashSet<BuildId>,
}

impl StaticRegistry {
    pub(crate) fn new(current: &str, included: &[&str]) -> Self {
        Self {
            current: current.into(),
            included: included.iter().map(|&build| build.into()).collect(),
        }
    }
}

impl BuildRegistry for StaticRegistry {
    fn current_build(&self) -> BuildId {
        self.current.clone()
    }

    fn root_build(&self) -> BuildId {
        BuildId::new("root")
    }

    fn included_builds(&self) -> HashSet<BuildId> {
        self.included.clone()
    }
}

/// Resolves every configuration to the same list of artifacts.
pub(crate) struct StaticDependencies {
    artifacts: Result<Vec<ResolvedArtifact>, String>,
    calls: AtomicUsize,
}

impl StaticDependencies {
    pub(crate) fn new(artifacts: Vec<ResolvedArtifact>) -> Self {
        Self {
            artifacts: Ok(artifacts),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            artifacts: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DependencyResolver for StaticDependencies {
    type Configuration = String;

    fn resolve_artifacts(&self, _: &String) -> anyhow::Result<Vec<ResolvedArtifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .clone()
            .map_err(|reason| anyhow::anyhow!("{reason}"))
    }
}
