//! Cross-build task coordination.
//!
//! A [`Coordinator`] lives for exactly one composite build invocation. Every
//! build that needs artifacts from another build goes through it:
//!
//! 1. The tasks producing the artifact are registered. The first request for
//!    a task forwards it to the owning build's [`ExecutionEngine`], later
//!    requests only join the waiters.
//! 2. The requesting thread blocks on a per-task condition variable until the
//!    engine reports a terminal outcome through [`Coordinator::on_task_terminal`].
//! 3. Before blocking, the "awaiting-for" graph between builds is checked, so
//!    that two builds waiting on each other fail fast instead of hanging.
//!
//! Cancellation is broadcast: [`Coordinator::cancel`] releases every waiter.

mod awaiting;
mod diagnostics;
mod slot;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::artifact::CrossBuild;
use crate::core::{BuildId, TaskOutcome, TaskRef, TaskStatus};
use crate::error::CoordinationError;
use crate::external::ExecutionEngine;

use self::awaiting::AwaitGraph;
use self::slot::TaskSlot;

pub use self::diagnostics::{Diagnostics, TaskReport, WaitReport};

/// Everything the coordinator knows, guarded by a single lock. The lock is
/// only held for bookkeeping, never while waiting or calling into an engine.
#[derive(Default)]
struct Registry {
    /// Task names already forwarded to each build's engine.
    requested: HashMap<BuildId, HashSet<Arc<str>>>,
    slots: HashMap<TaskRef, Arc<TaskSlot>>,
    requesters: HashMap<TaskRef, BTreeSet<BuildId>>,
    awaiting: AwaitGraph,
}

impl Registry {
    fn slot(&mut self, task: &TaskRef) -> Arc<TaskSlot> {
        self.slots
            .entry(task.clone())
            .or_insert_with(|| Arc::new(TaskSlot::new()))
            .clone()
    }

    /// Marks `task` as requested, returns `true` only for the first request.
    fn mark_requested(&mut self, task: &TaskRef) -> bool {
        self.requested
            .entry(task.build.clone())
            .or_default()
            .insert(task.name.clone())
    }
}

/// Coordinates task execution between the builds of one composite build.
///
/// The coordinator is shared between all worker threads resolving
/// classpaths, typically behind an [`Arc`].
pub struct Coordinator {
    engine: Arc<dyn ExecutionEngine>,
    registry: Mutex<Registry>,
    cancelled: AtomicBool,
}

impl Coordinator {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine,
            registry: Mutex::new(Registry::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Ensures the tasks producing a cross-build artifact have run.
    ///
    /// Tasks not yet known are scheduled with the producing build's engine,
    /// then the calling thread blocks until every one of them has reached a
    /// terminal state.
    ///
    /// # Errors
    ///
    /// * [`CoordinationError::DependencyFailed`] if any of the tasks failed.
    /// * [`CoordinationError::CyclicBuildDependency`] if the producing build
    ///   is itself, possibly indirectly, waiting on `requester`.
    /// * [`CoordinationError::Cancelled`] if the invocation was cancelled
    ///   before all tasks finished.
    pub fn register_and_await(
        &self,
        requester: &BuildId,
        request: &CrossBuild,
    ) -> Result<(), CoordinationError> {
        if self.is_cancelled() {
            return Err(CoordinationError::Cancelled);
        }

        let span = tracing::info_span!(
            "await_tasks",
            requester = %requester,
            producer = %request.build
        );
        let _enter = span.enter();

        let (slots, to_schedule) = {
            let mut registry = self.registry.lock();
            let mut slots = Vec::with_capacity(request.tasks.len());
            let mut to_schedule = Vec::new();

            for task in request.task_refs() {
                if registry.mark_requested(&task) {
                    to_schedule.push(task.clone());
                }
                registry
                    .requesters
                    .entry(task.clone())
                    .or_default()
                    .insert(requester.clone());

                let slot = registry.slot(&task);
                slots.push((task, slot));
            }

            (slots, to_schedule)
        };

        for task in &to_schedule {
            self.trigger(task);
        }

        // Tasks of the requesting build itself are ordered by its own engine.
        if *requester == request.build {
            tracing::debug!("intra-build request, not waiting");
            return Ok(());
        }

        let _guard = self.enter_wait(requester, &request.build, &slots)?;

        for (task, slot) in &slots {
            slot.wait(task, &self.cancelled)?;
            tracing::debug!(task = %task, "task finished");
        }

        Ok(())
    }

    /// Called by an execution engine when a requested task starts running.
    pub fn on_task_started(&self, task: &TaskRef) {
        let slot = self.registry.lock().slot(task);
        if slot.start() {
            tracing::debug!(task = %task, "task started");
        }
    }

    /// Called by an execution engine once a task has finished, successfully
    /// or not. Wakes every thread waiting on this task.
    pub fn on_task_terminal(&self, task: &TaskRef, outcome: TaskOutcome) {
        let slot = self.registry.lock().slot(task);

        match &outcome {
            TaskOutcome::Completed => tracing::debug!(task = %task, "task completed"),
            TaskOutcome::Failed(cause) => {
                tracing::debug!(task = %task, cause = %cause, "task failed")
            }
        }

        if !slot.finish(outcome) {
            tracing::warn!(task = %task, "ignoring repeated terminal notification");
        }
    }

    /// Cancels the invocation. Every blocked and future wait fails with
    /// [`CoordinationError::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let slots: Vec<_> = self.registry.lock().slots.values().cloned().collect();
        tracing::info!(tasks = slots.len(), "cancelling cross-build waits");

        for slot in slots {
            slot.interrupt();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Current status of a task, `None` if nobody has asked for it yet.
    pub fn status(&self, task: &TaskRef) -> Option<TaskStatus> {
        self.registry.lock().slots.get(task).map(|slot| slot.status())
    }

    /// Takes a snapshot of all requests and waits.
    pub fn diagnostics(&self) -> Diagnostics {
        let registry = self.registry.lock();

        let mut tasks: Vec<_> = registry
            .slots
            .iter()
            .map(|(task, slot)| {
                let requesters = registry
                    .requesters
                    .get(task)
                    .map(|builds| builds.iter().map(BuildId::to_string).collect())
                    .unwrap_or_default();

                TaskReport {
                    task: task.to_string(),
                    status: slot.status(),
                    requesters,
                }
            })
            .collect();
        tasks.sort_by(|a, b| a.task.cmp(&b.task));

        let mut waits: Vec<_> = registry
            .awaiting
            .edges()
            .into_iter()
            .map(|(requester, producer, count)| WaitReport {
                requester: requester.to_string(),
                producer: producer.to_string(),
                count,
            })
            .collect();
        waits.sort_by(|a, b| (&a.requester, &a.producer).cmp(&(&b.requester, &b.producer)));

        Diagnostics {
            tasks,
            waits,
            cancelled: self.is_cancelled(),
        }
    }

    /// Forwards a task to its engine. A task the engine refuses to schedule
    /// can never complete, so it is failed on the spot.
    fn trigger(&self, task: &TaskRef) {
        tracing::debug!(task = %task, "scheduling task");

        if let Err(err) = self.engine.schedule_task(task) {
            tracing::error!(task = %task, "failed to schedule task: {err:#}");
            self.on_task_terminal(task, TaskOutcome::Failed(format!("{err:#}")));
        }
    }

    /// Registers `requester` as waiting on `producer`, unless everything it
    /// needs has already finished.
    fn enter_wait<'a>(
        &'a self,
        requester: &BuildId,
        producer: &BuildId,
        slots: &[(TaskRef, Arc<TaskSlot>)],
    ) -> Result<Option<WaitGuard<'a>>, CoordinationError> {
        let mut registry = self.registry.lock();

        if slots.iter().all(|(_, slot)| slot.is_terminal()) {
            return Ok(None);
        }

        if let Err(path) = registry.awaiting.enter(requester, producer) {
            tracing::warn!(path = %path, "refusing to wait on a cyclic build dependency");
            return Err(CoordinationError::CyclicBuildDependency(path));
        }

        Ok(Some(WaitGuard {
            coordinator: self,
            requester: requester.clone(),
            producer: producer.clone(),
        }))
    }
}

/// Removes the awaiting-for edge once the wait ends, whichever way it ends.
struct WaitGuard<'a> {
    coordinator: &'a Coordinator,
    requester: BuildId,
    producer: BuildId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.coordinator
            .registry
            .lock()
            .awaiting
            .leave(&self.requester, &self.producer);
    }
}
