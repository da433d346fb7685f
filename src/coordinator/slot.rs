use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::core::{TaskOutcome, TaskRef, TaskStatus};
use crate::error::CoordinationError;

/// Status of one requested task, together with the condition variable its
/// waiters sleep on.
pub(crate) struct TaskSlot {
    status: Mutex<TaskStatus>,
    signal: Condvar,
}

impl TaskSlot {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(TaskStatus::NotStarted),
            signal: Condvar::new(),
        }
    }

    pub(crate) fn status(&self) -> TaskStatus {
        self.status.lock().clone()
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.status.lock().is_terminal()
    }

    /// Moves a not yet started task to running. Returns `false` if the task
    /// was already past that point.
    pub(crate) fn start(&self) -> bool {
        let mut status = self.status.lock();
        match *status {
            TaskStatus::NotStarted => {
                *status = TaskStatus::Running;
                true
            }
            _ => false,
        }
    }

    /// Records the terminal outcome and wakes every waiter of this task.
    /// The first outcome wins, later ones are rejected with `false`.
    pub(crate) fn finish(&self, outcome: TaskOutcome) -> bool {
        let mut status = self.status.lock();
        if status.is_terminal() {
            return false;
        }

        *status = outcome.into();
        self.signal.notify_all();
        true
    }

    /// Wakes every waiter so that they can observe the cancellation flag.
    pub(crate) fn interrupt(&self) {
        let _status = self.status.lock();
        self.signal.notify_all();
    }

    /// Blocks until the task reaches a terminal state or the invocation is
    /// cancelled.
    pub(crate) fn wait(
        &self,
        task: &TaskRef,
        cancelled: &AtomicBool,
    ) -> Result<(), CoordinationError> {
        let mut status = self.status.lock();
        loop {
            match &*status {
                TaskStatus::Completed => return Ok(()),
                TaskStatus::Failed(cause) => {
                    return Err(CoordinationError::DependencyFailed {
                        task: task.clone(),
                        cause: cause.clone(),
                    });
                }
                _ if cancelled.load(Ordering::SeqCst) => return Err(CoordinationError::Cancelled),
                _ => self.signal.wait(&mut status),
            }
        }
    }
}
