use std::fmt::Write;

use serde::Serialize;

use crate::core::TaskStatus;

/// Snapshot of a single requested task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// The task, formatted as `build:task`.
    pub task: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    /// Builds which asked for this task, sorted.
    pub requesters: Vec<String>,
}

/// A build currently blocked on tasks of another build.
#[derive(Debug, Clone, Serialize)]
pub struct WaitReport {
    pub requester: String,
    pub producer: String,
    /// Number of threads of `requester` waiting on `producer`.
    pub count: usize,
}

/// Coordination state of a composite build at a point in time.
///
/// This struct is returned by [`Coordinator::diagnostics`] and is meant for
/// debugging stuck or slow composite builds.
///
/// [`Coordinator::diagnostics`]: crate::Coordinator::diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub tasks: Vec<TaskReport>,
    pub waits: Vec<WaitReport>,
    pub cancelled: bool,
}

impl Diagnostics {
    /// Renders the requests as a Mermaid diagram, color-coded by task status.
    ///
    /// * **Gray**: Not started
    /// * **Yellow**: Running
    /// * **Green**: Completed
    /// * **Red**: Failed
    ///
    /// Builds that are currently blocked on another build are linked with a
    /// dotted edge.
    pub fn render_mermaid(&self) -> String {
        let mut f = String::new();
        let _ = writeln!(f, "graph LR");

        for (i, report) in self.tasks.iter().enumerate() {
            let color = match report.status {
                TaskStatus::NotStarted => "#D3D3D3",
                TaskStatus::Running => "#FFFF00",
                TaskStatus::Completed => "#00FF00",
                TaskStatus::Failed(_) => "#FF0000",
            };
            let name = report.task.replace('"', "\\\"");

            let _ = writeln!(f, "    t{i}[\"{}\\n{}\"]", name, report.status.label());
            let _ = writeln!(f, "    style t{i} fill:{color}");

            for requester in &report.requesters {
                let _ = writeln!(f, "    {:?} --> t{i}", requester);
            }
        }

        for wait in &self.waits {
            let _ = writeln!(
                f,
                "    {:?} -. \"waits x{}\" .-> {:?}",
                wait.requester, wait.count, wait.producer
            );
        }

        f
    }

    /// Serialize the snapshot to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
