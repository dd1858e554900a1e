//! Asynchronous dispatch of whole command runs

use crate::commander::{Commander, Execution};
use crate::invocation::Invocation;
use cmdr_core::errors::{CommandError, Result};
use cmdr_core::TaskId;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Queue that runs invocations outside the caller's thread
pub trait TaskQueue {
    fn enqueue(&self, invocation: Invocation) -> Result<TaskHandle>;
}

/// Handle to one queued run
///
/// The run's execution log carries the same task id, so it can also be
/// found through `CommandRepo::find_log_by_task`.
pub struct TaskHandle {
    task_id: TaskId,
    handle: JoinHandle<Result<Execution>>,
}

impl TaskHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end
    pub fn join(self) -> Result<Execution> {
        self.handle.join().map_err(|_| {
            CommandError::WorkerFailure {
                reason: format!("task {} panicked", self.task_id),
            }
        })?
    }
}

/// Runs each task on its own named thread with its own connection
#[derive(Clone)]
pub struct ThreadTaskQueue {
    commander: Arc<Commander>,
}

impl ThreadTaskQueue {
    pub fn new(commander: Arc<Commander>) -> Self {
        Self { commander }
    }
}

impl TaskQueue for ThreadTaskQueue {
    fn enqueue(&self, invocation: Invocation) -> Result<TaskHandle> {
        let task_id = TaskId::new();
        let invocation = invocation.with_task_id(task_id.as_str());
        let commander = Arc::clone(&self.commander);

        tracing::info!(
            command = invocation.command(),
            task_id = task_id.as_str(),
            "queued command"
        );
        let handle = std::thread::Builder::new()
            .name(format!("cmdr-task-{}", invocation.command()))
            .spawn(move || commander.run(invocation))
            .map_err(|e| CommandError::WorkerFailure {
                reason: format!("unable to start task thread: {}", e),
            })?;

        Ok(TaskHandle { task_id, handle })
    }
}
