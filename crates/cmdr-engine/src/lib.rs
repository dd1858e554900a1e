//! cmdr engine - registering and running commands
//!
//! Provides:
//! - Command contracts for the basic and pipeline shapes
//! - Invocation resolution through each command's command-line definition
//! - The dependency gate and its override prompts
//! - The result cache wrapper and per-run context
//! - Sequential and parallel pipelines with the dispatch shim
//! - The `Commander`, the built-in maintenance command and the task queue

pub mod command;
pub mod commander;
pub mod context;
pub mod dispatch;
pub mod gate;
pub mod invocation;
pub mod maintenance;
mod pipeline;
pub mod pool;
pub mod registry;
pub mod result_cache;
pub mod tasks;

// Re-export key types
pub use command::{BasicCommand, DownloadIterateCommand, IterateDownloadCommand, Units};
pub use commander::{Commander, Execution, Outcome};
pub use context::RunContext;
pub use dispatch::{dispatch_unit, DispatchRequest};
pub use gate::{DeclinePrompt, OverridePrompt, StdinPrompt};
pub use invocation::{Invocation, Origin, ResolvedInvocation};
pub use maintenance::{ClearCommandLogs, ClearedLogs, CLEAR_COMMAND_LOGS};
pub use registry::{Registration, Registry};
pub use tasks::{TaskHandle, TaskQueue, ThreadTaskQueue};
