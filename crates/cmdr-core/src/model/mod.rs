pub mod command_record;
pub mod execution_log;

pub use command_record::{CommandRecord, CommandSummary};
pub use execution_log::{ExecutionLog, LogError, LogStatus};
