//! Built-in maintenance command

use crate::command::BasicCommand;
use crate::context::RunContext;
use cmdr_core::errors::Result;
use cmdr_core::{log_op_end, log_op_error, log_op_start};
use cmdr_store::CommandRepo;
use serde::Serialize;
use std::time::Instant;

pub const CLEAR_COMMAND_LOGS: &str = "clear_command_logs";

/// Rows removed by one `clear_command_logs` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearedLogs {
    pub failed_logs: usize,
    pub empty_commands: usize,
    pub consolidated_logs: usize,
}

/// Delete failed logs, drop records left without logs and keep one log per
/// remaining record. The log of the running clear itself is never touched.
pub struct ClearCommandLogs;

impl ClearCommandLogs {
    fn clear(&self, ctx: &RunContext<'_>) -> Result<ClearedLogs> {
        let conn = ctx.conn();
        let own_log = ctx.log_id();

        let failed_logs = CommandRepo::delete_failed_logs(conn, own_log)?;
        let empty_commands = CommandRepo::delete_commands_without_logs(conn)?;

        let mut consolidated_logs = 0;
        for record in CommandRepo::list_commands(conn)? {
            consolidated_logs += CommandRepo::consolidate_logs(conn, record.id, own_log)?;
        }

        Ok(ClearedLogs {
            failed_logs,
            empty_commands,
            consolidated_logs,
        })
    }
}

impl BasicCommand for ClearCommandLogs {
    type Output = ClearedLogs;

    fn run(&mut self, ctx: &RunContext<'_>) -> Result<ClearedLogs> {
        log_op_start!(CLEAR_COMMAND_LOGS);
        let start = Instant::now();

        match self.clear(ctx) {
            Ok(cleared) => {
                log_op_end!(
                    CLEAR_COMMAND_LOGS,
                    duration_ms = start.elapsed().as_millis() as u64,
                    failed_logs = cleared.failed_logs,
                    empty_commands = cleared.empty_commands,
                    consolidated_logs = cleared.consolidated_logs
                );
                Ok(cleared)
            }
            Err(err) => {
                log_op_error!(
                    CLEAR_COMMAND_LOGS,
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }
}
