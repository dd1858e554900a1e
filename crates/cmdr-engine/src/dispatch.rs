//! Dispatch shim
//!
//! Re-creates a command on the receiving side of a fan-out and runs one
//! unit's processing step. The request is plain data so it can be queued
//! to a worker thread as-is.

use crate::commander::Commander;
use crate::context::RunContext;
use crate::invocation::{resolve, Invocation, Origin};
use cmdr_core::errors::Result;
use cmdr_core::params::ParamMap;
use cmdr_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// One unit of a parallel pipeline, addressed to a command by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub command: String,
    pub parameters: ParamMap,
    pub options: ParamMap,
    /// Execution log of the supervising run
    pub log_id: Option<i64>,
    /// `[unit]` for acquire-then-expand, `[downloaded, unit]` for expand-then-acquire
    pub args: Vec<Value>,
}

impl DispatchRequest {
    pub(crate) fn for_run(ctx: &RunContext<'_>) -> Self {
        Self {
            command: ctx.command_name().to_string(),
            parameters: ctx.parameters().clone(),
            options: ctx.options().clone(),
            log_id: ctx.log_id(),
            args: Vec::new(),
        }
    }

    pub fn with_args(&self, args: Vec<Value>) -> Self {
        Self {
            args,
            ..self.clone()
        }
    }
}

/// Run one unit on `conn`
///
/// The command is resolved with worker origin, so neither the argv
/// re-parse nor the dependency gate runs again. Returns `None` when the
/// unit's data turned out to be empty.
pub fn dispatch_unit(
    commander: &Commander,
    conn: &Connection,
    request: DispatchRequest,
) -> Result<Option<Value>> {
    let command = request.command.clone();
    log_op_start!("dispatch_unit", command = command.as_str());
    let start = Instant::now();

    match dispatch(commander, conn, request) {
        Ok(output) => {
            log_op_end!(
                "dispatch_unit",
                duration_ms = start.elapsed().as_millis() as u64,
                command = command.as_str(),
                skipped = output.is_none()
            );
            Ok(output)
        }
        Err(err) => {
            log_op_error!(
                "dispatch_unit",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                command = command.as_str()
            );
            Err(err)
        }
    }
}

fn dispatch(
    commander: &Commander,
    conn: &Connection,
    request: DispatchRequest,
) -> Result<Option<Value>> {
    let DispatchRequest {
        command,
        parameters,
        options,
        log_id,
        args,
    } = request;

    let registration = commander.registry().get(&command)?;
    let mut bag = parameters;
    bag.extend(options);

    let invocation = Invocation::new(command)
        .args(bag)
        .with_origin(Origin::Worker);
    let resolved = resolve(registration.spec(), invocation)?;
    let mut instance = registration.instantiate(&resolved)?;

    let ctx = RunContext::new(
        commander,
        conn,
        &resolved,
        registration.shape(),
        log_id,
    );
    instance.process_unit(&ctx, args)
}
