//! Execution pipelines, one per command shape
//!
//! Every pipeline returns its outputs as a JSON array. Parallel variants
//! acquire and expand in the calling thread and fan each unit out through
//! the dispatch shim.

use crate::command::{DownloadIterateCommand, IterateDownloadCommand};
use crate::context::RunContext;
use crate::dispatch::{dispatch_unit, DispatchRequest};
use crate::pool::WorkerPool;
use cmdr_core::errors::{CmdErrorKind, CommandError, Result};
use cmdr_core::params::is_empty_value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

fn is_empty<T: Serialize>(value: &T) -> Result<bool> {
    Ok(is_empty_value(&serde_json::to_value(value)?))
}

fn is_shape_mismatch(result: &Result<impl Sized>) -> bool {
    matches!(result, Err(err) if err.kind() == CmdErrorKind::ShapeMismatch)
}

fn outputs_value<T: Serialize>(outputs: &[T]) -> Result<Value> {
    Ok(serde_json::to_value(outputs)?)
}

/// Deserialize one dispatched argument, reporting a stale shape on failure
fn unit_arg<T: DeserializeOwned>(function: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        CommandError::ShapeMismatch {
            function: function.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn check_arity(ctx: &RunContext<'_>, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() != expected {
        return Err(CommandError::UnitArity {
            command: ctx.command_name().to_string(),
            expected,
            actual: args.len(),
        }
        .into());
    }
    Ok(())
}

// ========== Acquire-then-expand ==========

pub(crate) fn run_download_iterate<C: DownloadIterateCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
) -> Result<Value> {
    let downloaded = command.download(ctx)?;
    let mut results = Vec::new();
    for unit in command.iterate(ctx, downloaded)? {
        if is_empty(&unit)? {
            continue;
        }
        results.push(command.parse_and_save(ctx, unit)?);
    }
    command.cleanup(ctx, &results)?;
    outputs_value(&results)
}

pub(crate) fn run_parallel_download_iterate<C: DownloadIterateCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
) -> Result<Value> {
    let downloaded = command.download(ctx)?;
    let units = command.iterate(ctx, downloaded)?;

    let outputs = fan_out(ctx, |submit| {
        for unit in units {
            if is_empty(&unit)? {
                continue;
            }
            submit(vec![serde_json::to_value(&unit)?])?;
        }
        Ok(())
    })?;

    finish_parallel(command, ctx, outputs, C::cleanup)
}

pub(crate) fn process_download_iterate_unit<C: DownloadIterateCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
    args: Vec<Value>,
) -> Result<Option<Value>> {
    check_arity(ctx, 1, &args)?;
    let mut args = args.into_iter();
    let unit: C::Unit = unit_arg("parse_and_save", args.next().unwrap_or(Value::Null))?;
    let output = command.parse_and_save(ctx, unit)?;
    Ok(Some(serde_json::to_value(output)?))
}

// ========== Expand-then-acquire ==========

pub(crate) fn run_iterate_download<C: IterateDownloadCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
) -> Result<Value> {
    let mut results = Vec::new();
    for unit in command.iterate(ctx)? {
        let attempt = download_and_save(command, ctx, &unit);
        let saved = if is_shape_mismatch(&attempt) {
            tracing::warn!(
                command = ctx.command_name(),
                "stale data shape, downloading again with a refreshed cache"
            );
            ctx.refreshing(|| download_and_save(command, ctx, &unit))?
        } else {
            attempt?
        };
        results.extend(saved);
    }
    command.cleanup(ctx, &results)?;
    outputs_value(&results)
}

fn download_and_save<C: IterateDownloadCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
    unit: &C::Unit,
) -> Result<Option<C::Output>> {
    let downloaded = command.download(ctx, unit)?;
    if is_empty(&downloaded)? {
        return Ok(None);
    }
    command.parse_and_save(ctx, downloaded, unit).map(Some)
}

pub(crate) fn run_parallel_iterate_download<C: IterateDownloadCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
) -> Result<Value> {
    let units = command.iterate(ctx)?;

    let outputs = fan_out(ctx, |submit| {
        for unit in units {
            let attempt = command.download(ctx, &unit);
            let downloaded = if is_shape_mismatch(&attempt) {
                ctx.refreshing(|| command.download(ctx, &unit))?
            } else {
                attempt?
            };
            if is_empty(&downloaded)? {
                continue;
            }
            submit(vec![
                serde_json::to_value(&downloaded)?,
                serde_json::to_value(&unit)?,
            ])?;
        }
        Ok(())
    })?;

    finish_parallel(command, ctx, outputs, C::cleanup)
}

/// Worker side of expand-then-acquire
///
/// A downloaded payload that no longer fits, or a `parse_and_save` that
/// reports a stale shape, triggers one refreshed download of the unit.
pub(crate) fn process_iterate_download_unit<C: IterateDownloadCommand>(
    command: &mut C,
    ctx: &RunContext<'_>,
    args: Vec<Value>,
) -> Result<Option<Value>> {
    check_arity(ctx, 2, &args)?;
    let mut args = args.into_iter();
    let downloaded = args.next().unwrap_or(Value::Null);
    let unit: C::Unit = unit_arg("parse_and_save", args.next().unwrap_or(Value::Null))?;

    let attempt = unit_arg::<C::Downloaded>("parse_and_save", downloaded)
        .and_then(|downloaded| command.parse_and_save(ctx, downloaded, &unit));
    let output = if is_shape_mismatch(&attempt) {
        tracing::warn!(
            command = ctx.command_name(),
            "stale data shape in dispatched unit, downloading again"
        );
        match ctx.refreshing(|| download_and_save(command, ctx, &unit))? {
            Some(output) => output,
            None => return Ok(None),
        }
    } else {
        attempt?
    };

    Ok(Some(serde_json::to_value(output)?))
}

// ========== Fan-out ==========

/// Process submitted unit arguments through the dispatch shim
///
/// Inline on the run's own connection for a single core or a test run,
/// otherwise on a pool of `num_cores` workers with one connection each.
fn fan_out<P>(ctx: &RunContext<'_>, produce: P) -> Result<Vec<Value>>
where
    P: FnOnce(&mut dyn FnMut(Vec<Value>) -> Result<()>) -> Result<()>,
{
    let base = DispatchRequest::for_run(ctx);
    let commander = ctx.commander();

    if ctx.num_cores() == 1 || ctx.is_test() {
        let mut outputs = Vec::new();
        produce(&mut |args: Vec<Value>| -> Result<()> {
            outputs.extend(dispatch_unit(commander, ctx.conn(), base.with_args(args))?);
            Ok(())
        })?;
        return Ok(outputs);
    }

    tracing::debug!(
        command = ctx.command_name(),
        workers = ctx.num_cores(),
        "fanning out units"
    );
    let outputs = WorkerPool::new(ctx.num_cores()).run(
        |worker| {
            tracing::debug!(worker, "worker opening its own connection");
            commander.connect()
        },
        |conn: &mut rusqlite::Connection, args: Vec<Value>| {
            dispatch_unit(commander, conn, base.with_args(args))
        },
        produce,
    )?;
    Ok(outputs.into_iter().flatten().collect())
}

fn finish_parallel<C, O>(
    command: &mut C,
    ctx: &RunContext<'_>,
    outputs: Vec<Value>,
    cleanup: fn(&mut C, &RunContext<'_>, &[O]) -> Result<()>,
) -> Result<Value>
where
    O: Serialize + DeserializeOwned,
{
    let results = outputs
        .into_iter()
        .map(|value| unit_arg::<O>("cleanup", value))
        .collect::<Result<Vec<_>>>()?;
    cleanup(command, ctx, &results)?;
    outputs_value(&results)
}
