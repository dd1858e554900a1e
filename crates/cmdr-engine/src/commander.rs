//! Commander: runs registered commands against a record store and cache
//!
//! One `run` moves an execution attempt through
//! CREATED → DEPENDENCIES_CHECKED → RUNNING → {COMPLETED, FAILED}.
//! Failures before RUNNING are returned as `Err` and leave no log behind.
//! Failures while RUNNING are recorded on the log and returned as
//! `Outcome::Failed`.

use crate::context::RunContext;
use crate::gate::{self, DeclinePrompt, OverridePrompt};
use crate::invocation::{resolve, Invocation};
use crate::registry::Registry;
use cmdr_core::config::CommanderConfig;
use cmdr_core::errors::{CmdError, CmdErrorKind, CommandError, Result};
use cmdr_core::model::{CommandRecord, CommandSummary, ExecutionLog, LogError, LogStatus};
use cmdr_core::params::ParamMap;
use cmdr_core::spec::TEST;
use cmdr_core::RunId;
use cmdr_core::{log_op_end, log_op_error, log_op_start};
use cmdr_store::{CacheStore, CommandRepo, Database, FsCache};
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// How a run that reached RUNNING ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Value),
    Failed(LogError),
}

/// Result of one execution attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub command_id: i64,
    pub log_id: i64,
    pub outcome: Outcome,
}

impl Execution {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed(_))
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Completed(output) => Some(output),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LogError> {
        match &self.outcome {
            Outcome::Completed(_) => None,
            Outcome::Failed(error) => Some(error),
        }
    }

    pub fn status(&self) -> LogStatus {
        if self.is_success() {
            LogStatus::Completed
        } else {
            LogStatus::Failed
        }
    }

    /// Turn a recorded failure back into an error
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Completed(output) => Ok(output),
            Outcome::Failed(error) => {
                let kind =
                    CmdErrorKind::from_code(&error.code).unwrap_or(CmdErrorKind::CommandFailed);
                Err(CmdError::new(kind)
                    .with_log_id(self.log_id)
                    .with_message(error.message))
            }
        }
    }
}

pub struct Commander {
    registry: Arc<Registry>,
    database: Database,
    cache: Arc<dyn CacheStore>,
    prompt: Arc<dyn OverridePrompt>,
}

impl Commander {
    /// Build a commander and bring the record store's schema up to date
    ///
    /// Dependency overrides are declined until `with_prompt` installs an
    /// interactive prompt.
    pub fn new(
        registry: impl Into<Arc<Registry>>,
        database: Database,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        database.initialize()?;
        Ok(Self {
            registry: registry.into(),
            database,
            cache,
            prompt: Arc::new(DeclinePrompt),
        })
    }

    /// Build from configuration: SQLite store and filesystem cache
    pub fn from_config(registry: impl Into<Arc<Registry>>, config: &CommanderConfig) -> Result<Self> {
        Self::new(
            registry,
            Database::new(&config.database_path),
            Arc::new(FsCache::new(&config.cache_dir)),
        )
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn OverridePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Open a new connection to the record store
    pub fn connect(&self) -> Result<Connection> {
        self.database.connect()
    }

    /// Run a command once
    pub fn run(&self, invocation: Invocation) -> Result<Execution> {
        let command = invocation.command().to_string();
        let run_id = RunId::new();
        log_op_start!(
            "run_command",
            command = command.as_str(),
            run_id = run_id.as_str()
        );
        let start = Instant::now();

        match self.execute(invocation) {
            Ok(execution) => {
                log_op_end!(
                    "run_command",
                    duration_ms = start.elapsed().as_millis() as u64,
                    command = command.as_str(),
                    run_id = run_id.as_str(),
                    log_id = execution.log_id,
                    status = %execution.status()
                );
                Ok(execution)
            }
            Err(err) => {
                log_op_error!(
                    "run_command",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    command = command.as_str(),
                    run_id = run_id.as_str()
                );
                Err(err)
            }
        }
    }

    /// Run a command from code with explicit parameters and options
    pub fn run_command(&self, name: &str, args: ParamMap) -> Result<Execution> {
        self.run(Invocation::new(name).args(args))
    }

    /// Re-run a stored command record with its recorded parameters
    pub fn run_record(&self, command_id: i64) -> Result<Execution> {
        let conn = self.connect()?;
        let record = CommandRepo::get_command(&conn, command_id)?
            .ok_or(CommandError::CommandRecordNotFound { command_id })?;
        drop(conn);
        self.run(Invocation::new(record.name).args(record.parameters))
    }

    fn execute(&self, invocation: Invocation) -> Result<Execution> {
        let registration = self.registry.get(invocation.command())?;
        let spec = registration.spec();
        let resolved = resolve(spec, invocation)?;
        let mut instance = registration.instantiate(&resolved)?;

        let conn = self.connect()?;
        let record = CommandRepo::get_or_create_command(&conn, &spec.name, &resolved.parameters)?;
        let log = CommandRepo::create_log(
            &conn,
            record.id,
            &resolved.options,
            resolved.task_id.as_deref(),
        )?;

        if let Err(err) = gate::check(&conn, spec, &resolved, self.prompt.as_ref()) {
            if let Err(delete_err) = CommandRepo::delete_log(&conn, log.id) {
                tracing::warn!(log_id = log.id, error = %delete_err, "failed to discard blocked log");
            }
            return Err(err);
        }

        tracing::debug!(
            command = spec.name.as_str(),
            log_id = log.id,
            shape = spec.shape().as_str(),
            "running"
        );
        let ctx = RunContext::new(self, &conn, &resolved, spec.shape(), Some(log.id));
        let outcome = match instance.execute(&ctx) {
            Ok(output) => {
                self.complete(&conn, log.id);
                Outcome::Completed(output)
            }
            Err(err) => {
                let err = err.with_command(spec.name.as_str()).with_log_id(log.id);
                tracing::warn!(error = %err, "command failed");
                Outcome::Failed(self.record_failure(&conn, log.id, &err))
            }
        };

        Ok(Execution {
            command_id: record.id,
            log_id: log.id,
            outcome,
        })
    }

    /// Best-effort completion, retried once on a fresh connection
    fn complete(&self, conn: &Connection, log_id: i64) {
        let Err(err) = CommandRepo::finish_log(conn, log_id) else {
            return;
        };
        tracing::warn!(log_id, error = %err, "failed to mark log completed, reconnecting");

        let retried = self.connect().and_then(|fresh| {
            CommandRepo::get_log(&fresh, log_id)?
                .ok_or(CommandError::LogNotFound { log_id })?;
            CommandRepo::finish_log(&fresh, log_id)
        });
        if let Err(err) = retried {
            tracing::warn!(log_id, error = %err, "unable to mark log completed");
        }
    }

    /// Save the error of a failed run, falling back to plain text
    fn record_failure(&self, conn: &Connection, log_id: i64, err: &CmdError) -> LogError {
        let captured = LogError::capture(err);
        if let Err(save_err) = CommandRepo::fail_log(conn, log_id, &captured) {
            tracing::warn!(log_id, error = %save_err, "failed to save structured error");
            if let Err(save_err) = CommandRepo::fail_log_text(conn, log_id, &err.to_string()) {
                tracing::warn!(log_id, error = %save_err, "failed to save error");
            }
        }
        captured
    }

    /// Run every command that declares test inputs, in test mode
    pub fn test_commands(&self) -> Result<Vec<Execution>> {
        log_op_start!("test_commands");
        let start = Instant::now();

        let names: Vec<String> = self
            .registry
            .registrations()
            .filter(|registration| registration.spec().has_test_inputs())
            .map(|registration| registration.spec().name.clone())
            .collect();

        let mut executions = Vec::with_capacity(names.len());
        for name in names {
            match self.run(Invocation::new(name).arg(TEST, true)) {
                Ok(execution) => executions.push(execution),
                Err(err) => {
                    log_op_error!(
                        "test_commands",
                        err.clone(),
                        duration_ms = start.elapsed().as_millis() as u64
                    );
                    return Err(err);
                }
            }
        }

        log_op_end!(
            "test_commands",
            duration_ms = start.elapsed().as_millis() as u64,
            count = executions.len()
        );
        Ok(executions)
    }

    /// Records with their latest log, most recently run first
    pub fn history(&self) -> Result<Vec<CommandSummary>> {
        CommandRepo::list_summaries(&self.connect()?)
    }

    pub fn command(&self, command_id: i64) -> Result<CommandRecord> {
        CommandRepo::get_command(&self.connect()?, command_id)?
            .ok_or_else(|| CommandError::CommandRecordNotFound { command_id }.into())
    }

    /// Logs of one record, newest first
    pub fn logs(&self, command_id: i64) -> Result<Vec<ExecutionLog>> {
        let conn = self.connect()?;
        if CommandRepo::get_command(&conn, command_id)?.is_none() {
            return Err(CommandError::CommandRecordNotFound { command_id }.into());
        }
        CommandRepo::logs_for_command(&conn, command_id)
    }

    /// Delete logs that failed or never finished
    pub fn clear_unfinished_command_logs(&self) -> Result<usize> {
        let deleted = CommandRepo::clear_unfinished_logs(&self.connect()?, None)?;
        tracing::info!(deleted, "cleared unfinished command logs");
        Ok(deleted)
    }

    /// Keep only the latest successful log of a record, or its latest log
    pub fn consolidate_logs(&self, command_id: i64) -> Result<usize> {
        let conn = self.connect()?;
        if CommandRepo::get_command(&conn, command_id)?.is_none() {
            return Err(CommandError::CommandRecordNotFound { command_id }.into());
        }
        CommandRepo::consolidate_logs(&conn, command_id, None)
    }
}
