//! Per-run context handed to command code

use crate::commander::Commander;
use crate::invocation::ResolvedInvocation;
use crate::result_cache::{cache_key, cache_namespace, read_through};
use cmdr_core::errors::{CmdError, CmdErrorKind, Result};
use cmdr_core::params::ParamMap;
use cmdr_core::spec::{PipelineShape, REFRESH_CACHE};
use cmdr_store::LinkRepo;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;

/// Everything a command step can see about the run it belongs to
///
/// Borrowed for the duration of one step; worker threads build their own
/// context on their own connection.
pub struct RunContext<'a> {
    commander: &'a Commander,
    conn: &'a Connection,
    resolved: &'a ResolvedInvocation,
    shape: PipelineShape,
    log_id: Option<i64>,
    force_refresh: Cell<bool>,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        commander: &'a Commander,
        conn: &'a Connection,
        resolved: &'a ResolvedInvocation,
        shape: PipelineShape,
        log_id: Option<i64>,
    ) -> Self {
        Self {
            commander,
            conn,
            resolved,
            shape,
            log_id,
            force_refresh: Cell::new(false),
        }
    }

    /// Database connection of this run (or of this worker)
    pub fn conn(&self) -> &Connection {
        self.conn
    }

    pub fn commander(&self) -> &Commander {
        self.commander
    }

    pub fn command_name(&self) -> &str {
        &self.resolved.command
    }

    pub fn resolved(&self) -> &ResolvedInvocation {
        self.resolved
    }

    pub fn parameters(&self) -> &ParamMap {
        &self.resolved.parameters
    }

    pub fn options(&self) -> &ParamMap {
        &self.resolved.options
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.resolved.parameter(key)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.resolved.option(key)
    }

    /// String parameter, or an `InvalidInput` error naming the key
    pub fn parameter_str(&self, key: &str) -> Result<&str> {
        self.parameter(key).and_then(Value::as_str).ok_or_else(|| {
            CmdError::new(CmdErrorKind::InvalidInput)
                .with_command(self.command_name())
                .with_message(format!("parameter '{}' is missing or not a string", key))
        })
    }

    /// Execution log of the run; `None` only for contexts built outside a run
    pub fn log_id(&self) -> Option<i64> {
        self.log_id
    }

    pub fn shape(&self) -> PipelineShape {
        self.shape
    }

    pub fn is_test(&self) -> bool {
        self.resolved.is_test()
    }

    pub fn num_cores(&self) -> usize {
        self.resolved.num_cores()
    }

    /// Whether cached results must be recomputed
    pub fn refresh_requested(&self) -> bool {
        self.force_refresh.get() || self.resolved.flag(REFRESH_CACHE)
    }

    /// Run `f` with cache reads bypassed
    pub fn refreshing<T>(&self, f: impl FnOnce() -> T) -> T {
        let previous = self.force_refresh.replace(true);
        let out = f();
        self.force_refresh.set(previous);
        out
    }

    /// Memoize `compute` under this command, `function`, `args` and the
    /// run's parameters
    pub fn cached<A, T, F>(&self, function: &str, args: &A, compute: F) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let args = serde_json::to_value(args)?;
        let key = cache_key(self.command_name(), function, &args, self.parameters());
        let namespace = cache_namespace(self.command_name(), self.is_test());
        read_through(
            self.commander.cache(),
            &namespace,
            &key,
            function,
            self.refresh_requested(),
            compute,
        )
    }

    /// Record that this run wrote the given entity
    pub fn link_entity(&self, entity_type: &str, entity_key: &str) -> Result<()> {
        let log_id = self.log_id.ok_or_else(|| {
            CmdError::new(CmdErrorKind::InvalidInput)
                .with_op("link_entity")
                .with_command(self.command_name())
                .with_message("no execution log is attached to this context")
        })?;
        LinkRepo::link_entity(self.conn, log_id, entity_type, entity_key)
    }
}
