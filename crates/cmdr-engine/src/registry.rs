//! Explicit command registration table
//!
//! The embedding program registers every command at startup, pairing its
//! `CommandSpec` with a factory that builds a fresh instance per run (and
//! per dispatched unit).

use crate::command::{BasicCommand, DownloadIterateCommand, IterateDownloadCommand};
use crate::context::RunContext;
use crate::invocation::ResolvedInvocation;
use crate::maintenance::{ClearCommandLogs, CLEAR_COMMAND_LOGS};
use crate::pipeline;
use cmdr_core::errors::{CmdError, CmdErrorKind, CommandError, Result};
use cmdr_core::spec::{CommandSpec, PipelineShape};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shape-independent view of a command instance
pub(crate) trait ErasedCommand {
    /// Run the whole command and return its serialized output
    fn execute(&mut self, ctx: &RunContext<'_>) -> Result<Value>;

    /// Process one dispatched unit; `None` when the unit turned out empty
    fn process_unit(&mut self, ctx: &RunContext<'_>, args: Vec<Value>) -> Result<Option<Value>>;
}

struct BasicAdapter<C>(C);

impl<C: BasicCommand> ErasedCommand for BasicAdapter<C> {
    fn execute(&mut self, ctx: &RunContext<'_>) -> Result<Value> {
        Ok(serde_json::to_value(self.0.run(ctx)?)?)
    }

    fn process_unit(&mut self, ctx: &RunContext<'_>, _args: Vec<Value>) -> Result<Option<Value>> {
        Err(CmdError::new(CmdErrorKind::InvalidInput)
            .with_command(ctx.command_name())
            .with_message("basic commands have no unit step"))
    }
}

struct DownloadIterateAdapter<C>(C);

impl<C: DownloadIterateCommand> ErasedCommand for DownloadIterateAdapter<C> {
    fn execute(&mut self, ctx: &RunContext<'_>) -> Result<Value> {
        if ctx.shape().is_parallel() {
            pipeline::run_parallel_download_iterate(&mut self.0, ctx)
        } else {
            pipeline::run_download_iterate(&mut self.0, ctx)
        }
    }

    fn process_unit(&mut self, ctx: &RunContext<'_>, args: Vec<Value>) -> Result<Option<Value>> {
        pipeline::process_download_iterate_unit(&mut self.0, ctx, args)
    }
}

struct IterateDownloadAdapter<C>(C);

impl<C: IterateDownloadCommand> ErasedCommand for IterateDownloadAdapter<C> {
    fn execute(&mut self, ctx: &RunContext<'_>) -> Result<Value> {
        if ctx.shape().is_parallel() {
            pipeline::run_parallel_iterate_download(&mut self.0, ctx)
        } else {
            pipeline::run_iterate_download(&mut self.0, ctx)
        }
    }

    fn process_unit(&mut self, ctx: &RunContext<'_>, args: Vec<Value>) -> Result<Option<Value>> {
        pipeline::process_iterate_download_unit(&mut self.0, ctx, args)
    }
}

type Factory =
    Box<dyn Fn(&ResolvedInvocation) -> Result<Box<dyn ErasedCommand>> + Send + Sync>;

/// A registered command: its description and how to build it
pub struct Registration {
    spec: CommandSpec,
    factory: Factory,
}

impl Registration {
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn shape(&self) -> PipelineShape {
        self.spec.shape()
    }

    pub(crate) fn instantiate(&self, resolved: &ResolvedInvocation) -> Result<Box<dyn ErasedCommand>> {
        (self.factory)(resolved)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    commands: BTreeMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in maintenance commands
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let spec = CommandSpec::new(CLEAR_COMMAND_LOGS).about(
            "Delete failed logs, drop records without logs and keep one log per record",
        );
        // A fresh registry has no entries, so this cannot collide.
        let _ = registry.register_basic(spec, |_| Ok(ClearCommandLogs));
        registry
    }

    fn insert(&mut self, spec: CommandSpec, factory: Factory) -> Result<()> {
        if self.commands.contains_key(&spec.name) {
            return Err(CommandError::AlreadyRegistered {
                name: spec.name.clone(),
            }
            .into());
        }
        tracing::debug!(
            command = spec.name.as_str(),
            shape = spec.shape().as_str(),
            "registered command"
        );
        self.commands
            .insert(spec.name.clone(), Registration { spec, factory });
        Ok(())
    }

    pub fn register_basic<C, F>(&mut self, spec: CommandSpec, factory: F) -> Result<()>
    where
        C: BasicCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.insert(
            spec.with_shape(PipelineShape::Basic),
            Box::new(move |resolved| {
                Ok(Box::new(BasicAdapter(factory(resolved)?)) as Box<dyn ErasedCommand>)
            }),
        )
    }

    pub fn register_download_iterate<C, F>(&mut self, spec: CommandSpec, factory: F) -> Result<()>
    where
        C: DownloadIterateCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.register_download_iterate_shape(spec, PipelineShape::DownloadIterate, factory)
    }

    pub fn register_parallel_download_iterate<C, F>(
        &mut self,
        spec: CommandSpec,
        factory: F,
    ) -> Result<()>
    where
        C: DownloadIterateCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.register_download_iterate_shape(spec, PipelineShape::ParallelDownloadIterate, factory)
    }

    pub fn register_iterate_download<C, F>(&mut self, spec: CommandSpec, factory: F) -> Result<()>
    where
        C: IterateDownloadCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.register_iterate_download_shape(spec, PipelineShape::IterateDownload, factory)
    }

    pub fn register_parallel_iterate_download<C, F>(
        &mut self,
        spec: CommandSpec,
        factory: F,
    ) -> Result<()>
    where
        C: IterateDownloadCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.register_iterate_download_shape(spec, PipelineShape::ParallelIterateDownload, factory)
    }

    fn register_download_iterate_shape<C, F>(
        &mut self,
        spec: CommandSpec,
        shape: PipelineShape,
        factory: F,
    ) -> Result<()>
    where
        C: DownloadIterateCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.insert(
            spec.with_shape(shape),
            Box::new(move |resolved| {
                Ok(Box::new(DownloadIterateAdapter(factory(resolved)?)) as Box<dyn ErasedCommand>)
            }),
        )
    }

    fn register_iterate_download_shape<C, F>(
        &mut self,
        spec: CommandSpec,
        shape: PipelineShape,
        factory: F,
    ) -> Result<()>
    where
        C: IterateDownloadCommand + 'static,
        F: Fn(&ResolvedInvocation) -> Result<C> + Send + Sync + 'static,
    {
        self.insert(
            spec.with_shape(shape),
            Box::new(move |resolved| {
                Ok(Box::new(IterateDownloadAdapter(factory(resolved)?)) as Box<dyn ErasedCommand>)
            }),
        )
    }

    pub fn get(&self, name: &str) -> Result<&Registration> {
        self.commands.get(name).ok_or_else(|| {
            CommandError::UnknownCommand {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
