//! Static command descriptions
//!
//! A `CommandSpec` declares everything the framework needs to know about a
//! command before constructing it: its arguments, which of them are
//! parameters, its dependencies, test inputs, and the pipeline shape that
//! drives its execution.

use serde_json::Value;

use crate::dependency::Dependency;
use crate::errors::{CommandError, Result};
use crate::params::ParamMap;

pub const IGNORE_DEPENDENCIES: &str = "ignore_dependencies";
pub const TEST: &str = "test";
pub const REFRESH_CACHE: &str = "refresh_cache";
pub const NUM_CORES: &str = "num_cores";

/// How the pipeline drives a command through RUNNING
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineShape {
    /// Single `run` step
    Basic,
    /// Acquire once, then expand into units
    DownloadIterate,
    /// Expand into units, then acquire per unit
    IterateDownload,
    /// `DownloadIterate` with units fanned out to a worker pool
    ParallelDownloadIterate,
    /// `IterateDownload` with units fanned out to a worker pool
    ParallelIterateDownload,
}

impl PipelineShape {
    /// Shapes with download and iterate steps
    pub fn is_pipeline(&self) -> bool {
        !matches!(self, PipelineShape::Basic)
    }

    pub fn is_parallel(&self) -> bool {
        matches!(
            self,
            PipelineShape::ParallelDownloadIterate | PipelineShape::ParallelIterateDownload
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineShape::Basic => "basic",
            PipelineShape::DownloadIterate => "download_iterate",
            PipelineShape::IterateDownload => "iterate_download",
            PipelineShape::ParallelDownloadIterate => "parallel_download_iterate",
            PipelineShape::ParallelIterateDownload => "parallel_iterate_download",
        }
    }
}

/// How an argument appears on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// `<name>`
    Positional,
    /// `--name <value>`
    Value,
    /// `--name`, true when present
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
}

/// One declared command argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    pub value_type: ValueType,
    pub default: Option<Value>,
    pub help: Option<String>,
}

impl ArgSpec {
    fn new(name: impl Into<String>, kind: ArgKind, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type,
            default: None,
            help: None,
        }
    }

    /// Required positional string argument
    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Positional, ValueType::String)
    }

    /// Optional `--name <value>` string argument
    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Value, ValueType::String)
    }

    /// Boolean `--name` switch, false when absent
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Flag, ValueType::Bool).with_default(Value::Bool(false))
    }

    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Value taken when the argument is absent: its default, or `null`
    pub fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Convert a raw command-line string into a typed value
    pub fn parse_value(&self, command: &str, raw: &str) -> Result<Value> {
        let invalid = |reason: String| CommandError::InvalidArgument {
            command: command.to_string(),
            argument: self.name.clone(),
            reason,
        };

        let value = match self.value_type {
            ValueType::String => Value::String(raw.to_string()),
            ValueType::Int => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| invalid(e.to_string()))?,
            ValueType::Float => raw
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| invalid(e.to_string()))?,
            ValueType::Bool => raw
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|e| invalid(e.to_string()))?,
        };
        Ok(value)
    }
}

/// Static description of one command
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub about: Option<String>,
    arguments: Vec<ArgSpec>,
    parameter_names: Vec<String>,
    dependencies: Vec<Dependency>,
    test_parameters: Option<ParamMap>,
    test_options: Option<ParamMap>,
    shape: PipelineShape,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            arguments: Vec::new(),
            parameter_names: Vec::new(),
            dependencies: Vec::new(),
            test_parameters: None,
            test_options: None,
            shape: PipelineShape::Basic,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Declare an argument that identifies the data set the command loads
    pub fn parameter(mut self, arg: ArgSpec) -> Self {
        self.parameter_names.push(arg.name.clone());
        self.arguments.push(arg);
        self
    }

    /// Declare an argument that only affects how the command runs
    pub fn option(mut self, arg: ArgSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn test_parameters(mut self, parameters: ParamMap) -> Self {
        self.test_parameters = Some(parameters);
        self
    }

    pub fn test_options(mut self, options: ParamMap) -> Self {
        self.test_options = Some(options);
        self
    }

    /// Set the pipeline shape; registries call this when a command is registered
    pub fn with_shape(mut self, shape: PipelineShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn shape(&self) -> PipelineShape {
        self.shape
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameter_names.iter().any(|p| p == name)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn test_parameter_overrides(&self) -> Option<&ParamMap> {
        self.test_parameters.as_ref()
    }

    pub fn test_option_overrides(&self) -> Option<&ParamMap> {
        self.test_options.as_ref()
    }

    /// Whether the command takes part in the test sweep
    pub fn has_test_inputs(&self) -> bool {
        self.test_parameters.is_some() || self.test_options.is_some()
    }

    /// Declared arguments followed by the base arguments for this shape
    pub fn arguments(&self) -> Vec<ArgSpec> {
        let mut all = self.arguments.clone();
        all.extend(
            base_arguments(self.shape)
                .into_iter()
                .filter(|base| !self.arguments.iter().any(|a| a.name == base.name)),
        );
        all
    }

    pub fn argument(&self, name: &str) -> Option<ArgSpec> {
        self.arguments().into_iter().find(|a| a.name == name)
    }
}

/// Arguments every command of a given shape accepts
pub fn base_arguments(shape: PipelineShape) -> Vec<ArgSpec> {
    let mut args = vec![
        ArgSpec::flag(IGNORE_DEPENDENCIES).with_help("Run even if dependencies have not run"),
        ArgSpec::flag(TEST).with_help("Run with the command's test inputs"),
    ];

    if shape.is_pipeline() {
        args.push(ArgSpec::flag(REFRESH_CACHE).with_help("Recompute cached results"));
    }

    if shape.is_parallel() {
        args.push(
            ArgSpec::value(NUM_CORES)
                .with_type(ValueType::Int)
                .with_default(1)
                .with_help("Number of worker threads"),
        );
    }

    args
}
