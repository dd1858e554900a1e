//! Invocations and argument resolution
//!
//! An `Invocation` is what a caller asked for: a command name and a bag of
//! explicit inputs. Resolution splits the bag into parameters and options,
//! applies test overlays and fills the remaining arguments through the
//! command's own command-line definition.

use clap::{Arg, ArgAction, ArgMatches};
use cmdr_core::errors::{CommandError, Result};
use cmdr_core::params::{flag, render_value, ParamMap};
use cmdr_core::spec::{ArgKind, ArgSpec, CommandSpec, IGNORE_DEPENDENCIES, NUM_CORES, TEST};
use serde_json::Value;

/// Where an invocation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Called from code; inputs are completed by parsing a rendered argv
    Library,
    /// Parsed from a real command line; interactive when dependencies are missing
    Cli,
    /// Dispatched to a worker by a supervising run
    Worker,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    command: String,
    explicit: ParamMap,
    origin: Origin,
    task_id: Option<String>,
}

impl Invocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            explicit: ParamMap::new(),
            origin: Origin::Library,
            task_id: None,
        }
    }

    /// Parse a command line against the command's argument definitions
    pub fn from_argv<I, S>(spec: &CommandSpec, argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        Ok(Self {
            command: spec.name.clone(),
            explicit: parse_argv(spec, &argv)?,
            origin: Origin::Cli,
            task_id: None,
        })
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.explicit.insert(key.into(), value.into());
        self
    }

    pub fn args(mut self, args: ParamMap) -> Self {
        self.explicit.extend(args);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn explicit(&self) -> &ParamMap {
        &self.explicit
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }
}

/// Fully resolved inputs of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInvocation {
    pub command: String,
    pub parameters: ParamMap,
    pub options: ParamMap,
    pub origin: Origin,
    pub task_id: Option<String>,
}

impl ResolvedInvocation {
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Boolean option; absent reads as false
    pub fn flag(&self, key: &str) -> bool {
        flag(&self.options, key)
    }

    pub fn is_test(&self) -> bool {
        self.flag(TEST)
    }

    pub fn ignores_dependencies(&self) -> bool {
        self.flag(IGNORE_DEPENDENCIES)
    }

    /// Worker pool size requested by the run, at least one
    pub fn num_cores(&self) -> usize {
        self.options
            .get(NUM_CORES)
            .and_then(Value::as_u64)
            .map(|n| n.max(1) as usize)
            .unwrap_or(1)
    }
}

/// Resolve an invocation against its command's description
pub fn resolve(spec: &CommandSpec, invocation: Invocation) -> Result<ResolvedInvocation> {
    let Invocation {
        command,
        explicit,
        origin,
        task_id,
    } = invocation;

    let mut parameters = ParamMap::new();
    let mut options = ParamMap::new();
    for (key, value) in explicit {
        if cmdr_core::params::INTERNAL_OPTIONS.contains(&key.as_str()) {
            continue;
        }
        if spec.is_parameter(&key) {
            parameters.insert(key, value);
        } else {
            options.insert(key, value);
        }
    }

    for base in [IGNORE_DEPENDENCIES, TEST] {
        options
            .entry(base.to_string())
            .or_insert(Value::Bool(false));
    }

    if flag(&options, TEST) {
        if let Some(overlay) = spec.test_parameter_overrides() {
            parameters.extend(overlay.clone());
        }
        if let Some(overlay) = spec.test_option_overrides() {
            options.extend(overlay.clone());
        }
    }

    if origin == Origin::Library {
        let argv = render_argv(spec, &parameters, &options);
        let parsed = match parse_argv(spec, &argv) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(
                    command = spec.name.as_str(),
                    error = %err,
                    "unable to parse arguments, using defaults and explicit inputs"
                );
                spec.arguments()
                    .into_iter()
                    .map(|arg| (arg.name.clone(), arg.default_value()))
                    .collect()
            }
        };

        for (key, value) in parsed {
            let target = if spec.is_parameter(&key) {
                &mut parameters
            } else {
                &mut options
            };
            target.entry(key).or_insert(value);
        }
    }

    Ok(ResolvedInvocation {
        command,
        parameters,
        options,
        origin,
        task_id,
    })
}

/// Build the command-line definition of a command
pub fn command_line(spec: &CommandSpec) -> clap::Command {
    let mut cmd = clap::Command::new(spec.name.clone()).no_binary_name(true);
    if let Some(about) = &spec.about {
        cmd = cmd.about(about.clone());
    }

    for arg in spec.arguments() {
        let mut clap_arg = Arg::new(arg.name.clone());
        clap_arg = match arg.kind {
            ArgKind::Positional => clap_arg
                .action(ArgAction::Set)
                .required(arg.default.is_none()),
            ArgKind::Value => clap_arg.long(arg.name.clone()).action(ArgAction::Set),
            ArgKind::Flag => clap_arg.long(arg.name.clone()).action(ArgAction::SetTrue),
        };
        if let Some(help) = &arg.help {
            clap_arg = clap_arg.help(help.clone());
        }
        cmd = cmd.arg(clap_arg);
    }

    cmd
}

/// Parse argv into a value for every declared argument
///
/// Absent arguments take their declared default, or `null`.
pub fn parse_argv(spec: &CommandSpec, argv: &[String]) -> Result<ParamMap> {
    let matches = command_line(spec)
        .try_get_matches_from(argv)
        .map_err(|e| CommandError::InvalidArgument {
            command: spec.name.clone(),
            argument: "argv".to_string(),
            reason: e.to_string(),
        })?;

    spec.arguments()
        .iter()
        .map(|arg| Ok((arg.name.clone(), matched_value(spec, arg, &matches)?)))
        .collect()
}

fn matched_value(spec: &CommandSpec, arg: &ArgSpec, matches: &ArgMatches) -> Result<Value> {
    match arg.kind {
        ArgKind::Flag => Ok(Value::Bool(matches.get_flag(&arg.name))),
        ArgKind::Positional | ArgKind::Value => match matches.get_one::<String>(&arg.name) {
            Some(raw) => arg.parse_value(&spec.name, raw),
            None => Ok(arg.default_value()),
        },
    }
}

/// Render inputs as the argv a user would have typed
///
/// Positional parameters come first in declaration order; flags are
/// emitted only when true, and `null` values are left out.
pub fn render_argv(spec: &CommandSpec, parameters: &ParamMap, options: &ParamMap) -> Vec<String> {
    let mut argv = Vec::new();
    let arguments = spec.arguments();

    for arg in arguments.iter().filter(|a| a.kind == ArgKind::Positional) {
        let source = if spec.is_parameter(&arg.name) {
            parameters
        } else {
            options
        };
        if let Some(value) = source.get(&arg.name).filter(|v| !v.is_null()) {
            argv.push(render_value(value));
        }
    }

    for arg in arguments.iter().filter(|a| a.kind != ArgKind::Positional) {
        let source = if spec.is_parameter(&arg.name) {
            parameters
        } else {
            options
        };
        match (arg.kind, source.get(&arg.name)) {
            (_, None) | (_, Some(Value::Null)) => {}
            (ArgKind::Flag, Some(value)) => {
                if value.as_bool() == Some(true) {
                    argv.push(format!("--{}", arg.name));
                }
            }
            (_, Some(value)) => {
                argv.push(format!("--{}", arg.name));
                argv.push(render_value(value));
            }
        }
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdr_core::spec::{PipelineShape, ValueType};
    use serde_json::json;

    fn spec() -> CommandSpec {
        CommandSpec::new("load_parents")
            .parameter(ArgSpec::positional("parent_name"))
            .option(ArgSpec::value("child_name"))
            .option(
                ArgSpec::value("batch")
                    .with_type(ValueType::Int)
                    .with_default(10),
            )
            .with_shape(PipelineShape::ParallelDownloadIterate)
    }

    #[test]
    fn test_library_inputs_are_completed_from_defaults() {
        let resolved =
            resolve(&spec(), Invocation::new("load_parents").arg("parent_name", "bob")).unwrap();

        assert_eq!(resolved.parameters.len(), 1);
        assert_eq!(resolved.parameter("parent_name"), Some(&json!("bob")));
        assert_eq!(resolved.option("child_name"), Some(&Value::Null));
        assert_eq!(resolved.option("batch"), Some(&json!(10)));
        assert_eq!(resolved.option("refresh_cache"), Some(&json!(false)));
        assert_eq!(resolved.num_cores(), 1);
        assert!(!resolved.is_test());
    }

    #[test]
    fn test_explicit_input_wins_over_parsed_value() {
        let resolved = resolve(
            &spec(),
            Invocation::new("load_parents")
                .arg("parent_name", 5)
                .arg("batch", 3),
        )
        .unwrap();

        assert_eq!(resolved.parameter("parent_name"), Some(&json!(5)));
        assert_eq!(resolved.option("batch"), Some(&json!(3)));
    }

    #[test]
    fn test_parse_failure_falls_back_to_defaults() {
        let resolved = resolve(
            &spec(),
            Invocation::new("load_parents").arg("batch", "not a number"),
        )
        .unwrap();

        assert_eq!(resolved.parameter("parent_name"), Some(&Value::Null));
        assert_eq!(resolved.option("batch"), Some(&json!("not a number")));
        assert_eq!(resolved.option("num_cores"), Some(&json!(1)));
    }

    #[test]
    fn test_internal_options_are_dropped() {
        let resolved = resolve(
            &spec(),
            Invocation::new("load_parents")
                .arg("parent_name", "bob")
                .arg("dispatched", true),
        )
        .unwrap();
        assert!(resolved.option("dispatched").is_none());
    }

    #[test]
    fn test_test_flag_applies_overlays() {
        let mut test_parameters = ParamMap::new();
        test_parameters.insert("parent_name".to_string(), json!("test_parent"));
        let mut test_options = ParamMap::new();
        test_options.insert("num_cores".to_string(), json!(1));

        let spec = spec()
            .test_parameters(test_parameters)
            .test_options(test_options);
        let resolved = resolve(
            &spec,
            Invocation::new("load_parents")
                .arg("parent_name", "bob")
                .arg("num_cores", 4)
                .arg("test", true),
        )
        .unwrap();

        assert_eq!(resolved.parameter("parent_name"), Some(&json!("test_parent")));
        assert_eq!(resolved.num_cores(), 1);
        assert!(resolved.is_test());
    }

    #[test]
    fn test_worker_origin_skips_parsing() {
        let resolved = resolve(
            &spec(),
            Invocation::new("load_parents")
                .arg("parent_name", "bob")
                .with_origin(Origin::Worker),
        )
        .unwrap();

        assert!(resolved.option("batch").is_none());
        assert_eq!(resolved.option("test"), Some(&json!(false)));
    }

    #[test]
    fn test_from_argv_parses_types_and_flags() {
        let invocation = Invocation::from_argv(
            &spec(),
            ["bob", "--batch", "7", "--num_cores", "2", "--ignore_dependencies"],
        )
        .unwrap();
        assert_eq!(invocation.origin(), Origin::Cli);

        let resolved = resolve(&spec(), invocation).unwrap();
        assert_eq!(resolved.parameter("parent_name"), Some(&json!("bob")));
        assert_eq!(resolved.option("batch"), Some(&json!(7)));
        assert_eq!(resolved.num_cores(), 2);
        assert!(resolved.ignores_dependencies());
    }

    #[test]
    fn test_from_argv_rejects_unknown_flags() {
        let err = Invocation::from_argv(&spec(), ["bob", "--nope"]).unwrap_err();
        assert_eq!(err.kind(), cmdr_core::CmdErrorKind::InvalidArgument);
    }

    #[test]
    fn test_render_argv_order() {
        let mut parameters = ParamMap::new();
        parameters.insert("parent_name".to_string(), json!("bob"));
        let mut options = ParamMap::new();
        options.insert("child_name".to_string(), json!("sally"));
        options.insert("test".to_string(), json!(true));
        options.insert("ignore_dependencies".to_string(), json!(false));

        assert_eq!(
            render_argv(&spec(), &parameters, &options),
            vec!["bob", "--child_name", "sally", "--test"]
        );
    }
}
