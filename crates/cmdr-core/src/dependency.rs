//! Command dependencies
//!
//! A dependency names another command and the parameters its successful
//! run must have had. Expected parameter values are predicates resolved
//! against the dependent command's own inputs at check time.

use serde_json::Value;

use crate::params::{canonical_json, ParamMap};

/// Inputs a predicate may read
#[derive(Debug, Clone, Copy)]
pub struct DependencyContext<'a> {
    pub parameters: &'a ParamMap,
    pub options: &'a ParamMap,
}

impl<'a> DependencyContext<'a> {
    pub fn new(parameters: &'a ParamMap, options: &'a ParamMap) -> Self {
        Self {
            parameters,
            options,
        }
    }
}

/// Expected value of one dependency parameter
#[derive(Clone)]
pub enum ParamPredicate {
    /// A fixed value
    Literal(Value),
    /// The dependent command's parameter of this name
    Parameter(String),
    /// The dependent command's option of this name
    Option(String),
    /// Computed from the dependent command's inputs
    Resolver(fn(&DependencyContext<'_>) -> Value),
}

impl std::fmt::Debug for ParamPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamPredicate::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ParamPredicate::Parameter(key) => f.debug_tuple("Parameter").field(key).finish(),
            ParamPredicate::Option(key) => f.debug_tuple("Option").field(key).finish(),
            ParamPredicate::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl ParamPredicate {
    /// Resolve to a concrete value; absent inputs resolve to `null`
    pub fn resolve(&self, ctx: &DependencyContext) -> Value {
        match self {
            ParamPredicate::Literal(value) => value.clone(),
            ParamPredicate::Parameter(key) => {
                ctx.parameters.get(key).cloned().unwrap_or(Value::Null)
            }
            ParamPredicate::Option(key) => ctx.options.get(key).cloned().unwrap_or(Value::Null),
            ParamPredicate::Resolver(resolve) => resolve(ctx),
        }
    }
}

/// A prior successful run this command requires
#[derive(Debug, Clone)]
pub struct Dependency {
    pub command: String,
    pub parameters: Vec<(String, ParamPredicate)>,
}

impl Dependency {
    pub fn on(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, predicate: ParamPredicate) -> Self {
        self.parameters.push((key.into(), predicate));
        self
    }

    /// Require the same value as the dependent command's parameter
    pub fn with_parameter(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.with(key.clone(), ParamPredicate::Parameter(key))
    }

    pub fn resolve(&self, ctx: &DependencyContext) -> ParamMap {
        self.parameters
            .iter()
            .map(|(key, predicate)| (key.clone(), predicate.resolve(ctx)))
            .collect()
    }
}

/// A dependency that has no matching successful run
#[derive(Debug, Clone, PartialEq)]
pub struct MissingDependency {
    pub command: String,
    pub parameters: ParamMap,
}

impl std::fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.command, canonical_json(&self.parameters))
    }
}
