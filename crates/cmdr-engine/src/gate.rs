//! Dependency gate
//!
//! Before a command runs, each declared dependency must have at least one
//! successful execution whose parameters match the dependency's resolved
//! predicates.

use crate::invocation::{Origin, ResolvedInvocation};
use cmdr_core::dependency::{DependencyContext, MissingDependency};
use cmdr_core::errors::{CommandError, Result};
use cmdr_core::params::value_matches;
use cmdr_core::spec::CommandSpec;
use cmdr_store::CommandRepo;
use rusqlite::Connection;
use std::io::{BufRead, Write};

/// Asked whether to run a command despite missing dependencies
pub trait OverridePrompt: Send + Sync {
    fn confirm(&self, command: &str, missing: &[MissingDependency]) -> bool;
}

/// Interactive prompt on stdin/stdout; end of input declines
pub struct StdinPrompt;

impl OverridePrompt for StdinPrompt {
    fn confirm(&self, command: &str, missing: &[MissingDependency]) -> bool {
        let rendered = render_missing(missing).join(", ");
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        loop {
            print!(
                "{}: missing dependencies: {}. Do you want to continue? (y/n) >> ",
                command, rendered
            );
            let _ = std::io::stdout().flush();

            let mut answer = String::new();
            match input.read_line(&mut answer) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => continue,
            }
        }
    }
}

/// Non-interactive prompt that never overrides
pub struct DeclinePrompt;

impl OverridePrompt for DeclinePrompt {
    fn confirm(&self, _command: &str, _missing: &[MissingDependency]) -> bool {
        false
    }
}

pub fn render_missing(missing: &[MissingDependency]) -> Vec<String> {
    missing.iter().map(ToString::to_string).collect()
}

/// Dependencies of `spec` that have no matching successful run
pub fn missing_dependencies(
    conn: &Connection,
    spec: &CommandSpec,
    resolved: &ResolvedInvocation,
) -> Result<Vec<MissingDependency>> {
    let ctx = DependencyContext::new(&resolved.parameters, &resolved.options);
    let mut missing = Vec::new();

    for dependency in spec.dependencies() {
        let expected = dependency.resolve(&ctx);
        let satisfied = CommandRepo::successful_parameter_sets(conn, &dependency.command)?
            .iter()
            .any(|stored| {
                expected.iter().all(|(key, value)| {
                    stored
                        .get(key)
                        .is_some_and(|stored_value| value_matches(stored_value, value))
                })
            });

        if !satisfied {
            missing.push(MissingDependency {
                command: dependency.command.clone(),
                parameters: expected,
            });
        }
    }

    Ok(missing)
}

/// Apply the gate policy for one run
///
/// Bypassed by `ignore_dependencies` and for worker invocations. A blocked
/// CLI run asks `prompt`; a blocked library run fails immediately.
pub fn check(
    conn: &Connection,
    spec: &CommandSpec,
    resolved: &ResolvedInvocation,
    prompt: &dyn OverridePrompt,
) -> Result<()> {
    if resolved.ignores_dependencies() || resolved.origin == Origin::Worker {
        return Ok(());
    }

    let missing = missing_dependencies(conn, spec, resolved)?;
    if missing.is_empty() {
        return Ok(());
    }

    if resolved.origin == Origin::Cli && prompt.confirm(&spec.name, &missing) {
        tracing::info!(
            command = spec.name.as_str(),
            missing = missing.len(),
            "running despite missing dependencies"
        );
        return Ok(());
    }

    Err(CommandError::MissingDependencies {
        command: spec.name.clone(),
        missing: render_missing(&missing),
    }
    .into())
}
