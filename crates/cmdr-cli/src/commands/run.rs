//! Run one registered command from the command line

use clap::Args;
use cmdr_engine::{Commander, Invocation, Outcome, StdinPrompt};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Registered command name
    pub command: String,

    /// Arguments passed through to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

pub fn execute(commander: Commander, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let commander = commander.with_prompt(Arc::new(StdinPrompt));
    let spec = commander.registry().get(&args.command)?.spec();
    let invocation = Invocation::from_argv(spec, args.args)?;

    let execution = commander.run(invocation)?;
    match execution.outcome {
        Outcome::Completed(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            println!(
                "{} completed (command {}, log {})",
                args.command, execution.command_id, execution.log_id
            );
            Ok(())
        }
        Outcome::Failed(error) => Err(format!(
            "{} failed (command {}, log {}): {}",
            args.command, execution.command_id, execution.log_id, error
        )
        .into()),
    }
}
