//! cmdr CLI
//!
//! Command-line front end for a command registry. The `cmdr` binary runs
//! the built-in commands; programs with their own commands build a
//! `Registry` and hand it to [`run`].

use clap::{Parser, Subcommand};
use cmdr_core::config::CommanderConfig;
use cmdr_core::logging_facility;
use cmdr_engine::{Commander, Registry};
use std::ffi::OsString;
use std::path::PathBuf;

pub mod commands;

#[derive(Debug, Parser)]
#[command(name = "cmdr")]
#[command(about = "Run registered commands and inspect their execution history", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to cmdr.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database holding command records and logs
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Root directory of the result cache
    #[arg(long = "cache-dir", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a registered command
    Run(commands::run::RunArgs),
    /// List registered commands
    #[command(name = "commands")]
    List,
    /// Show command records with their latest log
    History,
    /// Show every log of one command record
    Logs(commands::history::LogsArgs),
    /// Delete logs that failed or never finished
    ClearUnfinished,
    /// Run every command that declares test inputs
    TestCommands,
}

/// Parse `args` and run them against `registry`; returns the exit status
pub fn run<I, T>(registry: Registry, args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    match execute(registry, cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn execute(registry: Registry, cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CommanderConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }
    logging_facility::init(config.log_profile()?);

    if let CliCommand::List = cli.command {
        return commands::list::execute(&registry);
    }

    let commander = Commander::from_config(registry, &config)?;
    match cli.command {
        CliCommand::Run(args) => commands::run::execute(commander, args),
        CliCommand::List => commands::list::execute(commander.registry()),
        CliCommand::History => commands::history::execute_history(&commander),
        CliCommand::Logs(args) => commands::history::execute_logs(&commander, args),
        CliCommand::ClearUnfinished => commands::maintenance::execute_clear_unfinished(&commander),
        CliCommand::TestCommands => commands::maintenance::execute_test_commands(&commander),
    }
}
