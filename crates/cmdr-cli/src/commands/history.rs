//! Execution history listings

use clap::Args;
use cmdr_core::model::ExecutionLog;
use cmdr_engine::Commander;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Command record id, as shown by `cmdr history`
    pub command_id: i64,
}

fn format_log(log: &ExecutionLog) -> String {
    let end_time = log
        .end_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}\t{}\t{}\t{}",
        log.id,
        log.status(),
        log.start_time.to_rfc3339(),
        end_time
    );
    if let Some(error) = &log.error {
        line.push('\t');
        line.push_str(&error.message);
    }
    line
}

pub fn execute_history(commander: &Commander) -> Result<(), Box<dyn std::error::Error>> {
    for summary in commander.history()? {
        let latest = summary
            .latest_log
            .as_ref()
            .map(|log| format!("{} {}", log.status(), log.start_time.to_rfc3339()))
            .unwrap_or_else(|| "never run".to_string());
        println!(
            "{}\t{}\t{}\t{} log(s)",
            summary.command.id, summary.command, latest, summary.log_count
        );
    }
    Ok(())
}

pub fn execute_logs(
    commander: &Commander,
    args: LogsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = commander.command(args.command_id)?;
    println!("{}", record);
    for log in commander.logs(args.command_id)? {
        println!("{}", format_log(&log));
    }
    Ok(())
}
