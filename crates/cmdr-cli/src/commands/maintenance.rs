//! Log maintenance and the test sweep

use cmdr_engine::Commander;

pub fn execute_clear_unfinished(commander: &Commander) -> Result<(), Box<dyn std::error::Error>> {
    let deleted = commander.clear_unfinished_command_logs()?;
    println!("Deleted {} unfinished log(s)", deleted);
    Ok(())
}

pub fn execute_test_commands(commander: &Commander) -> Result<(), Box<dyn std::error::Error>> {
    let executions = commander.test_commands()?;
    let mut failed = 0;
    for execution in &executions {
        let record = commander.command(execution.command_id)?;
        match execution.error() {
            None => println!("ok\t{}", record.name),
            Some(error) => {
                failed += 1;
                println!("FAILED\t{}\t{}", record.name, error);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} test command(s) failed", failed, executions.len()).into());
    }
    Ok(())
}
