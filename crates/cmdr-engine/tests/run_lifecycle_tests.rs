// Execution lifecycle: records, logs, outcomes and entity links

mod common;

use cmdr_core::errors::CmdErrorKind;
use cmdr_core::model::LogStatus;
use cmdr_engine::{Invocation, Outcome};
use cmdr_store::{CommandRepo, LinkRepo};
use common::*;
use serde_json::json;

#[test]
fn test_run_creates_record_and_completed_log() {
    let env = setup();

    let execution = env
        .commander
        .run(Invocation::new(TEST_COMMAND).arg("parent_name", "bob"))
        .unwrap();

    assert!(execution.is_success());
    assert_eq!(execution.output(), Some(&json!(["bob", "child"])));

    let conn = env.conn();
    let record = CommandRepo::get_command(&conn, execution.command_id)
        .unwrap()
        .unwrap();
    assert_eq!(record.name, TEST_COMMAND);
    assert_eq!(record.parameters, args(&[("parent_name", json!("bob"))]));

    let log = CommandRepo::get_log(&conn, execution.log_id).unwrap().unwrap();
    assert_eq!(log.status(), LogStatus::Completed);
    assert!(log.end_time.is_some());
    assert_eq!(parent_names(&conn), vec!["bob"]);
}

#[test]
fn test_same_parameters_reuse_record() {
    let env = setup();

    let first = env
        .commander
        .run_command(TEST_COMMAND, args(&[("parent_name", json!("bob"))]))
        .unwrap();
    let second = env
        .commander
        .run_command(
            TEST_COMMAND,
            args(&[("parent_name", json!("bob")), ("child_name", json!("ann"))]),
        )
        .unwrap();
    let other = env
        .commander
        .run_command(TEST_COMMAND, args(&[("parent_name", json!("shelly"))]))
        .unwrap();

    assert_eq!(first.command_id, second.command_id);
    assert_ne!(first.log_id, second.log_id);
    assert_ne!(first.command_id, other.command_id);

    let conn = env.conn();
    assert_eq!(CommandRepo::count_commands(&conn).unwrap(), 2);
    assert_eq!(CommandRepo::count_logs(&conn).unwrap(), 3);
    assert_eq!(
        CommandRepo::logs_for_command(&conn, first.command_id)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_options_are_stored_on_log() {
    let env = setup();

    let execution = env
        .commander
        .run_command(
            TEST_COMMAND,
            args(&[("parent_name", json!("bob")), ("child_name", json!("ann"))]),
        )
        .unwrap();

    let log = CommandRepo::get_log(&env.conn(), execution.log_id)
        .unwrap()
        .unwrap();
    assert_eq!(log.options.get("child_name"), Some(&json!("ann")));
    assert_eq!(log.options.get("test"), Some(&json!(false)));
    assert_eq!(log.options.get("ignore_dependencies"), Some(&json!(false)));
}

#[test]
fn test_failed_run_records_structured_error() {
    let env = setup();

    let execution = env.commander.run(Invocation::new(FAILING_COMMAND)).unwrap();

    let Outcome::Failed(error) = &execution.outcome else {
        panic!("expected a failed outcome");
    };
    assert_eq!(error.code, CmdErrorKind::CommandFailed.code());
    assert!(error.message.contains("parent source unavailable"));
    assert!(!error.trace.is_empty());

    let log = CommandRepo::get_log(&env.conn(), execution.log_id)
        .unwrap()
        .unwrap();
    assert_eq!(log.status(), LogStatus::Failed);
    assert!(log.end_time.is_none());
    assert_eq!(log.error.as_ref(), Some(error));

    let err = execution.into_result().unwrap_err();
    assert_eq!(err.kind(), CmdErrorKind::CommandFailed);
}

#[test]
fn test_failure_does_not_abort_following_runs() {
    let env = setup();

    let failed = env.commander.run(Invocation::new(FAILING_COMMAND)).unwrap();
    let succeeded = env
        .commander
        .run(Invocation::new(TEST_COMMAND).arg("parent_name", "bob"))
        .unwrap();

    assert!(!failed.is_success());
    assert!(succeeded.is_success());
    assert_eq!(CommandRepo::count_logs(&env.conn()).unwrap(), 2);
}

#[test]
fn test_unknown_command_is_error_without_log() {
    let env = setup();

    let err = env
        .commander
        .run(Invocation::new("no_such_command"))
        .unwrap_err();

    assert_eq!(err.kind(), CmdErrorKind::UnknownCommand);
    assert_eq!(CommandRepo::count_logs(&env.conn()).unwrap(), 0);
}

#[test]
fn test_entities_are_linked_to_log() {
    let env = setup();

    let execution = env
        .commander
        .run(Invocation::new(TEST_COMMAND).arg("parent_name", "bob"))
        .unwrap();

    let conn = env.conn();
    let entities = LinkRepo::entities_for_log(&conn, execution.log_id).unwrap();
    assert_eq!(
        entities,
        vec![
            ("child".to_string(), "bob/child".to_string()),
            ("parent".to_string(), "bob".to_string()),
        ]
    );

    let records = LinkRepo::commands_for_entity(&conn, "parent", "bob").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, execution.command_id);
}

#[test]
fn test_run_record_replays_parameters() {
    let env = setup();

    let first = env
        .commander
        .run_command(TEST_COMMAND, args(&[("parent_name", json!("bob"))]))
        .unwrap();
    let replay = env.commander.run_record(first.command_id).unwrap();

    assert!(replay.is_success());
    assert_eq!(replay.command_id, first.command_id);

    let err = env.commander.run_record(9999).unwrap_err();
    assert_eq!(err.kind(), CmdErrorKind::NotFound);
}

#[test]
fn test_history_lists_latest_first() {
    let env = setup();

    env.commander
        .run_command(TEST_COMMAND, args(&[("parent_name", json!("bob"))]))
        .unwrap();
    let latest = env.commander.run(Invocation::new(FAILING_COMMAND)).unwrap();

    let history = env.commander.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].command.id, latest.command_id);
    assert_eq!(
        history[0].latest_log.as_ref().map(|l| l.status()),
        Some(LogStatus::Failed)
    );

    let logs = env.commander.logs(latest.command_id).unwrap();
    assert_eq!(logs.len(), 1);
}
