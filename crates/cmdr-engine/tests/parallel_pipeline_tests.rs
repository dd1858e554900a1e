// Parallel pipelines: worker pool fan-out and the dispatch shim

mod common;

use cmdr_core::errors::CmdErrorKind;
use cmdr_engine::{dispatch_unit, DispatchRequest, Invocation};
use cmdr_store::{CommandRepo, LinkRepo};
use common::*;
use serde_json::json;

fn sorted(value: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = serde_json::from_value(value.clone()).unwrap();
    names.sort();
    names
}

#[test]
fn test_parallel_download_iterate_with_two_workers() {
    let env = setup();

    let execution = env
        .commander
        .run(Invocation::new(PARALLEL_DOWNLOAD_ITERATE).arg("num_cores", 2))
        .unwrap();

    assert!(execution.is_success());
    assert_eq!(sorted(execution.output().unwrap()), vec!["bob", "shelly"]);

    let conn = env.conn();
    assert_eq!(parent_names(&conn), vec!["bob", "shelly"]);
    assert_eq!(env.counters.downloads(), 1);
    assert_eq!(env.counters.parses(), 2);

    // Workers link to the supervising run's log
    for name in ["bob", "shelly"] {
        let logs = LinkRepo::logs_for_entity(&conn, "parent", name).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, execution.log_id);
    }
    assert_eq!(CommandRepo::count_logs(&conn).unwrap(), 1);
}

#[test]
fn test_parallel_iterate_download_with_two_workers() {
    let env = setup();

    let execution = env
        .commander
        .run(Invocation::new(PARALLEL_ITERATE_DOWNLOAD).arg("num_cores", 2))
        .unwrap();

    assert!(execution.is_success());
    assert_eq!(sorted(execution.output().unwrap()), vec!["BOB", "SHELLY"]);

    let conn = env.conn();
    assert_eq!(upper_name(&conn, "bob").as_deref(), Some("BOB"));
    assert_eq!(upper_name(&conn, "shelly").as_deref(), Some("SHELLY"));
}

#[test]
fn test_single_core_runs_inline() {
    let env = setup();

    let execution = env
        .commander
        .run(Invocation::new(PARALLEL_DOWNLOAD_ITERATE))
        .unwrap();

    assert!(execution.is_success());
    assert_eq!(execution.output(), Some(&json!(["bob", "shelly"])));
}

#[test]
fn test_pool_size_does_not_change_persisted_results() {
    let persisted = |num_cores: i64| {
        let env = setup();
        let execution = env
            .commander
            .run(Invocation::new(PARALLEL_ITERATE_DOWNLOAD).arg("num_cores", num_cores))
            .unwrap();
        assert!(execution.is_success());

        let conn = env.conn();
        let names = parent_names(&conn);
        let uppers: Vec<Option<String>> =
            names.iter().map(|name| upper_name(&conn, name)).collect();
        (names, uppers, sorted(execution.output().unwrap()))
    };

    assert_eq!(persisted(1), persisted(4));
}

#[test]
fn test_test_run_uses_test_options() {
    let env = setup();

    let execution = env
        .commander
        .run(
            Invocation::new(PARALLEL_DOWNLOAD_ITERATE)
                .arg("num_cores", 4)
                .arg("test", true),
        )
        .unwrap();

    let log = CommandRepo::get_log(&env.conn(), execution.log_id)
        .unwrap()
        .unwrap();
    assert_eq!(log.options.get("num_cores"), Some(&json!(1)));
    assert_eq!(execution.output(), Some(&json!(["bob", "shelly"])));
}

#[test]
fn test_dispatch_unit_processes_one_unit() {
    let env = setup();
    let conn = env.conn();

    let output = dispatch_unit(
        &env.commander,
        &conn,
        DispatchRequest {
            command: PARALLEL_ITERATE_DOWNLOAD.to_string(),
            parameters: Default::default(),
            options: Default::default(),
            log_id: None,
            args: vec![json!(["JOHN"]), json!("john")],
        },
    );

    // Without a supervising log the entity link cannot be recorded
    let err = output.unwrap_err();
    assert_eq!(err.kind(), CmdErrorKind::InvalidInput);
}

#[test]
fn test_dispatch_unit_rejects_wrong_arity() {
    let env = setup();
    let conn = env.conn();

    let err = dispatch_unit(
        &env.commander,
        &conn,
        DispatchRequest {
            command: PARALLEL_DOWNLOAD_ITERATE.to_string(),
            parameters: Default::default(),
            options: Default::default(),
            log_id: None,
            args: vec![json!("bob"), json!("extra")],
        },
    )
    .unwrap_err();

    assert_eq!(err.kind(), CmdErrorKind::InvalidInput);
    assert!(err.message().contains("expected 1"));
}

#[test]
fn test_dispatch_unit_stale_download_is_refetched() {
    let env = setup();
    let conn = env.conn();

    let execution = env
        .commander
        .run(Invocation::new(TEST_COMMAND).arg("parent_name", "seed"))
        .unwrap();

    // A payload that no longer fits the download type forces a refreshed download
    let output = dispatch_unit(
        &env.commander,
        &conn,
        DispatchRequest {
            command: PARALLEL_ITERATE_DOWNLOAD.to_string(),
            parameters: Default::default(),
            options: Default::default(),
            log_id: Some(execution.log_id),
            args: vec![json!({"legacy": true}), json!("john")],
        },
    )
    .unwrap();

    assert_eq!(output, Some(json!("JOHN")));
    assert_eq!(env.counters.downloads(), 1);
    assert_eq!(upper_name(&conn, "john").as_deref(), Some("JOHN"));
}

#[test]
fn test_dispatch_unit_unknown_command() {
    let env = setup();
    let conn = env.conn();

    let err = dispatch_unit(
        &env.commander,
        &conn,
        DispatchRequest {
            command: "missing".to_string(),
            parameters: Default::default(),
            options: Default::default(),
            log_id: None,
            args: vec![],
        },
    )
    .unwrap_err();

    assert_eq!(err.kind(), CmdErrorKind::UnknownCommand);
}
