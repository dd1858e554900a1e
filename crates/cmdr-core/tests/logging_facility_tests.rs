#![allow(clippy::unwrap_used, clippy::expect_used)]

use cmdr_core::errors::{CmdErrorKind, CommandError};
use cmdr_core::logging_facility::test_capture::init_test_capture;
use cmdr_core::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use cmdr_core::{log_op_end, log_op_error, log_op_start};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, command = "load_parents");

    let events = capture.events();
    let start_events: Vec<_> = events
        .iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .collect();

    assert_eq!(start_events.len(), 1);
    assert_eq!(
        start_events[0].fields.get("command"),
        Some(&"load_parents".to_string())
    );
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("end event should be captured");

    assert_eq!(end_event.fields.get("duration_ms"), Some(&"42".to_string()));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = CommandError::UnknownCommand {
        name: "nope".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 7);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| {
            e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR)
        })
        .expect("error event should be captured");

    assert_eq!(error_event.level, tracing::Level::ERROR);
    assert_eq!(
        error_event.fields.get("err_code"),
        Some(&CmdErrorKind::UnknownCommand.code().to_string())
    );
}

#[test]
fn test_component_is_module_path() {
    let capture = init_test_capture();
    let op_name = "test_component_unique_4";

    log_op_start!(op_name);

    let found = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name)
            && e.component.as_deref() == Some("logging_facility_tests")
    });
    assert_eq!(found, 1);
}
