// Integration tests for log/entity links

use cmdr_core::params::ParamMap;
use cmdr_store::{CommandRepo, Database, LinkRepo};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_entity_links_resolve_logs_and_commands() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("commander.db"));
    db.initialize().unwrap();
    let conn = db.connect().unwrap();

    let mut bob = ParamMap::new();
    bob.insert("parent_name".to_string(), json!("bob"));
    let loader = CommandRepo::get_or_create_command(&conn, "load_parents", &bob).unwrap();
    let enricher = CommandRepo::get_or_create_command(&conn, "enrich_parents", &bob).unwrap();

    let first = CommandRepo::create_log(&conn, loader.id, &ParamMap::new(), None).unwrap();
    let second = CommandRepo::create_log(&conn, loader.id, &ParamMap::new(), None).unwrap();
    let third = CommandRepo::create_log(&conn, enricher.id, &ParamMap::new(), None).unwrap();

    for log_id in [first.id, second.id, third.id] {
        LinkRepo::link_entity(&conn, log_id, "parent", "bob").unwrap();
    }
    LinkRepo::link_entity(&conn, first.id, "parent", "bob").unwrap();
    LinkRepo::link_entity(&conn, first.id, "child", "sally").unwrap();

    assert_eq!(LinkRepo::logs_for_entity(&conn, "parent", "bob").unwrap().len(), 3);
    assert_eq!(LinkRepo::commands_for_entity(&conn, "parent", "bob").unwrap().len(), 2);

    let sally_commands = LinkRepo::commands_for_entity(&conn, "child", "sally").unwrap();
    assert_eq!(sally_commands.len(), 1);
    assert_eq!(sally_commands[0].name, "load_parents");

    assert_eq!(
        LinkRepo::entities_for_log(&conn, first.id).unwrap(),
        vec![
            ("child".to_string(), "sally".to_string()),
            ("parent".to_string(), "bob".to_string())
        ]
    );
}

#[test]
fn test_links_are_removed_with_their_log() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("commander.db"));
    db.initialize().unwrap();
    let conn = db.connect().unwrap();

    let record = CommandRepo::get_or_create_command(&conn, "a", &ParamMap::new()).unwrap();
    let log = CommandRepo::create_log(&conn, record.id, &ParamMap::new(), None).unwrap();
    LinkRepo::link_entity(&conn, log.id, "parent", "bob").unwrap();

    CommandRepo::delete_log(&conn, log.id).unwrap();

    assert!(LinkRepo::logs_for_entity(&conn, "parent", "bob").unwrap().is_empty());
}
