//! Links between execution logs and the domain rows they wrote
//!
//! Commands call `link_entity` for each row they create or update, so a
//! row's provenance can later be traced to the logs and records that
//! touched it. Entity-to-record links are derived through the log.

use super::rows::{command_from_row, log_from_row, COMMAND_COLUMNS, LOG_COLUMNS};
use crate::errors::{from_rusqlite, Result};
use cmdr_core::model::{CommandRecord, ExecutionLog};
use rusqlite::{params, Connection};

pub struct LinkRepo;

impl LinkRepo {
    /// Associate an entity with a log; linking twice is a no-op
    pub fn link_entity(
        conn: &Connection,
        log_id: i64,
        entity_type: &str,
        entity_key: &str,
    ) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO command_log_links (log_id, entity_type, entity_key)
             VALUES (?1, ?2, ?3)",
            params![log_id, entity_type, entity_key],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Logs linked to an entity, newest first
    pub fn logs_for_entity(
        conn: &Connection,
        entity_type: &str,
        entity_key: &str,
    ) -> Result<Vec<ExecutionLog>> {
        let columns = LOG_COLUMNS
            .split(", ")
            .map(|c| format!("l.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM command_logs l
                 JOIN command_log_links k ON k.log_id = l.id
                 WHERE k.entity_type = ?1 AND k.entity_key = ?2
                 ORDER BY l.start_time DESC, l.id DESC",
                columns
            ))
            .map_err(from_rusqlite)?;
        let logs = stmt
            .query_map(params![entity_type, entity_key], log_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(logs)
    }

    /// Distinct records whose logs are linked to an entity
    pub fn commands_for_entity(
        conn: &Connection,
        entity_type: &str,
        entity_key: &str,
    ) -> Result<Vec<CommandRecord>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM commands WHERE id IN (
                    SELECT l.command_id FROM command_logs l
                    JOIN command_log_links k ON k.log_id = l.id
                    WHERE k.entity_type = ?1 AND k.entity_key = ?2
                 ) ORDER BY id",
                COMMAND_COLUMNS
            ))
            .map_err(from_rusqlite)?;
        let records = stmt
            .query_map(params![entity_type, entity_key], command_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(records)
    }

    /// Entities linked to one log, as `(entity_type, entity_key)`
    pub fn entities_for_log(conn: &Connection, log_id: i64) -> Result<Vec<(String, String)>> {
        let mut stmt = conn
            .prepare(
                "SELECT entity_type, entity_key FROM command_log_links
                 WHERE log_id = ?1 ORDER BY entity_type, entity_key",
            )
            .map_err(from_rusqlite)?;
        let entities = stmt
            .query_map([log_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(entities)
    }
}
