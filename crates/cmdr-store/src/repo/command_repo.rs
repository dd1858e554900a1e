//! Execution record store
//!
//! Command records are unique per `(name, canonical parameters)`; every
//! execution attempt appends one log row under its record.

use super::rows::{
    command_from_row, log_from_row, to_millis, COMMAND_COLUMNS, LOG_COLUMNS,
};
use crate::errors::{from_rusqlite, log_not_found, Result};
use chrono::Utc;
use cmdr_core::model::{CommandRecord, CommandSummary, ExecutionLog, LogError};
use cmdr_core::params::{canonical_json, loggable_options, parse_map, ParamMap};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite repository for command records and execution logs
pub struct CommandRepo;

impl CommandRepo {
    /// Fetch the record for `(name, parameters)`, creating it on first use
    ///
    /// Safe under concurrent callers: the insert is a no-op when another
    /// connection created the row first.
    pub fn get_or_create_command(
        conn: &Connection,
        name: &str,
        parameters: &ParamMap,
    ) -> Result<CommandRecord> {
        let canonical = canonical_json(parameters);

        conn.execute(
            "INSERT INTO commands (name, parameters, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (name, parameters) DO NOTHING",
            params![name, canonical, to_millis(Utc::now())],
        )
        .map_err(from_rusqlite)?;

        conn.query_row(
            &format!(
                "SELECT {} FROM commands WHERE name = ?1 AND parameters = ?2",
                COMMAND_COLUMNS
            ),
            params![name, canonical],
            command_from_row,
        )
        .map_err(from_rusqlite)
    }

    pub fn get_command(conn: &Connection, command_id: i64) -> Result<Option<CommandRecord>> {
        conn.query_row(
            &format!("SELECT {} FROM commands WHERE id = ?1", COMMAND_COLUMNS),
            [command_id],
            command_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    pub fn find_command(
        conn: &Connection,
        name: &str,
        parameters: &ParamMap,
    ) -> Result<Option<CommandRecord>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM commands WHERE name = ?1 AND parameters = ?2",
                COMMAND_COLUMNS
            ),
            params![name, canonical_json(parameters)],
            command_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// All records, oldest first
    pub fn list_commands(conn: &Connection) -> Result<Vec<CommandRecord>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM commands ORDER BY id", COMMAND_COLUMNS))
            .map_err(from_rusqlite)?;
        let records = stmt
            .query_map([], command_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(records)
    }

    /// Records with their latest log, most recently run first
    ///
    /// Records without logs sort last.
    pub fn list_summaries(conn: &Connection) -> Result<Vec<CommandSummary>> {
        let mut summaries = Vec::new();
        for command in Self::list_commands(conn)? {
            let logs = Self::logs_for_command(conn, command.id)?;
            summaries.push(CommandSummary {
                log_count: logs.len(),
                latest_log: logs.into_iter().next(),
                command,
            });
        }

        summaries.sort_by(|a, b| {
            let key = |s: &CommandSummary| {
                (
                    s.latest_log.as_ref().map(|l| (l.start_time, l.id)),
                    s.command.id,
                )
            };
            key(b).cmp(&key(a))
        });
        Ok(summaries)
    }

    /// Start a new execution attempt
    ///
    /// Framework-internal option keys are dropped before the options are stored.
    pub fn create_log(
        conn: &Connection,
        command_id: i64,
        options: &ParamMap,
        task_id: Option<&str>,
    ) -> Result<ExecutionLog> {
        let options = loggable_options(options);
        let start_time = Utc::now();

        conn.execute(
            "INSERT INTO command_logs (command_id, start_time, options, task_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                command_id,
                to_millis(start_time),
                canonical_json(&options),
                task_id
            ],
        )
        .map_err(from_rusqlite)?;

        let id = conn.last_insert_rowid();
        tracing::debug!(log_id = id, command_id, "created execution log");

        Self::get_log(conn, id)?.ok_or_else(|| log_not_found(id))
    }

    pub fn get_log(conn: &Connection, log_id: i64) -> Result<Option<ExecutionLog>> {
        conn.query_row(
            &format!("SELECT {} FROM command_logs WHERE id = ?1", LOG_COLUMNS),
            [log_id],
            log_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Mark an attempt as completed
    pub fn finish_log(conn: &Connection, log_id: i64) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE command_logs SET end_time = ?1 WHERE id = ?2",
                params![to_millis(Utc::now()), log_id],
            )
            .map_err(from_rusqlite)?;

        if updated == 0 {
            return Err(log_not_found(log_id));
        }
        Ok(())
    }

    /// Record a structured error on an attempt
    pub fn fail_log(conn: &Connection, log_id: i64, error: &LogError) -> Result<()> {
        Self::fail_log_text(conn, log_id, &error.to_column()?)
    }

    /// Record an error as plain text
    pub fn fail_log_text(conn: &Connection, log_id: i64, error: &str) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE command_logs SET error = ?1 WHERE id = ?2",
                params![error, log_id],
            )
            .map_err(from_rusqlite)?;

        if updated == 0 {
            return Err(log_not_found(log_id));
        }
        Ok(())
    }

    /// Delete one attempt; returns whether it existed
    pub fn delete_log(conn: &Connection, log_id: i64) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM command_logs WHERE id = ?1", [log_id])
            .map_err(from_rusqlite)?;
        Ok(deleted > 0)
    }

    /// Attempts of one record, newest first
    pub fn logs_for_command(conn: &Connection, command_id: i64) -> Result<Vec<ExecutionLog>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM command_logs WHERE command_id = ?1
                 ORDER BY start_time DESC, id DESC",
                LOG_COLUMNS
            ))
            .map_err(from_rusqlite)?;
        let logs = stmt
            .query_map([command_id], log_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(logs)
    }

    /// Distinct parameter sets of `name` that have at least one successful log
    pub fn successful_parameter_sets(conn: &Connection, name: &str) -> Result<Vec<ParamMap>> {
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT c.parameters FROM commands c
                 JOIN command_logs l ON l.command_id = c.id
                 WHERE c.name = ?1 AND l.end_time IS NOT NULL AND l.error IS NULL",
            )
            .map_err(from_rusqlite)?;
        let sets = stmt
            .query_map([name], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?
            .map(|raw| raw.map(|raw| parse_map(&raw)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(sets)
    }

    pub fn set_task_id(conn: &Connection, log_id: i64, task_id: &str) -> Result<()> {
        let updated = conn
            .execute(
                "UPDATE command_logs SET task_id = ?1 WHERE id = ?2",
                params![task_id, log_id],
            )
            .map_err(from_rusqlite)?;

        if updated == 0 {
            return Err(log_not_found(log_id));
        }
        Ok(())
    }

    pub fn find_log_by_task(conn: &Connection, task_id: &str) -> Result<Option<ExecutionLog>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM command_logs WHERE task_id = ?1 ORDER BY id DESC LIMIT 1",
                LOG_COLUMNS
            ),
            [task_id],
            log_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Delete every log that failed or never finished, except `keep`
    pub fn clear_unfinished_logs(conn: &Connection, keep: Option<i64>) -> Result<usize> {
        let deleted = conn
            .execute(
                "DELETE FROM command_logs
                 WHERE (error IS NOT NULL OR end_time IS NULL)
                   AND (?1 IS NULL OR id != ?1)",
                params![keep],
            )
            .map_err(from_rusqlite)?;
        tracing::debug!(deleted, "cleared unfinished logs");
        Ok(deleted)
    }

    /// Delete every failed log, except `keep`
    pub fn delete_failed_logs(conn: &Connection, keep: Option<i64>) -> Result<usize> {
        conn.execute(
            "DELETE FROM command_logs
             WHERE error IS NOT NULL AND (?1 IS NULL OR id != ?1)",
            params![keep],
        )
        .map_err(from_rusqlite)
    }

    /// Keep one log for a record and delete the rest
    ///
    /// The kept log is the latest successful one, or the latest log when
    /// none succeeded. `keep` is never deleted either.
    pub fn consolidate_logs(conn: &Connection, command_id: i64, keep: Option<i64>) -> Result<usize> {
        let latest_successful: Option<i64> = conn
            .query_row(
                "SELECT id FROM command_logs
                 WHERE command_id = ?1 AND end_time IS NOT NULL AND error IS NULL
                 ORDER BY end_time DESC, id DESC LIMIT 1",
                [command_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        let keeper = match latest_successful {
            Some(id) => Some(id),
            None => conn
                .query_row(
                    "SELECT id FROM command_logs WHERE command_id = ?1
                     ORDER BY start_time DESC, id DESC LIMIT 1",
                    [command_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(from_rusqlite)?,
        };

        let Some(keeper) = keeper else {
            return Ok(0);
        };

        conn.execute(
            "DELETE FROM command_logs
             WHERE command_id = ?1 AND id != ?2 AND (?3 IS NULL OR id != ?3)",
            params![command_id, keeper, keep],
        )
        .map_err(from_rusqlite)
    }

    /// Delete records that have no logs left
    pub fn delete_commands_without_logs(conn: &Connection) -> Result<usize> {
        conn.execute(
            "DELETE FROM commands
             WHERE NOT EXISTS (SELECT 1 FROM command_logs l WHERE l.command_id = commands.id)",
            [],
        )
        .map_err(from_rusqlite)
    }

    pub fn count_commands(conn: &Connection) -> Result<usize> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }

    pub fn count_logs(conn: &Connection) -> Result<usize> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM command_logs", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }
}
