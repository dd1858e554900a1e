//! Row mapping between SQLite and the cmdr data model
//!
//! Timestamps are stored as Unix milliseconds.

use chrono::{DateTime, Utc};
use cmdr_core::model::{CommandRecord, ExecutionLog, LogError};
use cmdr_core::params::parse_map;
use rusqlite::Row;

pub(crate) const COMMAND_COLUMNS: &str = "id, name, parameters, created_at";

pub(crate) const LOG_COLUMNS: &str =
    "id, command_id, start_time, end_time, options, error, task_id";

pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

pub(crate) fn command_from_row(row: &Row<'_>) -> rusqlite::Result<CommandRecord> {
    let parameters: String = row.get(2)?;
    Ok(CommandRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        parameters: parse_map(&parameters),
        created_at: from_millis(row.get(3)?),
    })
}

pub(crate) fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionLog> {
    let options: String = row.get(4)?;
    let error: Option<String> = row.get(5)?;
    Ok(ExecutionLog {
        id: row.get(0)?,
        command_id: row.get(1)?,
        start_time: from_millis(row.get(2)?),
        end_time: row.get::<_, Option<i64>>(3)?.map(from_millis),
        options: parse_map(&options),
        error: error.as_deref().map(LogError::from_column),
        task_id: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip_keeps_precision() {
        let now = Utc::now();
        let restored = from_millis(to_millis(now));
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());
    }
}
