use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution_log::ExecutionLog;
use crate::params::{canonical_json, ParamMap};

/// CommandRecord - one distinct `(name, parameters)` pair
///
/// Parameters are the inputs that decide *what* a command loads, so the
/// name and parameters together identify one specific data set. The
/// record is created on the first execution attempt and shared by every
/// later attempt with the same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Store-assigned row id
    pub id: i64,

    /// Registered command name
    pub name: String,

    /// Parameters used to initialize the command
    pub parameters: ParamMap,

    /// Timestamp of the first execution attempt
    pub created_at: DateTime<Utc>,
}

impl CommandRecord {
    /// Canonical JSON of the parameters, as persisted
    pub fn canonical_parameters(&self) -> String {
        canonical_json(&self.parameters)
    }
}

impl std::fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.canonical_parameters())
    }
}

/// A command record together with its most recent log, for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSummary {
    pub command: CommandRecord,
    pub latest_log: Option<ExecutionLog>,
    pub log_count: usize,
}
