use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CmdError;
use crate::params::ParamMap;

/// Code stored for errors that were saved as a plain string
pub const UNSTRUCTURED_ERROR_CODE: &str = "ERR_UNSTRUCTURED";

/// ExecutionLog - one row per execution attempt of a command record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: i64,

    /// Parent command record
    pub command_id: i64,

    /// Set when the log is created
    pub start_time: DateTime<Utc>,

    /// Set only on successful completion
    pub end_time: Option<DateTime<Utc>>,

    /// Run-time options, without framework-internal keys
    pub options: ParamMap,

    /// Captured error of a failed run
    pub error: Option<LogError>,

    /// Task queue reference for asynchronously dispatched runs
    pub task_id: Option<String>,
}

/// Lifecycle status derived from a log's end time and error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogStatus::Running => "RUNNING",
            LogStatus::Completed => "COMPLETED",
            LogStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

impl ExecutionLog {
    pub fn status(&self) -> LogStatus {
        match (&self.end_time, &self.error) {
            (_, Some(_)) => LogStatus::Failed,
            (Some(_), None) => LogStatus::Completed,
            (None, None) => LogStatus::Running,
        }
    }

    /// A log with an end time and no error
    pub fn is_successful(&self) -> bool {
        self.status() == LogStatus::Completed
    }
}

/// Structured error captured from a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogError {
    /// Stable error code (see `CmdErrorKind::code`)
    pub code: String,
    pub message: String,
    /// Error context chain, then backtrace frames when capture is enabled
    #[serde(default)]
    pub trace: Vec<String>,
}

impl LogError {
    /// Capture an error with its source chain and, if enabled, a backtrace
    pub fn capture(err: &CmdError) -> Self {
        let mut trace = err.chain();
        let backtrace = std::backtrace::Backtrace::capture();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            trace.extend(backtrace.to_string().lines().map(str::to_string));
        }

        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            trace,
        }
    }

    /// Wrap a plain string that was saved without structure
    pub fn unstructured(raw: impl Into<String>) -> Self {
        Self {
            code: UNSTRUCTURED_ERROR_CODE.to_string(),
            message: raw.into(),
            trace: Vec::new(),
        }
    }

    /// Read a persisted error column, accepting both structured and plain forms
    pub fn from_column(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self::unstructured(raw))
    }

    pub fn to_column(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
