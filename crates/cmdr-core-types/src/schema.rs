//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the engine's
//! lifecycle events and the store's debug output.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_TASK_ID: &str = "task_id";

// Entity identifiers
pub const FIELD_COMMAND: &str = "command";
pub const FIELD_COMMAND_ID: &str = "command_id";
pub const FIELD_LOG_ID: &str = "log_id";
pub const FIELD_WORKER: &str = "worker";

// Collection sizes
pub const FIELD_UNITS: &str = "units";
pub const FIELD_POOL_SIZE: &str = "pool_size";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
