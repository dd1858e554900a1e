//! cmdr core - command descriptions, data model and ambient facilities
//!
//! This crate provides the pieces shared by the store, engine and CLI:
//! - Error facility (`CmdError`, `CmdErrorKind`, `CommandError`)
//! - Structured logging facility and lifecycle macros
//! - Parameter maps and their canonical JSON form
//! - Command records, execution logs and captured errors
//! - Static command descriptions and dependencies
//! - Configuration

pub mod config;
pub mod dependency;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod params;
pub mod spec;

pub use cmdr_core_types::schema;
pub use cmdr_core_types::{RunId, TaskId};

// Re-export commonly used types
pub use config::CommanderConfig;
pub use dependency::{Dependency, DependencyContext, MissingDependency, ParamPredicate};
pub use errors::{CmdError, CmdErrorKind, CommandError, Result};
pub use model::{CommandRecord, CommandSummary, ExecutionLog, LogError, LogStatus};
pub use params::ParamMap;
pub use spec::{ArgKind, ArgSpec, CommandSpec, PipelineShape, ValueType};
