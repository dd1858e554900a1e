use thiserror::Error;

/// Result type alias using CmdError
pub type Result<T> = std::result::Result<T, CmdError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. Codes are persisted inside
/// failed execution logs, so they must not change once released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdErrorKind {
    // Invocation
    InvalidInput,
    InvalidArgument,
    UnknownCommand,
    AlreadyRegistered,
    NotFound,

    // Dependency gate
    MissingDependency,

    // Pipeline
    ShapeMismatch,
    CommandFailed,
    Worker,

    // Integration/IO
    Io,
    Cache,
    Config,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl CmdErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            CmdErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            CmdErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            CmdErrorKind::UnknownCommand => "ERR_UNKNOWN_COMMAND",
            CmdErrorKind::AlreadyRegistered => "ERR_ALREADY_REGISTERED",
            CmdErrorKind::NotFound => "ERR_NOT_FOUND",
            CmdErrorKind::MissingDependency => "ERR_MISSING_DEPENDENCY",
            CmdErrorKind::ShapeMismatch => "ERR_SHAPE_MISMATCH",
            CmdErrorKind::CommandFailed => "ERR_COMMAND_FAILED",
            CmdErrorKind::Worker => "ERR_WORKER",
            CmdErrorKind::Io => "ERR_IO",
            CmdErrorKind::Cache => "ERR_CACHE",
            CmdErrorKind::Config => "ERR_CONFIG",
            CmdErrorKind::Serialization => "ERR_SERIALIZATION",
            CmdErrorKind::Persistence => "ERR_PERSISTENCE",
            CmdErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Look a kind up by its stable code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    const ALL: [CmdErrorKind; 15] = [
        CmdErrorKind::InvalidInput,
        CmdErrorKind::InvalidArgument,
        CmdErrorKind::UnknownCommand,
        CmdErrorKind::AlreadyRegistered,
        CmdErrorKind::NotFound,
        CmdErrorKind::MissingDependency,
        CmdErrorKind::ShapeMismatch,
        CmdErrorKind::CommandFailed,
        CmdErrorKind::Worker,
        CmdErrorKind::Io,
        CmdErrorKind::Cache,
        CmdErrorKind::Config,
        CmdErrorKind::Serialization,
        CmdErrorKind::Persistence,
        CmdErrorKind::Internal,
    ];
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus optional
/// context (operation, command name, log id) for debugging.
#[derive(Debug, Clone)]
pub struct CmdError {
    kind: CmdErrorKind,
    op: Option<String>,
    command: Option<String>,
    log_id: Option<i64>,
    message: String,
    source: Option<Box<CmdError>>,
    missing: Option<Vec<String>>,
}

impl CmdError {
    /// Create a new error with the specified kind
    pub fn new(kind: CmdErrorKind) -> Self {
        Self {
            kind,
            op: None,
            command: None,
            log_id: None,
            message: String::new(),
            source: None,
            missing: None,
        }
    }

    /// Shorthand for a failure raised by command code itself
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CmdErrorKind::CommandFailed).with_message(message)
    }

    /// Shorthand for a stale or mismatched data shape
    ///
    /// The expand-then-acquire pipeline retries once with a refreshed
    /// download when it sees this kind.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(CmdErrorKind::ShapeMismatch).with_message(message)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add command name context
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Add execution log context
    pub fn with_log_id(mut self, log_id: i64) -> Self {
        self.log_id = Some(log_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: CmdError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add the rendered list of unsatisfied dependencies
    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing = Some(missing);
        self
    }

    pub fn kind(&self) -> CmdErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn log_id(&self) -> Option<i64> {
        self.log_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&CmdError> {
        self.source.as_deref()
    }

    /// Get unsatisfied dependencies, if any (populated on MissingDependency)
    pub fn missing(&self) -> Option<&[String]> {
        self.missing.as_deref()
    }

    /// Render this error and its sources, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        let mut current = self.source_error();
        while let Some(err) = current {
            lines.push(err.to_string());
            current = err.source_error();
        }
        lines
    }
}

impl std::fmt::Display for CmdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(command) = &self.command {
            write!(f, " (command: {})", command)?;
        }
        if let Some(log_id) = self.log_id {
            write!(f, " (log_id: {})", log_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for CmdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for command orchestration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// No command with this name is registered
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// A command with this name is already registered
    #[error("Command already registered: {name}")]
    AlreadyRegistered { name: String },

    /// One or more dependencies have no successful log
    #[error("Missing dependencies: {}", .missing.join(", "))]
    MissingDependencies { command: String, missing: Vec<String> },

    /// An argument could not be parsed or converted
    #[error("Invalid argument '{argument}' for {command}: {reason}")]
    InvalidArgument {
        command: String,
        argument: String,
        reason: String,
    },

    /// A cached payload or dispatched argument no longer matches the expected type
    #[error("Stale data shape in {function}: {reason}")]
    ShapeMismatch { function: String, reason: String },

    /// Dispatched unit arguments do not fit the command's pipeline shape
    #[error("Command {command} expected {expected} unit argument(s), got {actual}")]
    UnitArity {
        command: String,
        expected: usize,
        actual: usize,
    },

    /// Command record not found in store
    #[error("Command record not found: {command_id}")]
    CommandRecordNotFound { command_id: i64 },

    /// Execution log not found in store
    #[error("Execution log not found: {log_id}")]
    LogNotFound { log_id: i64 },

    /// A worker thread panicked or exited before finishing its units
    #[error("Worker failure: {reason}")]
    WorkerFailure { reason: String },

    /// Configuration could not be loaded
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<CommandError> for CmdError {
    fn from(err: CommandError) -> Self {
        let message = err.to_string();
        match err {
            CommandError::UnknownCommand { name } => CmdError::new(CmdErrorKind::UnknownCommand)
                .with_command(name)
                .with_message(message),
            CommandError::AlreadyRegistered { name } => {
                CmdError::new(CmdErrorKind::AlreadyRegistered)
                    .with_command(name)
                    .with_message(message)
            }
            CommandError::MissingDependencies { command, missing } => {
                CmdError::new(CmdErrorKind::MissingDependency)
                    .with_command(command)
                    .with_message(message)
                    .with_missing(missing)
            }
            CommandError::InvalidArgument { command, .. } => {
                CmdError::new(CmdErrorKind::InvalidArgument)
                    .with_command(command)
                    .with_message(message)
            }
            CommandError::ShapeMismatch { .. } => {
                CmdError::new(CmdErrorKind::ShapeMismatch).with_message(message)
            }
            CommandError::UnitArity { command, .. } => CmdError::new(CmdErrorKind::InvalidInput)
                .with_command(command)
                .with_message(message),
            CommandError::CommandRecordNotFound { .. } => {
                CmdError::new(CmdErrorKind::NotFound).with_message(message)
            }
            CommandError::LogNotFound { log_id } => CmdError::new(CmdErrorKind::NotFound)
                .with_log_id(log_id)
                .with_message(message),
            CommandError::WorkerFailure { .. } => {
                CmdError::new(CmdErrorKind::Worker).with_message(message)
            }
            CommandError::InvalidConfig { .. } => {
                CmdError::new(CmdErrorKind::Config).with_message(message)
            }
            CommandError::Serialization { .. } => {
                CmdError::new(CmdErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CmdError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::from(err).into()
    }
}
