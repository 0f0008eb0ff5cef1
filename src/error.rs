//! Error types for varactions.
//!
//! All errors are strongly typed using thiserror so the dispatcher can tell a
//! per-notification failure (logged, loop continues) from a startup failure
//! (fatal, loop never entered).

use std::path::PathBuf;

use thiserror::Error;

use crate::notify::NotificationClass;

/// Success result code.
pub const EOK: i32 = 0;
/// No such entry: no trigger matched, or an unknown variable was addressed.
pub const ENOENT: i32 = 2;
/// I/O failure while running a statement.
pub const EIO: i32 = 5;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// No space left: the timer table is full.
pub const ENOSPC: i32 = 28;
/// Broken pipe: a notification queue has no consumer left.
pub const EPIPE: i32 = 32;

/// Renders a result code the way `strerror` would.
#[must_use]
pub fn describe_code(code: i32) -> String {
    if code == EOK {
        "Success".to_string()
    } else {
        std::io::Error::from_raw_os_error(code).to_string()
    }
}

/// Failure reported by the execution collaborator for a single statement.
///
/// Statement failures are never fatal: the executor keeps running the
/// remaining statements of the trigger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("statement at line {line} failed (code {code}): {message}")]
pub struct StatementError {
    /// errno-style result code.
    pub code: i32,
    /// Definition line of the failing statement.
    pub line: u32,
    /// Human readable reason.
    pub message: String,
}

impl StatementError {
    /// Failure with errno-style `code` at definition `line`.
    #[must_use]
    pub fn new(code: i32, line: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            line,
            message: message.into(),
        }
    }
}

/// Validation errors raised while building the trigger graph.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Action {action} listens for {class} notifications but binds no variables")]
    EmptyBindings {
        action: usize,
        class: NotificationClass,
    },

    #[error("Unknown variable '{name}'")]
    UnknownVariable {
        name: String,
    },

    #[error("Unknown timescale '{unit}'")]
    UnknownTimescale {
        unit: String,
    },

    #[error("Invalid statement at line {line}: {reason}")]
    InvalidStatement {
        line: u32,
        reason: String,
    },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue {
        name: String,
        reason: String,
    },

    #[error("{class} notifications cannot be registered on a variable")]
    UnsupportedRegistration {
        class: NotificationClass,
    },
}

/// Execution errors that occur while servicing notifications.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No trigger matched {class} notification {payload}")]
    NoMatchingTrigger {
        class: NotificationClass,
        payload: u32,
    },

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Variable {id} not found")]
    VariableNotFound {
        id: u32,
    },

    #[error("Variable store is closed")]
    StoreClosed,
}

/// Resource errors from the timer manager.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Timer table is full (max: {max})")]
    TimerTableFull {
        max: usize,
    },

    #[error("Timer interval of {count} {unit} is zero")]
    ZeroInterval {
        count: u32,
        unit: String,
    },

    #[error("Timer backend error: {message}")]
    TimerBackend {
        message: String,
    },
}

/// Errors reading the trigger definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No trigger definition file was given")]
    MissingDefinition,

    #[error("Cannot read trigger definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trigger definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error type for varactions.
#[derive(Debug, Error)]
pub enum ActionsError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ActionsError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a resource error.
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if no trigger matched a delivered notification.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::NoMatchingTrigger { .. }))
    }

    /// Errors that stop the process before the dispatch loop is entered.
    #[must_use]
    pub const fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_) | Self::Resource(_))
    }

    /// errno-style code for diagnostics.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Internal { .. } => EINVAL,
            Self::Execution(e) => match e {
                ExecutionError::NoMatchingTrigger { .. } | ExecutionError::VariableNotFound { .. } => ENOENT,
                ExecutionError::Statement(s) => s.code,
                ExecutionError::Disconnected { .. } => EPIPE,
                ExecutionError::StoreClosed => EIO,
            },
            Self::Resource(e) => match e {
                ResourceError::TimerTableFull { .. } => ENOSPC,
                ResourceError::ZeroInterval { .. } => EINVAL,
                ResourceError::TimerBackend { .. } => EIO,
            },
        }
    }
}

/// Result type alias for varactions operations.
pub type ActionsResult<T> = Result<T, ActionsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_display() {
        let err = StatementError::new(EIO, 7, "exit status 1");
        let msg = format!("{err}");
        assert!(msg.contains("line 7"));
        assert!(msg.contains("code 5"));
        assert!(msg.contains("exit status 1"));
    }

    #[test]
    fn test_validation_error_empty_bindings() {
        let err = ValidationError::EmptyBindings {
            action: 3,
            class: NotificationClass::CalcRequest,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Action 3"));
        assert!(msg.contains("calc"));
    }

    #[test]
    fn test_resource_error_table_full() {
        let err = ResourceError::TimerTableFull { max: 255 };
        assert!(format!("{err}").contains("255"));
    }

    #[test]
    fn test_not_found_classification() {
        let err: ActionsError = ExecutionError::NoMatchingTrigger {
            class: NotificationClass::VariableChange,
            payload: 99,
        }
        .into();
        assert!(err.is_execution());
        assert!(err.is_not_found());
        assert!(!err.is_fatal_at_startup());
        assert_eq!(err.code(), ENOENT);
    }

    #[test]
    fn test_statement_error_code_passes_through() {
        let err: ActionsError = ExecutionError::from(StatementError::new(17, 1, "boom")).into();
        assert_eq!(err.code(), 17);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_startup_errors_are_fatal() {
        let config: ActionsError = ConfigError::MissingDefinition.into();
        assert!(config.is_config());
        assert!(config.is_fatal_at_startup());

        let resource: ActionsError = ResourceError::TimerTableFull { max: 255 }.into();
        assert!(resource.is_resource());
        assert!(resource.is_fatal_at_startup());
        assert_eq!(resource.code(), ENOSPC);
    }

    #[test]
    fn test_internal_error() {
        let err = ActionsError::internal("unexpected state");
        assert!(!err.is_validation());
        assert!(format!("{err}").contains("unexpected state"));
    }

    #[test]
    fn test_describe_code() {
        assert_eq!(describe_code(EOK), "Success");
        assert!(!describe_code(ENOENT).is_empty());
    }
}
