#![forbid(unsafe_code)]

//! Error taxonomy for dispatch, execution and history navigation.
//!
//! | Variant | Raised when | State mutated? |
//! |---------|-------------|----------------|
//! | `NoHandler` | no registered type accepts the command | no |
//! | `ExecutionFailure` | a handler returned an error | publish: no; undo/redo: one history side dropped |
//! | `InvalidArgument` | negative batch count | no |
//! | `NoHistory` | nothing left in the requested direction | no |
//! | `Reentrant` | a handler or listener called back into a mutating method | no |

use thiserror::Error;

use crate::operation::{Direction, Operation};

/// Fault reported by a handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a handler call.
pub type HandlerResult = Result<(), HandlerError>;

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered command type accepts the command.
    #[error("no handler is subscribed for command '{name}' of type {command_type}")]
    NoHandler { name: String, command_type: String },

    /// A handler failed during execute, unexecute or reexecute.
    #[error("{operation} of '{name}' failed: {source}")]
    ExecutionFailure {
        operation: Operation,
        name: String,
        #[source]
        source: HandlerError,
    },

    /// A caller-supplied argument was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// History is exhausted in the requested direction.
    #[error("nothing to {0}")]
    NoHistory(Direction),

    /// A mutating call was made while the same dispatcher was mid-operation
    /// on this thread.
    #[error("re-entrant dispatch from inside a handler or listener")]
    Reentrant,
}

impl DispatchError {
    /// Wrap a handler fault.
    pub fn execution(operation: Operation, name: impl Into<String>, source: HandlerError) -> Self {
        Self::ExecutionFailure {
            operation,
            name: name.into(),
            source,
        }
    }

    /// Stable code for programmatic matching and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoHandler { .. } => "ERR_NO_HANDLER",
            Self::ExecutionFailure { .. } => "ERR_EXECUTION_FAILURE",
            Self::InvalidArgument(_) => "ERR_INVALID_ARGUMENT",
            Self::NoHistory(_) => "ERR_NO_HISTORY",
            Self::Reentrant => "ERR_REENTRANT",
        }
    }
}
