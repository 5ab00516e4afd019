#![forbid(unsafe_code)]

//! cmdx public facade crate.
//!
//! Publish command values, let the dispatcher route each one to the most
//! specific handler registered for its type, and undo or redo what happened.
//!
//! ```
//! use std::sync::Arc;
//! use cmdx::prelude::*;
//!
//! #[derive(Debug)]
//! struct Rename;
//!
//! impl Command for Rename {
//!     fn command_type(&self) -> &CommandType {
//!         CommandType::undoable()
//!     }
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let handler = FnHandler::new(|_| Ok(())).with_unexecute(|_| Ok(()));
//! dispatcher.subscribe(Arc::new(handler), CommandType::undoable().clone());
//! dispatcher.publish(Arc::new(Rename))?;
//! assert_eq!(dispatcher.undo_name().as_deref(), Some("UndoableCommand"));
//! # Ok::<(), cmdx::Error>(())
//! ```

#[cfg(feature = "tracing-json")]
pub mod logging;

pub use cmdx_core::{
    Command, CommandType, Direction, DispatchError, DispatchResult, FnHandler, Handler,
    HandlerError, HandlerResult, Operation, TypeOrdering, UndoableHandler,
};
pub use cmdx_runtime::{
    ConfigError, Dispatcher, DispatcherConfig, ExecutionLedger, LedgerEntry, ListenerId,
    StepOutcome,
};

pub use cmdx_core as core;
pub use cmdx_runtime as runtime;

/// Top-level error type for cmdx hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dispatch, execution or history failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A global logger could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Standard result type for cmdx hosts.
pub type Result<T> = std::result::Result<T, Error>;

/// Prelude for day-to-day usage.
pub mod prelude {
    pub use crate::{
        Command, CommandType, DispatchError, Dispatcher, DispatcherConfig, Error, FnHandler,
        Handler, HandlerResult, LedgerEntry, Operation, Result, StepOutcome, UndoableHandler,
    };

    pub use crate::{core, runtime};
}
