#![forbid(unsafe_code)]

//! Core: command type descriptors, handler traits and the error taxonomy.
//!
//! # Role in cmdx
//! `cmdx-core` is the vocabulary layer. It defines what a command is, how its
//! runtime type is described and ordered, what a handler can do, and how
//! failures are reported. It holds no dispatcher state.
//!
//! # Primary responsibilities
//! - **CommandType / TypeOrdering**: open, runtime-extensible type hierarchy.
//! - **Command**: the value being dispatched.
//! - **Handler / UndoableHandler / FnHandler**: execution capabilities.
//! - **DispatchError**: typed failures shared by every layer.
//!
//! # How it fits in the system
//! `cmdx-runtime` builds the dispatch tree, history timeline, ledger and the
//! dispatcher on top of these types. The `cmdx` facade re-exports both.

pub mod command;
pub mod command_type;
pub mod error;
pub mod handler;
pub mod operation;

pub use command::Command;
pub use command_type::{CommandType, TypeOrdering};
pub use error::{DispatchError, DispatchResult, HandlerError, HandlerResult};
pub use handler::{FnHandler, Handler, UndoableHandler};
pub use operation::{Direction, Operation};
