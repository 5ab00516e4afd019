#![forbid(unsafe_code)]

//! Runtime: the dispatch tree, undo/redo history, execution ledger and the
//! [`Dispatcher`] that composes them.
//!
//! # Key Components
//!
//! - [`DispatchTree`] - Forest of command types resolving the most specific handler
//! - [`HistoryTimeline`] - Cursor-based undo/redo sequence
//! - [`ExecutionLedger`] - Newest-first audit trail of do/undo/redo events
//! - [`ListenerRegistry`] - Ordered execution listeners
//! - [`Dispatcher`] - Orchestrator with publish / undo / redo
//! - [`DispatcherConfig`] - History and ledger limits, listener isolation
//!
//! # Role in cmdx
//! `cmdx-runtime` holds all mutable state. It consumes the vocabulary from
//! `cmdx-core` and is re-exported by the `cmdx` facade.

pub mod config;
pub mod dispatch_tree;
pub mod dispatcher;
pub mod history;
pub mod ledger;
pub mod listener;

pub use config::{ConfigError, DispatcherConfig};
pub use dispatch_tree::{DispatchTree, NodeId};
pub use dispatcher::{Clock, Dispatcher, StepOutcome};
pub use history::{HistoryEntry, HistoryError, HistoryTimeline};
pub use ledger::{ExecutionLedger, LedgerEntry};
pub use listener::{ListenerFn, ListenerId, ListenerRegistry};
