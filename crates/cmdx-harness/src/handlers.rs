#![forbid(unsafe_code)]

//! Handlers that observe or sabotage dispatch.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cmdx_core::{Command, Handler, HandlerResult, Operation, UndoableHandler};

/// One handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub handler: String,
    pub operation: Operation,
    pub command: Option<String>,
}

/// Shared call log so several handlers can record into one ordered list.
pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Handler that counts and logs every call and always succeeds.
pub struct RecordingHandler {
    label: String,
    undoable: bool,
    executed: AtomicUsize,
    unexecuted: AtomicUsize,
    reexecuted: AtomicUsize,
    log: CallLog,
}

impl fmt::Debug for RecordingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingHandler")
            .field("label", &self.label)
            .field("undoable", &self.undoable)
            .field("executed", &self.executed())
            .field("unexecuted", &self.unexecuted())
            .field("reexecuted", &self.reexecuted())
            .finish()
    }
}

impl RecordingHandler {
    /// Undoable handler with its own log.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_log(label, CallLog::default())
    }

    /// Undoable handler writing into `log`.
    pub fn with_log(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            undoable: true,
            executed: AtomicUsize::new(0),
            unexecuted: AtomicUsize::new(0),
            reexecuted: AtomicUsize::new(0),
            log,
        }
    }

    /// Drop the undo capability.
    #[must_use]
    pub fn execute_only(mut self) -> Self {
        self.undoable = false;
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unexecuted(&self) -> usize {
        self.unexecuted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn reexecuted(&self) -> usize {
        self.reexecuted.load(Ordering::SeqCst)
    }

    /// Copy of the call log.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, counter: &AtomicUsize, operation: Operation, command: &dyn Command) {
        counter.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Call {
                handler: self.label.clone(),
                operation,
                command: command.name().map(str::to_owned),
            });
    }
}

impl Handler for RecordingHandler {
    fn execute(&self, command: &dyn Command) -> HandlerResult {
        self.record(&self.executed, Operation::Do, command);
        Ok(())
    }

    fn as_undoable(&self) -> Option<&dyn UndoableHandler> {
        if self.undoable { Some(self) } else { None }
    }
}

impl UndoableHandler for RecordingHandler {
    fn unexecute(&self, command: &dyn Command) -> HandlerResult {
        self.record(&self.unexecuted, Operation::Undo, command);
        Ok(())
    }

    fn reexecute(&self, command: &dyn Command) -> HandlerResult {
        self.record(&self.reexecuted, Operation::Redo, command);
        Ok(())
    }
}

/// Undoable handler that fails one phase while armed.
#[derive(Debug)]
pub struct FailingHandler {
    phase: Operation,
    armed: AtomicBool,
    attempts: AtomicUsize,
}

impl FailingHandler {
    /// Fail every call of `phase`; other phases succeed.
    #[must_use]
    pub fn on(phase: Operation) -> Self {
        Self {
            phase,
            armed: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Like [`FailingHandler::on`] but starts disarmed.
    #[must_use]
    pub fn disarmed(phase: Operation) -> Self {
        let handler = Self::on(phase);
        handler.armed.store(false, Ordering::SeqCst);
        handler
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Total calls across all phases.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn run(&self, operation: Operation, command: &dyn Command) -> HandlerResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if operation == self.phase && self.armed.load(Ordering::SeqCst) {
            return Err(format!("injected {operation} failure for '{}'", command.display_name()).into());
        }
        Ok(())
    }
}

impl Handler for FailingHandler {
    fn execute(&self, command: &dyn Command) -> HandlerResult {
        self.run(Operation::Do, command)
    }

    fn as_undoable(&self) -> Option<&dyn UndoableHandler> {
        Some(self)
    }
}

impl UndoableHandler for FailingHandler {
    fn unexecute(&self, command: &dyn Command) -> HandlerResult {
        self.run(Operation::Undo, command)
    }

    fn reexecute(&self, command: &dyn Command) -> HandlerResult {
        self.run(Operation::Redo, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::NamedCommand;

    #[test]
    fn recording_counts_and_logs() {
        let log = CallLog::default();
        let a = RecordingHandler::with_log("a", Arc::clone(&log));
        let b = RecordingHandler::with_log("b", Arc::clone(&log)).execute_only();
        let cmd = NamedCommand::edit("x");

        a.execute(&cmd).unwrap();
        b.execute(&cmd).unwrap();
        a.as_undoable().unwrap().unexecute(&cmd).unwrap();

        assert!(b.as_undoable().is_none());
        assert_eq!((a.executed(), a.unexecuted(), a.reexecuted()), (1, 1, 0));
        let handlers: Vec<_> = a.calls().into_iter().map(|c| c.handler).collect();
        assert_eq!(handlers, vec!["a", "b", "a"]);
    }

    #[test]
    fn failing_only_in_armed_phase() {
        let handler = FailingHandler::disarmed(Operation::Undo);
        let cmd = NamedCommand::edit("x");
        assert!(handler.unexecute(&cmd).is_ok());
        handler.arm();
        let err = handler.unexecute(&cmd).unwrap_err();
        assert_eq!(err.to_string(), "injected undo failure for 'x'");
        assert!(handler.execute(&cmd).is_ok());
        assert_eq!(handler.attempts(), 3);
    }
}
