#![forbid(unsafe_code)]

//! Handler traits and the closure-backed [`FnHandler`].
//!
//! A handler is bound to one command type at registration but must accept
//! any subtype of it. Capabilities are layered:
//!
//! - [`Handler`]: `execute`
//! - [`UndoableHandler`]: adds `unexecute` and `reexecute`
//!
//! Handlers take `&self`. The dispatcher never runs two handler calls at
//! once, but handlers are shared behind `Arc` and keep their own state with
//! interior mutability.

use std::fmt;
use std::sync::Arc;

use crate::command::Command;
use crate::error::HandlerResult;

/// Executes commands of one type (and its subtypes).
pub trait Handler: Send + Sync {
    /// Execute the command for the first time.
    fn execute(&self, command: &dyn Command) -> HandlerResult;

    /// Reverse capability, if this handler has one.
    fn as_undoable(&self) -> Option<&dyn UndoableHandler> {
        None
    }

    /// Debug name of the handler.
    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A handler that can also reverse and re-apply commands.
///
/// Implementors should override [`Handler::as_undoable`] to return
/// `Some(self)`, otherwise the dispatcher treats the handler as
/// execute-only and undo becomes a no-op.
pub trait UndoableHandler: Handler {
    /// Reverse a previously executed command.
    fn unexecute(&self, command: &dyn Command) -> HandlerResult;

    /// Re-apply a command after it was undone.
    fn reexecute(&self, command: &dyn Command) -> HandlerResult {
        self.execute(command)
    }
}

type Strategy = Arc<dyn Fn(&dyn Command) -> HandlerResult + Send + Sync>;

/// Handler assembled from closures.
///
/// The undo capability is present only when an unexecute closure is set.
/// Without a reexecute closure, redo falls back to execute.
///
/// ```
/// use cmdx_core::{FnHandler, Handler};
///
/// let handler = FnHandler::new(|_cmd| Ok(()))
///     .with_unexecute(|_cmd| Ok(()));
/// assert!(handler.as_undoable().is_some());
/// ```
#[derive(Clone)]
pub struct FnHandler {
    execute: Strategy,
    unexecute: Option<Strategy>,
    reexecute: Option<Strategy>,
}

impl FnHandler {
    /// Create an execute-only handler.
    pub fn new(execute: impl Fn(&dyn Command) -> HandlerResult + Send + Sync + 'static) -> Self {
        Self {
            execute: Arc::new(execute),
            unexecute: None,
            reexecute: None,
        }
    }

    /// Set the reversal closure.
    #[must_use]
    pub fn with_unexecute(
        mut self,
        unexecute: impl Fn(&dyn Command) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.unexecute = Some(Arc::new(unexecute));
        self
    }

    /// Set the re-application closure.
    #[must_use]
    pub fn with_reexecute(
        mut self,
        reexecute: impl Fn(&dyn Command) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.reexecute = Some(Arc::new(reexecute));
        self
    }

    /// True if an unexecute closure is set.
    #[must_use]
    pub fn has_unexecute(&self) -> bool {
        self.unexecute.is_some()
    }

    /// True if a reexecute closure is set.
    #[must_use]
    pub fn has_reexecute(&self) -> bool {
        self.reexecute.is_some()
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("unexecute", &self.has_unexecute())
            .field("reexecute", &self.has_reexecute())
            .finish()
    }
}

impl Handler for FnHandler {
    fn execute(&self, command: &dyn Command) -> HandlerResult {
        (self.execute)(command)
    }

    fn as_undoable(&self) -> Option<&dyn UndoableHandler> {
        if self.unexecute.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn debug_name(&self) -> &'static str {
        "FnHandler"
    }
}

impl UndoableHandler for FnHandler {
    fn unexecute(&self, command: &dyn Command) -> HandlerResult {
        match &self.unexecute {
            Some(unexecute) => unexecute(command),
            None => Err(format!(
                "handler has no unexecute strategy for '{}'",
                command.display_name()
            )
            .into()),
        }
    }

    fn reexecute(&self, command: &dyn Command) -> HandlerResult {
        match &self.reexecute {
            Some(reexecute) => reexecute(command),
            None => self.execute(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_type::CommandType;
    use std::any::Any;
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NOOP: LazyLock<CommandType> = LazyLock::new(|| CommandType::new_undoable("Noop"));

    #[derive(Debug)]
    struct Noop;

    impl Command for Noop {
        fn command_type(&self) -> &CommandType {
            &NOOP
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ExecuteOnly;

    impl Handler for ExecuteOnly {
        fn execute(&self, _command: &dyn Command) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn execute_only_has_no_undo() {
        assert!(ExecuteOnly.as_undoable().is_none());
        assert!(ExecuteOnly.debug_name().ends_with("ExecuteOnly"));
        let handler = FnHandler::new(|_| Ok(()));
        assert!(handler.as_undoable().is_none());
    }

    #[test]
    fn reexecute_defaults_to_execute() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = FnHandler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .with_unexecute(|_| Ok(()));

        let undoable = handler.as_undoable().expect("undo capability");
        undoable.reexecute(&Noop).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_reexecute_wins() {
        let handler = FnHandler::new(|_| Err("execute should not run".into()))
            .with_unexecute(|_| Ok(()))
            .with_reexecute(|_| Ok(()));
        assert!(handler.reexecute(&Noop).is_ok());
        assert!(handler.has_reexecute());
    }

    #[test]
    fn missing_unexecute_reports_error() {
        let handler = FnHandler::new(|_| Ok(()));
        let err = handler.unexecute(&Noop).unwrap_err();
        assert!(err.to_string().contains("Noop"));
    }
}
