#![forbid(unsafe_code)]

//! The [`Command`] trait: values describing an action to perform.
//!
//! A command is identified by its [`CommandType`], not by its Rust type. The
//! dispatcher routes on the descriptor; handlers that need the concrete
//! payload downcast through [`Command::as_any`].
//!
//! Commands are immutable once published. The dispatcher shares them between
//! the history timeline and the execution ledger behind an `Arc`.

use std::any::Any;
use std::fmt;

use crate::command_type::CommandType;

/// A value describing an action to perform.
///
/// # Example
///
/// ```
/// use std::sync::LazyLock;
/// use cmdx_core::{Command, CommandType};
///
/// static RENAME: LazyLock<CommandType> =
///     LazyLock::new(|| CommandType::new_undoable("Rename"));
///
/// #[derive(Debug)]
/// struct Rename {
///     to: String,
/// }
///
/// impl Command for Rename {
///     fn command_type(&self) -> &CommandType {
///         &RENAME
///     }
///
///     fn as_any(&self) -> &dyn std::any::Any {
///         self
///     }
/// }
///
/// let cmd = Rename { to: "b".into() };
/// assert!(cmd.is_undoable());
/// assert_eq!(cmd.name(), Some("Rename"));
/// ```
pub trait Command: Any + Send + Sync + fmt::Debug {
    /// Runtime type used for dispatch.
    fn command_type(&self) -> &CommandType;

    /// Human-readable name shown in undo/redo menus and the ledger.
    ///
    /// Defaults to the type name. `None` is allowed.
    fn name(&self) -> Option<&str> {
        Some(self.command_type().name())
    }

    /// True if this command can be reversed.
    fn is_undoable(&self) -> bool {
        self.command_type().is_undoable()
    }

    /// Upcast for downcasting to the concrete command struct.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Command {
    /// Borrow the concrete command, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Name for diagnostics: the command name, else the type name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.command_type().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, LazyLock};

    static PING: LazyLock<CommandType> = LazyLock::new(|| CommandType::new("Ping", &[]));

    #[derive(Debug)]
    struct Ping(u32);

    impl Command for Ping {
        fn command_type(&self) -> &CommandType {
            &PING
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Anonymous;

    impl Command for Anonymous {
        fn command_type(&self) -> &CommandType {
            &PING
        }

        fn name(&self) -> Option<&str> {
            None
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn default_name_is_type_name() {
        assert_eq!(Ping(1).name(), Some("Ping"));
        assert!(!Ping(1).is_undoable());
    }

    #[test]
    fn downcast_through_trait_object() {
        let cmd: Arc<dyn Command> = Arc::new(Ping(7));
        assert_eq!(cmd.downcast_ref::<Ping>().map(|p| p.0), Some(7));
        assert!(cmd.downcast_ref::<Anonymous>().is_none());
    }

    #[test]
    fn display_name_falls_back_to_type() {
        let cmd: Arc<dyn Command> = Arc::new(Anonymous);
        assert_eq!(cmd.name(), None);
        assert_eq!(cmd.display_name(), "Ping");
    }
}
