#![forbid(unsafe_code)]

//! Operation and direction tags shared by the ledger, history and errors.

use std::fmt;

/// What happened to a command.
///
/// The declaration order is significant: ledger ordering compares
/// operations as `Do < Undo < Redo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// First execution via publish.
    Do,
    /// Reversal via undo.
    Undo,
    /// Re-application via redo.
    Redo,
}

impl Operation {
    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Do => "do",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of travel through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards older entries (undo).
    Back,
    /// Towards newer entries (redo).
    Forward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => f.write_str("undo"),
            Self::Forward => f.write_str("redo"),
        }
    }
}
