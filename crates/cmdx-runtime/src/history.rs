#![forbid(unsafe_code)]

//! Cursor-based undo/redo timeline.
//!
//! [`HistoryTimeline`] keeps executed commands in one ordered sequence with a
//! single cursor. Entries before the cursor are done (undoable); entries at or
//! after it have been undone (redoable).
//!
//! # Invariants
//!
//! 1. `cursor <= entries.len()` after every operation.
//! 2. `append` destroys every entry after the cursor before inserting.
//! 3. With `max_depth > 0`, `entries.len() <= max_depth` after `append`.
//! 4. Peeking never moves the cursor.
//!
//! # Cursor Model
//!
//! ```text
//! append(A) append(B) append(C)
//! ┌───────────────────────────────┐
//! │ [A, B, C]              cursor=3│
//! └───────────────────────────────┘
//!
//! step_back() x2          (returns C, then B)
//! ┌───────────────────────────────┐
//! │ [A | B, C]             cursor=1│
//! └───────────────────────────────┘
//!
//! append(D)               <-- new branch, B and C destroyed
//! ┌───────────────────────────────┐
//! │ [A, D]                 cursor=2│
//! └───────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use cmdx_core::{Command, Direction, DispatchError, Handler};
use thiserror::Error;

/// Failure to move the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The cursor is already at the end it was asked to move past.
    #[error("nothing to {0}")]
    NoHistory(Direction),
}

impl From<HistoryError> for DispatchError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NoHistory(direction) => DispatchError::NoHistory(direction),
        }
    }
}

/// One executed command and the handler that executed it.
#[derive(Clone)]
pub struct HistoryEntry {
    command: Arc<dyn Command>,
    handler: Arc<dyn Handler>,
}

impl HistoryEntry {
    /// Pair a command with the handler it was dispatched to.
    #[must_use]
    pub fn new(command: Arc<dyn Command>, handler: Arc<dyn Handler>) -> Self {
        Self { command, handler }
    }

    /// The recorded command.
    #[must_use]
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// The handler resolved when the command was published.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("command", &self.command)
            .field("handler", &self.handler.debug_name())
            .finish()
    }
}

/// Ordered command history with a movable cursor.
#[derive(Default)]
pub struct HistoryTimeline {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_depth: usize,
}

impl fmt::Debug for HistoryTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTimeline")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl HistoryTimeline {
    /// Create an unbounded timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a timeline that keeps at most `max_depth` entries (0 = unlimited).
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    // ========================================================================
    // Core Operations
    // ========================================================================

    /// Insert at the cursor and advance past the new entry.
    ///
    /// Entries after the cursor are destroyed first.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.truncate_forward();
        self.entries.push(entry);
        self.cursor = self.entries.len();
        self.enforce_depth();
    }

    /// Move the cursor back one and return the entry now after it.
    pub fn step_back(&mut self) -> Result<HistoryEntry, HistoryError> {
        if self.cursor == 0 {
            return Err(HistoryError::NoHistory(Direction::Back));
        }
        self.cursor -= 1;
        Ok(self.entries[self.cursor].clone())
    }

    /// Return the entry after the cursor and move the cursor past it.
    pub fn step_forward(&mut self) -> Result<HistoryEntry, HistoryError> {
        let Some(entry) = self.entries.get(self.cursor).cloned() else {
            return Err(HistoryError::NoHistory(Direction::Forward));
        };
        self.cursor += 1;
        Ok(entry)
    }

    /// Destroy every entry after the cursor. Returns how many were dropped.
    pub fn truncate_forward(&mut self) -> usize {
        let dropped = self.entries.len() - self.cursor;
        self.entries.truncate(self.cursor);
        dropped
    }

    /// Destroy every entry before the cursor. Returns how many were dropped.
    pub fn truncate_backward(&mut self) -> usize {
        let dropped = self.cursor;
        self.entries.drain(..self.cursor);
        self.cursor = 0;
        dropped
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Entry that the next step back would return.
    #[must_use]
    pub fn peek_back_entry(&self) -> Option<&HistoryEntry> {
        self.cursor.checked_sub(1).map(|i| &self.entries[i])
    }

    /// Entry that the next step forward would return.
    #[must_use]
    pub fn peek_forward_entry(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Up to `n` names before the cursor, most recent first.
    #[must_use]
    pub fn peek_back(&self, n: usize) -> Vec<String> {
        self.entries[..self.cursor]
            .iter()
            .rev()
            .take(n)
            .filter_map(|e| e.command.name().map(str::to_owned))
            .collect()
    }

    /// Up to `n` names after the cursor, next first.
    #[must_use]
    pub fn peek_forward(&self, n: usize) -> Vec<String> {
        self.entries[self.cursor..]
            .iter()
            .take(n)
            .filter_map(|e| e.command.name().map(str::to_owned))
            .collect()
    }

    /// Number of entries before the cursor.
    #[must_use]
    pub fn back_len(&self) -> usize {
        self.cursor
    }

    /// Number of entries after the cursor.
    #[must_use]
    pub fn forward_len(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position (`0..=len`).
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Configured depth limit (0 = unlimited).
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn enforce_depth(&mut self) {
        if self.max_depth == 0 || self.entries.len() <= self.max_depth {
            return;
        }
        let excess = self.entries.len() - self.max_depth;
        self.entries.drain(..excess);
        self.cursor = self.cursor.saturating_sub(excess);
    }
}

// ============================================================================
// Tests
// ============================================================================
