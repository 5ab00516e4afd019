#![forbid(unsafe_code)]

//! Audit trail of do/undo/redo events.
//!
//! The [`ExecutionLedger`] is an always-sorted set of [`LedgerEntry`] values,
//! newest first. Ties are broken deterministically so two ledgers fed the
//! same entries iterate identically.
//!
//! # Ordering
//!
//! Iteration order is the reverse of the ascending key
//! `(timestamp_ms, name, operation, sequence)` where names compare with
//! absent names first. Concretely:
//!
//! 1. newer timestamps first;
//! 2. same timestamp: names descending, unnamed commands last;
//! 3. same name: `Redo`, then `Undo`, then `Do`;
//! 4. finally the higher sequence number first.
//!
//! Two entries with the same key are duplicates; the second insert is
//! rejected.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut ledger = ExecutionLedger::new();
//! ledger.insert(LedgerEntry::new(cmd, Operation::Do, 1_000, 0));
//! let recent = ledger.first(10);
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use cmdx_core::{Command, Operation};

/// One recorded execution event.
#[derive(Clone)]
pub struct LedgerEntry {
    command: Arc<dyn Command>,
    operation: Operation,
    timestamp_ms: u64,
    sequence: u64,
}

impl LedgerEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(command: Arc<dyn Command>, operation: Operation, timestamp_ms: u64, sequence: u64) -> Self {
        Self {
            command,
            operation,
            timestamp_ms,
            sequence,
        }
    }

    /// The command the event happened to.
    #[must_use]
    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// What happened.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Wall-clock milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Dispatcher-assigned sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Shorthand for the command name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.command.name()
    }

    fn ascending_key(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            // Option<&str> orders None first.
            .then_with(|| self.name().cmp(&other.name()))
            .then_with(|| self.operation.cmp(&other.operation))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialEq for LedgerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LedgerEntry {}

impl PartialOrd for LedgerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LedgerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.ascending_key(self)
    }
}

impl fmt::Debug for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEntry")
            .field("name", &self.name())
            .field("operation", &self.operation)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Sorted, newest-first collection of execution events.
#[derive(Clone, Default)]
pub struct ExecutionLedger {
    entries: BTreeSet<LedgerEntry>,
    max_entries: usize,
}

impl fmt::Debug for ExecutionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionLedger")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl ExecutionLedger {
    /// Create an unbounded ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that keeps the newest `max_entries` (0 = unlimited).
    #[must_use]
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: BTreeSet::new(),
            max_entries,
        }
    }

    /// Insert an entry.
    ///
    /// Returns `false` if an equal entry is already present, or if the ledger
    /// is full and `entry` is older than everything it keeps. A `true` result
    /// means the entry is stored.
    pub fn insert(&mut self, entry: LedgerEntry) -> bool {
        if self.max_entries > 0
            && self.entries.len() >= self.max_entries
            && self.entries.last().is_some_and(|oldest| entry > *oldest)
        {
            return false;
        }
        if !self.entries.insert(entry) {
            return false;
        }
        if self.max_entries > 0 {
            while self.entries.len() > self.max_entries {
                self.entries.pop_last();
            }
        }
        true
    }

    /// The most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.entries.first()
    }

    /// Independent copy of the `n` most recent entries.
    #[must_use]
    pub fn first(&self, n: usize) -> ExecutionLedger {
        ExecutionLedger {
            entries: self.entries.iter().take(n).cloned().collect(),
            max_entries: self.max_entries,
        }
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a ExecutionLedger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::collections::btree_set::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdx_core::CommandType;
    use std::any::Any;
    use std::sync::LazyLock;

    static EVENT: LazyLock<CommandType> = LazyLock::new(|| CommandType::new_undoable("Event"));

    #[derive(Debug)]
    struct Named(Option<&'static str>);

    impl Command for Named {
        fn command_type(&self) -> &CommandType {
            &EVENT
        }

        fn name(&self) -> Option<&str> {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn entry(name: Option<&'static str>, op: Operation, ts: u64, seq: u64) -> LedgerEntry {
        LedgerEntry::new(Arc::new(Named(name)), op, ts, seq)
    }

    fn names(ledger: &ExecutionLedger) -> Vec<Option<String>> {
        ledger.iter().map(|e| e.name().map(str::to_owned)).collect()
    }

    #[test]
    fn newest_first() {
        let mut ledger = ExecutionLedger::new();
        ledger.insert(entry(Some("old"), Operation::Do, 1, 0));
        ledger.insert(entry(Some("new"), Operation::Do, 5, 1));
        ledger.insert(entry(Some("mid"), Operation::Do, 3, 2));

        assert_eq!(
            names(&ledger),
            vec![Some("new".into()), Some("mid".into()), Some("old".into())]
        );
        assert_eq!(ledger.latest().and_then(LedgerEntry::name), Some("new"));
    }

    #[test]
    fn same_timestamp_orders_by_name_descending_unnamed_last() {
        let mut ledger = ExecutionLedger::new();
        ledger.insert(entry(None, Operation::Do, 7, 0));
        ledger.insert(entry(Some("alpha"), Operation::Do, 7, 1));
        ledger.insert(entry(Some("beta"), Operation::Do, 7, 2));

        assert_eq!(
            names(&ledger),
            vec![Some("beta".into()), Some("alpha".into()), None]
        );
    }

    #[test]
    fn same_name_orders_by_operation_descending() {
        let mut ledger = ExecutionLedger::new();
        ledger.insert(entry(Some("x"), Operation::Do, 1, 0));
        ledger.insert(entry(Some("x"), Operation::Redo, 1, 0));
        ledger.insert(entry(Some("x"), Operation::Undo, 1, 0));

        let ops: Vec<_> = ledger.iter().map(LedgerEntry::operation).collect();
        assert_eq!(ops, vec![Operation::Redo, Operation::Undo, Operation::Do]);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut ledger = ExecutionLedger::new();
        assert!(ledger.insert(entry(Some("x"), Operation::Do, 1, 0)));
        assert!(!ledger.insert(entry(Some("x"), Operation::Do, 1, 0)));
        assert!(ledger.insert(entry(Some("x"), Operation::Do, 1, 1)));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn first_is_independent_snapshot() {
        let mut ledger = ExecutionLedger::new();
        for i in 0..5 {
            ledger.insert(entry(Some("e"), Operation::Do, i, i));
        }

        let mut snapshot = ledger.first(2);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.latest().map(LedgerEntry::timestamp_ms), Some(4));

        snapshot.insert(entry(Some("extra"), Operation::Do, 99, 99));
        snapshot.clear();
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.first(100).len(), 5);
        assert!(ledger.first(0).is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut ledger = ExecutionLedger::with_capacity(2);
        for i in 0..4 {
            ledger.insert(entry(Some("e"), Operation::Do, i, i));
        }
        let stamps: Vec<_> = ledger.iter().map(LedgerEntry::timestamp_ms).collect();
        assert_eq!(stamps, vec![3, 2]);
    }

    #[test]
    fn full_ledger_rejects_entry_older_than_everything_kept() {
        let mut ledger = ExecutionLedger::with_capacity(1);
        assert!(ledger.insert(entry(Some("e"), Operation::Do, 100, 0)));
        assert!(!ledger.insert(entry(Some("e"), Operation::Do, 90, 1)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.latest().map(LedgerEntry::timestamp_ms), Some(100));

        assert!(ledger.insert(entry(Some("e"), Operation::Do, 110, 2)));
        assert_eq!(ledger.latest().map(LedgerEntry::timestamp_ms), Some(110));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn into_iterator_matches_iter() {
        let mut ledger = ExecutionLedger::new();
        ledger.insert(entry(Some("a"), Operation::Do, 1, 0));
        let mut count = 0;
        for e in &ledger {
            assert_eq!(e.sequence(), 0);
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
