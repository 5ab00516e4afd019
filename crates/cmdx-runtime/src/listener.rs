#![forbid(unsafe_code)]

//! Execution listeners notified after every ledgered event.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Ids are never reused within one registry.
//! 3. With panic isolation on, a panicking listener neither aborts the
//!    notification round nor propagates to the caller.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::ledger::LedgerEntry;

/// Callback receiving `(previous most-recent record, new record)`.
pub type ListenerFn = dyn Fn(Option<&LedgerEntry>, &LedgerEntry) + Send + Sync;

/// Handle returned by [`ListenerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Ordered set of listener callbacks.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Arc<ListenerFn>)>,
    next_id: u64,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback at the end of the notification order.
    pub fn add(&mut self, listener: Arc<ListenerFn>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a callback. Returns `false` if the id is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Clone the current callbacks so they can run without holding a lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ListenerId, Arc<ListenerFn>)> {
        self.listeners.clone()
    }
}

/// Invoke `listeners` in order.
///
/// Returns the number of listeners that panicked. Without isolation the first
/// panic unwinds to the caller.
pub fn notify_all(
    listeners: &[(ListenerId, Arc<ListenerFn>)],
    previous: Option<&LedgerEntry>,
    current: &LedgerEntry,
    isolate_panics: bool,
) -> usize {
    let mut panicked = 0;
    for (id, listener) in listeners {
        if !isolate_panics {
            listener(previous, current);
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| listener(previous, current))).is_err() {
            panicked += 1;
            warn!(
                listener = id.get(),
                operation = %current.operation(),
                "execution listener panicked; continuing"
            );
        }
    }
    panicked
}
