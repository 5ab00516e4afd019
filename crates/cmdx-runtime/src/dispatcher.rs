#![forbid(unsafe_code)]

//! The dispatcher: routes commands to handlers and drives undo/redo.
//!
//! [`Dispatcher`] composes the [`DispatchTree`], the [`HistoryTimeline`], the
//! [`ExecutionLedger`] and the listener registry behind two locks.
//!
//! # Locking
//!
//! ```text
//! publish / undo / redo
//!   ├── gate   (held for the whole call, handlers and listeners included)
//!   └── state  (held only to read or mutate tree / timeline / ledger)
//!
//! subscribe / unsubscribe / queries
//!   └── state
//! ```
//!
//! Handlers and listeners run with only the gate held, so they may query the
//! dispatcher or subscribe new handlers. A mutating call from inside them on
//! the same thread fails with [`DispatchError::Reentrant`].
//!
//! # Publish
//!
//! ```text
//! resolve ──► execute ──► (record) truncate forward
//!                                  truncate backward if not undoable
//!                                  append
//!                     ──► ledger Do ──► notify listeners
//! ```
//!
//! History is only touched after the handler succeeded, so a failing publish
//! leaves the timeline and the ledger as they were.
//!
//! # Invariants
//!
//! 1. No two `publish` / `undo` / `redo` calls interleave.
//! 2. After a recording publish of a non-undoable command, `can_undo()` is false.
//! 3. A failed undo destroys the redo side; a failed redo destroys the undo side.
//! 4. Listeners see `(previous latest, new)` only for events that reached the ledger.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use cmdx_core::{
    Command, CommandType, Direction, DispatchError, DispatchResult, Handler, Operation,
};
use tracing::{debug, debug_span, warn};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::config::{ConfigError, DispatcherConfig};
use crate::dispatch_tree::DispatchTree;
use crate::history::{HistoryEntry, HistoryTimeline};
use crate::ledger::{ExecutionLedger, LedgerEntry};
use crate::listener::{ListenerFn, ListenerId, ListenerRegistry, notify_all};

/// Millisecond clock used for ledger timestamps.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Result of a single undo or redo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The handler reversed (or re-applied) the command.
    Applied,
    /// The entry or its handler cannot be reversed; the cursor did not move.
    Skipped,
}

impl StepOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

struct State {
    tree: DispatchTree,
    timeline: HistoryTimeline,
    ledger: ExecutionLedger,
    listeners: ListenerRegistry,
    next_sequence: u64,
}

/// A ledgered event waiting to be delivered once the state lock is gone.
struct Notification {
    previous: Option<LedgerEntry>,
    current: LedgerEntry,
    listeners: Vec<(ListenerId, Arc<ListenerFn>)>,
}

/// Command dispatcher with undo/redo history and an execution ledger.
///
/// Share it as `Arc<Dispatcher>`; every method takes `&self`.
///
/// ```
/// use std::sync::Arc;
/// use cmdx_core::{Command, CommandType, FnHandler};
/// use cmdx_runtime::Dispatcher;
///
/// #[derive(Debug)]
/// struct Save;
///
/// impl Command for Save {
///     fn command_type(&self) -> &CommandType {
///         CommandType::undoable()
///     }
///     fn as_any(&self) -> &dyn std::any::Any {
///         self
///     }
/// }
///
/// let dispatcher = Dispatcher::new();
/// let handler = FnHandler::new(|_| Ok(())).with_unexecute(|_| Ok(()));
/// dispatcher.subscribe(Arc::new(handler), CommandType::undoable().clone());
///
/// dispatcher.publish(Arc::new(Save)).unwrap();
/// assert!(dispatcher.can_undo());
/// assert!(dispatcher.undo().unwrap().is_applied());
/// assert!(dispatcher.can_redo());
/// ```
pub struct Dispatcher {
    gate: Mutex<()>,
    owner: Mutex<Option<ThreadId>>,
    state: Mutex<State>,
    clock: Clock,
    config: DispatcherConfig,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Dispatcher")
            .field("handlers", &state.tree.bound_count())
            .field("history_len", &state.timeline.len())
            .field("history_cursor", &state.timeline.cursor())
            .field("ledger_len", &state.ledger.len())
            .field("listeners", &state.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with the given configuration.
    ///
    /// An invalid configuration is still applied; each issue is logged at
    /// `warn`. Use [`Dispatcher::try_with_config`] to reject it instead.
    #[must_use]
    pub fn with_config(config: DispatcherConfig) -> Self {
        for issue in config.validate() {
            warn!(%issue, "dispatcher config is inconsistent");
        }
        Self::build(config)
    }

    /// Create a dispatcher, failing with [`ConfigError::Validation`] if the
    /// configuration does not validate.
    pub fn try_with_config(config: DispatcherConfig) -> Result<Self, ConfigError> {
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::Validation(issues));
        }
        Ok(Self::build(config))
    }

    fn build(config: DispatcherConfig) -> Self {
        Self {
            gate: Mutex::new(()),
            owner: Mutex::new(None),
            state: Mutex::new(State {
                tree: DispatchTree::new(),
                timeline: HistoryTimeline::with_max_depth(config.history_limit),
                ledger: ExecutionLedger::with_capacity(config.ledger_limit),
                listeners: ListenerRegistry::new(),
                next_sequence: 0,
            }),
            clock: Arc::new(system_millis),
            config,
        }
    }

    /// Replace the ledger clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Bind `handler` to `command_type` and its subtypes.
    ///
    /// Always succeeds. Registering a type again replaces its handler.
    pub fn subscribe(&self, handler: Arc<dyn Handler>, command_type: CommandType) -> bool {
        let mut state = lock(&self.state);
        state.tree.register(command_type, handler);
        true
    }

    /// Detach `handler` from every type it is bound to.
    ///
    /// Returns `false` if it was not bound anywhere. History entries recorded
    /// with this handler keep using it for undo and redo.
    pub fn unsubscribe(&self, handler: &Arc<dyn Handler>) -> bool {
        let mut state = lock(&self.state);
        state.tree.detach(handler)
    }

    /// Number of types with a bound handler.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        lock(&self.state).tree.bound_count()
    }

    /// `(depth, type name)` rows of the dispatch tree, depth first.
    #[must_use]
    pub fn dispatch_outline(&self) -> Vec<(usize, String)> {
        lock(&self.state).tree.outline()
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute `command` and record it for undo.
    pub fn publish(&self, command: Arc<dyn Command>) -> DispatchResult<()> {
        self.publish_with(command, true)
    }

    /// Execute `command`, recording it in history only if `record` is true.
    ///
    /// The execution is ledgered either way.
    pub fn publish_with(&self, command: Arc<dyn Command>, record: bool) -> DispatchResult<()> {
        let _gate = self.enter()?;
        let name = command.display_name().to_owned();
        let _span = debug_span!("cmdx.publish", command = %name, record).entered();

        let handler = lock(&self.state).tree.resolve(command.as_ref());
        let Some(handler) = handler else {
            debug!("no handler accepts command");
            return Err(DispatchError::NoHandler {
                name,
                command_type: command.command_type().name().to_owned(),
            });
        };

        if let Err(source) = handler.execute(command.as_ref()) {
            warn!(error = %source, "execute failed; history untouched");
            return Err(DispatchError::execution(Operation::Do, name, source));
        }

        let notification = {
            let mut state = lock(&self.state);
            if record {
                let redo_dropped = state.timeline.truncate_forward();
                let undo_dropped = if command.is_undoable() {
                    0
                } else {
                    state.timeline.truncate_backward()
                };
                if redo_dropped + undo_dropped > 0 {
                    debug!(redo_dropped, undo_dropped, "history truncated");
                }
                state
                    .timeline
                    .append(HistoryEntry::new(Arc::clone(&command), handler));
            }
            self.ledger_event(&mut state, command, Operation::Do)
        };
        self.deliver(notification);
        Ok(())
    }

    /// Undo the most recent command.
    pub fn undo(&self) -> DispatchResult<StepOutcome> {
        let _gate = self.enter()?;
        self.step(Direction::Back)
    }

    /// Redo the most recently undone command.
    pub fn redo(&self) -> DispatchResult<StepOutcome> {
        let _gate = self.enter()?;
        self.step(Direction::Forward)
    }

    /// Undo `count` times, stopping at the first failure.
    ///
    /// Returns how many steps were applied. Completed steps are not rolled
    /// back when a later one fails.
    pub fn undo_many(&self, count: isize) -> DispatchResult<usize> {
        self.step_many(Direction::Back, count)
    }

    /// Redo `count` times, stopping at the first failure.
    pub fn redo_many(&self, count: isize) -> DispatchResult<usize> {
        self.step_many(Direction::Forward, count)
    }

    fn step_many(&self, direction: Direction, count: isize) -> DispatchResult<usize> {
        let Ok(count) = usize::try_from(count) else {
            return Err(DispatchError::InvalidArgument(format!(
                "{direction} count must be non-negative, got {count}"
            )));
        };
        let _gate = self.enter()?;
        let mut applied = 0;
        for _ in 0..count {
            if self.step(direction)?.is_applied() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// One undo or redo step. The caller holds the gate.
    fn step(&self, direction: Direction) -> DispatchResult<StepOutcome> {
        let entry = {
            let mut state = lock(&self.state);
            match direction {
                Direction::Back => state.timeline.step_back()?,
                Direction::Forward => state.timeline.step_forward()?,
            }
        };
        let operation = match direction {
            Direction::Back => Operation::Undo,
            Direction::Forward => Operation::Redo,
        };
        let command = Arc::clone(entry.command());
        let name = command.display_name().to_owned();
        let _span = debug_span!("cmdx.step", command = %name, %operation).entered();

        let reverse = if command.is_undoable() {
            entry.handler().as_undoable()
        } else {
            None
        };
        let Some(reverse) = reverse else {
            let mut state = lock(&self.state);
            let restored = match direction {
                Direction::Back => state.timeline.step_forward(),
                Direction::Forward => state.timeline.step_back(),
            };
            debug!(restored = restored.is_ok(), "not reversible; skipped");
            return Ok(StepOutcome::Skipped);
        };

        let result = match direction {
            Direction::Back => reverse.unexecute(command.as_ref()),
            Direction::Forward => reverse.reexecute(command.as_ref()),
        };
        if let Err(source) = result {
            let mut state = lock(&self.state);
            let dropped = match direction {
                Direction::Back => state.timeline.truncate_forward(),
                Direction::Forward => state.timeline.truncate_backward(),
            };
            warn!(error = %source, dropped, "{operation} failed; history truncated");
            return Err(DispatchError::execution(operation, name, source));
        }

        let notification = {
            let mut state = lock(&self.state);
            self.ledger_event(&mut state, command, operation)
        };
        self.deliver(notification);
        Ok(StepOutcome::Applied)
    }

    // ========================================================================
    // History queries
    // ========================================================================

    /// True if the entry before the cursor exists and is undoable.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        lock(&self.state)
            .timeline
            .peek_back_entry()
            .is_some_and(|entry| entry.command().is_undoable())
    }

    /// True if the entry after the cursor exists and is undoable.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        lock(&self.state)
            .timeline
            .peek_forward_entry()
            .is_some_and(|entry| entry.command().is_undoable())
    }

    /// Name of the command `undo()` would reverse.
    #[must_use]
    pub fn undo_name(&self) -> Option<String> {
        let state = lock(&self.state);
        let entry = state.timeline.peek_back_entry()?;
        if !entry.command().is_undoable() {
            return None;
        }
        entry.command().name().map(str::to_owned)
    }

    /// Name of the command `redo()` would re-apply.
    #[must_use]
    pub fn redo_name(&self) -> Option<String> {
        let state = lock(&self.state);
        let entry = state.timeline.peek_forward_entry()?;
        if !entry.command().is_undoable() {
            return None;
        }
        entry.command().name().map(str::to_owned)
    }

    /// Up to `count` undo names, most recent first.
    #[must_use]
    pub fn undo_names(&self, count: usize) -> Vec<String> {
        lock(&self.state).timeline.peek_back(count)
    }

    /// Up to `count` redo names, next first.
    #[must_use]
    pub fn redo_names(&self, count: usize) -> Vec<String> {
        lock(&self.state).timeline.peek_forward(count)
    }

    /// Drop all history. The ledger is kept.
    pub fn clear_history(&self) {
        lock(&self.state).timeline.clear();
        debug!("history cleared");
    }

    // ========================================================================
    // Ledger queries
    // ========================================================================

    /// Most recent ledger record.
    #[must_use]
    pub fn latest_execution_record(&self) -> Option<LedgerEntry> {
        lock(&self.state).ledger.latest().cloned()
    }

    /// Independent snapshot of the `count` most recent records.
    #[must_use]
    pub fn execution_records(&self, count: usize) -> ExecutionLedger {
        lock(&self.state).ledger.first(count)
    }

    /// Independent snapshot of every record.
    #[must_use]
    pub fn all_execution_records(&self) -> ExecutionLedger {
        lock(&self.state).ledger.clone()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a callback for every ledgered event.
    pub fn add_listener(
        &self,
        listener: impl Fn(Option<&LedgerEntry>, &LedgerEntry) + Send + Sync + 'static,
    ) -> ListenerId {
        lock(&self.state).listeners.add(Arc::new(listener))
    }

    /// Remove a callback. Returns `false` if the id is unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.state).listeners.remove(id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn enter(&self) -> DispatchResult<GateGuard<'_>> {
        let me = thread::current().id();
        if *lock(&self.owner) == Some(me) {
            warn!("re-entrant dispatcher call rejected");
            return Err(DispatchError::Reentrant);
        }
        let gate = lock(&self.gate);
        *lock(&self.owner) = Some(me);
        Ok(GateGuard {
            owner: &self.owner,
            _gate: gate,
        })
    }

    fn ledger_event(
        &self,
        state: &mut State,
        command: Arc<dyn Command>,
        operation: Operation,
    ) -> Option<Notification> {
        let previous = state.ledger.latest().cloned();
        let current = LedgerEntry::new(command, operation, (self.clock)(), state.next_sequence);
        state.next_sequence += 1;
        if !state.ledger.insert(current.clone()) {
            debug!(sequence = current.sequence(), "ledger record not kept");
            return None;
        }
        Some(Notification {
            previous,
            current,
            listeners: state.listeners.snapshot(),
        })
    }

    fn deliver(&self, notification: Option<Notification>) {
        let Some(notification) = notification else {
            return;
        };
        if notification.listeners.is_empty() {
            return;
        }
        notify_all(
            &notification.listeners,
            notification.previous.as_ref(),
            &notification.current,
            self.config.isolate_listener_panics,
        );
    }
}

/// Holds the gate and marks the current thread as its owner.
struct GateGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
    _gate: MutexGuard<'a, ()>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}

/// Lock, recovering from poisoning. No lock is held across a handler or
/// listener call, so a poisoned lock never guards half-written state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
