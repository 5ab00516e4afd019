#![forbid(unsafe_code)]

//! Command fixtures and a deterministic clock.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use cmdx_core::{Command, CommandType};

static EDIT: LazyLock<CommandType> = LazyLock::new(|| CommandType::new_undoable("Edit"));
static PLAIN: LazyLock<CommandType> = LazyLock::new(|| CommandType::new("Plain", &[]));

/// Shared undoable type used by most fixtures.
#[must_use]
pub fn edit_type() -> &'static CommandType {
    &EDIT
}

/// Shared non-undoable type.
#[must_use]
pub fn plain_type() -> &'static CommandType {
    &PLAIN
}

/// Command with an explicit (possibly absent) name.
#[derive(Debug, Clone)]
pub struct NamedCommand {
    command_type: CommandType,
    name: Option<String>,
}

impl NamedCommand {
    /// Named command of any type.
    pub fn of(command_type: &CommandType, name: impl Into<String>) -> Self {
        Self {
            command_type: command_type.clone(),
            name: Some(name.into()),
        }
    }

    /// Command of any type whose name is absent.
    #[must_use]
    pub fn unnamed(command_type: &CommandType) -> Self {
        Self {
            command_type: command_type.clone(),
            name: None,
        }
    }

    /// Named command of the undoable [`edit_type`].
    pub fn edit(name: impl Into<String>) -> Self {
        Self::of(edit_type(), name)
    }

    /// Named command of the non-undoable [`plain_type`].
    pub fn plain(name: impl Into<String>) -> Self {
        Self::of(plain_type(), name)
    }

    /// Wrap for publishing.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Command> {
        Arc::new(self)
    }
}

impl Command for NamedCommand {
    fn command_type(&self) -> &CommandType {
        &self.command_type
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Command that keeps the default name (its type's name).
#[derive(Debug, Clone)]
pub struct PlainCommand(pub CommandType);

impl PlainCommand {
    #[must_use]
    pub fn shared(command_type: &CommandType) -> Arc<dyn Command> {
        Arc::new(Self(command_type.clone()))
    }
}

impl Command for PlainCommand {
    fn command_type(&self) -> &CommandType {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Millisecond clock that only moves when told to.
///
/// Clones share the same counter, so one copy can be handed to a dispatcher
/// while the test keeps another.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<AtomicU64>,
    step: u64,
}

impl TestClock {
    /// Clock frozen at `start`.
    #[must_use]
    pub fn frozen(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
            step: 0,
        }
    }

    /// Clock that advances by `step` after every read.
    #[must_use]
    pub fn ticking(start: u64, step: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
            step,
        }
    }

    /// Read the clock (advancing it when ticking).
    pub fn read(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }

    /// Jump to `value`.
    pub fn set(&self, value: u64) {
        self.now.store(value, Ordering::SeqCst);
    }

    /// Boxed reader suitable for `Dispatcher::with_clock`.
    #[must_use]
    pub fn reader(&self) -> impl Fn() -> u64 + Send + Sync + 'static {
        let clock = self.clone();
        move || clock.read()
    }
}
