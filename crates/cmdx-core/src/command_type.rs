#![forbid(unsafe_code)]

//! Runtime command type descriptors and their hierarchy ordering.
//!
//! Command types are explicit descriptor objects rather than language-level
//! types. Each [`CommandType`] knows its direct supertypes, which is enough to
//! answer "is this type assignable to that one" without reflection. Host
//! applications create descriptors at runtime, so the set of types is open.
//!
//! # Hierarchy
//!
//! ```text
//!                 Command
//!                /       \
//!       UndoableCommand   SaveCommand
//!          /        \
//!   RenameCommand   MoveCommand
//! ```
//!
//! Every descriptor created without explicit supertypes extends
//! [`CommandType::command`]. A type may list several supertypes, in which
//! case it behaves like a class implementing several capability interfaces.
//!
//! # Invariants
//!
//! 1. The supertype graph is acyclic (a descriptor can only reference
//!    descriptors that already exist).
//! 2. Identity is the descriptor id; two descriptors with the same name are
//!    still distinct types.
//! 3. A type's depth (longest supertype chain down to `Command`) is strictly
//!    greater than the depth of each of its ancestors.
//! 4. [`TypeOrdering`] orders by depth, then name, then id. Ancestors
//!    therefore always sort before their descendants.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, LazyLock};

/// Source of process-local descriptor ids. 0 and 1 are the built-ins.
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(2);

static COMMAND: LazyLock<CommandType> = LazyLock::new(|| CommandType::with_id(0, "Command".to_owned(), Vec::new()));

static UNDOABLE: LazyLock<CommandType> =
    LazyLock::new(|| CommandType::with_id(1, "UndoableCommand".to_owned(), vec![CommandType::command().clone()]));

struct TypeInfo {
    id: u64,
    depth: usize,
    name: String,
    supertypes: Vec<CommandType>,
}

/// Descriptor for a command type.
///
/// Cloning is cheap (shared pointer). Equality, hashing and ordering never
/// look at the name alone.
#[derive(Clone)]
pub struct CommandType {
    inner: Arc<TypeInfo>,
}

impl CommandType {
    fn with_id(id: u64, name: String, supertypes: Vec<CommandType>) -> Self {
        let depth = supertypes
            .iter()
            .map(|parent| parent.depth() + 1)
            .max()
            .unwrap_or(0);
        Self {
            inner: Arc::new(TypeInfo {
                id,
                depth,
                name,
                supertypes,
            }),
        }
    }

    /// Create a new command type extending the given supertypes.
    ///
    /// An empty supertype list means the type extends [`CommandType::command`].
    #[must_use]
    pub fn new(name: impl Into<String>, supertypes: &[CommandType]) -> Self {
        let supertypes = if supertypes.is_empty() {
            vec![Self::command().clone()]
        } else {
            supertypes.to_vec()
        };
        let id = NEXT_TYPE_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self::with_id(id, name.into(), supertypes)
    }

    /// Create a new command type whose instances can be undone.
    ///
    /// Shorthand for `CommandType::new(name, &[CommandType::undoable().clone()])`.
    #[must_use]
    pub fn new_undoable(name: impl Into<String>) -> Self {
        Self::new(name, std::slice::from_ref(Self::undoable()))
    }

    /// The root of every command type.
    #[must_use]
    pub fn command() -> &'static CommandType {
        &COMMAND
    }

    /// The capability type shared by every reversible command.
    #[must_use]
    pub fn undoable() -> &'static CommandType {
        &UNDOABLE
    }

    /// Display name of this type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Process-local unique id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Length of the longest supertype chain down to [`CommandType::command`].
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Direct supertypes, in declaration order.
    #[must_use]
    pub fn supertypes(&self) -> &[CommandType] {
        &self.inner.supertypes
    }

    /// True if an instance of `other` can be treated as an instance of `self`.
    ///
    /// Reflexive: every type is assignable from itself.
    #[must_use]
    pub fn is_assignable_from(&self, other: &CommandType) -> bool {
        if self == other {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|parent| self.is_assignable_from(parent))
    }

    /// True if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_proper_supertype_of(&self, other: &CommandType) -> bool {
        self != other && self.is_assignable_from(other)
    }

    /// True if instances of this type can be undone.
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        Self::undoable().is_assignable_from(self)
    }
}

impl PartialEq for CommandType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for CommandType {}

impl Hash for CommandType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for CommandType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CommandType {
    fn cmp(&self, other: &Self) -> Ordering {
        TypeOrdering::compare(self, other)
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandType")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field(
                "supertypes",
                &self.inner.supertypes.iter().map(CommandType::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Total order over command types.
///
/// Keyed by `(depth, name, id)`. Every ancestor is shallower than its
/// descendants, so ancestors sort first; types at the same depth (which are
/// never related) sort by name, and by id when names collide.
///
/// Ordering related types by ancestry and everything else by name alone is
/// not transitive once the hierarchy branches: with `Z` above `A` and an
/// unrelated `M`, it gives `Z < A < M < Z`. The depth key avoids that cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeOrdering;

impl TypeOrdering {
    /// Compare two command types.
    #[must_use]
    pub fn compare(first: &CommandType, second: &CommandType) -> Ordering {
        if first == second {
            return Ordering::Equal;
        }
        first
            .depth()
            .cmp(&second.depth())
            .then_with(|| first.name().cmp(second.name()))
            .then_with(|| first.id().cmp(&second.id()))
    }
}
