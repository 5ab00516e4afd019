#![forbid(unsafe_code)]

//! Type-hierarchy dispatch tree.
//!
//! The [`DispatchTree`] is a forest of nodes, each bound to one registered
//! [`CommandType`] and (usually) one handler. Resolution walks the forest and
//! returns the handler of the deepest node whose type accepts the command.
//!
//! # Invariants
//!
//! 1. Along any root-to-leaf path, each node's type is a proper supertype of
//!    its children's types.
//! 2. No sibling is assignable to another sibling.
//! 3. Sibling lists (and the root list) are sorted by [`TypeOrdering`](cmdx_core::TypeOrdering).
//! 4. Nodes are never removed from the arena; unsubscribing only clears the
//!    handler, leaving a vacant node that resolution skips.
//!
//! # Registration
//!
//! ```text
//! register(Child)            register(Parent)
//! roots: [Child]      ──►    roots: [Parent]
//!                                      └── Child
//! ```
//!
//! A type that already has a node anywhere in the forest only swaps that
//! node's handler. A type deeper than an existing node recurses into that
//! node's children. A
//! type more general than one or more siblings adopts all of them. Anything
//! else becomes a new sibling. For single-inheritance hierarchies the
//! resulting shape does not depend on registration order. A type with several
//! registered supertypes sits under whichever of them was reachable first;
//! resolution compares candidates across branches, so that placement does
//! not change which handler runs.
//!
//! # Resolution
//!
//! Every accepting sibling offers a candidate: the best bound node among its
//! children, else the node itself when it holds a handler. Vacant nodes pass
//! through to their subtree. Across siblings the candidate whose type is
//! deepest wins, so a registered subtype beats its supertypes even when it
//! was nested under a different branch. Equal depths fall back to
//! [`TypeOrdering`](cmdx_core::TypeOrdering), which pins the choice for a
//! command type with several unrelated registered supertypes.

use std::fmt;
use std::sync::Arc;

use cmdx_core::{Command, CommandType, Handler};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

struct DispatchNode {
    command_type: CommandType,
    handler: Option<Arc<dyn Handler>>,
    children: Vec<NodeId>,
}

/// Which sibling list an insertion scan is working on.
#[derive(Clone, Copy)]
enum Level {
    Roots,
    Children(NodeId),
}

/// Forest of registered command types and their handlers.
#[derive(Default)]
pub struct DispatchTree {
    nodes: Vec<DispatchNode>,
    roots: Vec<NodeId>,
}

impl fmt::Debug for DispatchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("bound", &self.bound_count())
            .finish()
    }
}

fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl DispatchTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes that currently hold a handler.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.handler.is_some()).count()
    }

    /// Bind `handler` to `command_type`, restructuring the forest as needed.
    ///
    /// Registering a type that already has a node replaces its handler.
    pub fn register(&mut self, command_type: CommandType, handler: Arc<dyn Handler>) -> NodeId {
        // The arena holds every node ever created, whatever branch it sits in.
        if let Some(existing) = self
            .nodes
            .iter()
            .position(|node| node.command_type == command_type)
        {
            tracing::debug!(command_type = %command_type, "replacing handler on existing node");
            self.nodes[existing].handler = Some(handler);
            return NodeId(existing);
        }

        let mut level = Level::Roots;
        loop {
            let siblings = self.siblings(level).to_vec();

            if let Some(&ancestor) = siblings.iter().find(|&&id| {
                self.nodes[id.0]
                    .command_type
                    .is_proper_supertype_of(&command_type)
            }) {
                level = Level::Children(ancestor);
                continue;
            }

            let (adopted, kept): (Vec<NodeId>, Vec<NodeId>) = siblings.into_iter().partition(|&id| {
                command_type.is_proper_supertype_of(&self.nodes[id.0].command_type)
            });

            let id = NodeId(self.nodes.len());
            tracing::debug!(
                command_type = %command_type,
                adopted = adopted.len(),
                "inserting dispatch node"
            );
            self.nodes.push(DispatchNode {
                command_type,
                handler: Some(handler),
                children: adopted,
            });

            let mut level_ids = kept;
            level_ids.push(id);
            self.sort_ids(&mut level_ids);
            *self.siblings_mut(level) = level_ids;
            return id;
        }
    }

    /// Most specific handler for `command`, if any registered type accepts it.
    #[must_use]
    pub fn resolve(&self, command: &dyn Command) -> Option<Arc<dyn Handler>> {
        self.resolve_type(command.command_type())
    }

    /// Most specific handler for instances of `command_type`.
    #[must_use]
    pub fn resolve_type(&self, command_type: &CommandType) -> Option<Arc<dyn Handler>> {
        let found = self.resolve_in(&self.roots, command_type);
        tracing::trace!(
            command_type = %command_type,
            resolved = found.is_some(),
            "dispatch resolution"
        );
        found
    }

    fn resolve_in(&self, level: &[NodeId], command_type: &CommandType) -> Option<Arc<dyn Handler>> {
        self.best_in(level, command_type)
            .map(|id| &self.nodes[id.0])
            .and_then(|node| node.handler.clone())
    }

    /// Deepest bound node accepting `command_type` under `level`.
    ///
    /// Every accepting sibling contributes a candidate (its best descendant,
    /// else itself when bound). The candidate with the deepest type wins;
    /// equal depths keep the earlier sibling in
    /// [`TypeOrdering`](cmdx_core::TypeOrdering) order.
    fn best_in(&self, level: &[NodeId], command_type: &CommandType) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for &id in level {
            let node = &self.nodes[id.0];
            if !node.command_type.is_assignable_from(command_type) {
                continue;
            }
            let candidate = self
                .best_in(&node.children, command_type)
                .or_else(|| node.handler.as_ref().map(|_| id));
            let Some(candidate) = candidate else {
                continue;
            };
            let depth = |id: NodeId| self.nodes[id.0].command_type.depth();
            let deeper = best.is_none_or(|current| depth(candidate) > depth(current));
            if deeper {
                best = Some(candidate);
            }
        }
        best
    }

    /// Clear `handler` from every node it is bound to.
    ///
    /// Returns `true` if at least one node was bound to it.
    pub fn detach(&mut self, handler: &Arc<dyn Handler>) -> bool {
        let mut detached = false;
        for node in &mut self.nodes {
            if node.handler.as_ref().is_some_and(|h| same_handler(h, handler)) {
                node.handler = None;
                detached = true;
            }
        }
        detached
    }

    /// Type bound to a node.
    #[must_use]
    pub fn command_type(&self, id: NodeId) -> Option<&CommandType> {
        self.nodes.get(id.0).map(|n| &n.command_type)
    }

    /// Depth-first `(depth, type name)` rows, roots at depth 0.
    #[must_use]
    pub fn outline(&self) -> Vec<(usize, String)> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, NodeId)> = self.roots.iter().rev().map(|&id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            let node = &self.nodes[id.0];
            rows.push((depth, node.command_type.name().to_owned()));
            stack.extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        }
        rows
    }

    /// Check the structural invariants. Empty means healthy.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        self.validate_level(&self.roots, None, &mut issues);
        issues
    }

    fn validate_level(&self, level: &[NodeId], parent: Option<NodeId>, issues: &mut Vec<String>) {
        if level
            .windows(2)
            .any(|w| self.nodes[w[0].0].command_type > self.nodes[w[1].0].command_type)
        {
            issues.push("sibling list is not sorted".to_owned());
        }
        for (i, &id) in level.iter().enumerate() {
            let node = &self.nodes[id.0];
            if let Some(parent) = parent {
                let parent_type = &self.nodes[parent.0].command_type;
                if !parent_type.is_proper_supertype_of(&node.command_type) {
                    issues.push(format!(
                        "{} is under {} but is not a proper subtype of it",
                        node.command_type, parent_type
                    ));
                }
            }
            for &other in &level[i + 1..] {
                let other_type = &self.nodes[other.0].command_type;
                if node.command_type.is_assignable_from(other_type)
                    || other_type.is_assignable_from(&node.command_type)
                {
                    issues.push(format!(
                        "siblings {} and {} are related",
                        node.command_type, other_type
                    ));
                }
            }
            self.validate_level(&node.children, Some(id), issues);
        }
    }

    fn siblings(&self, level: Level) -> &[NodeId] {
        match level {
            Level::Roots => &self.roots,
            Level::Children(id) => &self.nodes[id.0].children,
        }
    }

    fn siblings_mut(&mut self, level: Level) -> &mut Vec<NodeId> {
        match level {
            Level::Roots => &mut self.roots,
            Level::Children(id) => &mut self.nodes[id.0].children,
        }
    }

    fn sort_ids(&self, ids: &mut [NodeId]) {
        ids.sort_by(|a, b| self.nodes[a.0].command_type.cmp(&self.nodes[b.0].command_type));
    }
}
