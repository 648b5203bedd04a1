mod chained;
mod parent_lock;
mod sibling_backoff;
mod sibling_locks;
mod unsynchronized;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::forest::Forest;
use crate::node::NodeId;
use crate::sync::RawLock;

/// Locking discipline used to unlink a node from its parent's child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalStrategy {
    /// No synchronization; single-threaded use only.
    NoLocks,
    /// The parent's lock is held for the whole unlink. Removals under one parent are
    /// fully serialized.
    ParentLockOnly,
    /// Parent lock plus the four locks on both sides of both edges, acquired blocking.
    ParentAndSiblingLocks,
    /// Per-side locks acquired with try-and-backoff; the parent lock is only held for
    /// the end-link update.
    SiblingLocksBackoff,
    /// One lock per node plus a reference to the lock guarding the left boundary,
    /// handed over to the right neighbour on removal.
    ChainedLocks,
}

impl RemovalStrategy {
    pub const ALL: [RemovalStrategy; 5] = [
        RemovalStrategy::NoLocks,
        RemovalStrategy::ParentLockOnly,
        RemovalStrategy::ParentAndSiblingLocks,
        RemovalStrategy::SiblingLocksBackoff,
        RemovalStrategy::ChainedLocks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RemovalStrategy::NoLocks => "no-locks",
            RemovalStrategy::ParentLockOnly => "parent-lock-only",
            RemovalStrategy::ParentAndSiblingLocks => "parent-and-sibling-locks",
            RemovalStrategy::SiblingLocksBackoff => "sibling-locks-backoff",
            RemovalStrategy::ChainedLocks => "chained-locks",
        }
    }

    /// Whether concurrent removals under one parent are safe at all.
    pub fn is_thread_safe(self) -> bool {
        !matches!(self, RemovalStrategy::NoLocks)
    }

    /// Whether the strategy is deadlock-free in every workload, including concurrent
    /// appends and removals under different parents.
    pub fn is_deadlock_free(self) -> bool {
        matches!(
            self,
            RemovalStrategy::ParentLockOnly
                | RemovalStrategy::SiblingLocksBackoff
                | RemovalStrategy::ChainedLocks
        )
    }

    pub(crate) fn remove<T, L: RawLock>(self, forest: &Forest<T, L>, id: NodeId) {
        match self {
            RemovalStrategy::NoLocks => unsynchronized::remove(forest, id),
            RemovalStrategy::ParentLockOnly => parent_lock::remove(forest, id),
            RemovalStrategy::ParentAndSiblingLocks => sibling_locks::remove(forest, id),
            RemovalStrategy::SiblingLocksBackoff => sibling_backoff::remove(forest, id),
            RemovalStrategy::ChainedLocks => chained::remove(forest, id),
        }
    }
}

impl fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrategyError(String);

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown removal strategy `{}`", self.0)
    }
}

impl std::error::Error for ParseStrategyError {}

impl FromStr for RemovalStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        RemovalStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == normalized)
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

// The three fixups every strategy runs. Callers hold whatever locks their discipline
// requires; the fixups themselves never lock.

/// Move the parent's end-links off `id` if it is currently the head or the tail.
pub(crate) fn fix_parent<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    let Some(parent) = node.parent.get() else {
        return;
    };
    let parent_node = forest.node(parent);
    if parent_node.first_child.get() == Some(id) {
        parent_node.first_child.set(node.right.get());
    }
    if parent_node.last_child.get() == Some(id) {
        parent_node.last_child.set(node.left.get());
    }
}

/// Splice `id` out of the sibling chain. The right neighbour's `ref_lock` is handed over
/// to the new left neighbour in the same step.
pub(crate) fn fix_siblings<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    let left = node.left.get();
    let right = node.right.get();
    debug_assert_eq!(node.ref_lock.get(), left, "ref_lock of {} drifted", id);
    if let Some(left) = left {
        forest.node(left).right.set(right);
    }
    if let Some(right) = right {
        let right_node = forest.node(right);
        right_node.left.set(left);
        right_node.ref_lock.set(left);
    }
}

/// Clear the removed node's own links. Its children are left alone.
pub(crate) fn fix_self<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    node.parent.clear();
    node.left.clear();
    node.right.clear();
    node.ref_lock.clear();
}


// Run with:
//   cargo test --features=shuttle -- under_shuttle
#[cfg(test)]
#[cfg(feature = "shuttle")]
mod shuttle_tests {
    use super::*;
    use std::sync::Arc;

    fn check_neighbourhood_races_under_shuttle(strategy: RemovalStrategy) {
        shuttle::check_random(
            move || {
                let mut forest: Forest<usize> = Forest::new();
                let root = forest.add_node(usize::MAX);
                let kids: Vec<NodeId> = (0..8).map(|i| forest.add_node(i)).collect();
                for &kid in &kids {
                    forest.append_child(root, kid);
                }
                let extra = forest.add_node(8);
                let forest = Arc::new(forest);

                let mut handles = Vec::new();
                // adjacent blocks, the first one starting at the head
                for block in [0..2, 2..4, 4..6] {
                    let forest = Arc::clone(&forest);
                    let ids = kids[block].to_vec();
                    handles.push(shuttle::thread::spawn(move || {
                        for id in ids {
                            forest.remove(id, strategy);
                        }
                    }));
                }
                {
                    let forest = Arc::clone(&forest);
                    handles.push(shuttle::thread::spawn(move || {
                        forest.append_child(root, extra);
                    }));
                }
                for handle in handles {
                    handle.join().unwrap();
                }

                assert_eq!(
                    forest.children(root).collect::<Vec<_>>(),
                    vec![kids[6], kids[7], extra]
                );
                for &kid in &kids[..6] {
                    assert!(!forest.is_attached(kid));
                    assert_eq!(forest.left(kid), None);
                    assert_eq!(forest.right(kid), None);
                }
                forest.check_invariants();
            },
            1000,
        );
    }

    #[test]
    fn test_parent_lock_only_under_shuttle() {
        check_neighbourhood_races_under_shuttle(RemovalStrategy::ParentLockOnly);
    }

    #[test]
    fn test_sibling_locks_backoff_under_shuttle() {
        check_neighbourhood_races_under_shuttle(RemovalStrategy::SiblingLocksBackoff);
    }

    #[test]
    fn test_chained_locks_under_shuttle() {
        check_neighbourhood_races_under_shuttle(RemovalStrategy::ChainedLocks);
    }
}
