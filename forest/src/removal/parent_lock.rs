use crate::forest::Forest;
use crate::node::NodeId;
use crate::removal::{fix_parent, fix_self, fix_siblings};
use crate::sync::RawLock;

/// Unlink `id` while holding its parent's lock (or the root lock) across both fixups.
///
/// Every sibling-chain write under a parent happens with that parent's lock held, so
/// removals under one parent form a total order. Removals under different parents still
/// run in parallel.
pub(crate) fn remove<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    // only our own remover clears `parent`, so reading it unlocked is fine
    let lock = forest.structural_lock(forest.node(id).parent.get());
    lock.lock();
    fix_parent(forest, id);
    fix_siblings(forest, id);
    lock.unlock();

    fix_self(forest, id);
}
