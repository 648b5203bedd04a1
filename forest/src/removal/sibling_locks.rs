use smallvec::SmallVec;

use crate::forest::Forest;
use crate::node::NodeId;
use crate::removal::{fix_parent, fix_self, fix_siblings};
use crate::sync::RawLock;

/// Unlink `id` under the parent lock plus the four side locks of its two edges.
///
/// Locks are taken in a fixed local order: parent, own `left_lock`, left neighbour's
/// `right_lock`, own `right_lock`, right neighbour's `left_lock`. The parent lock is
/// released as soon as the end-links are fixed, so the sibling splice of one removal
/// overlaps with the lock acquisition of the next. All acquisitions block; nothing backs
/// off, so this is not deadlock-free once other disciplines hold side locks while
/// waiting for a parent.
pub(crate) fn remove<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    let parent_lock = forest.structural_lock(node.parent.get());
    parent_lock.lock();

    let mut held: SmallVec<[&L; 4]> = SmallVec::new();

    // a neighbour is only stable once our own side lock is held: the neighbour's own
    // removal rewrites our link while holding that lock
    node.left_lock.lock();
    held.push(&node.left_lock);
    if let Some(left) = node.left.get() {
        let facing = &forest.node(left).right_lock;
        facing.lock();
        held.push(facing);
    }

    node.right_lock.lock();
    held.push(&node.right_lock);
    if let Some(right) = node.right.get() {
        let facing = &forest.node(right).left_lock;
        facing.lock();
        held.push(facing);
    }

    fix_parent(forest, id);
    parent_lock.unlock();

    fix_siblings(forest, id);
    for lock in held.into_iter().rev() {
        lock.unlock();
    }

    fix_self(forest, id);
}
