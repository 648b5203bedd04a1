use crate::backoff::Backoff;
use crate::forest::Forest;
use crate::node::NodeId;
use crate::removal::{fix_parent, fix_self, fix_siblings};
use crate::sync::RawLock;

// Lock coverage under this discipline:
// - `n.right` and the right neighbour's `left`/`ref_lock` are guarded by `n.self_lock`
// - `n.left` and `n.ref_lock` are guarded by the lock `n.ref_lock` names
// So holding our own lock and the lock named by our `ref_lock` freezes both of our
// edges, and the splice hands our `ref_lock` over to the right neighbour.

/// Acquire our own `self_lock` and the `self_lock` of the node our `ref_lock` names,
/// backing off on any failure. Returns the guard node, if any.
fn lock_hand_over_hand<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) -> Option<NodeId> {
    let node = forest.node(id);
    let mut backoff = Backoff::new();
    loop {
        if !node.self_lock.try_lock() {
            backoff.snooze();
            continue;
        }
        let Some(guard) = node.ref_lock.get() else {
            return None;
        };
        let guard_lock = &forest.node(guard).self_lock;
        if guard_lock.try_lock() {
            // the left neighbour may have been removed between reading `ref_lock` and
            // locking it; its removal rewrote our `ref_lock` under the lock we now hold
            if node.ref_lock.get() == Some(guard) {
                return Some(guard);
            }
            guard_lock.unlock();
        }
        node.self_lock.unlock();
        debug_println!(
            "{} backing off from guard {} after {} rounds",
            id,
            guard,
            backoff.rounds()
        );
        backoff.snooze();
    }
}

/// Unlink `id` holding exactly two node locks: its own and its left guard's.
///
/// The parent lock is taken last and only around the end-link update, like the
/// sibling-backoff discipline, so a concurrent append (which only try-locks node locks
/// while holding the parent lock) can never deadlock with a removal.
pub(crate) fn remove<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    let guard = lock_hand_over_hand(forest, id);

    let parent_lock = forest.structural_lock(node.parent.get());
    parent_lock.lock();
    fix_parent(forest, id);
    parent_lock.unlock();

    fix_siblings(forest, id);

    if let Some(guard) = guard {
        forest.node(guard).self_lock.unlock();
    }
    node.self_lock.unlock();

    fix_self(forest, id);
}
