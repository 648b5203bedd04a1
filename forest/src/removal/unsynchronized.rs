use crate::forest::Forest;
use crate::node::NodeId;
use crate::removal::{fix_parent, fix_self, fix_siblings};
use crate::sync::RawLock;

/// Unlink `id` without taking any lock. Single-threaded baseline.
pub(crate) fn remove<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    fix_parent(forest, id);
    fix_siblings(forest, id);
    fix_self(forest, id);
}
