use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sync::{AtomicU32, Ordering, RawLock};

/// Handle of a node inside its [`Forest`](crate::Forest).
///
/// Handles are plain arena indices. A forest never frees a node, so a handle stays valid
/// (and keeps naming the same node) for the forest's whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        assert!(
            index < Link::NONE as usize,
            "forest is full: {} nodes",
            index
        );
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An optional `NodeId` in a single atomic word.
///
/// All writes happen under whatever locks the active strategy takes, so relaxed
/// accesses are enough; the locks provide the happens-before edges. Unsynchronized use
/// (the `NoLocks` strategy) is a logical race but never a data race.
pub(crate) struct Link(AtomicU32);

impl Link {
    const NONE: u32 = u32::MAX;

    pub fn empty() -> Self {
        Link(AtomicU32::new(Self::NONE))
    }

    pub fn get(&self) -> Option<NodeId> {
        match self.0.load(Ordering::Relaxed) {
            Self::NONE => None,
            raw => Some(NodeId(raw)),
        }
    }

    pub fn set(&self, id: Option<NodeId>) {
        self.0
            .store(id.map_or(Self::NONE, |id| id.0), Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.set(None);
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(id) => write!(f, "{}", id),
            None => write!(f, "-"),
        }
    }
}

/// A node of the forest: payload, tree links, and the locks the removal strategies use.
pub(crate) struct Node<T, L: RawLock> {
    pub data: T,

    pub parent: Link,
    pub left: Link,
    pub right: Link,
    pub first_child: Link,
    pub last_child: Link,
    /// The node whose `self_lock` guards this node's left boundary. Kept equal to `left`
    /// by append and by the sibling fixup.
    pub ref_lock: Link,

    /// Held while this node acts as a parent: guards `first_child` and `last_child`.
    pub children_lock: L,
    /// Chained-lock strategy: guards `right` of this node and `left`/`ref_lock` of the
    /// right neighbour.
    pub self_lock: L,
    /// Per-side locks of the sibling-lock strategies. The edge between `a` and
    /// `a.right` is owned by whoever holds `a.right_lock` and `a.right.left_lock`.
    pub left_lock: L,
    pub right_lock: L,
}

impl<T, L: RawLock> Node<T, L> {
    pub fn new(data: T) -> Self {
        Node {
            data,
            parent: Link::empty(),
            left: Link::empty(),
            right: Link::empty(),
            first_child: Link::empty(),
            last_child: Link::empty(),
            ref_lock: Link::empty(),
            children_lock: L::new(),
            self_lock: L::new(),
            left_lock: L::new(),
            right_lock: L::new(),
        }
    }

    /// Try to own this node's right boundary under every scheme at once, so that an
    /// append can rewrite `right` regardless of which strategy removals use.
    pub fn try_lock_right_boundary(&self) -> bool {
        if !self.self_lock.try_lock() {
            return false;
        }
        if !self.right_lock.try_lock() {
            self.self_lock.unlock();
            return false;
        }
        true
    }

    pub fn unlock_right_boundary(&self) {
        self.right_lock.unlock();
        self.self_lock.unlock();
    }
}

impl<T: fmt::Debug, L: RawLock> fmt::Debug for Node<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("data", &self.data)
            .field("parent", &self.parent)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("first_child", &self.first_child)
            .field("last_child", &self.last_child)
            .field("ref_lock", &self.ref_lock)
            .finish()
    }
}

#[cfg(test)]
#[cfg(not(feature = "shuttle"))]
mod tests {
    use super::*;
    use crate::sync::NodeLock;

    #[test]
    fn test_link_roundtrip() {
        let link = Link::empty();
        assert_eq!(link.get(), None);
        link.set(Some(NodeId(7)));
        assert_eq!(link.get(), Some(NodeId(7)));
        assert_eq!(format!("{:?}", link), "#7");
        link.clear();
        assert_eq!(link.get(), None);
        assert_eq!(format!("{:?}", link), "-");
    }

    #[test]
    fn test_new_node_is_detached() {
        let node: Node<u32, NodeLock> = Node::new(3);
        assert_eq!(node.data, 3);
        assert!(node.parent.get().is_none());
        assert!(node.left.get().is_none());
        assert!(node.right.get().is_none());
        assert!(node.first_child.get().is_none());
        assert!(node.last_child.get().is_none());
        assert!(node.ref_lock.get().is_none());
    }

    #[test]
    fn test_right_boundary_is_all_or_nothing() {
        let node: Node<(), NodeLock> = Node::new(());
        node.right_lock.lock();
        assert!(!node.try_lock_right_boundary());
        assert!(
            !node.self_lock.is_locked(),
            "a failed attempt must not leave self_lock held"
        );
        node.right_lock.unlock();

        assert!(node.try_lock_right_boundary());
        assert!(node.self_lock.is_locked() && node.right_lock.is_locked());
        node.unlock_right_boundary();
        assert!(!node.self_lock.is_locked() && !node.right_lock.is_locked());
    }

    #[test]
    #[should_panic(expected = "forest is full")]
    fn test_node_id_rejects_sentinel() {
        NodeId::from_index(u32::MAX as usize);
    }
}
