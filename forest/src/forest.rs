use std::fmt::Debug;

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::node::{Node, NodeId};
use crate::removal::RemovalStrategy;
use crate::sync::{NodeLock, RawLock};

/// Arena of nodes plus the lock that stands in for the parent of every root.
///
/// Node creation needs `&mut self`; linking and removal only need `&self`, so a built
/// forest can be shared between threads.
pub struct Forest<T, L: RawLock = NodeLock> {
    nodes: Vec<Node<T, L>>,
    root_lock: L,
}

impl<T, L: RawLock> Default for Forest<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L: RawLock> Forest<T, L> {
    pub fn new() -> Self {
        Forest {
            nodes: Vec::new(),
            root_lock: L::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Forest {
            nodes: Vec::with_capacity(capacity),
            root_lock: L::new(),
        }
    }

    /// Create a detached node carrying `data`.
    pub fn add_node(&mut self, data: T) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(data));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    pub fn data(&self, id: NodeId) -> &T {
        &self.node(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent.get()
    }
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left.get()
    }
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right.get()
    }
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child.get()
    }
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child.get()
    }
    /// The node whose lock guards `id`'s left boundary under the chained strategy.
    pub fn ref_lock(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ref_lock.get()
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.parent(id).is_some()
    }

    /// Walk `parent`'s sibling chain from head to tail.
    ///
    /// The walk is not synchronized with concurrent removals; use it on a quiescent forest.
    pub fn children(&self, parent: NodeId) -> Children<'_, T, L> {
        Children {
            forest: self,
            next: self.first_child(parent),
        }
    }

    /// Attach `child` as the new tail of `parent`'s sibling chain.
    ///
    /// `child` must be detached. Safe to call while other threads remove siblings under
    /// any strategy except `NoLocks`.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        debug_println!("append {} under {}", child, parent);
        let parent_node = self.node(parent);
        let child_node = self.node(child);
        debug_assert!(
            child_node.parent.get().is_none(),
            "{} is already attached",
            child
        );
        debug_assert_ne!(parent, child);

        let mut backoff = Backoff::new();
        loop {
            parent_node.children_lock.lock();
            let Some(tail) = parent_node.last_child.get() else {
                child_node.parent.set(Some(parent));
                parent_node.first_child.set(Some(child));
                parent_node.last_child.set(Some(child));
                parent_node.children_lock.unlock();
                return;
            };

            // the old tail's right link is guarded by its boundary locks, which a removal
            // of the tail's left neighbour may hold; those removals take the parent lock
            // after their node locks, so only try here
            let tail_node = self.node(tail);
            if tail_node.try_lock_right_boundary() {
                child_node.parent.set(Some(parent));
                child_node.left.set(Some(tail));
                child_node.ref_lock.set(Some(tail));
                tail_node.right.set(Some(child));
                parent_node.last_child.set(Some(child));
                tail_node.unlock_right_boundary();
                parent_node.children_lock.unlock();
                return;
            }

            parent_node.children_lock.unlock();
            debug_println!("append {} backing off from tail {}", child, tail);
            backoff.snooze();
        }
    }

    /// Detach `id` from its parent's child list using `strategy`.
    ///
    /// `id` must be attached and must not be a root. Its own children stay linked to it.
    pub fn remove(&self, id: NodeId, strategy: RemovalStrategy) {
        debug_println!("remove {} with {}", id, strategy);
        strategy.remove(self, id);
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<T, L> {
        &self.nodes[id.index()]
    }

    /// The lock guarding the end-links of `parent`'s child list, or the forest-wide root
    /// lock for a parentless node.
    pub(crate) fn structural_lock(&self, parent: Option<NodeId>) -> &L {
        match parent {
            Some(parent) => &self.node(parent).children_lock,
            None => &self.root_lock,
        }
    }

    /// Verify the structure of the whole forest, panicking on the first violation.
    ///
    /// Every child list must be a well-formed doubly linked chain whose ends match the
    /// parent's end-links, every member must point back at the parent, `ref_lock` must
    /// track `left`, and no node may appear in more than one chain. Must be called on a
    /// quiescent forest.
    pub fn check_invariants(&self) {
        debug_println!("checking invariants");
        let mut seen = FxHashSet::default();
        for parent in self.node_ids() {
            let parent_node = self.node(parent);
            let Some(head) = parent_node.first_child.get() else {
                assert!(
                    parent_node.last_child.get().is_none(),
                    "{} has a last child but no first child",
                    parent
                );
                continue;
            };
            assert!(
                self.node(head).left.get().is_none(),
                "head {} of {} has a left sibling",
                head,
                parent
            );

            let mut previous = None;
            let mut current = Some(head);
            while let Some(child) = current {
                assert!(
                    seen.insert(child),
                    "{} is reachable twice (cycle or shared chain), last seen under {}",
                    child,
                    parent
                );
                let child_node = self.node(child);
                assert_eq!(
                    child_node.parent.get(),
                    Some(parent),
                    "{} is in the chain of {} but points at another parent",
                    child,
                    parent
                );
                assert_eq!(
                    child_node.left.get(),
                    previous,
                    "{} has a left link that does not match its predecessor",
                    child
                );
                assert_eq!(
                    child_node.ref_lock.get(),
                    previous,
                    "{} has a ref_lock that does not match its left neighbour",
                    child
                );
                previous = Some(child);
                current = child_node.right.get();
            }
            assert_eq!(
                parent_node.last_child.get(),
                previous,
                "last child of {} is not the tail of its chain",
                parent
            );
        }

        // anything that claims a parent must have been found in that parent's chain
        for id in self.node_ids() {
            if self.node(id).parent.get().is_some() {
                assert!(seen.contains(&id), "{} has a parent but is not in its chain", id);
            }
        }
    }

    pub fn snapshot(&self) -> ForestSnapshot<T>
    where
        T: Clone,
    {
        ForestSnapshot {
            nodes: self
                .node_ids()
                .map(|id| {
                    let node = self.node(id);
                    NodeSnapshot {
                        id,
                        data: node.data.clone(),
                        parent: node.parent.get(),
                        left: node.left.get(),
                        right: node.right.get(),
                        first_child: node.first_child.get(),
                        last_child: node.last_child.get(),
                    }
                })
                .collect(),
        }
    }

    pub fn print_tree(&self)
    where
        T: Debug,
    {
        println!("Forest:");
        println!("+----------------------+");
        println!("| Nodes: {}", self.len());
        println!("+----------------------+");
        for root in self.node_ids().filter(|id| !self.is_attached(*id)) {
            self.print_subtree(root, 0);
        }
    }

    fn print_subtree(&self, id: NodeId, depth: usize)
    where
        T: Debug,
    {
        println!("{:indent$}{} {:?}", "", id, self.data(id), indent = depth * 2);
        for child in self.children(id) {
            self.print_subtree(child, depth + 1);
        }
    }
}

impl<T: Debug, L: RawLock> Debug for Forest<T, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

pub struct Children<'a, T, L: RawLock> {
    forest: &'a Forest<T, L>,
    next: Option<NodeId>,
}

impl<T, L: RawLock> Iterator for Children<'_, T, L> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.forest.right(current);
        Some(current)
    }
}

/// Point-in-time copy of one node's links, for debugging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot<T> {
    pub id: NodeId,
    pub data: T,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestSnapshot<T> {
    pub nodes: Vec<NodeSnapshot<T>>,
}

impl<T: Serialize> ForestSnapshot<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[cfg(not(feature = "shuttle"))]
mod tests {
    use super::*;
    use crate::sync::SpinLock;

    fn make_forest(children: usize) -> (Forest<usize>, NodeId, Vec<NodeId>) {
        let mut forest = Forest::with_capacity(children + 1);
        let root = forest.add_node(usize::MAX);
        let kids: Vec<NodeId> = (0..children).map(|i| forest.add_node(i)).collect();
        for &kid in &kids {
            forest.append_child(root, kid);
        }
        (forest, root, kids)
    }

    #[test]
    fn test_append_links_chain() {
        let (forest, root, kids) = make_forest(4);

        assert_eq!(forest.first_child(root), Some(kids[0]));
        assert_eq!(forest.last_child(root), Some(kids[3]));
        assert_eq!(forest.children(root).collect::<Vec<_>>(), kids);
        for (i, &kid) in kids.iter().enumerate() {
            assert_eq!(forest.parent(kid), Some(root));
            assert_eq!(*forest.data(kid), i);
            let expected_left = i.checked_sub(1).map(|j| kids[j]);
            assert_eq!(forest.left(kid), expected_left);
            assert_eq!(forest.ref_lock(kid), expected_left);
            assert_eq!(forest.right(kid), kids.get(i + 1).copied());
        }
        assert!(!forest.is_attached(root));
        forest.check_invariants();
    }

    #[test]
    fn test_first_append_sets_both_ends() {
        let (forest, root, kids) = make_forest(1);
        assert_eq!(forest.first_child(root), Some(kids[0]));
        assert_eq!(forest.last_child(root), Some(kids[0]));
        assert_eq!(forest.left(kids[0]), None);
        assert_eq!(forest.right(kids[0]), None);
        assert_eq!(forest.ref_lock(kids[0]), None);
        forest.check_invariants();
    }

    #[test]
    fn test_empty_forest() {
        let forest: Forest<u8> = Forest::default();
        assert!(forest.is_empty());
        assert_eq!(forest.node_ids().len(), 0);
        forest.check_invariants();
    }

    #[test]
    fn test_nested_children_with_spin_lock() {
        let mut forest: Forest<&str, SpinLock> = Forest::new();
        let root = forest.add_node("root");
        let a = forest.add_node("a");
        let b = forest.add_node("b");
        let a1 = forest.add_node("a1");
        let a2 = forest.add_node("a2");
        forest.append_child(root, a);
        forest.append_child(root, b);
        forest.append_child(a, a1);
        forest.append_child(a, a2);

        assert_eq!(forest.children(root).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(forest.children(a).collect::<Vec<_>>(), vec![a1, a2]);
        assert_eq!(forest.children(b).count(), 0);
        assert_eq!(forest.parent(a2), Some(a));
        assert_eq!(*forest.data(a2), "a2");
        forest.check_invariants();
    }

    #[test]
    #[should_panic(expected = "does not match its predecessor")]
    fn test_check_invariants_detects_broken_back_link() {
        let (forest, _root, kids) = make_forest(3);
        forest.node(kids[2]).left.set(Some(kids[0]));
        forest.check_invariants();
    }

    #[test]
    #[should_panic(expected = "not the tail")]
    fn test_check_invariants_detects_stale_last_child() {
        let (forest, root, kids) = make_forest(3);
        forest.node(root).last_child.set(Some(kids[1]));
        forest.check_invariants();
    }

    #[test]
    #[should_panic(expected = "reachable twice")]
    fn test_check_invariants_detects_cycle() {
        let (forest, _root, kids) = make_forest(3);
        forest.node(kids[2]).right.set(Some(kids[0]));
        forest.check_invariants();
    }

    #[test]
    #[should_panic(expected = "not in its chain")]
    fn test_check_invariants_detects_orphan() {
        let (mut forest, root, _kids) = make_forest(2);
        let orphan = forest.add_node(99);
        forest.node(orphan).parent.set(Some(root));
        forest.check_invariants();
    }

    #[test]
    fn test_snapshot_json() {
        let (forest, root, kids) = make_forest(2);
        let snapshot = forest.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[0].first_child, Some(kids[0]));
        assert_eq!(snapshot.nodes[1].parent, Some(root));
        assert_eq!(snapshot.nodes[1].right, Some(kids[1]));

        let json = snapshot.to_json().unwrap();
        let parsed: ForestSnapshot<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"][2]["left"], serde_json::json!(1));
        assert_eq!(value["nodes"][2]["right"], serde_json::Value::Null);
    }
}
