use crate::backoff::Backoff;
use crate::forest::Forest;
use crate::node::{Node, NodeId};
use crate::removal::{fix_parent, fix_self, fix_siblings};
use crate::sync::RawLock;

/// Which edge of a node a boundary covers.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Own side lock plus (optionally) the neighbour's facing lock, both held.
struct Boundary<'a, L: RawLock> {
    own: &'a L,
    facing: Option<&'a L>,
}

impl<L: RawLock> Boundary<'_, L> {
    fn release(self) {
        if let Some(facing) = self.facing {
            facing.unlock();
        }
        self.own.unlock();
    }
}

/// Block on our own side lock, then try the neighbour's facing lock; if the neighbour is
/// busy, drop ours and try again later.
///
/// The only thread that can hold our own side lock against us is the neighbour on that
/// side, and it only does so after it has secured that very edge, so blocking on our own
/// lock never waits on a thread that waits on us.
fn secure<'a, T, L: RawLock>(
    forest: &'a Forest<T, L>,
    node: &'a Node<T, L>,
    id: NodeId,
    side: Side,
) -> Boundary<'a, L> {
    let mut backoff = Backoff::new();
    loop {
        let (own, neighbour) = match side {
            Side::Left => (&node.left_lock, &node.left),
            Side::Right => (&node.right_lock, &node.right),
        };
        own.lock();
        let Some(neighbour) = neighbour.get() else {
            return Boundary { own, facing: None };
        };
        let neighbour_node = forest.node(neighbour);
        let facing = match side {
            Side::Left => &neighbour_node.right_lock,
            Side::Right => &neighbour_node.left_lock,
        };
        if facing.try_lock() {
            return Boundary {
                own,
                facing: Some(facing),
            };
        }
        own.unlock();
        debug_println!(
            "{} backing off from {:?} neighbour {} after {} rounds",
            id,
            side,
            neighbour,
            backoff.rounds()
        );
        backoff.snooze();
    }
}

/// Unlink `id` after securing both of its edges with try-and-backoff.
///
/// The parent lock is taken last and only around the end-link update; nobody waits for
/// another lock while holding a parent lock, which keeps the scheme deadlock-free.
/// Removals of non-adjacent siblings share no lock except, briefly, the parent's.
pub(crate) fn remove<T, L: RawLock>(forest: &Forest<T, L>, id: NodeId) {
    let node = forest.node(id);
    let left = secure(forest, node, id, Side::Left);
    let right = secure(forest, node, id, Side::Right);

    // with both edges held, `left == None` and `parent.first_child == id` agree, and an
    // append cannot move the tail away from under us
    let parent_lock = forest.structural_lock(node.parent.get());
    parent_lock.lock();
    fix_parent(forest, id);
    parent_lock.unlock();

    fix_siblings(forest, id);
    right.release();
    left.release();

    fix_self(forest, id);
}
