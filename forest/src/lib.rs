//! A forest whose children form doubly linked sibling chains, with several locking
//! disciplines for removing an interior node while other threads remove its neighbours.
//!
//! Nodes live in a [`Forest`] arena and are addressed by [`NodeId`] handles, so a removed
//! node's stale links can never dangle. Build the forest single-threaded with
//! [`Forest::add_node`], attach children with [`Forest::append_child`], then share the
//! forest across threads and call [`Forest::remove`] with a [`RemovalStrategy`].
//!
//! Only [`RemovalStrategy::SiblingLocksBackoff`] and [`RemovalStrategy::ChainedLocks`] let
//! removals of non-adjacent siblings run without blocking each other, and only those two are
//! deadlock-free in every workload. [`RemovalStrategy::NoLocks`] is a single-threaded
//! baseline. Mixing strategies on one forest is not supported.

#[macro_use]
mod debug;

mod backoff;
mod forest;
mod node;
mod partition;
mod removal;
mod sync;

pub use forest::{Children, Forest, ForestSnapshot, NodeSnapshot};
pub use node::NodeId;
pub use partition::PartitionError;
pub use removal::{ParseStrategyError, RemovalStrategy};
pub use sync::{NodeLock, RawLock, SpinLock, UsyncLock};
