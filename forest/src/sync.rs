pub use std::sync::atomic::Ordering;

/// Very similar to `lock_api::RawMutex`, but without the const constructor constraint
pub trait RawLock: Send + Sync {
    fn new() -> Self;
    fn lock(&self);
    fn try_lock(&self) -> bool;
    fn unlock(&self);
    fn is_locked(&self) -> bool;
}

// Links always use the std atomics, even under shuttle; the interesting
// interleavings come from the locks, and the locks are shuttle-aware
pub type AtomicU32 = std::sync::atomic::AtomicU32;

// NodeLock has two implementations: a spin lock for miri, shuttle and the
// `spin_lock` feature, and a parking lock for everything else
#[cfg(all(not(miri), not(feature = "shuttle"), not(feature = "spin_lock")))]
pub type NodeLock = UsyncLock;
#[cfg(any(miri, feature = "shuttle", feature = "spin_lock"))]
pub type NodeLock = SpinLock;

use lock_api::RawRwLock as _;

/// A parking lock. Only the exclusive side of `usync`'s reader-writer lock is used.
pub struct UsyncLock {
    inner: usync::RawRwLock,
}

impl RawLock for UsyncLock {
    fn new() -> Self {
        Self {
            inner: usync::RawRwLock::INIT,
        }
    }
    fn lock(&self) {
        self.inner.lock_exclusive();
    }
    fn try_lock(&self) -> bool {
        self.inner.try_lock_exclusive()
    }
    fn unlock(&self) {
        debug_assert!(self.inner.is_locked_exclusive());
        unsafe { self.inner.unlock_exclusive() };
    }
    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

#[cfg(feature = "shuttle")]
type SpinFlag = shuttle::sync::atomic::AtomicBool;
#[cfg(not(feature = "shuttle"))]
type SpinFlag = std::sync::atomic::AtomicBool;

/// Busy-waits on a single flag. Acquire on lock, release on unlock.
pub struct SpinLock {
    locked: SpinFlag,
}

impl RawLock for SpinLock {
    fn new() -> Self {
        Self {
            locked: SpinFlag::new(false),
        }
    }

    fn lock(&self) {
        loop {
            if self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            // spin on a plain load so waiters don't bounce the cache line
            while self.locked.load(Ordering::Relaxed) {
                spin_hint();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn unlock(&self) {
        let was_locked = self.locked.swap(false, Ordering::Release);
        assert!(was_locked, "unlock called on an unlocked SpinLock");
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

pub(crate) fn spin_hint() {
    std::hint::spin_loop();
    #[cfg(feature = "shuttle")]
    shuttle::hint::spin_loop();
}

pub(crate) fn yield_now() {
    #[cfg(feature = "shuttle")]
    shuttle::thread::yield_now();
    #[cfg(not(feature = "shuttle"))]
    std::thread::yield_now();
}
