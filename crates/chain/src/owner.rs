use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, Weak};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Owner`].
///
/// Decorations that keep per-instance state (memoize caches, call counters)
/// use this as their map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    fn next() -> Self {
        Self(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner-{}", self.0)
    }
}

/// State kept outside an [`Owner`] but keyed by its id.
///
/// Registered through [`Owner::on_release`], it is told to drop everything it
/// holds for the owner once the owner itself is dropped.
pub trait OwnerRelease: Send + Sync {
    fn release(&self, owner: OwnerId);
}

/// The receiver a decorated operation is invoked on.
///
/// An owner pairs a fresh [`OwnerId`] with whatever state the operation bodies
/// need; the bodies reach it through [`Owner::state`].
pub struct Owner {
    id: OwnerId,
    state: Box<dyn Any + Send + Sync>,
    releases: Mutex<Vec<Weak<dyn OwnerRelease>>>,
}

impl Owner {
    pub fn new<T: Any + Send + Sync>(state: T) -> Self {
        Self { id: OwnerId::next(), state: Box::new(state), releases: Mutex::new(Vec::new()) }
    }

    /// Creates an owner which carries no state
    pub fn empty() -> Self {
        Self::new(())
    }

    #[inline]
    pub fn id(&self) -> OwnerId {
        self.id
    }

    /// Returns the owner's state if it is a `T`
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    /// Asks `release` to forget this owner when it is dropped.
    ///
    /// Registering the same holder twice has no further effect; a holder that
    /// is already gone by then is skipped.
    pub fn on_release(&self, release: Weak<dyn OwnerRelease>) {
        let mut releases = self.releases.lock().unwrap_or_else(PoisonError::into_inner);
        if !releases.iter().any(|registered| Weak::ptr_eq(registered, &release)) {
            releases.push(release);
        }
    }
}

impl Drop for Owner {
    fn drop(&mut self) {
        let releases = self.releases.get_mut().unwrap_or_else(PoisonError::into_inner);
        for release in releases.drain(..).filter_map(|release| release.upgrade()) {
            release.release(self.id);
        }
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner").field("id", &self.id).finish_non_exhaustive()
    }
}
