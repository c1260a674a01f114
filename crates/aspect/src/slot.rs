use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use micro_chain::{OperationId, Owner, OwnerId, OwnerRelease};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

type Slots<V> = HashMap<OperationId, V>;

/// Per-owner, per-operation decoration state that lives as long as its owner.
///
/// The first slot created for an owner registers the table with that owner, so
/// dropping the owner evicts all of its slots.
#[derive(Debug)]
pub(crate) struct SlotTable<V> {
    owners: Arc<OwnerSlots<V>>,
}

#[derive(Debug)]
struct OwnerSlots<V>(DashMap<OwnerId, Slots<V>>);

impl<V: Send + Sync + 'static> OwnerRelease for OwnerSlots<V> {
    fn release(&self, owner: OwnerId) {
        self.0.remove(&owner);
    }
}

impl<V: Default + Send + Sync + 'static> SlotTable<V> {
    pub(crate) fn new() -> Self {
        Self { owners: Arc::new(OwnerSlots(DashMap::new())) }
    }

    /// Runs `f` on the slot of `operation` on `owner`, creating it first if needed.
    ///
    /// The owner's shard stays locked while `f` runs.
    pub(crate) fn with<R>(&self, owner: &Owner, operation: &OperationId, f: impl FnOnce(&mut V) -> R) -> R {
        let mut slots = match self.owners.0.entry(owner.id()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                let release: Weak<dyn OwnerRelease> = Arc::downgrade(&self.owners) as Weak<OwnerSlots<V>>;
                owner.on_release(release);
                entry.insert(Slots::new())
            }
        };
        f(slots.entry(operation.clone()).or_default())
    }

    pub(crate) fn get<R>(&self, owner: OwnerId, operation: &OperationId, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.owners.0.get(&owner).and_then(|slots| slots.get(operation).map(f))
    }

    pub(crate) fn release(&self, owner: OwnerId) {
        self.owners.release(owner);
    }

    /// Number of owners holding at least one slot
    pub(crate) fn owners(&self) -> usize {
        self.owners.0.len()
    }

    /// Number of slots across all owners
    pub(crate) fn slots(&self) -> usize {
        self.owners.0.iter().map(|slots| slots.len()).sum()
    }
}

impl<V: Default + Send + Sync + 'static> Default for SlotTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
