use crate::slot::SlotTable;
use micro_chain::{CallContext, Config, Decoration, Fault, Next, OperationId, OwnerId, Value};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::trace;

pub const MEMOIZE: &str = "memoize";

/// The `memoize` decoration: caches an operation's result per owner.
///
/// The first successful call on an owner runs the continuation and stores its
/// value; every later call on that owner returns the stored value without
/// running anything downstream. Faults are not cached. Concurrent first calls
/// on the same owner wait for a single computation; other owners are not
/// blocked. Cached values are dropped together with their owner.
///
/// An operation memoized on an owner must not call itself on that same owner.
#[derive(Debug, Default)]
pub struct Memoize {
    cache: SlotTable<Arc<OnceCell<Value>>>,
}

impl Memoize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value of `operation` on `owner`, if computed
    pub fn cached(&self, owner: OwnerId, operation: &OperationId) -> Option<Value> {
        self.cache.get(owner, operation, |slot| slot.get().cloned()).flatten()
    }

    /// Drops every value cached for `owner`
    pub fn forget(&self, owner: OwnerId) {
        self.cache.release(owner);
    }

    /// Number of live owners with cached state
    pub fn owners(&self) -> usize {
        self.cache.owners()
    }
}

impl Decoration for Memoize {
    fn apply(&self, ctx: &CallContext<'_>, _config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        // clone the cell out so the shard lock is released before computing
        let slot = self.cache.with(ctx.owner(), ctx.operation(), |slot| Arc::clone(slot));
        if let Some(value) = slot.get() {
            trace!(operation = %ctx.operation(), owner = %ctx.owner().id(), "memoized value hit");
            return Ok(value.clone());
        }
        slot.get_or_try_init(|| next.call()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{Memoize, MEMOIZE};
    use micro_chain::{operation_fn, Config, Definition, Fault, Owner, Registry, Scope, Value};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn counter_definition(memoize: &Arc<Memoize>) -> Definition {
        let registry = Registry::new();
        registry.register(MEMOIZE, Arc::clone(memoize)).unwrap();

        Scope::with_registry("Counter", &registry)
            .declare(MEMOIZE, Config::none())
            .unwrap()
            .define(
                "call",
                operation_fn(|ctx| {
                    let count = ctx.owner().state::<AtomicI64>().ok_or_else(|| Fault::runtime("no counter"))?;
                    Ok(Value::from(count.fetch_add(1, Ordering::SeqCst) + 1))
                }),
            )
            .declare(MEMOIZE, Config::none())
            .unwrap()
            .define("scream!", operation_fn(|_| Ok(Value::from("BOO!"))))
            .define(
                "uncached",
                operation_fn(|ctx| {
                    let count = ctx.owner().state::<AtomicI64>().ok_or_else(|| Fault::runtime("no counter"))?;
                    Ok(Value::from(count.fetch_add(1, Ordering::SeqCst) + 1))
                }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_side_effect_runs_once_per_owner() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let owner = Owner::new(AtomicI64::new(0));

        for _ in 0..3 {
            assert_eq!(definition.invoke(&owner, "call", &[], None).unwrap(), Value::from(1));
        }
        assert_eq!(owner.state::<AtomicI64>().unwrap().load(Ordering::SeqCst), 1);

        let operation = definition.operation("call").unwrap().operation_id();
        assert_eq!(memoize.cached(owner.id(), operation), Some(Value::from(1)));
    }

    #[test]
    fn test_owners_have_separate_caches() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let first = Owner::new(AtomicI64::new(0));
        let second = Owner::new(AtomicI64::new(10));

        assert_eq!(definition.invoke(&first, "call", &[], None).unwrap(), Value::from(1));
        assert_eq!(definition.invoke(&second, "call", &[], None).unwrap(), Value::from(11));
        assert_eq!(definition.invoke(&first, "call", &[], None).unwrap(), Value::from(1));
    }

    #[test]
    fn test_operations_are_cached_separately() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let owner = Owner::new(AtomicI64::new(0));

        for _ in 0..3 {
            assert_eq!(definition.invoke(&owner, "scream!", &[], None).unwrap(), Value::from("BOO!"));
        }
        assert_eq!(definition.invoke(&owner, "call", &[], None).unwrap(), Value::from(1));
        assert_eq!(definition.invoke(&owner, "uncached", &[], None).unwrap(), Value::from(2));
        assert_eq!(definition.invoke(&owner, "uncached", &[], None).unwrap(), Value::from(3));
    }

    #[test]
    fn test_faults_are_not_cached() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let stateless = Owner::empty();

        assert!(definition.invoke(&stateless, "call", &[], None).is_err());
        assert!(definition.invoke(&stateless, "call", &[], None).is_err());

        let operation = definition.operation("call").unwrap().operation_id();
        assert_eq!(memoize.cached(stateless.id(), operation), None);
    }

    #[test]
    fn test_forget_clears_owner() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let owner = Owner::new(AtomicI64::new(0));

        definition.invoke(&owner, "call", &[], None).unwrap();
        memoize.forget(owner.id());

        assert_eq!(definition.invoke(&owner, "call", &[], None).unwrap(), Value::from(2));
    }

    #[test]
    fn test_concurrent_first_calls_compute_once() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let owner = Owner::new(AtomicI64::new(0));

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(definition.invoke(&owner, "call", &[], None).unwrap(), Value::from(1));
                });
            }
        });

        assert_eq!(owner.state::<AtomicI64>().unwrap().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_owners_release_cached_values() {
        let memoize = Arc::new(Memoize::new());
        let definition = counter_definition(&memoize);
        let kept = Owner::new(AtomicI64::new(0));
        definition.invoke(&kept, "call", &[], None).unwrap();

        for _ in 0..100 {
            let owner = Owner::new(AtomicI64::new(0));
            definition.invoke(&owner, "call", &[], None).unwrap();
            definition.invoke(&owner, "scream!", &[], None).unwrap();
        }

        assert_eq!(memoize.owners(), 1);
        let operation = definition.operation("call").unwrap().operation_id();
        assert_eq!(memoize.cached(kept.id(), operation), Some(Value::from(1)));
    }
}
