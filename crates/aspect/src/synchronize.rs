use crate::slot::SlotTable;
use dashmap::DashMap;
use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, Next, OperationId, Value};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

pub const SYNCHRONIZE: &str = "synchronize";

static DEFAULT_SCOPE: LockScope = LockScope::Operation;

/// Which calls share a lock under the `synchronize` decoration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LockScope {
    /// one lock per operation, shared by every owner
    #[default]
    Operation,
    /// one lock per owner and operation
    Owner,
    /// one lock per name, shared by every operation declaring it
    Named(Arc<str>),
}

impl LockScope {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        LockScope::Named(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Operation(OperationId),
    Named(Arc<str>),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Operation(operation) => write!(f, "{operation}"),
            LockKey::Named(name) => f.write_str(name),
        }
    }
}

/// The `synchronize` decoration: runs the continuation under a mutex.
///
/// The lock is released on every exit path, faults included. A lock left
/// poisoned by a panicking holder is recovered, since it guards no data. A
/// synchronized operation must not re-enter itself under the same lock.
/// Owner-scoped locks are dropped together with their owner.
#[derive(Debug, Default)]
pub struct Synchronize {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
    owner_locks: SlotTable<Arc<Mutex<()>>>,
}

impl Synchronize {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct live locks
    pub fn lock_count(&self) -> usize {
        self.locks.len() + self.owner_locks.slots()
    }

    fn lock(&self, scope: &LockScope, ctx: &CallContext<'_>) -> (String, Arc<Mutex<()>>) {
        let key = match scope {
            LockScope::Operation => LockKey::Operation(ctx.operation().clone()),
            LockScope::Named(name) => LockKey::Named(Arc::clone(name)),
            LockScope::Owner => {
                let lock = self.owner_locks.with(ctx.owner(), ctx.operation(), |lock| Arc::clone(lock));
                return (format!("{}@{}", ctx.operation(), ctx.owner().id()), lock);
            }
        };
        let lock = Arc::clone(&self.locks.entry(key.clone()).or_default());
        (key.to_string(), lock)
    }
}

impl Decoration for Synchronize {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        config.get_or(&DEFAULT_SCOPE).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let scope = config.get_or(&DEFAULT_SCOPE).map_err(|source| Fault::invalid_config(SYNCHRONIZE, source))?;
        let (key, lock) = self.lock(scope, ctx);

        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(lock = %key, "recovered lock poisoned by a panicking holder");
                lock.clear_poison();
                poisoned.into_inner()
            }
        };
        trace!(lock = %key, "acquired lock");
        next.call()
    }
}
