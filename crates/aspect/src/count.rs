use crate::slot::SlotTable;
use micro_chain::{CallContext, Config, Decoration, Fault, Next, OperationId, OwnerId, Value};

pub const COUNT: &str = "count";

/// The `count` decoration: counts calls per owner and operation.
///
/// The counter is bumped before the continuation runs, so calls that fault are
/// counted too. Counters are dropped together with their owner.
#[derive(Debug, Default)]
pub struct Count {
    calls: SlotTable<u64>,
}

impl Count {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls of `operation` on `owner`; `None` if it was never called decorated
    pub fn calls(&self, owner: OwnerId, operation: &OperationId) -> Option<u64> {
        self.calls.get(owner, operation, |count| *count)
    }

    /// Drops every counter kept for `owner`
    pub fn reset(&self, owner: OwnerId) {
        self.calls.release(owner);
    }

    /// Number of live owners with counters
    pub fn owners(&self) -> usize {
        self.calls.owners()
    }
}

impl Decoration for Count {
    fn apply(&self, ctx: &CallContext<'_>, _config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        self.calls.with(ctx.owner(), ctx.operation(), |count| *count += 1);
        next.call()
    }
}
