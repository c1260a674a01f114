use micro_chain::{CallContext, Config, Decoration, Fault, Next, Value};
use std::time::Instant;
use tracing::info;

pub const MEASURE: &str = "measure";

/// The `measure` decoration: logs how long the continuation took.
///
/// The elapsed time is logged whether the call succeeds or faults.
#[derive(Debug, Default, Clone, Copy)]
pub struct Measure;

impl Decoration for Measure {
    fn apply(&self, ctx: &CallContext<'_>, _config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let start = Instant::now();
        let result = next.call();
        info!(operation = %ctx.operation(), elapsed = ?start.elapsed(), ok = result.is_ok(), "measured call");
        result
    }
}
