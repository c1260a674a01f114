use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, Next, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const DISABLE: &str = "disable";

/// A shared switch deciding whether a `disable`-decorated operation runs.
///
/// Clones share the same switch. A new toggle starts enabled.
#[derive(Debug, Clone, Default)]
pub struct Toggle(Arc<AtomicBool>);

impl Toggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn disable(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_disabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The `disable` decoration: skips the operation and returns `Nil`.
///
/// Without a [`Toggle`] the operation is always skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disable;

impl Disable {
    fn is_disabled(config: &Config) -> Result<bool, ConfigError> {
        if config.is_none() {
            return Ok(true);
        }
        config.require::<Toggle>().map(Toggle::is_disabled)
    }
}

impl Decoration for Disable {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        Self::is_disabled(config).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        if Self::is_disabled(config).map_err(|source| Fault::invalid_config(DISABLE, source))? {
            debug!(operation = %ctx.operation(), "skipped disabled operation");
            return Ok(Value::Nil);
        }
        next.call()
    }
}
