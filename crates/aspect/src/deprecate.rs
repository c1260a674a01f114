use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, Next, Value};
use once_cell::sync::Lazy;
use tracing::warn;

pub const DEPRECATE: &str = "deprecate";

static DEFAULT_DEPRECATION: Lazy<Deprecation> = Lazy::new(Deprecation::default);

/// Configuration of the `deprecate` decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deprecation {
    replacement: Option<String>,
}

impl Deprecation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the operation callers should move to
    #[must_use]
    pub fn use_instead(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }
}

/// The `deprecate` decoration: warns with the caller's location, then runs the operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deprecate;

impl Decoration for Deprecate {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        config.get_or::<Deprecation>(&DEFAULT_DEPRECATION).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let deprecation = config
            .get_or::<Deprecation>(&DEFAULT_DEPRECATION)
            .map_err(|source| Fault::invalid_config(DEPRECATE, source))?;
        let operation = ctx.operation();
        let origin = ctx.origin();

        match &deprecation.replacement {
            Some(replacement) => warn!(
                operation = %operation,
                "{} is deprecated, use {} instead. Called from: {}:{}",
                operation.name(),
                replacement,
                origin.file(),
                origin.line()
            ),
            None => warn!(
                operation = %operation,
                "{} is deprecated. Called from: {}:{}",
                operation.name(),
                origin.file(),
                origin.line()
            ),
        }
        next.call()
    }
}
