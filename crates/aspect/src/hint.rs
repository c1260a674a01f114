use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, Next, Shape, Value};
use once_cell::sync::Lazy;
use tracing::debug;

pub const HINT: &str = "hint";

/// Parameter name reported when a required block is missing
pub const BLOCK_PARAM: &str = "&block";

static DEFAULT_HINT: Lazy<ArgumentHint> = Lazy::new(ArgumentHint::default);

/// Expected argument shapes, positionally, and whether a block is required.
///
/// Arguments beyond the listed shapes are not checked; a listed shape with no
/// matching argument is checked against `Nil`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentHint {
    shapes: Vec<Shape>,
    require_block: bool,
}

impl ArgumentHint {
    pub fn new<I: IntoIterator<Item = Shape>>(shapes: I) -> Self {
        Self { shapes: shapes.into_iter().collect(), require_block: false }
    }

    #[must_use]
    pub fn require_block(mut self) -> Self {
        self.require_block = true;
        self
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Checks the context's arguments and block against this hint
    pub fn check(&self, ctx: &CallContext<'_>) -> Result<(), Fault> {
        let nil = Value::Nil;
        for (index, expected) in self.shapes.iter().enumerate() {
            let argument = ctx.argument(index).unwrap_or(&nil);
            if !expected.accepts(argument) {
                return Err(Fault::argument_shape(ctx.parameter_name(index), *expected, argument.shape()));
            }
        }

        if self.require_block && ctx.block().is_none() {
            return Err(Fault::argument_shape(BLOCK_PARAM, Shape::Block, Shape::Nil));
        }
        Ok(())
    }
}

/// The `hint` decoration: validates arguments before the operation runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hint;

impl Decoration for Hint {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        config.get_or::<ArgumentHint>(&DEFAULT_HINT).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let hint = config.get_or::<ArgumentHint>(&DEFAULT_HINT).map_err(|source| Fault::invalid_config(HINT, source))?;
        if let Err(fault) = hint.check(ctx) {
            debug!(operation = %ctx.operation(), cause = %fault, "rejected arguments");
            return Err(fault);
        }
        next.call()
    }
}
