//! The contract between a chain and the decorations it is made of.
//!
//! A [`Decoration`] is a named policy applied around an operation. Each time the
//! chain is invoked, every decoration receives the [`CallContext`], its own
//! [`Config`] and a [`Next`] continuation standing for everything further in.
//! The decoration decides whether to call `next` zero times (short-circuit),
//! once (pass-through) or several times (retry); each call re-executes all of
//! the inner links and the operation itself.
//!
//! # Example
//!
//! ```
//! use micro_chain::{decoration_fn, operation_fn, Chain, Config, OperationId, Owner, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! registry
//!     .register("double", Arc::new(decoration_fn(|_ctx, _config, next| {
//!         let value = next.call()?;
//!         Ok(Value::from(value.as_int().unwrap_or_default() * 2))
//!     })))
//!     .unwrap();
//!
//! let chain = Chain::builder(&registry)
//!     .decorate("double", Config::none())
//!     .unwrap()
//!     .build(OperationId::new("Math", "answer"), operation_fn(|_ctx| Ok(Value::from(21))));
//!
//! assert_eq!(chain.invoke(&Owner::empty(), &[], None).unwrap(), Value::from(42));
//! ```

use crate::chain::{run, Link};
use crate::{CallContext, Config, ConfigError, Fault, Operation, Value};

/// A named, reusable behavior applied around an operation.
///
/// Implementations must not retain the context beyond the call and must treat
/// the configuration as data only they interpret.
pub trait Decoration: Send + Sync + 'static {
    /// Checks a configuration payload once, when the decoration is attached.
    fn validate(&self, _config: &Config) -> Result<(), ConfigError> {
        Ok(())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault>;
}

/// The forwarding continuation handed to a decoration.
#[derive(Copy, Clone)]
pub struct Next<'a> {
    links: &'a [Link],
    operation: &'a dyn Operation,
    ctx: &'a CallContext<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(links: &'a [Link], operation: &'a dyn Operation, ctx: &'a CallContext<'a>) -> Self {
        Self { links, operation, ctx }
    }

    /// Runs the rest of the chain with the current context
    pub fn call(&self) -> Result<Value, Fault> {
        run(self.links, self.operation, self.ctx)
    }

    /// Runs the rest of the chain with a derived context
    pub fn call_with(&self, ctx: &CallContext<'_>) -> Result<Value, Fault> {
        run(self.links, self.operation, ctx)
    }

    /// Number of decorations still between this point and the operation
    pub fn remaining(&self) -> usize {
        self.links.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("links", &self.links).finish_non_exhaustive()
    }
}

/// a [`Decoration`] backed by a closure
#[derive(Copy, Clone)]
pub struct FnDecoration<F> {
    f: F,
}

pub fn decoration_fn<F>(f: F) -> FnDecoration<F>
where
    F: Fn(&CallContext<'_>, &Config, Next<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
{
    FnDecoration { f }
}

impl<F> Decoration for FnDecoration<F>
where
    F: Fn(&CallContext<'_>, &Config, Next<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
{
    #[inline]
    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        (self.f)(ctx, config, next)
    }
}

impl<F> std::fmt::Debug for FnDecoration<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnDecoration")
    }
}
