use crate::{CallContext, Fault, Value};
use std::sync::Arc;

/// The original unit of behavior at the innermost end of a chain.
///
/// The context hands the body its arguments, its block and the owner it was
/// invoked on.
pub trait Operation: Send + Sync + 'static {
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, Fault>;
}

impl<T: Operation + ?Sized> Operation for Arc<T> {
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, Fault> {
        (**self).call(ctx)
    }
}

impl<T: Operation + ?Sized> Operation for Box<T> {
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, Fault> {
        (**self).call(ctx)
    }
}

/// an [`Operation`] backed by a closure
#[derive(Copy, Clone)]
pub struct FnOperation<F> {
    f: F,
}

pub fn operation_fn<F>(f: F) -> FnOperation<F>
where
    F: Fn(&CallContext<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
{
    FnOperation { f }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&CallContext<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
{
    #[inline]
    fn call(&self, ctx: &CallContext<'_>) -> Result<Value, Fault> {
        (self.f)(ctx)
    }
}

impl<F> std::fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnOperation")
    }
}
