use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, FaultKind, Next, Value};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use tracing::error;

pub const TRAP: &str = "trap";

static DEFAULT_POLICY: Lazy<TrapPolicy> = Lazy::new(TrapPolicy::default);

type TrapHook = dyn Fn(&CallContext<'_>, &Fault) + Send + Sync;

/// Configuration of the `trap` decoration.
#[derive(Clone)]
pub struct TrapPolicy {
    on: Vec<FaultKind>,
    hook: Option<Arc<TrapHook>>,
}

impl TrapPolicy {
    /// Traps runtime faults
    pub fn new() -> Self {
        Self { on: vec![FaultKind::RUNTIME], hook: None }
    }

    /// Replaces the fault kinds that are trapped
    #[must_use]
    pub fn on<I: IntoIterator<Item = FaultKind>>(mut self, kinds: I) -> Self {
        self.on = kinds.into_iter().collect();
        self
    }

    /// Runs `hook` for every trapped fault, after it has been logged
    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CallContext<'_>, &Fault) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn traps(&self, fault: &Fault) -> bool {
        self.on.iter().any(|kind| fault.is_kind(kind))
    }
}

impl Default for TrapPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapPolicy").field("on", &self.on).field("hook", &self.hook.is_some()).finish()
    }
}

/// The `trap` decoration: turns matching faults into `Nil`.
///
/// Faults of other kinds pass through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Trap;

impl Decoration for Trap {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        config.get_or::<TrapPolicy>(&DEFAULT_POLICY).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let policy =
            config.get_or::<TrapPolicy>(&DEFAULT_POLICY).map_err(|source| Fault::invalid_config(TRAP, source))?;
        match next.call() {
            Err(fault) if policy.traps(&fault) => {
                error!(operation = %ctx.operation(), kind = %fault.kind(), "trapped fault: {fault}");
                if let Some(hook) = &policy.hook {
                    hook(ctx, &fault);
                }
                Ok(Value::Nil)
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Trap, TrapPolicy, TRAP};
    use crate::test_util::CapturedLogs;
    use micro_chain::{operation_fn, Config, Definition, Fault, FaultKind, Owner, Registry, Scope, Shape, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn definition(policy: TrapPolicy) -> Definition {
        let registry = Registry::new();
        registry.register(TRAP, Arc::new(Trap)).unwrap();

        Scope::with_registry("Worker", &registry)
            .declare(TRAP, Config::new(policy))
            .unwrap()
            .define("explode", operation_fn(|_| Err(Fault::runtime("kaboom"))))
            .declare(TRAP, Config::none())
            .unwrap()
            .define("bad_args", operation_fn(|_| Err(Fault::argument_shape("x", Shape::Int, Shape::Str))))
            .declare(TRAP, Config::none())
            .unwrap()
            .define("work", operation_fn(|_| Ok(Value::from(7))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_trapped_fault_becomes_nil_and_runs_hook() {
        let hooked = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let policy = {
            let (hooked, seen) = (Arc::clone(&hooked), Arc::clone(&seen));
            TrapPolicy::new().hook(move |ctx, fault| {
                hooked.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(format!("{}: {}", ctx.operation(), fault));
            })
        };
        let definition = definition(policy);
        let logs = CapturedLogs::default();

        let result = logs.capture(|| definition.invoke(&Owner::empty(), "explode", &[], None));

        assert_eq!(result, Ok(Value::Nil));
        assert_eq!(hooked.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["Worker#explode: runtime: kaboom".to_string()]);
        assert!(logs.contents().contains("ERROR"));
        assert!(logs.contents().contains("kaboom"));
    }

    #[test]
    fn test_unlisted_kinds_propagate() {
        let definition = definition(TrapPolicy::new());

        let fault = definition.invoke(&Owner::empty(), "bad_args", &[], None).unwrap_err();

        assert!(fault.is_kind(&FaultKind::ARGUMENT_SHAPE));
    }

    #[test]
    fn test_listed_kinds_replace_default() {
        let definition = definition(TrapPolicy::new().on([FaultKind::TIMEOUT]));

        assert_eq!(definition.invoke(&Owner::empty(), "explode", &[], None), Err(Fault::runtime("kaboom")));
    }

    #[test]
    fn test_success_passes_through() {
        let definition = definition(TrapPolicy::new());

        assert_eq!(definition.invoke(&Owner::empty(), "work", &[], None), Ok(Value::from(7)));
    }
}
