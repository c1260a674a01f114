//! Built-in decorations for `micro-chain`.
//!
//! [`install`] registers every built-in under its conventional name; the
//! [`ScopeExt`] methods then declare them on a [`Scope`](micro_chain::Scope)
//! with typed configuration:
//!
//! ```
//! use micro_aspect::{install, RetryPolicy, ScopeExt};
//! use micro_chain::{operation_fn, Owner, Registry, Scope, Value};
//!
//! let registry = Registry::new();
//! let builtins = install(&registry).unwrap();
//!
//! let client = Scope::with_registry("Client", &registry)
//!     .retryable(RetryPolicy::new(3)).unwrap()
//!     .countable().unwrap()
//!     .define("get", operation_fn(|_| Ok(Value::from("ok"))))
//!     .build()
//!     .unwrap();
//!
//! let owner = Owner::empty();
//! assert_eq!(client.invoke(&owner, "get", &[], None), Ok(Value::from("ok")));
//! assert_eq!(builtins.count().calls(owner.id(), client.operation("get").unwrap().operation_id()), Some(1));
//! ```

mod count;
mod deprecate;
mod disable;
mod hint;
mod measure;
mod memoize;
mod retry;
mod scope_ext;
mod slot;
mod synchronize;
mod trap;

#[cfg(test)]
mod test_util;

pub use count::{Count, COUNT};
pub use deprecate::{Deprecate, Deprecation, DEPRECATE};
pub use disable::{Disable, Toggle, DISABLE};
pub use hint::{ArgumentHint, Hint, BLOCK_PARAM, HINT};
pub use measure::{Measure, MEASURE};
pub use memoize::{Memoize, MEMOIZE};
pub use retry::{Backoff, Retry, RetryPolicy, Sleep, ThreadSleep, RETRY};
pub use scope_ext::ScopeExt;
pub use synchronize::{LockScope, Synchronize, SYNCHRONIZE};
pub use trap::{Trap, TrapPolicy, TRAP};

use micro_chain::{Registry, RegistryError};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

static GLOBAL_BUILTINS: OnceCell<Builtins> = OnceCell::new();

/// Handles to the stateful built-ins registered by [`install`].
#[derive(Debug, Clone)]
pub struct Builtins {
    memoize: Arc<Memoize>,
    count: Arc<Count>,
    synchronize: Arc<Synchronize>,
}

impl Builtins {
    pub fn memoize(&self) -> &Memoize {
        &self.memoize
    }

    pub fn count(&self) -> &Count {
        &self.count
    }

    pub fn synchronize(&self) -> &Synchronize {
        &self.synchronize
    }
}

/// Registers every built-in decoration in `registry`.
///
/// Fails if any of the names is already taken, leaving the built-ins
/// registered before it in place.
pub fn install(registry: &Registry) -> Result<Builtins, RegistryError> {
    let builtins = Builtins {
        memoize: Arc::new(Memoize::new()),
        count: Arc::new(Count::new()),
        synchronize: Arc::new(Synchronize::new()),
    };

    registry.register(RETRY, Arc::new(Retry::new()))?;
    registry.register(MEMOIZE, Arc::clone(&builtins.memoize))?;
    registry.register(COUNT, Arc::clone(&builtins.count))?;
    registry.register(SYNCHRONIZE, Arc::clone(&builtins.synchronize))?;
    registry.register(HINT, Arc::new(Hint))?;
    registry.register(DEPRECATE, Arc::new(Deprecate))?;
    registry.register(TRAP, Arc::new(Trap))?;
    registry.register(MEASURE, Arc::new(Measure))?;
    registry.register(DISABLE, Arc::new(Disable))?;

    info!(decorations = registry.len(), "installed built-in decorations");
    Ok(builtins)
}

/// Installs the built-ins into [`Registry::global`] once per process.
///
/// Later calls return the handles of the first successful installation.
pub fn install_global() -> Result<&'static Builtins, RegistryError> {
    GLOBAL_BUILTINS.get_or_try_init(|| install(Registry::global()))
}
