use crate::{
    ArgumentHint, Deprecation, LockScope, RetryPolicy, Toggle, TrapPolicy, COUNT, DEPRECATE, DISABLE, HINT, MEASURE,
    MEMOIZE, RETRY, SYNCHRONIZE, TRAP,
};
use micro_chain::{BuildError, Config, Scope};

/// Typed declarations of the built-in decorations.
///
/// Each method declares its decoration, under the name [`install`](crate::install)
/// registers it with, for the next operation the scope defines.
pub trait ScopeExt: Sized {
    fn retryable(self, policy: RetryPolicy) -> Result<Self, BuildError>;

    fn memoizable(self) -> Result<Self, BuildError>;

    fn countable(self) -> Result<Self, BuildError>;

    fn synchronizable(self, scope: LockScope) -> Result<Self, BuildError>;

    fn hintable(self, hint: ArgumentHint) -> Result<Self, BuildError>;

    fn deprecatable(self, deprecation: Deprecation) -> Result<Self, BuildError>;

    fn trappable(self, policy: TrapPolicy) -> Result<Self, BuildError>;

    fn measurable(self) -> Result<Self, BuildError>;

    fn disableable(self, toggle: Toggle) -> Result<Self, BuildError>;
}

impl ScopeExt for Scope<'_> {
    fn retryable(self, policy: RetryPolicy) -> Result<Self, BuildError> {
        self.declare(RETRY, Config::new(policy))
    }

    fn memoizable(self) -> Result<Self, BuildError> {
        self.declare(MEMOIZE, Config::none())
    }

    fn countable(self) -> Result<Self, BuildError> {
        self.declare(COUNT, Config::none())
    }

    fn synchronizable(self, scope: LockScope) -> Result<Self, BuildError> {
        self.declare(SYNCHRONIZE, Config::new(scope))
    }

    fn hintable(self, hint: ArgumentHint) -> Result<Self, BuildError> {
        self.declare(HINT, Config::new(hint))
    }

    fn deprecatable(self, deprecation: Deprecation) -> Result<Self, BuildError> {
        self.declare(DEPRECATE, Config::new(deprecation))
    }

    fn trappable(self, policy: TrapPolicy) -> Result<Self, BuildError> {
        self.declare(TRAP, Config::new(policy))
    }

    fn measurable(self) -> Result<Self, BuildError> {
        self.declare(MEASURE, Config::none())
    }

    fn disableable(self, toggle: Toggle) -> Result<Self, BuildError> {
        self.declare(DISABLE, Config::new(toggle))
    }
}
