//! Re-running an operation after matching faults.
//!
//! The policy's `tries` counts retries, not calls: with `tries = 3` the
//! continuation runs at most four times. Before retry number `n` (zero-based)
//! the decoration sleeps for `backoff.delay(n)`, so a policy that gives up
//! after three retries has slept for `delay(0)`, `delay(1)` and `delay(2)`.

use micro_chain::{CallContext, Config, ConfigError, Decoration, Fault, FaultKind, Next, Value};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const RETRY: &str = "retry";

static DEFAULT_POLICY: Lazy<RetryPolicy> = Lazy::new(RetryPolicy::default);

/// Blocks the current thread between attempts.
#[cfg_attr(test, mockall::automock)]
pub trait Sleep: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleep`] backed by [`std::thread::sleep`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

type BackoffFn = dyn Fn(u32) -> Duration + Send + Sync;

/// Delay before a retry, as a function of the zero-based retry index.
#[derive(Clone, Default)]
pub enum Backoff {
    /// retry immediately
    #[default]
    None,
    /// `n + 1` seconds
    Linear,
    /// `2^n` seconds
    Exponential,
    Fixed(Duration),
    Custom(Arc<BackoffFn>),
}

impl Backoff {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(Arc::new(f))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear => Duration::from_secs(u64::from(attempt) + 1),
            Backoff::Exponential => Duration::from_secs(1u64.checked_shl(attempt).unwrap_or(u64::MAX)),
            Backoff::Fixed(delay) => *delay,
            Backoff::Custom(f) => f(attempt),
        }
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::None => f.write_str("None"),
            Backoff::Linear => f.write_str("Linear"),
            Backoff::Exponential => f.write_str("Exponential"),
            Backoff::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Backoff::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Configuration of the `retry` decoration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    tries: u32,
    on: Vec<FaultKind>,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Retries up to `tries` times on runtime faults, without delay
    pub fn new(tries: u32) -> Self {
        Self { tries, on: vec![FaultKind::RUNTIME], backoff: Backoff::None }
    }

    /// Replaces the fault kinds that trigger a retry
    #[must_use]
    pub fn on<I: IntoIterator<Item = FaultKind>>(mut self, kinds: I) -> Self {
        self.on = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn retries_on(&self, fault: &Fault) -> bool {
        self.on.iter().any(|kind| fault.is_kind(kind))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// The `retry` decoration, configured by a [`RetryPolicy`].
pub struct Retry {
    sleeper: Arc<dyn Sleep>,
}

impl Retry {
    pub fn new() -> Self {
        Self::with_sleeper(ThreadSleep)
    }

    pub fn with_sleeper<S: Sleep + 'static>(sleeper: S) -> Self {
        Self { sleeper: Arc::new(sleeper) }
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry").finish_non_exhaustive()
    }
}

impl Decoration for Retry {
    fn validate(&self, config: &Config) -> Result<(), ConfigError> {
        config.get_or::<RetryPolicy>(&DEFAULT_POLICY).map(|_| ())
    }

    fn apply(&self, ctx: &CallContext<'_>, config: &Config, next: Next<'_>) -> Result<Value, Fault> {
        let policy =
            config.get_or::<RetryPolicy>(&DEFAULT_POLICY).map_err(|source| Fault::invalid_config(RETRY, source))?;

        let mut attempt = 0;
        loop {
            match next.call() {
                Ok(value) => return Ok(value),
                Err(fault) if attempt < policy.tries && policy.retries_on(&fault) => {
                    let delay = policy.backoff.delay(attempt);
                    debug!(operation = %ctx.operation(), attempt, ?delay, cause = %fault, "retrying after fault");
                    self.sleeper.sleep(delay);
                    attempt += 1;
                    ctx.record_attempt();
                }
                Err(fault) => return Err(fault),
            }
        }
    }
}
