use crate::ConfigError;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

const NO_CONFIG: &str = "none";

/// The configuration payload of one decoration invocation.
///
/// The chain builder never looks inside; only the decoration the payload was
/// declared for interprets it.
#[derive(Clone)]
pub struct Config {
    payload: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Config {
    /// A decoration invocation without any configuration
    pub fn none() -> Self {
        Self { payload: None, type_name: NO_CONFIG }
    }

    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { payload: Some(Arc::new(value)), type_name: type_name::<T>() }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.payload.is_none()
    }

    /// Name of the payload's type, `"none"` when empty
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|payload| payload.downcast_ref::<T>())
    }

    /// Returns the payload, failing if it is absent or not a `T`
    pub fn require<T: Any>(&self) -> Result<&T, ConfigError> {
        self.get::<T>().ok_or_else(|| self.mismatch::<T>())
    }

    /// Returns the payload, or `default` when no payload was given.
    ///
    /// A payload of another type is still an error.
    pub fn get_or<'a, T: Any>(&'a self, default: &'a T) -> Result<&'a T, ConfigError> {
        if self.is_none() { Ok(default) } else { self.require::<T>() }
    }

    fn mismatch<T: Any>(&self) -> ConfigError {
        ConfigError { expected: type_name::<T>(), found: self.type_name }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Config").field(&self.type_name).finish()
    }
}
