//! Process-wide mapping from decoration name to decoration.
//!
//! Registration is expected during initialization and is serialized by a single
//! mutex. Lookups never take that lock: they load the current immutable
//! snapshot, which every registration replaces as a whole (copy-on-write).

use crate::decoration::Decoration;
use crate::RegistryError;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

type Decorations = HashMap<Arc<str>, Arc<dyn Decoration>>;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub struct Registry {
    snapshot: ArcSwap<Decorations>,
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self { snapshot: ArcSwap::from_pointee(HashMap::new()), write_lock: Mutex::new(()) }
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    /// Registers `decoration` as `name`, failing if the name is already taken.
    pub fn register<D: Decoration>(&self, name: impl Into<Arc<str>>, decoration: Arc<D>) -> Result<(), RegistryError> {
        self.insert(name.into(), decoration, false).map(|_| ())
    }

    /// Registers `decoration` as `name`, returning the decoration it replaced.
    pub fn register_or_replace<D: Decoration>(
        &self,
        name: impl Into<Arc<str>>,
        decoration: Arc<D>,
    ) -> Option<Arc<dyn Decoration>> {
        // replacing never fails
        self.insert(name.into(), decoration, true).unwrap_or_default()
    }

    fn insert(
        &self,
        name: Arc<str>,
        decoration: Arc<dyn Decoration>,
        replace: bool,
    ) -> Result<Option<Arc<dyn Decoration>>, RegistryError> {
        // the guarded data is the snapshot itself, a poisoned lock leaves it intact
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.snapshot.load();
        if !replace && current.contains_key(&name) {
            return Err(RegistryError::duplicate_decoration(name));
        }

        let mut next = Decorations::clone(&current);
        let previous = next.insert(Arc::clone(&name), decoration);
        self.snapshot.store(Arc::new(next));

        match previous {
            Some(_) => warn!(decoration = %name, "replaced registered decoration"),
            None => debug!(decoration = %name, "registered decoration"),
        }
        Ok(previous)
    }

    /// Looks up the decoration registered as `name`.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Decoration>, RegistryError> {
        self.snapshot.load().get(name).cloned().ok_or_else(|| RegistryError::unknown_decoration(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot.load().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names = self.snapshot.load().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("names", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::{decoration_fn, RegistryError};
    use std::sync::Arc;
    use std::thread;

    fn pass_through() -> Arc<impl crate::Decoration> {
        Arc::new(decoration_fn(|_ctx, _config, next| next.call()))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        registry.register("retry", pass_through()).unwrap();

        assert!(registry.lookup("retry").is_ok());
        assert!(registry.contains("retry"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = Registry::new();
        registry.register("retry", pass_through()).unwrap();

        let error = registry.register("retry", pass_through()).unwrap_err();
        assert_eq!(error, RegistryError::duplicate_decoration("retry"));
    }

    #[test]
    fn test_explicit_replace() {
        let registry = Registry::new();
        assert!(registry.register_or_replace("retry", pass_through()).is_none());
        assert!(registry.register_or_replace("retry", pass_through()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_lookup() {
        let registry = Registry::new();
        let error = registry.lookup("memoize").err().unwrap();
        assert_eq!(error, RegistryError::unknown_decoration("memoize"));
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = Registry::new();
        registry.register("retry", pass_through()).unwrap();
        registry.register("count", pass_through()).unwrap();
        let names = registry.names();
        assert_eq!(names.iter().map(|name| &**name).collect::<Vec<_>>(), ["count", "retry"]);
    }

    #[test]
    fn test_readers_see_consistent_snapshots_while_registering() {
        let registry = Registry::new();
        registry.register("first", pass_through()).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for index in 0..100 {
                    registry.register(format!("d{index}"), pass_through()).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert!(registry.lookup("first").is_ok());
                    }
                });
            }
        });

        assert_eq!(registry.len(), 101);
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }
}
