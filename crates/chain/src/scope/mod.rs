//! Declaring decorations for the next operation a scope defines.
//!
//! A [`Scope`] plays the role of a type under construction. Decorations are
//! declared first and attach to the very next operation defined in the same
//! scope:
//!
//! ```
//! use micro_chain::{decoration_fn, operation_fn, Config, Owner, Registry, Scope, Value};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! registry.register("shout", Arc::new(decoration_fn(|_ctx, _config, next| {
//!     let value = next.call()?;
//!     Ok(Value::from(value.as_str().unwrap_or_default().to_uppercase()))
//! }))).unwrap();
//!
//! let client = Scope::with_registry("Client", &registry)
//!     .declare("shout", Config::none())
//!     .unwrap()
//!     .define("greet", operation_fn(|_ctx| Ok(Value::from("hello"))))
//!     .define("whisper", operation_fn(|_ctx| Ok(Value::from("psst"))))
//!     .build()
//!     .unwrap();
//!
//! let owner = Owner::empty();
//! assert_eq!(client.invoke(&owner, "greet", &[], None).unwrap(), Value::from("HELLO"));
//! assert_eq!(client.invoke(&owner, "whisper", &[], None).unwrap(), Value::from("psst"));
//! ```
//!
//! The pending state belongs to the scope value itself, so scopes built
//! concurrently on different threads never see each other's declarations.

mod pending;

use crate::chain::{Chain, Diagnostic, Invocation};
use crate::{Block, BuildError, Config, Fault, Operation, OperationId, Owner, Registry, Value};
use indexmap::IndexMap;
use pending::Pending;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for a set of named, possibly decorated, operations.
pub struct Scope<'r> {
    name: Arc<str>,
    registry: &'r Registry,
    pending: Pending,
    operations: IndexMap<Arc<str>, Chain>,
}

impl Scope<'static> {
    /// Creates a scope resolving decorations against [`Registry::global`]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Scope::with_registry(name, Registry::global())
    }
}

impl<'r> Scope<'r> {
    pub fn with_registry(name: impl Into<Arc<str>>, registry: &'r Registry) -> Self {
        Self { name: name.into(), registry, pending: Pending::Idle, operations: IndexMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Declares that the next defined operation is decorated with `decoration`.
    ///
    /// The decoration is resolved right away, so an unknown name or an invalid
    /// configuration fails here rather than at definition or call time.
    /// Declarations accumulate until the next definition consumes them.
    pub fn declare(mut self, decoration: &str, config: Config) -> Result<Self, BuildError> {
        let link = Invocation::new(decoration, config).resolve(self.registry)?;
        debug!(scope = %self.name, decoration, "declared decoration for next operation");
        self.pending.arm(link);
        Ok(self)
    }

    /// Returns true if decorations are waiting for the next definition
    pub fn is_armed(&self) -> bool {
        self.pending.is_armed()
    }

    /// Names of the decorations waiting for the next definition, outermost first
    pub fn pending(&self) -> Vec<&str> {
        self.pending.names()
    }

    /// Defines `name`, attaching every pending declaration to it.
    #[must_use]
    pub fn define<O: Operation>(self, name: impl Into<Arc<str>>, operation: O) -> Self {
        self.define_with_params(name, Vec::<Arc<str>>::new(), operation)
    }

    /// Defines `name` with named parameters, attaching every pending declaration to it.
    #[must_use]
    pub fn define_with_params<O, I, S>(mut self, name: impl Into<Arc<str>>, parameters: I, operation: O) -> Self
    where
        O: Operation,
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let name = name.into();
        let links = self.pending.take();
        let operation_id = OperationId::new(Arc::clone(&self.name), Arc::clone(&name));

        if !links.is_empty() {
            debug!(operation = %operation_id, decorations = links.len(), "attached pending decorations");
        }

        let chain = Chain::from_links(operation_id, links, Arc::new(operation)).with_parameters(parameters);
        if self.operations.insert(Arc::clone(&name), chain).is_some() {
            warn!(scope = %self.name, operation = %name, "redefined operation, previous definition discarded");
        }
        self
    }

    /// Decorates an operation that is already defined.
    ///
    /// The decoration wraps the operation's existing chain from the outside.
    /// Pending declarations are left untouched.
    pub fn decorate(mut self, operation: &str, decoration: &str, config: Config) -> Result<Self, BuildError> {
        let link = Invocation::new(decoration, config).resolve(self.registry)?;
        let chain = self
            .operations
            .get_mut(operation)
            .ok_or_else(|| BuildError::undefined_operation(format!("{}#{operation}", self.name)))?;

        *chain = chain.clone().wrap([link]);
        debug!(scope = %self.name, operation, decoration, "decorated defined operation");
        Ok(self)
    }

    /// Finishes the scope.
    ///
    /// Fails if decorations were declared after the last definition, since they
    /// would otherwise be silently dropped.
    pub fn build(self) -> Result<Definition, BuildError> {
        if self.pending.is_armed() {
            return Err(BuildError::UnattachedDecorations {
                scope: self.name.to_string(),
                decorations: self.pending.names().into_iter().map(str::to_owned).collect(),
            });
        }
        Ok(Definition { name: self.name, operations: self.operations })
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("pending", &self.pending)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The finished set of operations of a [`Scope`].
#[derive(Clone)]
pub struct Definition {
    name: Arc<str>,
    operations: IndexMap<Arc<str>, Chain>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation(&self, name: &str) -> Option<&Chain> {
        self.operations.get(name)
    }

    /// Operation names in definition order
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(|name| &**name)
    }

    /// Invokes the operation `name` on `owner`.
    #[track_caller]
    pub fn invoke(
        &self,
        owner: &Owner,
        name: &str,
        arguments: &[Value],
        block: Option<&Block>,
    ) -> Result<Value, Fault> {
        match self.operations.get(name) {
            Some(chain) => chain.invoke(owner, arguments, block),
            None => Err(Fault::undefined_operation(format!("{}#{name}", self.name))),
        }
    }

    /// Every decoration applied in this definition, grouped by operation
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.operations.values().flat_map(Chain::diagnostics).collect()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition").field("name", &self.name).field("operations", &self.operations).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;
    use crate::{decoration_fn, operation_fn, BuildError, Config, Fault, Owner, Registry, RegistryError, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn tagging_registry() -> Registry {
        let registry = Registry::new();
        for tag in ["a", "b"] {
            registry
                .register(
                    tag,
                    Arc::new(decoration_fn(move |_ctx, _config, next| {
                        let inner = next.call()?;
                        Ok(Value::from(format!("{tag}({})", inner.as_str().unwrap_or_default())))
                    })),
                )
                .unwrap();
        }
        registry
    }

    fn named(name: &'static str) -> impl crate::Operation {
        operation_fn(move |_| Ok(Value::from(name)))
    }

    #[test]
    fn test_declarations_attach_only_to_next_operation() {
        let registry = tagging_registry();
        let definition = Scope::with_registry("Client", &registry)
            .declare("a", Config::none())
            .unwrap()
            .declare("b", Config::none())
            .unwrap()
            .define("first", named("first"))
            .define("second", named("second"))
            .build()
            .unwrap();

        let owner = Owner::empty();
        assert_eq!(definition.invoke(&owner, "first", &[], None).unwrap(), Value::from("a(b(first))"));
        assert_eq!(definition.invoke(&owner, "second", &[], None).unwrap(), Value::from("second"));
        assert!(definition.operation("second").unwrap().is_empty());
    }

    #[test]
    fn test_define_while_idle_is_undecorated() {
        let registry = tagging_registry();
        let scope = Scope::with_registry("Client", &registry).define("plain", named("plain"));
        assert!(!scope.is_armed());

        let definition = scope.build().unwrap();
        assert_eq!(definition.invoke(&Owner::empty(), "plain", &[], None).unwrap(), Value::from("plain"));
    }

    #[test]
    fn test_pending_state_transitions() {
        let registry = tagging_registry();
        let scope = Scope::with_registry("Client", &registry);
        assert!(!scope.is_armed());

        let scope = scope.declare("a", Config::none()).unwrap().declare("b", Config::none()).unwrap();
        assert!(scope.is_armed());
        assert_eq!(scope.pending(), ["a", "b"]);

        let scope = scope.define("first", named("first"));
        assert!(!scope.is_armed());
        assert!(scope.pending().is_empty());
    }

    #[test]
    fn test_unknown_decoration_fails_at_declare() {
        let registry = tagging_registry();
        let error = Scope::with_registry("Client", &registry).declare("missing", Config::none()).unwrap_err();
        assert_eq!(error, BuildError::Registry(RegistryError::unknown_decoration("missing")));
    }

    #[test]
    fn test_unattached_declarations_fail_the_build() {
        let registry = tagging_registry();
        let error = Scope::with_registry("Client", &registry)
            .define("first", named("first"))
            .declare("a", Config::none())
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(
            error,
            BuildError::UnattachedDecorations { scope: "Client".into(), decorations: vec!["a".into()] }
        );
    }

    #[test]
    fn test_classic_decorate_wraps_from_outside() {
        let registry = tagging_registry();
        let definition = Scope::with_registry("Client", &registry)
            .declare("b", Config::none())
            .unwrap()
            .define("call", named("call"))
            .decorate("call", "a", Config::none())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(definition.invoke(&Owner::empty(), "call", &[], None).unwrap(), Value::from("a(b(call))"));
    }

    #[test]
    fn test_classic_decorate_requires_defined_operation() {
        let registry = tagging_registry();
        let error = Scope::with_registry("Client", &registry).decorate("call", "a", Config::none()).unwrap_err();
        assert_eq!(error, BuildError::undefined_operation("Client#call"));
    }

    #[test]
    fn test_redefinition_replaces_operation() {
        let registry = tagging_registry();
        let definition = Scope::with_registry("Client", &registry)
            .declare("a", Config::none())
            .unwrap()
            .define("call", named("old"))
            .define("call", named("new"))
            .build()
            .unwrap();

        assert_eq!(definition.invoke(&Owner::empty(), "call", &[], None).unwrap(), Value::from("new"));
        assert_eq!(definition.operation_names().collect::<Vec<_>>(), ["call"]);
    }

    #[test]
    fn test_invoke_undefined_operation() {
        let definition = Scope::with_registry("Client", &Registry::new()).build().unwrap();
        let fault = definition.invoke(&Owner::empty(), "nope", &[], None).unwrap_err();
        assert_eq!(fault, Fault::undefined_operation("Client#nope"));
    }

    #[test]
    fn test_parameters_are_recorded() {
        let definition = Scope::with_registry("Client", &Registry::new())
            .define_with_params(
                "call",
                ["a", "b"],
                operation_fn(|ctx| Ok(Value::from(ctx.parameter_name(1).into_owned()))),
            )
            .build()
            .unwrap();

        assert_eq!(definition.invoke(&Owner::empty(), "call", &[], None).unwrap(), Value::from("b"));
    }

    #[test]
    fn test_concurrent_scopes_do_not_share_pending_declarations() {
        let registry = tagging_registry();
        let decorated = AtomicUsize::new(0);
        let definitions = Mutex::new(Vec::new());

        thread::scope(|threads| {
            for index in 0..8 {
                let registry = &registry;
                let decorated = &decorated;
                let definitions = &definitions;
                threads.spawn(move || {
                    let mut scope = Scope::with_registry(format!("Scope{index}"), registry);
                    if index % 2 == 0 {
                        scope = scope.declare("a", Config::none()).unwrap();
                        decorated.fetch_add(1, Ordering::SeqCst);
                    }
                    let definition = scope.define("call", named("call")).build().unwrap();
                    definitions.lock().unwrap().push((index, definition));
                });
            }
        });

        let owner = Owner::empty();
        for (index, definition) in definitions.into_inner().unwrap() {
            let expected = if index % 2 == 0 { "a(call)" } else { "call" };
            assert_eq!(definition.invoke(&owner, "call", &[], None).unwrap(), Value::from(expected));
        }
        assert_eq!(decorated.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_diagnostics_cover_every_operation() {
        let registry = tagging_registry();
        let definition = Scope::with_registry("Client", &registry)
            .declare("a", Config::none())
            .unwrap()
            .define("get", named("get"))
            .declare("b", Config::none())
            .unwrap()
            .define("post", named("post"))
            .build()
            .unwrap();

        let rendered = definition.diagnostics().iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(rendered, ["a(Client#get)", "b(Client#post)"]);
    }
}
