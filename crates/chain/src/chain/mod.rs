//! Composition of decorations around an operation.
//!
//! Given the ordered invocations `[d1(c1), d2(c2), ..., dn(cn)]` and an
//! operation `op`, the composed chain runs `d1` outermost and `op` innermost:
//!
//! ```text
//! d1 entry -> d2 entry -> ... -> op -> ... -> d2 exit -> d1 exit
//! ```
//!
//! Declaration order determines nesting, so `retry` declared before `measure`
//! re-runs the measurement on every attempt. An empty chain is the operation
//! itself.

mod diagnostic;

pub use diagnostic::Diagnostic;

use crate::decoration::{Decoration, Next};
use crate::{BuildError, CallContext, Config, Fault, Operation, OperationId, Owner, Registry, Value};
use crate::Block;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::trace;

/// One use-site request to apply a named decoration, with its configuration.
#[derive(Debug, Clone)]
pub struct Invocation {
    name: Arc<str>,
    config: Config,
}

impl Invocation {
    pub fn new(name: impl Into<Arc<str>>, config: Config) -> Self {
        Self { name: name.into(), config }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Looks the decoration up in `registry` and validates the configuration
    pub fn resolve(self, registry: &Registry) -> Result<Link, BuildError> {
        let decoration = registry.lookup(&self.name)?;
        decoration
            .validate(&self.config)
            .map_err(|source| BuildError::invalid_config(&self.name, source))?;
        Ok(Link { name: self.name, decoration, config: self.config })
    }
}

/// An [`Invocation`] bound to its registered [`Decoration`].
#[derive(Clone)]
pub struct Link {
    name: Arc<str>,
    decoration: Arc<dyn Decoration>,
    config: Config,
}

impl Link {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").field("name", &self.name).field("config", &self.config).finish_non_exhaustive()
    }
}

/// Runs `links` outermost-first around `operation`.
pub(crate) fn run(links: &[Link], operation: &dyn Operation, ctx: &CallContext<'_>) -> Result<Value, Fault> {
    match links.split_first() {
        None => operation.call(ctx),
        Some((link, rest)) => {
            trace!(decoration = %link.name, operation = %ctx.operation(), "enter decoration");
            link.decoration.apply(ctx, &link.config, Next::new(rest, operation, ctx))
        }
    }
}

/// A materialized decoration chain: the ordered links plus the wrapped operation.
///
/// Chains hold no per-call state and can be shared freely across threads;
/// cloning one is cheap.
#[derive(Clone)]
pub struct Chain {
    operation_id: OperationId,
    parameters: Arc<[Arc<str>]>,
    links: Arc<[Link]>,
    operation: Arc<dyn Operation>,
}

impl Chain {
    /// Creates a chain builder resolving decoration names against `registry`
    pub fn builder(registry: &Registry) -> ChainBuilder<'_> {
        ChainBuilder::new(registry)
    }

    /// A chain without decorations, invoking `operation` directly
    pub fn identity<O: Operation>(operation_id: OperationId, operation: O) -> Self {
        Self::from_links(operation_id, Vec::new(), Arc::new(operation))
    }

    pub(crate) fn from_links(operation_id: OperationId, links: Vec<Link>, operation: Arc<dyn Operation>) -> Self {
        Self { operation_id, parameters: Vec::new().into(), links: links.into(), operation }
    }

    /// Names the operation's parameters, used in diagnostics such as argument shape faults
    #[must_use]
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Wraps this chain from the outside: `outer` runs before every existing link.
    #[must_use]
    pub fn wrap(self, outer: impl IntoIterator<Item = Link>) -> Self {
        let links = outer.into_iter().chain(self.links.iter().cloned()).collect();
        Self { links, ..self }
    }

    /// Invokes the chain on `owner`.
    ///
    /// A fresh [`CallContext`] is created for this call; the caller's location is
    /// recorded as its origin.
    #[track_caller]
    pub fn invoke(&self, owner: &Owner, arguments: &[Value], block: Option<&Block>) -> Result<Value, Fault> {
        let ctx = CallContext::new(&self.operation_id, &self.parameters, owner, arguments, block, Location::caller());
        run(&self.links, self.operation.as_ref(), &ctx)
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn parameters(&self) -> &[Arc<str>] {
        &self.parameters
    }

    /// Number of decorations, the operation excluded
    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the chain is just the operation
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Decoration names, outermost first
    pub fn decorations(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(Link::name)
    }

    /// One [`Diagnostic`] per link, outermost first
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.links.iter().map(|link| Diagnostic::new(Arc::clone(&link.name), self.operation_id.clone())).collect()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("operation", &self.operation_id)
            .field("decorations", &self.decorations().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Collects decoration invocations, in declaration order, for one chain.
pub struct ChainBuilder<'r> {
    registry: &'r Registry,
    links: Vec<Link>,
}

impl<'r> ChainBuilder<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self { registry, links: Vec::new() }
    }

    /// Appends the decoration registered as `name`; it wraps every link added after it.
    pub fn decorate(self, name: &str, config: Config) -> Result<Self, BuildError> {
        self.invocation(Invocation::new(name, config))
    }

    pub fn invocation(mut self, invocation: Invocation) -> Result<Self, BuildError> {
        let link = invocation.resolve(self.registry)?;
        self.links.push(link);
        Ok(self)
    }

    /// Appends an already resolved link
    #[must_use]
    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn build<O: Operation>(self, operation_id: OperationId, operation: O) -> Chain {
        Chain::from_links(operation_id, self.links, Arc::new(operation))
    }
}

impl fmt::Debug for ChainBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder").field("links", &self.links).finish_non_exhaustive()
    }
}
