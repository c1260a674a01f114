//! Per-invocation state handed to every link of a chain.
//!
//! A [`CallContext`] is created fresh for each outer invocation of a chain and
//! passed by reference from the outermost decoration down to the operation.
//! Decorations read it; a decoration that wants to forward different
//! arguments derives a new context with [`CallContext::with_arguments`]
//! instead of mutating the shared one.

use crate::{Block, Owner, Value};
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a decorated operation: the scope it was defined in and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    scope: Arc<str>,
    name: Arc<str>,
}

impl OperationId {
    pub fn new(scope: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self { scope: scope.into(), name: name.into() }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.scope, self.name)
    }
}

/// Everything a decoration can know about the call it wraps.
pub struct CallContext<'a> {
    operation: &'a OperationId,
    parameters: &'a [Arc<str>],
    owner: &'a Owner,
    arguments: Cow<'a, [Value]>,
    block: Option<&'a Block>,
    origin: &'static Location<'static>,
    attempts: AtomicU32,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        operation: &'a OperationId,
        parameters: &'a [Arc<str>],
        owner: &'a Owner,
        arguments: &'a [Value],
        block: Option<&'a Block>,
        origin: &'static Location<'static>,
    ) -> Self {
        Self {
            operation,
            parameters,
            owner,
            arguments: Cow::Borrowed(arguments),
            block,
            origin,
            attempts: AtomicU32::new(0),
        }
    }

    /// Derives a context which forwards `arguments` instead of the current ones.
    ///
    /// Everything else, including the attempt counter's current value, is
    /// carried over.
    pub fn with_arguments(&self, arguments: Vec<Value>) -> CallContext<'a> {
        CallContext {
            operation: self.operation,
            parameters: self.parameters,
            owner: self.owner,
            arguments: Cow::Owned(arguments),
            block: self.block,
            origin: self.origin,
            attempts: AtomicU32::new(self.attempts()),
        }
    }

    #[inline]
    pub fn operation(&self) -> &'a OperationId {
        self.operation
    }

    #[inline]
    pub fn owner(&self) -> &'a Owner {
        self.owner
    }

    #[inline]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Returns the argument at `index`, if it was passed
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    #[inline]
    pub fn block(&self) -> Option<&'a Block> {
        self.block
    }

    /// Names the operation declared for its parameters
    pub fn parameters(&self) -> &'a [Arc<str>] {
        self.parameters
    }

    /// Name of the parameter at `index`, `arg{index}` when none was declared
    pub fn parameter_name(&self, index: usize) -> Cow<'a, str> {
        match self.parameters.get(index) {
            Some(name) => Cow::Borrowed(&**name),
            None => Cow::Owned(format!("arg{index}")),
        }
    }

    /// Where the outer invocation was made from
    #[inline]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// How many retries have been recorded for this outer invocation
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Records another attempt and returns the new count
    pub fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("operation", self.operation)
            .field("owner", &self.owner.id())
            .field("arguments", &self.arguments)
            .field("block", &self.block.is_some())
            .field("origin", self.origin)
            .field("attempts", &self.attempts())
            .finish()
    }
}
