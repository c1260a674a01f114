//! Explicit decoration chains for named operations.
//!
//! This crate lets a scope declare reusable cross-cutting behaviors
//! ("decorations": retrying, memoizing, counting, validating, synchronizing...)
//! and attach them to the next operation it defines. The decorations wrap the
//! operation in a chain that is assembled once, when the operation is defined,
//! and shared by every subsequent call.
//!
//! # Building blocks
//!
//! - [`Registry`]: maps decoration names to [`Decoration`] implementations
//! - [`CallContext`]: the per-call view a decoration gets: operation, owner,
//!   arguments, block and call-site origin
//! - [`Chain`] / [`ChainBuilder`]: an operation wrapped in ordered decorations,
//!   outermost first
//! - [`Scope`] / [`Definition`]: declare decorations, then define the operation
//!   they attach to
//!
//! Built-in policies live in the `micro-aspect` crate.

mod chain;
mod config;
mod context;
mod decoration;
mod error;
mod operation;
mod owner;
mod registry;
mod scope;
mod value;

pub use chain::{Chain, ChainBuilder, Diagnostic, Invocation, Link};
pub use config::Config;
pub use context::{CallContext, OperationId};
pub use decoration::{decoration_fn, Decoration, FnDecoration, Next};
pub use error::{BuildError, ConfigError, Fault, FaultKind, RegistryError};
pub use operation::{operation_fn, FnOperation, Operation};
pub use owner::{Owner, OwnerId, OwnerRelease};
pub use registry::Registry;
pub use scope::{Definition, Scope};
pub use value::{Block, Shape, Value};
