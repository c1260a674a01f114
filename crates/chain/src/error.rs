use crate::Shape;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Errors raised while registering or looking up decorations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown decoration `{name}`")]
    UnknownDecoration { name: String },

    #[error("decoration `{name}` is already registered")]
    DuplicateDecoration { name: String },
}

impl RegistryError {
    pub fn unknown_decoration<S: ToString>(name: S) -> Self {
        Self::UnknownDecoration { name: name.to_string() }
    }

    pub fn duplicate_decoration<S: ToString>(name: S) -> Self {
        Self::DuplicateDecoration { name: name.to_string() }
    }
}

/// A configuration payload did not have the type a decoration expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected configuration of type `{expected}`, found `{found}`")]
pub struct ConfigError {
    pub expected: &'static str,
    pub found: &'static str,
}

/// Errors raised while building chains and scopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid configuration for decoration `{decoration}`: {source}")]
    InvalidConfig {
        decoration: String,
        #[source]
        source: ConfigError,
    },

    #[error("operation `{operation}` is not defined")]
    UndefinedOperation { operation: String },

    #[error("scope `{scope}` finished with declared decorations {decorations:?} attached to no operation")]
    UnattachedDecorations { scope: String, decorations: Vec<String> },
}

impl BuildError {
    pub fn invalid_config<S: ToString>(decoration: S, source: ConfigError) -> Self {
        Self::InvalidConfig { decoration: decoration.to_string(), source }
    }

    pub fn undefined_operation<S: ToString>(operation: S) -> Self {
        Self::UndefinedOperation { operation: operation.to_string() }
    }
}

/// The kind of a [`Fault`], matched by policies such as retry and trap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FaultKind(Cow<'static, str>);

impl FaultKind {
    pub const RUNTIME: FaultKind = FaultKind::from_static("runtime");
    pub const ARGUMENT: FaultKind = FaultKind::from_static("argument");
    pub const ARGUMENT_SHAPE: FaultKind = FaultKind::from_static("argument_shape");
    pub const TIMEOUT: FaultKind = FaultKind::from_static("timeout");
    pub const INVALID_CONFIG: FaultKind = FaultKind::from_static("invalid_config");
    pub const LOCK_POISONED: FaultKind = FaultKind::from_static("lock_poisoned");
    pub const UNDEFINED_OPERATION: FaultKind = FaultKind::from_static("undefined_operation");

    pub const fn from_static(kind: &'static str) -> Self {
        Self(Cow::Borrowed(kind))
    }

    pub fn new<S: Into<String>>(kind: S) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fault raised while invoking a chain.
///
/// Faults raised by the wrapped operation travel through every decoration
/// unchanged unless a policy explicitly handles their kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    #[error("{param} expected argument of shape {expected}, was {actual}")]
    ArgumentShape { param: String, expected: Shape, actual: Shape },

    #[error("{kind}: {message}")]
    Raised { kind: FaultKind, message: String },

    #[error("invalid configuration for decoration `{decoration}`: {source}")]
    InvalidConfig {
        decoration: String,
        #[source]
        source: ConfigError,
    },

    #[error("lock `{key}` was poisoned by a panicking holder")]
    LockPoisoned { key: String },

    #[error("undefined operation `{operation}`")]
    UndefinedOperation { operation: String },
}

impl Fault {
    pub fn raise<S: ToString>(kind: FaultKind, message: S) -> Self {
        Self::Raised { kind, message: message.to_string() }
    }

    pub fn runtime<S: ToString>(message: S) -> Self {
        Self::raise(FaultKind::RUNTIME, message)
    }

    pub fn argument_shape<S: ToString>(param: S, expected: Shape, actual: Shape) -> Self {
        Self::ArgumentShape { param: param.to_string(), expected, actual }
    }

    pub fn invalid_config<S: ToString>(decoration: S, source: ConfigError) -> Self {
        Self::InvalidConfig { decoration: decoration.to_string(), source }
    }

    pub fn lock_poisoned<S: ToString>(key: S) -> Self {
        Self::LockPoisoned { key: key.to_string() }
    }

    pub fn undefined_operation<S: ToString>(operation: S) -> Self {
        Self::UndefinedOperation { operation: operation.to_string() }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::ArgumentShape { .. } => FaultKind::ARGUMENT_SHAPE,
            Fault::Raised { kind, .. } => kind.clone(),
            Fault::InvalidConfig { .. } => FaultKind::INVALID_CONFIG,
            Fault::LockPoisoned { .. } => FaultKind::LOCK_POISONED,
            Fault::UndefinedOperation { .. } => FaultKind::UNDEFINED_OPERATION,
        }
    }

    pub fn is_kind(&self, kind: &FaultKind) -> bool {
        match self {
            Fault::Raised { kind: raised, .. } => raised == kind,
            fault => fault.kind() == *kind,
        }
    }
}
