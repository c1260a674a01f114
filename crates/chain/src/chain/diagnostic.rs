use crate::OperationId;
use std::fmt;
use std::sync::Arc;

/// Describes one decoration applied to one operation, e.g. `retry(Client#get)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    decoration: Arc<str>,
    operation: OperationId,
}

impl Diagnostic {
    pub fn new(decoration: Arc<str>, operation: OperationId) -> Self {
        Self { decoration, operation }
    }

    pub fn decoration(&self) -> &str {
        &self.decoration
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.decoration, self.operation)
    }
}
