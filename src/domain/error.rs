//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree model or renderer setup.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("missing required renderer option: {option}")]
    Configuration { option: &'static str },

    #[error("cycle detected in hierarchy at node: {0}")]
    CycleDetected(i64),
}
