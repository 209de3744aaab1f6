//! Error types for the traversal engine
//!
//! All engine failures are [`FlowError`] values. The taxonomy matters to
//! callers: variable-resolution failures never surface here (they are
//! recovered into response warnings), while predicate failures, action-query
//! failures, and store failures propagate. The HTTP layer maps the whole
//! family to a single conflict status and reports [`FlowError::kind`] as the
//! machine-readable error type.

use askflow_graph::StoreError;
use thiserror::Error;

/// Convenience result type using [`FlowError`].
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors surfaced by a questionnaire walk.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The starting Section does not exist.
    #[error("Section '{0}' not found")]
    SectionNotFound(String),

    /// An expression failed to evaluate (askWhen, source expression, or an
    /// ad-hoc evaluator snippet outside variable resolution).
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A sandboxed evaluation exceeded its wall-clock budget.
    #[error("evaluator timed out after {ms} ms")]
    EvaluatorTimeout { ms: u64 },

    /// The sandbox rejected the snippet: disallowed construct, statement
    /// where an expression was required, or an unresolved name.
    #[error("sandbox violation: {0}")]
    Security(String),

    /// Non-transient graph store failure after retries were exhausted.
    #[error("graph store error: {0}")]
    Storage(StoreError),

    /// An evaluator-path query exceeded the row cap.
    #[error("evaluator query returned {returned} rows, exceeding the cap of {cap}")]
    ResourceLimit { returned: usize, cap: usize },

    /// Malformed graph data or a snippet of the wrong shape, e.g. a
    /// non-string `askWhen` or a Question node without a `questionId`.
    #[error("contract violation: {0}")]
    Contract(String),
}

impl FlowError {
    /// Machine-readable error kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::SectionNotFound(_) => "SectionNotFound",
            FlowError::Evaluation(_) => "EvaluationError",
            FlowError::EvaluatorTimeout { .. } => "EvaluatorTimeout",
            FlowError::Security(_) => "Security",
            FlowError::Storage(_) => "StorageError",
            FlowError::ResourceLimit { .. } => "ResourceLimit",
            FlowError::Contract(_) => "ContractViolation",
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RowCap { returned, cap } => FlowError::ResourceLimit { returned, cap },
            other => FlowError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_cap_maps_to_resource_limit() {
        let err: FlowError = StoreError::RowCap {
            returned: 150,
            cap: 100,
        }
        .into();
        assert!(matches!(
            err,
            FlowError::ResourceLimit {
                returned: 150,
                cap: 100
            }
        ));
        assert_eq!(err.kind(), "ResourceLimit");
    }

    #[test]
    fn test_store_errors_map_to_storage() {
        let err: FlowError = StoreError::Query("boom".into()).into();
        assert_eq!(err.kind(), "StorageError");
    }
}
