//! Error types for graph store operations.

use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by [`GraphStore`](crate::store::GraphStore)
/// implementations and the [`Gateway`](crate::gateway::Gateway).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is temporarily unreachable. Retryable.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// The session was invalidated mid-flight. Retryable.
    #[error("graph session expired: {0}")]
    SessionExpired(String),

    /// The statement lost a lock race. Retryable.
    #[error("transient conflict: {0}")]
    Transient(String),

    /// The statement itself is invalid or unsupported. Not retryable.
    #[error("query failed: {0}")]
    Query(String),

    /// An evaluator-path query exceeded the configured row cap.
    #[error("query returned {returned} rows, exceeding the cap of {cap}")]
    RowCap { returned: usize, cap: usize },

    /// Result decoding failed.
    #[error("result decoding failed: {0}")]
    Decode(String),
}

impl StoreError {
    /// True for error classes worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::SessionExpired(_) | StoreError::Transient(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::SessionExpired("gone".into()).is_transient());
        assert!(StoreError::Transient("deadlock".into()).is_transient());
        assert!(!StoreError::Query("syntax".into()).is_transient());
        assert!(!StoreError::RowCap { returned: 101, cap: 100 }.is_transient());
    }
}
