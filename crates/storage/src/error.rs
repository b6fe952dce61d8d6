/// All errors that can be returned by a ScopeStore implementation.
///
/// "Scope id not found" and "entry not found" are NOT errors -- the trait
/// methods return `Ok(None)` for those. Errors here are backend failures
/// only (connection loss, query faults, timeouts).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A backend-specific storage error (connection, query, serialization).
    #[error("scope storage backend error: {0}")]
    Backend(String),

    /// The backend did not answer within its own deadline.
    #[error("scope storage timed out: {0}")]
    Timeout(String),
}
