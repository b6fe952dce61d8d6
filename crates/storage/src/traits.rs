use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::ScopeEntryRecord;

/// The storage trait for student scope backends.
///
/// A `ScopeStore` implementation answers the two lookups the evaluation
/// engine performs while resolving a SCOPE-sourced action value:
///
/// 1. `find_scope_id` -- map (deployment, student, scope URN) to the
///    learner's current scope-entry id.
/// 2. `fetch_scope_entry` -- load the entry written by a given source
///    within that scope.
///
/// Both are single-attempt reads. The engine never retries; a caller that
/// wants time-bounded evaluation bounds these futures itself.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so one store can serve concurrent
/// evaluation attempts across async task boundaries.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Look up the learner's current scope-entry id.
    ///
    /// Returns `Ok(None)` when the learner has no entry for this scope URN
    /// in this deployment.
    async fn find_scope_id(
        &self,
        deployment_id: &str,
        student_id: &str,
        scope_urn: &str,
    ) -> Result<Option<String>, StorageError>;

    /// Fetch the scope entry written by `source_id` within `scope_id`.
    ///
    /// Returns `Ok(None)` when no such entry exists.
    async fn fetch_scope_entry(
        &self,
        scope_id: &str,
        source_id: &str,
    ) -> Result<Option<ScopeEntryRecord>, StorageError>;
}
