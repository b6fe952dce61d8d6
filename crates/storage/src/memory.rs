use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::ScopeEntryRecord;
use crate::traits::ScopeStore;

/// An in-memory `ScopeStore` backend.
///
/// Holds scope-id mappings and entries in process memory. Useful for tests
/// and for embedders that materialize scope data ahead of evaluation.
#[derive(Debug, Default)]
pub struct MemoryScopeStore {
    /// (deployment_id, student_id, scope_urn) -> scope_id
    scope_ids: RwLock<BTreeMap<(String, String, String), String>>,
    /// (scope_id, source_id) -> entry
    entries: RwLock<BTreeMap<(String, String), ScopeEntryRecord>>,
}

impl MemoryScopeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the learner's scope-entry id for a scope URN.
    pub fn put_scope_id(
        &self,
        deployment_id: &str,
        student_id: &str,
        scope_urn: &str,
        scope_id: &str,
    ) {
        // A poisoned lock only means another thread panicked while holding
        // it; the map itself is still consistent, so recover the guard.
        self.scope_ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (
                    deployment_id.to_string(),
                    student_id.to_string(),
                    scope_urn.to_string(),
                ),
                scope_id.to_string(),
            );
    }

    /// Store a scope entry with a raw JSON `data` payload.
    pub fn put_entry(&self, scope_id: &str, source_id: &str, data: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (scope_id.to_string(), source_id.to_string()),
                ScopeEntryRecord {
                    scope_id: scope_id.to_string(),
                    source_id: source_id.to_string(),
                    data: data.to_string(),
                    updated_at: None,
                },
            );
    }
}

#[async_trait]
impl ScopeStore for MemoryScopeStore {
    async fn find_scope_id(
        &self,
        deployment_id: &str,
        student_id: &str,
        scope_urn: &str,
    ) -> Result<Option<String>, StorageError> {
        let ids = self.scope_ids.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids
            .get(&(
                deployment_id.to_string(),
                student_id.to_string(),
                scope_urn.to_string(),
            ))
            .cloned())
    }

    async fn fetch_scope_entry(
        &self,
        scope_id: &str,
        source_id: &str,
    ) -> Result<Option<ScopeEntryRecord>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&(scope_id.to_string(), source_id.to_string()))
            .cloned())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
