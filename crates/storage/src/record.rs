use serde::{Deserialize, Serialize};

/// A persisted student scope entry as stored by the backend.
///
/// `data` is the raw JSON payload written by the learner's prior responses.
/// It is stored as a string and parsed by the evaluation engine's resolver,
/// which navigates it with the action's schema path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEntryRecord {
    pub scope_id: String,
    pub source_id: String,
    /// Raw JSON document for this entry.
    pub data: String,
    /// ISO 8601 / RFC 3339 timestamp string. None for backends that do not
    /// track write times.
    pub updated_at: Option<String>,
}
