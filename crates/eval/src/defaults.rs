//! Pathway default-action collaborator.
//!
//! A pathway may author its own default action, used when an evaluation
//! attempt matches no scenario at all. The engine only asks on that path;
//! implementations live with the courseware content subsystem.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::types::EvalError;

/// Asynchronous provider of authored pathway default actions.
///
/// Returns the raw authored action JSON; the engine runs it through the
/// same deserializer and resolver as scenario actions.
#[async_trait]
pub trait PathwayDefaults: Send + Sync {
    /// The pathway's authored default action, if it defines one.
    async fn default_action(
        &self,
        pathway_id: &str,
    ) -> Result<Option<serde_json::Value>, EvalError>;
}

/// A provider for deployments whose pathways define no defaults.
pub struct NoPathwayDefaults;

#[async_trait]
impl PathwayDefaults for NoPathwayDefaults {
    async fn default_action(
        &self,
        _pathway_id: &str,
    ) -> Result<Option<serde_json::Value>, EvalError> {
        Ok(None)
    }
}

/// A provider that returns a fixed default action per pathway id.
///
/// Useful for testing and for embedders that materialize pathway defaults
/// ahead of evaluation.
pub struct StaticPathwayDefaults {
    defaults: BTreeMap<String, serde_json::Value>,
}

impl StaticPathwayDefaults {
    pub fn new(defaults: BTreeMap<String, serde_json::Value>) -> Self {
        Self { defaults }
    }

    /// Create a provider with a single pathway's default action.
    pub fn single(pathway_id: &str, action: serde_json::Value) -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert(pathway_id.to_string(), action);
        Self { defaults }
    }
}

#[async_trait]
impl PathwayDefaults for StaticPathwayDefaults {
    async fn default_action(
        &self,
        pathway_id: &str,
    ) -> Result<Option<serde_json::Value>, EvalError> {
        Ok(self.defaults.get(pathway_id).cloned())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
