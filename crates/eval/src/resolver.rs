//! Action value resolution.
//!
//! Resolves an action's operand value either from the literal embedded in
//! its resolver context or from the learner's persisted scope data (an
//! asynchronous two-step lookup followed by JSON path navigation).
//!
//! Resolution is single-attempt: no retry, and every lookup failure raises
//! `UnableToResolve`. Whether that fault is fatal is the caller's choice;
//! the pipeline treats it as aborting the whole attempt.

use waypoint_storage::ScopeStore;

use crate::action::{ResolvedAction, ResolverContext, UnresolvedAction};
use crate::mutation;
use crate::types::{EvalError, Value};

/// Resolve an action's operand value.
///
/// Mutation-bearing actions also verify here that an implementation exists
/// for their (data type, operator) pair, so a configuration hole fails the
/// attempt at resolution time rather than when the caller applies the value.
pub async fn resolve(
    action: UnresolvedAction,
    store: &dyn ScopeStore,
    deployment_id: &str,
    student_id: &str,
) -> Result<ResolvedAction, EvalError> {
    if let Some((data_type, operator, is_list)) = action.context.mutation_signature() {
        mutation::select(data_type, operator, is_list)?;
    }

    let value = match &action.resolver {
        ResolverContext::Literal { value, .. } => value.clone(),
        ResolverContext::Scope {
            scope_urn,
            source_id,
            path,
            ..
        } => resolve_scope(store, deployment_id, student_id, scope_urn, source_id, path).await?,
    };

    Ok(ResolvedAction {
        context: action.context,
        value,
    })
}

/// Fetch and navigate a learner's scope entry.
async fn resolve_scope(
    store: &dyn ScopeStore,
    deployment_id: &str,
    student_id: &str,
    scope_urn: &str,
    source_id: &str,
    path: &[String],
) -> Result<Value, EvalError> {
    let scope_id = store
        .find_scope_id(deployment_id, student_id, scope_urn)
        .await?
        .ok_or_else(|| EvalError::UnableToResolve {
            message: "scope id not found".to_string(),
        })?;

    let entry = store
        .fetch_scope_entry(&scope_id, source_id)
        .await?
        .ok_or_else(|| EvalError::UnableToResolve {
            message: format!("student scope entry not found for {}", source_id),
        })?;

    let data: serde_json::Value =
        serde_json::from_str(&entry.data).map_err(|e| EvalError::UnableToResolve {
            message: format!("scope entry data for {} is not valid JSON: {}", source_id, e),
        })?;

    navigate(&data, path)
}

/// Walk an ordered key path into a scope entry's JSON document.
///
/// Every key must exist, and every key but the last must land on an object.
/// Each failure mode is its own `UnableToResolve`; there is no partial or
/// best-effort result.
fn navigate(data: &serde_json::Value, path: &[String]) -> Result<Value, EvalError> {
    let Some((last, intermediate)) = path.split_last() else {
        return Err(EvalError::UnableToResolve {
            message: "resolver path is empty".to_string(),
        });
    };

    let mut current = data;
    for key in intermediate {
        let obj = current.as_object().ok_or_else(|| EvalError::UnableToResolve {
            message: format!("cannot navigate through non-object at key '{}'", key),
        })?;
        current = obj.get(key).ok_or_else(|| EvalError::UnableToResolve {
            message: format!("key '{}' not found in scope data", key),
        })?;
    }

    let obj = current.as_object().ok_or_else(|| EvalError::UnableToResolve {
        message: format!("cannot navigate through non-object at key '{}'", last),
    })?;
    let leaf = obj.get(last).ok_or_else(|| EvalError::UnableToResolve {
        message: format!("key '{}' not found in scope data", last),
    })?;

    Value::from_json(leaf).map_err(|e| EvalError::UnableToResolve {
        message: format!("value at key '{}' has no runtime representation: {}", last, e),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
