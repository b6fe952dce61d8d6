//! Scenario evaluation pipeline.
//!
//! Drives one evaluation attempt through its phases:
//! `Pending -> ConditionsEvaluated -> ActionsResolved -> ProgressSelected ->
//! Complete`, with `Failed` terminal from any phase on an unrecoverable
//! fault. An attempt either fully completes or fully fails; no partial
//! action list ever reaches the caller.
//!
//! Key invariant: scenario conditions are evaluated sequentially in
//! authoring order, because order decides which progress action wins.
//! Action resolution across different matched scenarios carries no value
//! dependency and runs concurrently, but results are reassembled in
//! authoring order before progress selection.

use std::fmt;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::action::{
    deserialize_action, deserialize_actions, ActionContext, ProgressionType, ResolvedAction,
    UnresolvedAction,
};
use crate::condition;
use crate::defaults::PathwayDefaults;
use crate::resolver;
use crate::types::{EvalError, EvaluationContext, Scenario, Value};
use waypoint_storage::ScopeStore;

// ──────────────────────────────────────────────
// Attempt state machine
// ──────────────────────────────────────────────

/// Phases of a single evaluation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationPhase {
    Pending,
    ConditionsEvaluated,
    ActionsResolved,
    ProgressSelected,
    Complete,
    Failed,
}

impl EvaluationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationPhase::Pending => "PENDING",
            EvaluationPhase::ConditionsEvaluated => "CONDITIONS_EVALUATED",
            EvaluationPhase::ActionsResolved => "ACTIONS_RESOLVED",
            EvaluationPhase::ProgressSelected => "PROGRESS_SELECTED",
            EvaluationPhase::Complete => "COMPLETE",
            EvaluationPhase::Failed => "FAILED",
        }
    }
}

/// A fault that aborted an evaluation attempt, tagged with the phase the
/// attempt was in when it struck.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    pub phase: EvaluationPhase,
    pub fault: EvalError,
}

impl fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluation aborted in phase {}: {}",
            self.phase.as_str(),
            self.fault
        )
    }
}

impl std::error::Error for EvaluationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.fault)
    }
}

// ──────────────────────────────────────────────
// Request and result types
// ──────────────────────────────────────────────

/// Kind of courseware element receiving the progression decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalkableKind {
    Interactive,
    Activity,
}

/// A courseware element that can receive a progression decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Walkable {
    pub id: String,
    pub kind: WalkableKind,
}

/// One evaluation attempt's inputs. Owned by the invocation; nothing here
/// is shared between concurrent attempts.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub deployment_id: String,
    pub student_id: String,
    pub attempt_id: String,
    /// The element being evaluated, targeted by the winning progress action.
    pub walkable: Walkable,
    /// Containing pathway, consulted for a default action on the
    /// no-scenario-matched path.
    pub pathway_id: Option<String>,
    /// The learner's response values for condition operands.
    pub context: EvaluationContext,
}

/// The winning progress action's context plus the element it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressDecision {
    pub progression_type: ProgressionType,
    pub walkable: Walkable,
}

/// Per-attempt aggregate handed to the caller once the attempt completes.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    /// Ids of scenarios whose condition held, in authoring order.
    pub matched_scenarios: Vec<String>,
    /// All triggered actions: the single kept progress action first (when
    /// one exists), then every non-progress action in original order.
    pub triggered: Vec<ResolvedAction>,
    pub interactive_complete: bool,
    pub progress: Option<ProgressDecision>,
    pub walkable: Walkable,
}

// ──────────────────────────────────────────────
// Pipeline
// ──────────────────────────────────────────────

/// Evaluate an interactive's scenario set for one learner attempt.
pub async fn evaluate_scenarios(
    scenarios: &[Scenario],
    request: &EvaluationRequest,
    store: &dyn ScopeStore,
    defaults: &dyn PathwayDefaults,
) -> Result<EvaluationResult, EvaluationFailure> {
    let mut phase = EvaluationPhase::Pending;
    debug!(
        attempt = %request.attempt_id,
        scenarios = scenarios.len(),
        phase = phase.as_str(),
        "evaluation attempt started"
    );

    // Pending -> ConditionsEvaluated. Sequential, in authoring order. A
    // condition fault demotes its scenario to "not matched"; the attempt
    // itself continues.
    let mut matched: Vec<&Scenario> = Vec::new();
    for scenario in scenarios {
        match condition::evaluate(&scenario.condition, &request.context) {
            Ok(true) => matched.push(scenario),
            Ok(false) => {}
            Err(fault) => {
                warn!(
                    scenario = %scenario.id,
                    attempt = %request.attempt_id,
                    %fault,
                    "condition fault, scenario treated as not matched"
                );
            }
        }
    }
    phase = EvaluationPhase::ConditionsEvaluated;
    debug!(
        attempt = %request.attempt_id,
        matched = matched.len(),
        phase = phase.as_str(),
        "conditions evaluated"
    );

    // ConditionsEvaluated -> ActionsResolved. Deserialize the matched
    // scenarios' actions, then resolve scenario-by-scenario concurrently;
    // try_join_all reassembles results in authoring order.
    let resolved_per_scenario = resolve_matched(&matched, request, store)
        .await
        .map_err(|fault| fail(phase, fault))?;
    let mut flattened: Vec<ResolvedAction> = resolved_per_scenario.into_iter().flatten().collect();

    // Pathway defaults apply only on the no-scenario-matched path, never
    // when scenarios matched but produced no progress action.
    if matched.is_empty() {
        if let Some(pathway_id) = &request.pathway_id {
            if let Some(raw) = defaults
                .default_action(pathway_id)
                .await
                .map_err(|fault| fail(phase, fault))?
            {
                let action = deserialize_action(&raw).map_err(|fault| fail(phase, fault))?;
                let resolved = resolver::resolve(
                    action,
                    store,
                    &request.deployment_id,
                    &request.student_id,
                )
                .await
                .map_err(|fault| fail(phase, fault))?;
                debug!(pathway = %pathway_id, "no scenario matched, using pathway default action");
                flattened.push(resolved);
            }
        }
    }
    phase = EvaluationPhase::ActionsResolved;
    debug!(
        attempt = %request.attempt_id,
        resolved = flattened.len(),
        phase = phase.as_str(),
        "actions resolved"
    );

    // ActionsResolved -> ProgressSelected. Exactly one progress decision is
    // honored per attempt: the first in flattened order. The rest drop.
    let mut progress_action: Option<ResolvedAction> = None;
    let mut others: Vec<ResolvedAction> = Vec::new();
    let mut dropped = 0usize;
    for action in flattened {
        if action.is_progress() {
            if progress_action.is_none() {
                progress_action = Some(action);
            } else {
                dropped += 1;
            }
        } else {
            others.push(action);
        }
    }
    if dropped > 0 {
        debug!(
            attempt = %request.attempt_id,
            dropped,
            "extra progress actions dropped, first one wins"
        );
    }

    // An attempt never concludes with "nothing happens": with no actions at
    // all, a synthetic INTERACTIVE_REPEAT progress action is injected.
    if progress_action.is_none() && others.is_empty() {
        progress_action = Some(default_repeat_action());
        debug!(attempt = %request.attempt_id, "no actions triggered, injecting INTERACTIVE_REPEAT");
    }
    phase = EvaluationPhase::ProgressSelected;
    debug!(
        attempt = %request.attempt_id,
        has_progress = progress_action.is_some(),
        phase = phase.as_str(),
        "progress selected"
    );

    // ProgressSelected -> Complete.
    let progress = progress_action.as_ref().and_then(|a| match &a.context {
        ActionContext::ChangeProgress { progression_type } => Some(ProgressDecision {
            progression_type: *progression_type,
            walkable: request.walkable.clone(),
        }),
        _ => None,
    });
    let interactive_complete = progress
        .as_ref()
        .map(|p| p.progression_type.signals_completion())
        .unwrap_or(false);

    let mut triggered = Vec::with_capacity(others.len() + 1);
    if let Some(action) = progress_action {
        triggered.push(action);
    }
    triggered.extend(others);

    phase = EvaluationPhase::Complete;
    debug!(
        attempt = %request.attempt_id,
        triggered = triggered.len(),
        interactive_complete,
        phase = phase.as_str(),
        "evaluation complete"
    );

    Ok(EvaluationResult {
        matched_scenarios: matched.iter().map(|s| s.id.clone()).collect(),
        triggered,
        interactive_complete,
        progress,
        walkable: request.walkable.clone(),
    })
}

/// Deserialize and resolve every matched scenario's actions.
///
/// Within one scenario, actions resolve sequentially in authored order;
/// across scenarios, resolution runs concurrently.
async fn resolve_matched(
    matched: &[&Scenario],
    request: &EvaluationRequest,
    store: &dyn ScopeStore,
) -> Result<Vec<Vec<ResolvedAction>>, EvalError> {
    let mut parsed: Vec<Vec<UnresolvedAction>> = Vec::with_capacity(matched.len());
    for scenario in matched {
        parsed.push(deserialize_actions(&scenario.actions)?);
    }

    try_join_all(parsed.into_iter().map(|actions| async move {
        let mut resolved = Vec::with_capacity(actions.len());
        for action in actions {
            resolved.push(
                resolver::resolve(action, store, &request.deployment_id, &request.student_id)
                    .await?,
            );
        }
        Ok::<Vec<ResolvedAction>, EvalError>(resolved)
    }))
    .await
}

fn fail(phase: EvaluationPhase, fault: EvalError) -> EvaluationFailure {
    warn!(phase = phase.as_str(), %fault, "evaluation attempt failed");
    EvaluationFailure { phase, fault }
}

fn default_repeat_action() -> ResolvedAction {
    ResolvedAction {
        context: ActionContext::ChangeProgress {
            progression_type: ProgressionType::InteractiveRepeat,
        },
        value: Value::String(ProgressionType::InteractiveRepeat.as_str().to_string()),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::defaults::{NoPathwayDefaults, StaticPathwayDefaults};
    use crate::types::{parse_condition, Condition};
    use waypoint_storage::MemoryScopeStore;

    fn condition(matches: bool) -> Condition {
        let rhs = if matches { "yes" } else { "no" };
        parse_condition(&serde_json::json!({
            "type": "EVALUATOR",
            "operator": "IS",
            "operandType": "STRING",
            "lhs": {"value": "yes"},
            "rhs": {"value": rhs}
        }))
        .unwrap()
    }

    fn scenario(id: &str, matches: bool, actions: serde_json::Value) -> Scenario {
        Scenario {
            id: id.to_string(),
            name: id.to_string(),
            condition: condition(matches),
            actions,
        }
    }

    fn progress_action(progression: &str) -> serde_json::Value {
        serde_json::json!({
            "action": "CHANGE_PROGRESS",
            "resolver": {"type": "LITERAL", "dataType": "STRING", "value": progression},
            "context": {"progressionType": progression}
        })
    }

    fn feedback_action(message: &str) -> serde_json::Value {
        serde_json::json!({
            "action": "SEND_FEEDBACK",
            "resolver": {"type": "LITERAL", "dataType": "STRING", "value": message}
        })
    }

    fn request() -> EvaluationRequest {
        EvaluationRequest {
            deployment_id: "dep-1".to_string(),
            student_id: "student-1".to_string(),
            attempt_id: "attempt-1".to_string(),
            walkable: Walkable {
                id: "interactive-1".to_string(),
                kind: WalkableKind::Interactive,
            },
            pathway_id: Some("pathway-1".to_string()),
            context: EvaluationContext::new(),
        }
    }

    #[tokio::test]
    async fn progress_action_is_a_singleton() {
        let scenarios = vec![
            scenario(
                "s1",
                true,
                serde_json::json!([
                    progress_action("INTERACTIVE_COMPLETE"),
                    feedback_action("first"),
                ]),
            ),
            scenario(
                "s2",
                true,
                serde_json::json!([
                    progress_action("INTERACTIVE_REPEAT"),
                    feedback_action("second"),
                ]),
            ),
        ];
        let store = MemoryScopeStore::new();
        let result = evaluate_scenarios(&scenarios, &request(), &store, &NoPathwayDefaults)
            .await
            .unwrap();

        assert_eq!(result.matched_scenarios, vec!["s1", "s2"]);
        let progress_count = result
            .triggered
            .iter()
            .filter(|a| a.is_progress())
            .count();
        assert_eq!(progress_count, 1);
        assert_eq!(result.triggered.len(), 3);

        // The first-in-authoring-order progress action wins, and leads the
        // triggered list.
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveComplete
        );
        assert!(result.triggered[0].is_progress());
        assert!(result.interactive_complete);

        // Non-progress actions keep scenario-then-within-scenario order.
        assert_eq!(
            result.triggered[1].value,
            Value::String("first".to_string())
        );
        assert_eq!(
            result.triggered[2].value,
            Value::String("second".to_string())
        );
    }

    #[tokio::test]
    async fn no_match_injects_interactive_repeat() {
        let scenarios = vec![scenario("s1", false, serde_json::json!([]))];
        let store = MemoryScopeStore::new();
        let mut req = request();
        req.pathway_id = None;
        let result = evaluate_scenarios(&scenarios, &req, &store, &NoPathwayDefaults)
            .await
            .unwrap();

        assert!(result.matched_scenarios.is_empty());
        assert_eq!(result.triggered.len(), 1);
        assert_eq!(result.triggered[0].context.kind(), ActionKind::ChangeProgress);
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveRepeat
        );
        assert!(!result.interactive_complete);
    }

    #[tokio::test]
    async fn pathway_default_takes_precedence_over_generic_fallback() {
        let scenarios = vec![scenario("s1", false, serde_json::json!([]))];
        let store = MemoryScopeStore::new();
        let defaults = StaticPathwayDefaults::single(
            "pathway-1",
            progress_action("INTERACTIVE_COMPLETE_AND_PATHWAY_COMPLETE"),
        );
        let result = evaluate_scenarios(&scenarios, &request(), &store, &defaults)
            .await
            .unwrap();

        assert_eq!(result.triggered.len(), 1);
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveCompleteAndPathwayComplete
        );
        assert!(result.interactive_complete);
    }

    #[tokio::test]
    async fn matched_without_progress_does_not_consult_pathway_default() {
        let scenarios = vec![scenario(
            "s1",
            true,
            serde_json::json!([feedback_action("only feedback")]),
        )];
        let store = MemoryScopeStore::new();
        let defaults = StaticPathwayDefaults::single(
            "pathway-1",
            progress_action("INTERACTIVE_COMPLETE"),
        );
        let result = evaluate_scenarios(&scenarios, &request(), &store, &defaults)
            .await
            .unwrap();

        // The matched scenario produced a usable action, so neither the
        // pathway default nor the generic fallback applies.
        assert_eq!(result.triggered.len(), 1);
        assert_eq!(result.triggered[0].context.kind(), ActionKind::SendFeedback);
        assert!(result.progress.is_none());
        assert!(!result.interactive_complete);
    }

    #[tokio::test]
    async fn condition_fault_demotes_scenario_only() {
        // CONTAINS has no NUMBER implementation; that scenario is treated
        // as unmatched and the attempt carries on.
        let faulty_condition = parse_condition(&serde_json::json!({
            "type": "EVALUATOR",
            "operator": "CONTAINS",
            "operandType": "NUMBER",
            "lhs": {"value": 1},
            "rhs": {"value": 2}
        }))
        .unwrap();
        let scenarios = vec![
            Scenario {
                id: "faulty".to_string(),
                name: "faulty".to_string(),
                condition: faulty_condition,
                actions: serde_json::json!([progress_action("INTERACTIVE_REPEAT")]),
            },
            scenario(
                "healthy",
                true,
                serde_json::json!([progress_action("INTERACTIVE_COMPLETE")]),
            ),
        ];
        let store = MemoryScopeStore::new();
        let result = evaluate_scenarios(&scenarios, &request(), &store, &NoPathwayDefaults)
            .await
            .unwrap();

        assert_eq!(result.matched_scenarios, vec!["healthy"]);
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveComplete
        );
    }

    #[tokio::test]
    async fn resolver_fault_aborts_the_attempt() {
        let scope_action = serde_json::json!({
            "action": "GRADE",
            "resolver": {
                "type": "SCOPE",
                "studentScopeUrn": "urn:scope:selection",
                "sourceId": "source-1",
                "path": ["selection"],
                "dataType": "STRING"
            }
        });
        let scenarios = vec![scenario(
            "s1",
            true,
            serde_json::json!([scope_action, feedback_action("unreachable")]),
        )];
        // Empty store: scope id lookup fails.
        let store = MemoryScopeStore::new();
        let failure = evaluate_scenarios(&scenarios, &request(), &store, &NoPathwayDefaults)
            .await
            .unwrap_err();

        assert_eq!(failure.phase, EvaluationPhase::ConditionsEvaluated);
        assert!(matches!(failure.fault, EvalError::UnableToResolve { .. }));
    }

    #[tokio::test]
    async fn parse_fault_in_matched_scenario_aborts() {
        let scenarios = vec![scenario(
            "s1",
            true,
            serde_json::json!([{ "resolver": {"type": "LITERAL"} }]),
        )];
        let store = MemoryScopeStore::new();
        let failure = evaluate_scenarios(&scenarios, &request(), &store, &NoPathwayDefaults)
            .await
            .unwrap_err();
        assert!(matches!(failure.fault, EvalError::Parse { .. }));
    }

    #[tokio::test]
    async fn scope_sourced_action_resolves_through_store() {
        let scope_action = serde_json::json!({
            "action": "GRADE",
            "resolver": {
                "type": "SCOPE",
                "studentScopeUrn": "urn:scope:selection",
                "sourceId": "source-1",
                "path": ["response", "selection"],
                "dataType": "STRING"
            }
        });
        let scenarios = vec![scenario("s1", true, serde_json::json!([scope_action]))];
        let store = MemoryScopeStore::new();
        store.put_scope_id("dep-1", "student-1", "urn:scope:selection", "scope-1");
        store.put_entry("scope-1", "source-1", r#"{"response":{"selection":"b"}}"#);

        let result = evaluate_scenarios(&scenarios, &request(), &store, &NoPathwayDefaults)
            .await
            .unwrap();
        let grade = result
            .triggered
            .iter()
            .find(|a| a.context.kind() == ActionKind::Grade)
            .unwrap();
        assert_eq!(grade.value, Value::String("b".to_string()));
    }

    #[test]
    fn failure_display_names_phase() {
        let failure = EvaluationFailure {
            phase: EvaluationPhase::ConditionsEvaluated,
            fault: EvalError::UnableToResolve {
                message: "scope id not found".to_string(),
            },
        };
        assert_eq!(
            failure.to_string(),
            "evaluation aborted in phase CONDITIONS_EVALUATED: unable to resolve: scope id not found"
        );
    }
}
