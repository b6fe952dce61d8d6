//! Waypoint scenario evaluator -- accepts authored scenario JSON plus a
//! learner attempt, produces triggered actions and a progression decision.
//!
//! The evaluator consumes the authored courseware format (not an internal
//! model), evaluates scenario conditions against the attempt's context,
//! resolves matched scenarios' action values (literal or learner scope
//! sourced), and selects the single progress action that moves the learner
//! through the pathway.

pub mod action;
pub mod condition;
pub mod defaults;
pub mod mutation;
pub mod operator;
pub mod resolver;
pub mod scenario;
pub mod types;

pub use action::{
    deserialize_action, deserialize_actions, ActionContext, ActionKind, ProgressionType,
    ResolvedAction, ResolverContext, UnresolvedAction,
};
pub use defaults::{NoPathwayDefaults, PathwayDefaults, StaticPathwayDefaults};
pub use scenario::{
    evaluate_scenarios, EvaluationFailure, EvaluationPhase, EvaluationRequest, EvaluationResult,
    ProgressDecision, Walkable, WalkableKind,
};
pub use types::{
    parse_scenarios, Condition, DataType, EvalError, EvaluationContext, MutationOperator, Operand,
    Operator, Scenario, Value,
};

/// Evaluate an authored interactive document for one learner attempt.
///
/// This is the top-level public API: parse the document's scenario list,
/// then run the full evaluation pipeline against the request's context.
/// Parse faults surface as an `EvaluationFailure` in the `Pending` phase
/// since the attempt never got to condition evaluation.
///
/// # Arguments
/// * `doc` - Authored interactive JSON (`{"scenarios": [...]}`)
/// * `request` - The attempt's identity, target walkable, and context values
/// * `store` - Learner scope storage, consulted by SCOPE resolvers
/// * `defaults` - Pathway default-action provider for the no-match path
pub async fn evaluate(
    doc: &serde_json::Value,
    request: &EvaluationRequest,
    store: &dyn waypoint_storage::ScopeStore,
    defaults: &dyn PathwayDefaults,
) -> Result<EvaluationResult, EvaluationFailure> {
    let scenarios = parse_scenarios(doc).map_err(|fault| EvaluationFailure {
        phase: EvaluationPhase::Pending,
        fault,
    })?;
    evaluate_scenarios(&scenarios, request, store, defaults).await
}

// ──────────────────────────────────────────────
// Integration tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod integration_tests {
    use super::*;
    use waypoint_storage::MemoryScopeStore;

    fn request(context: EvaluationContext) -> EvaluationRequest {
        EvaluationRequest {
            deployment_id: "deployment-1".to_string(),
            student_id: "student-1".to_string(),
            attempt_id: "attempt-1".to_string(),
            walkable: Walkable {
                id: "interactive-1".to_string(),
                kind: WalkableKind::Interactive,
            },
            pathway_id: Some("pathway-1".to_string()),
            context,
        }
    }

    /// End-to-end run over a hand-authored multiple-choice document: the
    /// correct-answer scenario matches, grades from the learner's scope
    /// entry, awards score, and completes the interactive.
    #[tokio::test]
    async fn evaluate_correct_answer_document() {
        let doc = serde_json::json!({
            "scenarios": [
                {
                    "id": "scenario-correct",
                    "name": "chose option a",
                    "condition": {
                        "type": "EVALUATOR",
                        "operator": "IS",
                        "operandType": "STRING",
                        "lhs": {"contextRef": "selection"},
                        "rhs": {"value": "option-a"}
                    },
                    "actions": [
                        {
                            "action": "CHANGE_PROGRESS",
                            "resolver": {
                                "type": "LITERAL",
                                "dataType": "STRING",
                                "value": "INTERACTIVE_COMPLETE"
                            },
                            "context": {"progressionType": "INTERACTIVE_COMPLETE"}
                        },
                        {
                            "action": "CHANGE_SCORE",
                            "resolver": {
                                "type": "LITERAL",
                                "dataType": "NUMBER",
                                "value": 10
                            },
                            "context": {"operator": "ADD"}
                        },
                        {
                            "action": "GRADE",
                            "resolver": {
                                "type": "SCOPE",
                                "studentScopeUrn": "urn:scope:choice",
                                "sourceId": "choice-widget",
                                "path": ["response", "selection"],
                                "dataType": "STRING"
                            }
                        }
                    ]
                },
                {
                    "id": "scenario-wrong",
                    "name": "anything else",
                    "condition": {
                        "type": "EVALUATOR",
                        "operator": "IS_NOT",
                        "operandType": "STRING",
                        "lhs": {"contextRef": "selection"},
                        "rhs": {"value": "option-a"}
                    },
                    "actions": [
                        {
                            "action": "CHANGE_PROGRESS",
                            "resolver": {
                                "type": "LITERAL",
                                "dataType": "STRING",
                                "value": "INTERACTIVE_REPEAT"
                            },
                            "context": {"progressionType": "INTERACTIVE_REPEAT"}
                        }
                    ]
                }
            ]
        });

        let store = MemoryScopeStore::new();
        store.put_scope_id("deployment-1", "student-1", "urn:scope:choice", "scope-9");
        store.put_entry(
            "scope-9",
            "choice-widget",
            r#"{"response":{"selection":"option-a"}}"#,
        );

        let mut context = EvaluationContext::new();
        context.insert(
            "selection".to_string(),
            Value::String("option-a".to_string()),
        );

        let result = evaluate(&doc, &request(context), &store, &NoPathwayDefaults)
            .await
            .unwrap();

        assert_eq!(result.matched_scenarios, vec!["scenario-correct"]);
        assert_eq!(result.triggered.len(), 3);
        assert!(result.interactive_complete);
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveComplete
        );
        assert_eq!(result.progress.as_ref().unwrap().walkable.id, "interactive-1");

        let grade = result
            .triggered
            .iter()
            .find(|a| a.context.kind() == ActionKind::Grade)
            .unwrap();
        assert_eq!(grade.value, Value::String("option-a".to_string()));

        let score = result
            .triggered
            .iter()
            .find(|a| a.context.kind() == ActionKind::ChangeScore)
            .unwrap();
        assert_eq!(score.apply(&Value::Number(5.0)).unwrap(), Value::Number(15.0));
    }

    /// A chained condition over context values gates the scenario.
    #[tokio::test]
    async fn evaluate_chained_condition_document() {
        let doc = serde_json::json!({
            "scenarios": [
                {
                    "id": "scenario-exhausted",
                    "name": "wrong and out of attempts",
                    "condition": {
                        "type": "CHAINED_CONDITION",
                        "operator": "AND",
                        "conditions": [
                            {
                                "type": "EVALUATOR",
                                "operator": "IS_NOT",
                                "operandType": "STRING",
                                "lhs": {"contextRef": "selection"},
                                "rhs": {"value": "option-a"}
                            },
                            {
                                "type": "EVALUATOR",
                                "operator": "GE",
                                "operandType": "NUMBER",
                                "lhs": {"contextRef": "attempts"},
                                "rhs": {"value": 3}
                            }
                        ]
                    },
                    "actions": [
                        {
                            "action": "CHANGE_PROGRESS",
                            "resolver": {
                                "type": "LITERAL",
                                "dataType": "STRING",
                                "value": "INTERACTIVE_COMPLETE"
                            },
                            "context": {"progressionType": "INTERACTIVE_COMPLETE"}
                        },
                        {
                            "action": "SEND_FEEDBACK",
                            "resolver": {
                                "type": "LITERAL",
                                "dataType": "STRING",
                                "value": "Out of attempts, moving on."
                            }
                        }
                    ]
                }
            ]
        });

        let store = MemoryScopeStore::new();
        let mut context = EvaluationContext::new();
        context.insert(
            "selection".to_string(),
            Value::String("option-c".to_string()),
        );
        context.insert("attempts".to_string(), Value::Number(3.0));

        let result = evaluate(&doc, &request(context), &store, &NoPathwayDefaults)
            .await
            .unwrap();
        assert_eq!(result.matched_scenarios, vec!["scenario-exhausted"]);
        assert!(result.interactive_complete);
        assert_eq!(result.triggered.len(), 2);
    }

    /// No scenario matched, no pathway default: the attempt still yields a
    /// progression decision, not an empty result.
    #[tokio::test]
    async fn evaluate_falls_back_to_repeat() {
        let doc = serde_json::json!({
            "scenarios": [
                {
                    "id": "scenario-1",
                    "condition": {
                        "type": "EVALUATOR",
                        "operator": "IS",
                        "operandType": "STRING",
                        "lhs": {"contextRef": "selection"},
                        "rhs": {"value": "option-a"}
                    },
                    "actions": []
                }
            ]
        });

        let store = MemoryScopeStore::new();
        let mut context = EvaluationContext::new();
        context.insert(
            "selection".to_string(),
            Value::String("option-b".to_string()),
        );
        let mut req = request(context);
        req.pathway_id = None;

        let result = evaluate(&doc, &req, &store, &NoPathwayDefaults)
            .await
            .unwrap();
        assert!(result.matched_scenarios.is_empty());
        assert_eq!(
            result.progress.as_ref().unwrap().progression_type,
            ProgressionType::InteractiveRepeat
        );
        assert!(!result.interactive_complete);
    }

    /// A malformed document fails before conditions are ever evaluated.
    #[tokio::test]
    async fn evaluate_malformed_document() {
        let doc = serde_json::json!({"scenes": []});
        let store = MemoryScopeStore::new();
        let failure = evaluate(
            &doc,
            &request(EvaluationContext::new()),
            &store,
            &NoPathwayDefaults,
        )
        .await
        .unwrap_err();
        assert_eq!(failure.phase, EvaluationPhase::Pending);
        assert!(matches!(failure.fault, EvalError::Parse { .. }));
    }
}
