//! Authored action deserialization.
//!
//! Actions arrive as a heterogeneous JSON array discriminated by the
//! `action` tag. An unrecognized tag decodes to `Unsupported` instead of
//! failing the array -- one forward-incompatible action must not break
//! evaluation of the rest. A *missing* `action` or `resolver.type`
//! discriminator is different: without those the element cannot be typed at
//! all, and the whole parse faults.
//!
//! Actions are modeled as two types: an `UnresolvedAction` straight out of
//! the parser, and a `ResolvedAction` once the resolver has produced its
//! operand value. There is no mutable "resolved value" slot.

use serde::Serialize;

use crate::mutation;
use crate::types::{get_str, DataType, EvalError, MutationOperator, Value};

// ──────────────────────────────────────────────
// Action vocabulary
// ──────────────────────────────────────────────

/// Discriminator tags of the authored action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ChangeProgress,
    ChangeScore,
    ChangeCompetency,
    ChangeScope,
    SendFeedback,
    Grade,
    Unsupported,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ChangeProgress => "CHANGE_PROGRESS",
            ActionKind::ChangeScore => "CHANGE_SCORE",
            ActionKind::ChangeCompetency => "CHANGE_COMPETENCY",
            ActionKind::ChangeScope => "CHANGE_SCOPE",
            ActionKind::SendFeedback => "SEND_FEEDBACK",
            ActionKind::Grade => "GRADE",
            ActionKind::Unsupported => "UNSUPPORTED_ACTION",
        }
    }
}

/// How a progress action moves the learner through the pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressionType {
    InteractiveComplete,
    InteractiveCompleteAndPathwayComplete,
    InteractiveCompleteAndGoTo,
    InteractiveRepeat,
    ActivityComplete,
    ActivityRepeat,
}

impl ProgressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressionType::InteractiveComplete => "INTERACTIVE_COMPLETE",
            ProgressionType::InteractiveCompleteAndPathwayComplete => {
                "INTERACTIVE_COMPLETE_AND_PATHWAY_COMPLETE"
            }
            ProgressionType::InteractiveCompleteAndGoTo => "INTERACTIVE_COMPLETE_AND_GO_TO",
            ProgressionType::InteractiveRepeat => "INTERACTIVE_REPEAT",
            ProgressionType::ActivityComplete => "ACTIVITY_COMPLETE",
            ProgressionType::ActivityRepeat => "ACTIVITY_REPEAT",
        }
    }

    pub fn from_str(s: &str) -> Result<ProgressionType, EvalError> {
        match s {
            "INTERACTIVE_COMPLETE" => Ok(ProgressionType::InteractiveComplete),
            "INTERACTIVE_COMPLETE_AND_PATHWAY_COMPLETE" => {
                Ok(ProgressionType::InteractiveCompleteAndPathwayComplete)
            }
            "INTERACTIVE_COMPLETE_AND_GO_TO" => Ok(ProgressionType::InteractiveCompleteAndGoTo),
            "INTERACTIVE_REPEAT" => Ok(ProgressionType::InteractiveRepeat),
            "ACTIVITY_COMPLETE" => Ok(ProgressionType::ActivityComplete),
            "ACTIVITY_REPEAT" => Ok(ProgressionType::ActivityRepeat),
            other => Err(EvalError::Parse {
                message: format!("unknown progression type '{}'", other),
            }),
        }
    }

    /// Whether this progression marks the interactive as complete.
    pub fn signals_completion(&self) -> bool {
        match self {
            ProgressionType::InteractiveComplete
            | ProgressionType::InteractiveCompleteAndPathwayComplete
            | ProgressionType::InteractiveCompleteAndGoTo
            | ProgressionType::ActivityComplete => true,
            ProgressionType::InteractiveRepeat | ProgressionType::ActivityRepeat => false,
        }
    }
}

// ──────────────────────────────────────────────
// Resolver and action contexts
// ──────────────────────────────────────────────

/// How an action's operand value is obtained.
///
/// Constructed at parse time, consumed once during resolution, never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverContext {
    /// Value embedded directly in the action definition.
    Literal { value: Value, data_type: DataType },
    /// Pointer into the learner's persisted scope data.
    Scope {
        scope_urn: String,
        source_id: String,
        /// Ordered key path into the scope entry's JSON document.
        path: Vec<String>,
        data_type: DataType,
    },
}

/// Action-kind-specific parameters.
///
/// Serializes with the same `action` tag the authored format uses, so a
/// reported action list reads like the document that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "action",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ActionContext {
    ChangeProgress {
        progression_type: ProgressionType,
    },
    ChangeScore {
        operator: MutationOperator,
    },
    ChangeCompetency {
        document_id: String,
        item_id: String,
    },
    ChangeScope {
        #[serde(rename = "studentScopeUrn")]
        scope_urn: String,
        source_id: String,
        schema_path: Vec<String>,
        data_type: DataType,
        operator: MutationOperator,
    },
    SendFeedback,
    Grade,
    /// Unknown action kind; the raw element is kept for diagnostics.
    #[serde(rename = "UNSUPPORTED_ACTION")]
    Unsupported { raw: serde_json::Value },
}

impl ActionContext {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionContext::ChangeProgress { .. } => ActionKind::ChangeProgress,
            ActionContext::ChangeScore { .. } => ActionKind::ChangeScore,
            ActionContext::ChangeCompetency { .. } => ActionKind::ChangeCompetency,
            ActionContext::ChangeScope { .. } => ActionKind::ChangeScope,
            ActionContext::SendFeedback => ActionKind::SendFeedback,
            ActionContext::Grade => ActionKind::Grade,
            ActionContext::Unsupported { .. } => ActionKind::Unsupported,
        }
    }

    /// The (data type, operator, is_list) triple for mutation-bearing kinds.
    ///
    /// `CHANGE_SCORE` always mutates a NUMBER. `CHANGE_SCOPE` mutates the
    /// authored target type, on the list table when that type is LIST.
    pub fn mutation_signature(&self) -> Option<(DataType, MutationOperator, bool)> {
        match self {
            ActionContext::ChangeScore { operator } => {
                Some((DataType::Number, *operator, false))
            }
            ActionContext::ChangeScope {
                data_type, operator, ..
            } => Some((*data_type, *operator, *data_type == DataType::List)),
            _ => None,
        }
    }
}

/// A parsed action awaiting value resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedAction {
    pub context: ActionContext,
    pub resolver: ResolverContext,
}

/// An action whose operand value has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAction {
    #[serde(flatten)]
    pub context: ActionContext,
    pub value: Value,
}

impl ResolvedAction {
    pub fn is_progress(&self) -> bool {
        self.context.kind() == ActionKind::ChangeProgress
    }

    /// Apply this action's mutation semantics to a current stored value.
    ///
    /// Only mutation-bearing kinds (`CHANGE_SCORE`, `CHANGE_SCOPE`) can be
    /// applied; the engine computes the new value and the caller persists it.
    pub fn apply(&self, current: &Value) -> Result<Value, EvalError> {
        let (data_type, operator, is_list) =
            self.context
                .mutation_signature()
                .ok_or_else(|| EvalError::Type {
                    message: format!(
                        "action {} has no mutation semantics",
                        self.context.kind().as_str()
                    ),
                })?;
        let apply = mutation::select(data_type, operator, is_list)?;
        apply(current, &self.value)
    }
}

// ──────────────────────────────────────────────
// Deserialization
// ──────────────────────────────────────────────

/// Deserialize an authored action array.
///
/// An unrecognized `action` discriminator yields `Unsupported` at that
/// position without failing the rest; a missing `action` or `resolver.type`
/// discriminator is a hard parse fault.
pub fn deserialize_actions(v: &serde_json::Value) -> Result<Vec<UnresolvedAction>, EvalError> {
    let arr = v.as_array().ok_or_else(|| EvalError::Parse {
        message: "actions must be a JSON array".to_string(),
    })?;
    arr.iter().map(deserialize_action).collect()
}

/// Deserialize a single authored action element.
pub fn deserialize_action(v: &serde_json::Value) -> Result<UnresolvedAction, EvalError> {
    let kind_tag = get_str(v, "action").map_err(|_| EvalError::Parse {
        message: "action element missing 'action' discriminator".to_string(),
    })?;

    let resolver_val = v.get("resolver").ok_or_else(|| EvalError::Parse {
        message: format!("action '{}' missing 'resolver'", kind_tag),
    })?;
    let resolver = parse_resolver(resolver_val)?;

    let context_val = v.get("context");
    let context = match kind_tag.as_str() {
        "CHANGE_PROGRESS" => {
            let ctx = require_context(&kind_tag, context_val)?;
            let progression_type = ProgressionType::from_str(&get_str(ctx, "progressionType")?)?;
            ActionContext::ChangeProgress { progression_type }
        }
        "CHANGE_SCORE" => {
            let operator = decode_operator(context_val);
            ActionContext::ChangeScore { operator }
        }
        "CHANGE_COMPETENCY" => {
            let ctx = require_context(&kind_tag, context_val)?;
            ActionContext::ChangeCompetency {
                document_id: get_str(ctx, "documentId")?,
                item_id: get_str(ctx, "itemId")?,
            }
        }
        "CHANGE_SCOPE" => {
            let ctx = require_context(&kind_tag, context_val)?;
            ActionContext::ChangeScope {
                scope_urn: get_str(ctx, "studentScopeUrn")?,
                source_id: get_str(ctx, "sourceId")?,
                schema_path: parse_path(ctx.get("schemaPath"))?,
                data_type: DataType::from_str(&get_str(ctx, "dataType")?)?,
                operator: decode_operator(Some(ctx)),
            }
        }
        "SEND_FEEDBACK" => ActionContext::SendFeedback,
        "GRADE" => ActionContext::Grade,
        // Forward compatibility: newer/unknown kinds never abort the array.
        _ => ActionContext::Unsupported { raw: v.clone() },
    };

    Ok(UnresolvedAction { context, resolver })
}

fn require_context<'a>(
    kind: &str,
    v: Option<&'a serde_json::Value>,
) -> Result<&'a serde_json::Value, EvalError> {
    v.filter(|c| c.is_object()).ok_or_else(|| EvalError::Parse {
        message: format!("action '{}' missing 'context' object", kind),
    })
}

/// Decode the mutation-operator sub-field leniently: missing context,
/// missing field, null, or a garbled string all become SET.
fn decode_operator(ctx: Option<&serde_json::Value>) -> MutationOperator {
    MutationOperator::decode(ctx.and_then(|c| c.get("operator")).and_then(|o| o.as_str()))
}

fn parse_resolver(v: &serde_json::Value) -> Result<ResolverContext, EvalError> {
    let resolver_type = get_str(v, "type").map_err(|_| EvalError::Parse {
        message: "resolver missing 'type' discriminator".to_string(),
    })?;
    match resolver_type.as_str() {
        "LITERAL" => {
            let data_type = DataType::from_str(&get_str(v, "dataType")?)?;
            let value_val = v.get("value").ok_or_else(|| EvalError::Parse {
                message: "LITERAL resolver missing 'value'".to_string(),
            })?;
            let value = Value::from_json(value_val).map_err(|e| EvalError::Parse {
                message: format!("invalid LITERAL resolver value: {}", e),
            })?;
            Ok(ResolverContext::Literal { value, data_type })
        }
        "SCOPE" => Ok(ResolverContext::Scope {
            scope_urn: get_str(v, "studentScopeUrn")?,
            source_id: get_str(v, "sourceId")?,
            path: parse_path(v.get("path"))?,
            data_type: DataType::from_str(&get_str(v, "dataType")?)?,
        }),
        other => Err(EvalError::Parse {
            message: format!("unknown resolver type '{}'", other),
        }),
    }
}

fn parse_path(v: Option<&serde_json::Value>) -> Result<Vec<String>, EvalError> {
    let Some(v) = v else {
        return Ok(Vec::new());
    };
    let arr = v.as_array().ok_or_else(|| EvalError::Parse {
        message: "resolver path must be an array of strings".to_string(),
    })?;
    arr.iter()
        .map(|k| {
            k.as_str().map(|s| s.to_string()).ok_or_else(|| {
                EvalError::Parse {
                    message: format!("resolver path key must be a string: {}", k),
                }
            })
        })
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
