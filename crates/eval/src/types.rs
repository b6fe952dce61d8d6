//! Vocabulary, runtime values, and authored-document representation for the
//! Waypoint scenario evaluator.
//!
//! The evaluator consumes authored scenario JSON, not an internal authoring
//! model. Everything here is deserialized from that externally versioned
//! format with plain `serde_json::Value` navigation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur during scenario evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Malformed or missing required discriminator/field in authored JSON.
    Parse { message: String },
    /// No comparison implementation registered for this (type, operator) pair.
    UnsupportedOperation {
        operator: Operator,
        data_type: Option<DataType>,
    },
    /// No mutation implementation registered for this (type, operator) pair.
    UnsupportedMutation {
        operator: MutationOperator,
        data_type: Option<DataType>,
        is_list: bool,
    },
    /// Scope id / scope entry not found, or path navigation failed during
    /// SCOPE resolution.
    UnableToResolve { message: String },
    /// Operand value does not fit the operation applied to it.
    Type { message: String },
    /// The scope storage collaborator failed.
    Storage { message: String },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Parse { message } => write!(f, "parse fault: {}", message),
            EvalError::UnsupportedOperation {
                operator,
                data_type,
            } => match data_type {
                Some(dt) => write!(
                    f,
                    "unsupported operation: no implementation for operator {} on type {}",
                    operator.as_str(),
                    dt.as_str()
                ),
                None => write!(
                    f,
                    "unsupported operation: no implementation for operator {}",
                    operator.as_str()
                ),
            },
            EvalError::UnsupportedMutation {
                operator,
                data_type,
                is_list,
            } => {
                if *is_list {
                    write!(
                        f,
                        "unsupported mutation: no list implementation for operator {}",
                        operator.as_str()
                    )
                } else {
                    match data_type {
                        Some(dt) => write!(
                            f,
                            "unsupported mutation: no implementation for operator {} on type {}",
                            operator.as_str(),
                            dt.as_str()
                        ),
                        None => write!(
                            f,
                            "unsupported mutation: no implementation for operator {}",
                            operator.as_str()
                        ),
                    }
                }
            }
            EvalError::UnableToResolve { message } => {
                write!(f, "unable to resolve: {}", message)
            }
            EvalError::Type { message } => write!(f, "type error: {}", message),
            EvalError::Storage { message } => write!(f, "scope storage error: {}", message),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<waypoint_storage::StorageError> for EvalError {
    fn from(err: waypoint_storage::StorageError) -> Self {
        EvalError::Storage {
            message: err.to_string(),
        }
    }
}

// ──────────────────────────────────────────────
// Data types and operators
// ──────────────────────────────────────────────

/// Operand kinds attached to condition comparisons and action values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Number,
    Boolean,
    List,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Number => "NUMBER",
            DataType::Boolean => "BOOLEAN",
            DataType::List => "LIST",
        }
    }

    /// Decode an authored data-type string. Unknown strings are a parse fault.
    pub fn from_str(s: &str) -> Result<DataType, EvalError> {
        match s {
            "STRING" => Ok(DataType::String),
            "NUMBER" => Ok(DataType::Number),
            "BOOLEAN" => Ok(DataType::Boolean),
            "LIST" => Ok(DataType::List),
            other => Err(EvalError::Parse {
                message: format!("unknown data type '{}'", other),
            }),
        }
    }
}

/// The closed operator vocabulary of authored conditions.
///
/// `And`, `Or`, and `Not` are composition operators handled by the condition
/// evaluator; the rest are binary comparisons dispatched through the operator
/// tables in `operator.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEquals,
    LessThanOrEquals,
    Contains,
    NotContains,
    ContainsAnyOf,
    NotContainsAnyOf,
    ContainsOneOf,
    NotContainsOneOf,
    IncludesAllOf,
    NotIncludesAllOf,
    IncludesAnyOf,
    NotIncludesAnyOf,
    StartsWith,
    EndsWith,
    Is,
    IsNot,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::GreaterThan => "GT",
            Operator::LessThan => "LT",
            Operator::GreaterThanOrEquals => "GE",
            Operator::LessThanOrEquals => "LE",
            Operator::Contains => "CONTAINS",
            Operator::NotContains => "NOT_CONTAINS",
            Operator::ContainsAnyOf => "CONTAINS_ANY_OF",
            Operator::NotContainsAnyOf => "NOT_CONTAINS_ANY_OF",
            Operator::ContainsOneOf => "CONTAINS_ONE_OF",
            Operator::NotContainsOneOf => "NOT_CONTAINS_ONE_OF",
            Operator::IncludesAllOf => "INCLUDES_ALL_OF",
            Operator::NotIncludesAllOf => "NOT_INCLUDES_ALL_OF",
            Operator::IncludesAnyOf => "INCLUDES_ANY_OF",
            Operator::NotIncludesAnyOf => "NOT_INCLUDES_ANY_OF",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::Is => "IS",
            Operator::IsNot => "IS_NOT",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }

    /// Decode an authored operator string. Unknown strings are a parse fault.
    pub fn from_str(s: &str) -> Result<Operator, EvalError> {
        match s {
            "EQUALS" => Ok(Operator::Equals),
            "NOT_EQUALS" => Ok(Operator::NotEquals),
            "GT" => Ok(Operator::GreaterThan),
            "LT" => Ok(Operator::LessThan),
            "GE" => Ok(Operator::GreaterThanOrEquals),
            "LE" => Ok(Operator::LessThanOrEquals),
            "CONTAINS" => Ok(Operator::Contains),
            "NOT_CONTAINS" => Ok(Operator::NotContains),
            "CONTAINS_ANY_OF" => Ok(Operator::ContainsAnyOf),
            "NOT_CONTAINS_ANY_OF" => Ok(Operator::NotContainsAnyOf),
            "CONTAINS_ONE_OF" => Ok(Operator::ContainsOneOf),
            "NOT_CONTAINS_ONE_OF" => Ok(Operator::NotContainsOneOf),
            "INCLUDES_ALL_OF" => Ok(Operator::IncludesAllOf),
            "NOT_INCLUDES_ALL_OF" => Ok(Operator::NotIncludesAllOf),
            "INCLUDES_ANY_OF" => Ok(Operator::IncludesAnyOf),
            "NOT_INCLUDES_ANY_OF" => Ok(Operator::NotIncludesAnyOf),
            "STARTS_WITH" => Ok(Operator::StartsWith),
            "ENDS_WITH" => Ok(Operator::EndsWith),
            "IS" => Ok(Operator::Is),
            "IS_NOT" => Ok(Operator::IsNot),
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            "NOT" => Ok(Operator::Not),
            other => Err(EvalError::Parse {
                message: format!("unknown operator '{}'", other),
            }),
        }
    }
}

/// Logical connective of a chained condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Mutation semantics applied when changing a stored value.
///
/// Decoding is deliberately lenient: a missing, empty, or unrecognized
/// operator string decodes to `Set`. Legacy authored payloads carry all
/// three shapes and must keep evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationOperator {
    Add,
    Remove,
    Set,
}

impl MutationOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOperator::Add => "ADD",
            MutationOperator::Remove => "REMOVE",
            MutationOperator::Set => "SET",
        }
    }

    /// Decode an authored operator string, defaulting to `Set`.
    ///
    /// This never fails. Contrast with the mutation tables in `mutation.rs`,
    /// where a missing *implementation* is a loud `UnsupportedMutation`.
    pub fn decode(s: Option<&str>) -> MutationOperator {
        match s {
            Some("ADD") => MutationOperator::Add,
            Some("REMOVE") => MutationOperator::Remove,
            _ => MutationOperator::Set,
        }
    }
}

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// Runtime value for operands, resolved action values, and scope data.
///
/// NUMBER operands are double-precision, matching the authored format.
///
/// Serializes untagged, so a reported value looks exactly like the JSON it
/// was resolved from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    List(Vec<Value>),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "STRING",
            Value::Number(_) => "NUMBER",
            Value::Boolean(_) => "BOOLEAN",
            Value::List(_) => "LIST",
        }
    }

    /// Extracts a boolean or returns a type error.
    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(EvalError::Type {
                message: format!("expected BOOLEAN, got {}", other.type_name()),
            }),
        }
    }

    /// Extracts a number or returns a type error.
    pub fn as_number(&self) -> Result<f64, EvalError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::Type {
                message: format!("expected NUMBER, got {}", other.type_name()),
            }),
        }
    }

    /// Extracts a string slice or returns a type error.
    pub fn as_str(&self) -> Result<&str, EvalError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(EvalError::Type {
                message: format!("expected STRING, got {}", other.type_name()),
            }),
        }
    }

    /// Extracts list elements or returns a type error.
    pub fn as_list(&self) -> Result<&[Value], EvalError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(EvalError::Type {
                message: format!("expected LIST, got {}", other.type_name()),
            }),
        }
    }

    /// Convert a JSON value into a runtime value.
    ///
    /// Objects and nulls have no runtime representation -- navigating to one
    /// is the resolver's problem and surfaces there as a distinct fault.
    pub fn from_json(v: &serde_json::Value) -> Result<Value, EvalError> {
        match v {
            serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                let f = n.as_f64().ok_or_else(|| EvalError::Type {
                    message: format!("number {} is not representable as f64", n),
                })?;
                Ok(Value::Number(f))
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Array(arr) => {
                let items: Result<Vec<Value>, _> = arr.iter().map(Value::from_json).collect();
                Ok(Value::List(items?))
            }
            serde_json::Value::Null => Err(EvalError::Type {
                message: "null has no runtime value".to_string(),
            }),
            serde_json::Value::Object(_) => Err(EvalError::Type {
                message: "JSON object has no runtime value".to_string(),
            }),
        }
    }

    /// Convert a runtime value back to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => serde_json::json!(n),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

// ──────────────────────────────────────────────
// Condition expression tree
// ──────────────────────────────────────────────

/// A comparison operand: a literal embedded in the authored condition, or a
/// reference into the per-attempt evaluation context.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    ContextRef(String),
}

/// Authored condition expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Binary comparison leaf dispatched through the operator tables.
    Comparison {
        operator: Operator,
        data_type: DataType,
        lhs: Operand,
        rhs: Operand,
    },
    /// AND/OR over an ordered child list.
    Group {
        operator: LogicalOperator,
        conditions: Vec<Condition>,
    },
    /// Negation of a single child.
    Not { operand: Box<Condition> },
}

// ──────────────────────────────────────────────
// Evaluation context
// ──────────────────────────────────────────────

/// Per-attempt map of learner response values keyed by context name.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext(pub BTreeMap<String, Value>);

impl EvaluationContext {
    pub fn new() -> Self {
        EvaluationContext(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: String, value: Value) {
        self.0.insert(name, value);
    }
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

/// An authored (condition, action-list) pair.
///
/// Actions stay as raw JSON until the scenario's condition is known to be
/// true -- only matched scenarios pay the action deserialization cost, and a
/// bad action in a never-matching scenario never surfaces.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub condition: Condition,
    pub actions: serde_json::Value,
}

// ──────────────────────────────────────────────
// Authored JSON parsing
// ──────────────────────────────────────────────

pub(crate) fn get_str(obj: &serde_json::Value, field: &str) -> Result<String, EvalError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| EvalError::Parse {
            message: format!("missing string field '{}'", field),
        })
}

/// Parse the scenario list out of an authored interactive document.
///
/// The document shape is `{"scenarios": [...]}`; each scenario carries an
/// `id`, a `name`, a `condition` tree, and an ordered `actions` array.
pub fn parse_scenarios(doc: &serde_json::Value) -> Result<Vec<Scenario>, EvalError> {
    let arr = doc
        .get("scenarios")
        .and_then(|s| s.as_array())
        .ok_or_else(|| EvalError::Parse {
            message: "document missing 'scenarios' array".to_string(),
        })?;
    arr.iter().map(parse_scenario).collect()
}

/// Parse a single authored scenario.
pub fn parse_scenario(v: &serde_json::Value) -> Result<Scenario, EvalError> {
    let id = get_str(v, "id")?;
    let name = v
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_string();
    let condition_val = v.get("condition").ok_or_else(|| EvalError::Parse {
        message: format!("scenario '{}' missing 'condition'", id),
    })?;
    let condition = parse_condition(condition_val)?;
    let actions = v
        .get("actions")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    Ok(Scenario {
        id,
        name,
        condition,
        actions,
    })
}

/// Parse an authored condition expression tree.
///
/// Two node shapes exist: `EVALUATOR` comparison leaves and
/// `CHAINED_CONDITION` groups (`AND`/`OR` with a child list, `NOT` with
/// exactly one child).
pub fn parse_condition(v: &serde_json::Value) -> Result<Condition, EvalError> {
    let node_type = get_str(v, "type")?;
    match node_type.as_str() {
        "EVALUATOR" => {
            let operator = Operator::from_str(&get_str(v, "operator")?)?;
            let data_type = DataType::from_str(&get_str(v, "operandType")?)?;
            let lhs = parse_operand(v.get("lhs").ok_or_else(|| EvalError::Parse {
                message: "evaluator condition missing 'lhs'".to_string(),
            })?)?;
            let rhs = parse_operand(v.get("rhs").ok_or_else(|| EvalError::Parse {
                message: "evaluator condition missing 'rhs'".to_string(),
            })?)?;
            Ok(Condition::Comparison {
                operator,
                data_type,
                lhs,
                rhs,
            })
        }
        "CHAINED_CONDITION" => {
            let operator = Operator::from_str(&get_str(v, "operator")?)?;
            let children_val = v
                .get("conditions")
                .and_then(|c| c.as_array())
                .ok_or_else(|| EvalError::Parse {
                    message: "chained condition missing 'conditions' array".to_string(),
                })?;
            let children: Vec<Condition> = children_val
                .iter()
                .map(parse_condition)
                .collect::<Result<Vec<_>, EvalError>>()?;
            match operator {
                Operator::And => Ok(Condition::Group {
                    operator: LogicalOperator::And,
                    conditions: children,
                }),
                Operator::Or => Ok(Condition::Group {
                    operator: LogicalOperator::Or,
                    conditions: children,
                }),
                Operator::Not => {
                    if children.len() != 1 {
                        return Err(EvalError::Parse {
                            message: format!(
                                "NOT condition requires exactly one child, got {}",
                                children.len()
                            ),
                        });
                    }
                    Ok(Condition::Not {
                        operand: Box::new(children.into_iter().next().expect("len checked")),
                    })
                }
                other => Err(EvalError::Parse {
                    message: format!(
                        "chained condition operator must be AND, OR, or NOT, got {}",
                        other.as_str()
                    ),
                }),
            }
        }
        other => Err(EvalError::Parse {
            message: format!("unknown condition node type '{}'", other),
        }),
    }
}

fn parse_operand(v: &serde_json::Value) -> Result<Operand, EvalError> {
    if let Some(name) = v.get("contextRef") {
        let name = name.as_str().ok_or_else(|| EvalError::Parse {
            message: "'contextRef' must be a string".to_string(),
        })?;
        return Ok(Operand::ContextRef(name.to_string()));
    }
    if let Some(value) = v.get("value") {
        return Ok(Operand::Literal(Value::from_json(value).map_err(|e| {
            EvalError::Parse {
                message: format!("invalid literal operand: {}", e),
            }
        })?));
    }
    Err(EvalError::Parse {
        message: format!("operand must carry 'value' or 'contextRef': {}", v),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
