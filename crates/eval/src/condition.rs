//! Condition expression evaluator.
//!
//! Walks an authored condition tree, dispatching comparison leaves through
//! the operator tables and composing groups with AND/OR/NOT. Every fault is
//! a structured `EvalError`; the evaluator never panics on authored input.

use tracing::trace;

use crate::operator;
use crate::types::{Condition, EvalError, EvaluationContext, LogicalOperator, Operand, Value};

/// Evaluate a condition tree against the attempt's evaluation context.
pub fn evaluate(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    match condition {
        Condition::Comparison {
            operator: op,
            data_type,
            lhs,
            rhs,
        } => {
            let compare = operator::lookup(*data_type, *op)?;
            let lhs_val = resolve_operand(lhs, ctx)?;
            let rhs_val = resolve_operand(rhs, ctx)?;
            let verdict = compare(&lhs_val, &rhs_val)?;
            trace!(
                operator = op.as_str(),
                data_type = data_type.as_str(),
                verdict,
                "comparison evaluated"
            );
            Ok(verdict)
        }

        // Group children are ALL evaluated, even once the connective's
        // result is decided. A fault in any child surfaces regardless of
        // sibling results.
        Condition::Group {
            operator,
            conditions,
        } => {
            let mut verdicts = Vec::with_capacity(conditions.len());
            for child in conditions {
                verdicts.push(evaluate(child, ctx)?);
            }
            Ok(match operator {
                LogicalOperator::And => verdicts.iter().all(|v| *v),
                LogicalOperator::Or => verdicts.iter().any(|v| *v),
            })
        }

        Condition::Not { operand } => Ok(!evaluate(operand, ctx)?),
    }
}

fn resolve_operand(operand: &Operand, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    match operand {
        Operand::Literal(v) => Ok(v.clone()),
        Operand::ContextRef(name) => {
            ctx.get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnableToResolve {
                    message: format!("context value '{}' not present", name),
                })
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
