//! Comparison operator tables.
//!
//! Lookup order: the data-type-specific table is consulted first, then the
//! type-agnostic default table, and a miss in both is an
//! `UnsupportedOperation` fault naming the operator and type. Both tables
//! are static `match` dispatch over the closed vocabulary, so adding an
//! operator without an implementation is a compile-time hole, not a runtime
//! surprise.
//!
//! `AND`/`OR`/`NOT` never appear here -- they compose conditions and are
//! handled by the condition evaluator.

use crate::types::{DataType, EvalError, Operator, Value};

/// A binary comparison implementation.
pub type CompareFn = fn(&Value, &Value) -> Result<bool, EvalError>;

/// Resolve the comparison implementation for a (type, operator) pair.
///
/// Type-specific entries shadow default entries for the same operator.
pub fn lookup(data_type: DataType, operator: Operator) -> Result<CompareFn, EvalError> {
    typed_lookup(data_type, operator)
        .or_else(|| default_lookup(operator))
        .ok_or(EvalError::UnsupportedOperation {
            operator,
            data_type: Some(data_type),
        })
}

/// The data-type-specific table.
fn typed_lookup(data_type: DataType, operator: Operator) -> Option<CompareFn> {
    match (data_type, operator) {
        (DataType::Number, Operator::GreaterThan) => Some(number_gt),
        (DataType::Number, Operator::LessThan) => Some(number_lt),
        (DataType::Number, Operator::GreaterThanOrEquals) => Some(number_ge),
        (DataType::Number, Operator::LessThanOrEquals) => Some(number_le),
        (DataType::String, Operator::Contains) => Some(string_contains),
        (DataType::String, Operator::NotContains) => Some(string_not_contains),
        (DataType::String, Operator::ContainsAnyOf) => Some(string_contains_any_of),
        (DataType::String, Operator::NotContainsAnyOf) => Some(string_not_contains_any_of),
        (DataType::String, Operator::ContainsOneOf) => Some(string_contains_one_of),
        (DataType::String, Operator::NotContainsOneOf) => Some(string_not_contains_one_of),
        (DataType::String, Operator::StartsWith) => Some(string_starts_with),
        (DataType::String, Operator::EndsWith) => Some(string_ends_with),
        (DataType::List, Operator::IncludesAllOf) => Some(list_includes_all_of),
        (DataType::List, Operator::NotIncludesAllOf) => Some(list_not_includes_all_of),
        (DataType::List, Operator::IncludesAnyOf) => Some(list_includes_any_of),
        (DataType::List, Operator::NotIncludesAnyOf) => Some(list_not_includes_any_of),
        _ => None,
    }
}

/// The type-agnostic default table.
fn default_lookup(operator: Operator) -> Option<CompareFn> {
    match operator {
        Operator::Equals | Operator::Is => Some(structural_eq),
        Operator::NotEquals | Operator::IsNot => Some(structural_ne),
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Default implementations
// ──────────────────────────────────────────────

/// Structural equality across all value types, lists included.
fn structural_eq(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs == rhs)
}

fn structural_ne(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs != rhs)
}

// ──────────────────────────────────────────────
// NUMBER implementations
// ──────────────────────────────────────────────

fn number_gt(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_number()? > rhs.as_number()?)
}

fn number_lt(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_number()? < rhs.as_number()?)
}

fn number_ge(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_number()? >= rhs.as_number()?)
}

fn number_le(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_number()? <= rhs.as_number()?)
}

// ──────────────────────────────────────────────
// STRING implementations (case-sensitive)
// ──────────────────────────────────────────────

fn string_contains(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_str()?.contains(rhs.as_str()?))
}

fn string_not_contains(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(!string_contains(lhs, rhs)?)
}

/// Count how many needles from `rhs` (a list of strings) occur in `lhs`.
fn contained_needles(lhs: &Value, rhs: &Value) -> Result<usize, EvalError> {
    let haystack = lhs.as_str()?;
    let needles = rhs.as_list()?;
    let mut found = 0;
    for needle in needles {
        if haystack.contains(needle.as_str()?) {
            found += 1;
        }
    }
    Ok(found)
}

fn string_contains_any_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(contained_needles(lhs, rhs)? > 0)
}

fn string_not_contains_any_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(contained_needles(lhs, rhs)? == 0)
}

fn string_contains_one_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(contained_needles(lhs, rhs)? == 1)
}

fn string_not_contains_one_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(contained_needles(lhs, rhs)? != 1)
}

fn string_starts_with(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_str()?.starts_with(rhs.as_str()?))
}

fn string_ends_with(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(lhs.as_str()?.ends_with(rhs.as_str()?))
}

// ──────────────────────────────────────────────
// LIST implementations (structural element equality)
// ──────────────────────────────────────────────

fn list_includes_all_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let haystack = lhs.as_list()?;
    let needles = rhs.as_list()?;
    Ok(needles.iter().all(|n| haystack.contains(n)))
}

fn list_not_includes_all_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(!list_includes_all_of(lhs, rhs)?)
}

fn list_includes_any_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let haystack = lhs.as_list()?;
    let needles = rhs.as_list()?;
    Ok(needles.iter().any(|n| haystack.contains(n)))
}

fn list_not_includes_any_of(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    Ok(!list_includes_any_of(lhs, rhs)?)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
