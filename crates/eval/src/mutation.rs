//! Mutation operation tables.
//!
//! Maps a data type and mutation operator to the implementation that applies
//! that operator to a stored value. List-typed targets have their own table,
//! registered solely by operator: list ADD/REMOVE/SET are structural
//! (append/delete-match/replace) rather than value-arithmetic.
//!
//! A missing implementation is an `UnsupportedMutation` fault -- a
//! configuration hole fails loudly, it never defaults. (Decoding an authored
//! operator *string* to SET is a separate, deliberate policy in `types.rs`.)

use crate::types::{DataType, EvalError, MutationOperator, Value};

/// Applies a mutation operator to a current value, producing the new value.
/// The engine computes the result; persistence belongs to the caller.
pub type MutationFn = fn(&Value, &Value) -> Result<Value, EvalError>;

/// Resolve the scalar mutation implementation for a (type, operator) pair.
pub fn mutation_operation(
    data_type: DataType,
    operator: MutationOperator,
) -> Result<MutationFn, EvalError> {
    match (data_type, operator) {
        (DataType::Number, MutationOperator::Set)
        | (DataType::String, MutationOperator::Set)
        | (DataType::Boolean, MutationOperator::Set) => Ok(set_value),
        (DataType::Number, MutationOperator::Add) => Ok(number_add),
        (DataType::Number, MutationOperator::Remove) => Ok(number_remove),
        (DataType::String, MutationOperator::Add) => Ok(string_concat),
        // List targets go through the list table, never this one.
        _ => Err(EvalError::UnsupportedMutation {
            operator,
            data_type: Some(data_type),
            is_list: false,
        }),
    }
}

/// Resolve the list mutation implementation for an operator.
///
/// The list table is total over the operator vocabulary, so this cannot
/// miss -- exhaustiveness is checked at compile time.
pub fn list_mutation_operation(operator: MutationOperator) -> MutationFn {
    match operator {
        MutationOperator::Set => list_set,
        MutationOperator::Add => list_add,
        MutationOperator::Remove => list_remove,
    }
}

/// Convenience overload selecting between the scalar and list tables.
pub fn select(
    data_type: DataType,
    operator: MutationOperator,
    is_list: bool,
) -> Result<MutationFn, EvalError> {
    if is_list {
        Ok(list_mutation_operation(operator))
    } else {
        mutation_operation(data_type, operator)
    }
}

// ──────────────────────────────────────────────
// Scalar implementations
// ──────────────────────────────────────────────

/// SET replaces unconditionally, whatever the current value was.
fn set_value(_current: &Value, delta: &Value) -> Result<Value, EvalError> {
    Ok(delta.clone())
}

fn number_add(current: &Value, delta: &Value) -> Result<Value, EvalError> {
    Ok(Value::Number(current.as_number()? + delta.as_number()?))
}

fn number_remove(current: &Value, delta: &Value) -> Result<Value, EvalError> {
    Ok(Value::Number(current.as_number()? - delta.as_number()?))
}

fn string_concat(current: &Value, delta: &Value) -> Result<Value, EvalError> {
    let mut out = current.as_str()?.to_string();
    out.push_str(delta.as_str()?);
    Ok(Value::String(out))
}

// ──────────────────────────────────────────────
// List implementations (structural)
// ──────────────────────────────────────────────

/// SET replaces the whole list. A scalar delta becomes a one-element list.
fn list_set(_current: &Value, delta: &Value) -> Result<Value, EvalError> {
    match delta {
        Value::List(_) => Ok(delta.clone()),
        scalar => Ok(Value::List(vec![scalar.clone()])),
    }
}

/// ADD appends. A list delta is flattened in; a scalar delta is pushed.
fn list_add(current: &Value, delta: &Value) -> Result<Value, EvalError> {
    let mut items = current.as_list()?.to_vec();
    match delta {
        Value::List(extra) => items.extend(extra.iter().cloned()),
        scalar => items.push(scalar.clone()),
    }
    Ok(Value::List(items))
}

/// REMOVE deletes every element structurally equal to the delta (or to any
/// element of a list delta).
fn list_remove(current: &Value, delta: &Value) -> Result<Value, EvalError> {
    let items = current.as_list()?;
    let removed: Vec<Value> = match delta {
        Value::List(victims) => items
            .iter()
            .filter(|item| !victims.contains(item))
            .cloned()
            .collect(),
        scalar => items.iter().filter(|item| *item != scalar).cloned().collect(),
    };
    Ok(Value::List(removed))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
