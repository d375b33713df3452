//! Boolean predicates over parallel input columns.

use crate::error::{ConfigError, Error, Result};
use crate::func::Callable;
use crate::value::{Value, ValueType};

/// Returns true if `predicate` holds for any row of `columns`.
///
/// Row `i` passes `columns[j][i]` as argument `j`. Stops at the first row
/// that satisfies the predicate.
pub fn any(predicate: &Callable, columns: &[Value]) -> Result<bool> {
    let rows = validate(predicate, columns)?;
    for row in 0..rows {
        if evaluate(predicate, columns, row)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns true if `predicate` holds for every row of `columns`.
///
/// Stops at the first row that fails the predicate.
pub fn all(predicate: &Callable, columns: &[Value]) -> Result<bool> {
    let rows = validate(predicate, columns)?;
    for row in 0..rows {
        if !evaluate(predicate, columns, row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Check the predicate shape and column layout; returns the row count.
fn validate(
    predicate: &Callable,
    columns: &[Value],
) -> std::result::Result<usize, ConfigError> {
    let signature = predicate.signature();
    if signature.outputs != [ValueType::Bool] {
        return Err(ConfigError::PredicateOutput {
            function: predicate.name().to_string(),
            found: signature
                .outputs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    if columns.len() != signature.arity() {
        return Err(ConfigError::PredicateColumn {
            column: columns.len(),
            reason: format!(
                "got {} columns, want {} to match the predicate's inputs",
                columns.len(),
                signature.arity()
            ),
        });
    }

    let mut rows = None;
    for (column, value) in columns.iter().enumerate() {
        let Some(items) = value.as_slice() else {
            return Err(ConfigError::PredicateColumn {
                column,
                reason: format!("got {}, want seq or array", value.underlying().kind()),
            });
        };
        match rows {
            None => rows = Some(items.len()),
            Some(len) if len != items.len() => {
                return Err(ConfigError::PredicateColumn {
                    column,
                    reason: format!("length {} differs from column 0 length {len}", items.len()),
                });
            }
            Some(_) => {}
        }
    }
    Ok(rows.unwrap_or(0))
}

fn evaluate(predicate: &Callable, columns: &[Value], row: usize) -> Result<bool> {
    let args: Vec<Value> = columns
        .iter()
        .filter_map(|column| column.as_slice())
        .map(|items| items[row].underlying().clone())
        .collect();
    let outputs = predicate
        .call(&args)
        .map_err(|err| Error::call(predicate.name(), err))?;
    Ok(outputs.first().and_then(Value::as_bool).unwrap_or(false))
}
