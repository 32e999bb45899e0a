//! Windowing: deriving the view from the full set.
//!
//! The view is a pure function of the full set and the query state:
//! filter, then stable sort, then slice out the current page.

use crate::{query::Direction, DataItem, QueryState, SortKey};
use std::cmp::Ordering;

/// Compute the view for `items` under `state`.
pub fn compute_view(items: &[DataItem], state: &QueryState) -> Vec<DataItem> {
    let mut matching: Vec<&DataItem> = match state.filter() {
        Some(filter) => items.iter().filter(|item| filter.matches(item)).collect(),
        None => items.iter().collect(),
    };

    if !state.sort().is_empty() {
        // slice::sort_by is stable, so equal items keep full-set order
        matching.sort_by(|a, b| compare_items(a, b, state.sort()));
    }

    matching[state.window(matching.len())]
        .iter()
        .map(|item| (*item).clone())
        .collect()
}

/// Compare two items by a sort specification, left-to-right tie-break.
pub fn compare_items(a: &DataItem, b: &DataItem, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ordering = compare_values(&a[key.field.as_str()], &b[key.field.as_str()]);
        let ordering = match key.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values.
///
/// Values of different types order as null < bool < number < string <
/// array < object. Objects compare equal to each other.
pub fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
    use serde_json::Value;

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ if x.is_u64() && y.is_u64() => x.as_u64().cmp(&y.as_u64()),
            // Any i64 that is not a u64 is negative
            (Some(_), None) if y.is_u64() => Ordering::Less,
            (None, Some(_)) if x.is_u64() => Ordering::Greater,
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ordering = compare_values(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(_), Value::Object(_)) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &serde_json::Value) -> u8 {
    use serde_json::Value;

    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
