//! Aggregation processors used by the dashboard widgets.
//!
//! - `countBy` `{field}`: one `{value, count}` row per distinct value,
//!   largest count first
//! - `filter` `{field, equals}`: rows whose field equals the value
//! - `sortBy` `{field, descending}`: stable sort; numbers compare numerically,
//!   everything else by its string form, missing values last

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::{DashboardError, Result};
use crate::plugin::{Capability, Plugin, ProcessorFn};

pub const PLUGIN_ID: &str = "aggregations";

#[must_use]
pub fn plugin() -> Plugin {
    let mut processors: BTreeMap<String, ProcessorFn> = BTreeMap::new();
    processors.insert("countBy".to_string(), Arc::new(count_by));
    processors.insert("filter".to_string(), Arc::new(filter));
    processors.insert("sortBy".to_string(), Arc::new(sort_by));

    Plugin::new(
        PLUGIN_ID,
        "Aggregations",
        env!("CARGO_PKG_VERSION"),
        Capability::DataProcessor(processors),
    )
}

fn field(options: &Value) -> Result<&str> {
    options
        .get("field")
        .and_then(Value::as_str)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| DashboardError::Capability("processor requires a 'field' option".to_string()))
}

/// Key used for grouping; strings group by their content, not their JSON form.
fn group_key(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn count_by(rows: &[Value], options: &Value) -> Result<Vec<Value>> {
    let field = field(options)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(group_key(row.get(field))).or_default() += 1;
    }

    let mut grouped: Vec<(String, usize)> = counts.into_iter().collect();
    grouped.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(grouped
        .into_iter()
        .map(|(value, count)| json!({ "value": value, "count": count }))
        .collect())
}

fn filter(rows: &[Value], options: &Value) -> Result<Vec<Value>> {
    let field = field(options)?;
    let expected = options.get("equals").unwrap_or(&Value::Null);

    Ok(rows
        .iter()
        .filter(|row| row.get(field).unwrap_or(&Value::Null) == expected)
        .cloned()
        .collect())
}

fn sort_by(rows: &[Value], options: &Value) -> Result<Vec<Value>> {
    let field = field(options)?;
    let descending = options.get("descending").and_then(Value::as_bool).unwrap_or(false);

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare(a.get(field), b.get(field));
        match (a.get(field), b.get(field)) {
            // missing values stay last in both directions
            (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => ordering,
            _ if descending => ordering.reverse(),
            _ => ordering,
        }
    });
    Ok(sorted)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (a, b) => group_key(a).cmp(&group_key(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn accounts() -> Vec<Value> {
        vec![
            json!({"user": "a", "platform": "WinDomain", "age": 30}),
            json!({"user": "b", "platform": "UnixSSH", "age": 5}),
            json!({"user": "c", "platform": "WinDomain"}),
        ]
    }

    #[test]
    fn count_by_orders_largest_group_first() {
        let counts = count_by(&accounts(), &json!({"field": "platform"})).unwrap();
        assert_eq!(
            counts,
            vec![
                json!({"value": "WinDomain", "count": 2}),
                json!({"value": "UnixSSH", "count": 1}),
            ]
        );
    }

    #[test]
    fn filter_matches_on_equality() {
        let rows = filter(&accounts(), &json!({"field": "platform", "equals": "UnixSSH"})).unwrap();
        assert_eq!(rows, vec![accounts()[1].clone()]);
    }

    #[test]
    fn sort_by_keeps_missing_values_last() {
        let rows = sort_by(&accounts(), &json!({"field": "age", "descending": true})).unwrap();
        let users: Vec<&str> = rows.iter().filter_map(|r| r["user"].as_str()).collect();
        assert_eq!(users, vec!["a", "b", "c"]);

        let rows = sort_by(&accounts(), &json!({"field": "age"})).unwrap();
        let users: Vec<&str> = rows.iter().filter_map(|r| r["user"].as_str()).collect();
        assert_eq!(users, vec!["b", "a", "c"]);
    }

    #[test]
    fn missing_field_option_is_rejected() {
        assert!(matches!(count_by(&accounts(), &json!({})), Err(DashboardError::Capability(_))));
    }
}
