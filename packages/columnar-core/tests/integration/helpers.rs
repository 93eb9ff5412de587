//! Shared fixtures for the integration suite.

use columnar_core::query::QueryResponse;
use columnar_core::schema::{ColumnDefinition, ColumnKind};
use columnar_core::store::Row;
use serde_json::json;

/// The people table used across tests: id, name, score, active.
pub fn people_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", ColumnKind::Integer)
            .sortable(true)
            .filterable(true),
        ColumnDefinition::new("name", ColumnKind::String)
            .sortable(true)
            .filterable(true)
            .searchable(true),
        ColumnDefinition::new("score", ColumnKind::Double)
            .sortable(true)
            .filterable(true),
        ColumnDefinition::new("active", ColumnKind::Boolean).filterable(true),
    ]
}

pub fn people_rows() -> Vec<Row> {
    [
        json!({"id": 1, "name": "Alice", "score": 91.5, "active": true}),
        json!({"id": 2, "name": "Bob", "score": null, "active": false}),
        json!({"id": 3, "name": "Charlie", "score": 77.0, "active": true}),
        json!({"id": 4, "name": "Diana", "score": 88.25, "active": null}),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect()
}

/// Generates `count` synthetic rows with ids starting at `first_id`.
pub fn synthetic_rows(first_id: i32, count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let id = first_id + i as i32;
            serde_json::from_value(json!({
                "id": id,
                "name": format!("row-{id}"),
                "score": f64::from(id) * 0.5,
                "active": id % 2 == 0,
            }))
            .unwrap()
        })
        .collect()
}

pub fn ids(response: &QueryResponse) -> Vec<i64> {
    response
        .data
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}
