//! Container export and import through the engine facade.

use columnar_core::error::EngineError;
use columnar_core::query::{QueryRequest, SortDirection, SortSpecification};
use columnar_core::TableEngine;
use ntest::timeout;
use serde_json::json;
use tempfile::tempdir;

use crate::helpers::{ids, people_columns, people_rows, synthetic_rows};

#[test]
#[timeout(5000)]
fn exported_session_imports_with_identical_contents() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("people.ctc");

    let engine = TableEngine::new();
    engine.create_schema("src", people_columns()).unwrap();
    engine.append("src", &people_rows()).unwrap();
    engine.export("src", &path).unwrap();

    let imported = engine.import("dst", &path).unwrap();
    assert_eq!(imported, 4);
    assert_eq!(engine.get_schema("dst").unwrap(), people_columns());

    let source = engine.query(&QueryRequest::all("src")).unwrap();
    let copy = engine.query(&QueryRequest::all("dst")).unwrap();
    assert_eq!(source.data, copy.data);
}

#[test]
#[timeout(5000)]
fn import_preserves_nulls_and_supports_further_appends() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("people.ctc");

    let engine = TableEngine::new();
    engine.create_schema("src", people_columns()).unwrap();
    engine.append("src", &people_rows()).unwrap();
    engine.export("src", &path).unwrap();

    engine.import("dst", &path).unwrap();
    let response = engine.query(&QueryRequest::all("dst")).unwrap();
    assert_eq!(response.data[1]["score"], serde_json::Value::Null);
    assert_eq!(response.data[3]["active"], serde_json::Value::Null);

    engine.append("dst", &synthetic_rows(5, 3)).unwrap();
    let mut request = QueryRequest::all("dst");
    request.sorts = vec![SortSpecification::new("id", SortDirection::Asc)];
    assert_eq!(
        ids(&engine.query(&request).unwrap()),
        vec![1, 2, 3, 4, 5, 6, 7]
    );
}

#[test]
#[timeout(5000)]
fn import_replaces_an_existing_session() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("people.ctc");

    let engine = TableEngine::new();
    engine.create_schema("s", people_columns()).unwrap();
    engine.append("s", &people_rows()).unwrap();
    engine.export("s", &path).unwrap();

    engine.create_schema("s", people_columns()).unwrap();
    engine.append("s", &synthetic_rows(50, 10)).unwrap();

    engine.import("s", &path).unwrap();
    let response = engine.query(&QueryRequest::all("s")).unwrap();
    assert_eq!(response.total_elements, 4);
    assert_eq!(response.data[0]["name"], json!("Alice"));
}

#[test]
#[timeout(5000)]
fn truncated_container_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("people.ctc");

    let engine = TableEngine::new();
    engine.create_schema("s", people_columns()).unwrap();
    engine.append("s", &people_rows()).unwrap();
    engine.export("s", &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 6]).unwrap();

    let result = engine.import("broken", &path);
    assert!(matches!(result, Err(EngineError::IoError(_))));
    assert_eq!(
        engine.query(&QueryRequest::all("broken")).unwrap().total_elements,
        0
    );
}

#[test]
#[timeout(5000)]
fn export_overwrites_a_previous_container() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("people.ctc");

    let engine = TableEngine::new();
    engine.create_schema("s", people_columns()).unwrap();
    engine.append("s", &people_rows()).unwrap();
    engine.export("s", &path).unwrap();

    engine.append("s", &synthetic_rows(5, 2)).unwrap();
    engine.export("s", &path).unwrap();

    assert_eq!(engine.import("again", &path).unwrap(), 6);
}
