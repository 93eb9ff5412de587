//! Full table lifecycle: schema, load, query, update, clear.

use columnar_core::config::EngineConfig;
use columnar_core::query::{
    FilterCriteria, FilterOperation, QueryRequest, SortDirection, SortSpecification,
};
use columnar_core::TableEngine;
use ntest::timeout;
use serde_json::json;

use crate::helpers::{ids, people_columns, people_rows, synthetic_rows};

#[test]
#[timeout(5000)]
fn full_lifecycle_search_filter_sort_paginate() {
    let engine = TableEngine::new();
    engine.create_schema("demo", people_columns()).unwrap();
    engine.append("demo", &people_rows()).unwrap();

    // Searchable columns only, case-insensitive.
    let mut request = QueryRequest::all("demo");
    request.search_term = Some("li".into());
    assert_eq!(ids(&engine.query(&request).unwrap()), vec![1, 3]);

    // Conjunction of filters.
    let mut request = QueryRequest::all("demo");
    request.filters = vec![
        FilterCriteria::new("active", FilterOperation::Equals).with_values(vec![json!(true)]),
        FilterCriteria::new("score", FilterOperation::Gt).with_values(vec![json!(80)]),
    ];
    assert_eq!(ids(&engine.query(&request).unwrap()), vec![1]);

    // Sort descending keeps nulls first.
    let mut request = QueryRequest::all("demo");
    request.sorts = vec![SortSpecification::new("score", SortDirection::Desc)];
    assert_eq!(ids(&engine.query(&request).unwrap()), vec![2, 1, 4, 3]);

    // Update a cell through the id scan, then clear everything.
    assert!(engine
        .update_field_value("demo", "3", "score", &json!(99.0))
        .unwrap());
    let mut request = QueryRequest::all("demo");
    request.sorts = vec![SortSpecification::new("score", SortDirection::Desc)];
    assert_eq!(ids(&engine.query(&request).unwrap()), vec![2, 3, 1, 4]);

    engine.clear_session("demo").unwrap();
    assert_eq!(
        engine.query(&QueryRequest::all("demo")).unwrap().total_elements,
        0
    );
}

#[test]
#[timeout(5000)]
fn search_combines_with_descending_sort() {
    let engine = TableEngine::new();
    engine.create_schema("people", people_columns()).unwrap();
    let rows: Vec<columnar_core::store::Row> = [
        json!({"id": 1, "name": "Alice", "score": 95.5, "active": true}),
        json!({"id": 2, "name": "Bob", "score": 87.2, "active": false}),
        json!({"id": 3, "name": "Charlie", "score": 92.8, "active": true}),
        json!({"id": 4, "name": "Diana", "score": 88.9, "active": true}),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();
    engine.append("people", &rows).unwrap();

    let mut request = QueryRequest::all("people");
    request.search_term = Some("a".into());
    request.sorts = vec![SortSpecification::new("score", SortDirection::Desc)];
    request.page_size = 10;

    let response = engine.query(&request).unwrap();
    assert_eq!(response.total_elements, 3);
    let names: Vec<&str> = response
        .data
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alice", "Charlie", "Diana"]);
    assert_eq!(response.data[0]["score"], json!(95.5));
}

#[test]
#[timeout(5000)]
fn pages_concatenate_to_the_full_sorted_result() {
    let engine = TableEngine::with_config(EngineConfig {
        chunk_size: 16,
        initial_chunks: 1,
    });
    engine.create_schema("pages", people_columns()).unwrap();
    engine.append("pages", &synthetic_rows(1, 53)).unwrap();

    let mut request = QueryRequest::all("pages");
    request.sorts = vec![SortSpecification::new("id", SortDirection::Desc)];
    request.page_size = 10;

    let mut collected = Vec::new();
    let mut page = 0;
    loop {
        request.page = page;
        let response = engine.query(&request).unwrap();
        assert_eq!(response.total_elements, 53);
        assert_eq!(response.total_pages, 6);
        if response.data.is_empty() {
            break;
        }
        collected.extend(ids(&response));
        page += 1;
    }
    let expected: Vec<i64> = (1..=53).rev().collect();
    assert_eq!(collected, expected);
    assert_eq!(page, 6);
}

#[test]
#[timeout(5000)]
fn appends_grow_buffers_across_chunk_boundaries() {
    let engine = TableEngine::with_config(EngineConfig {
        chunk_size: 8,
        initial_chunks: 1,
    });
    engine.create_schema("grow", people_columns()).unwrap();

    engine.append("grow", &synthetic_rows(1, 5)).unwrap();
    engine.append("grow", &synthetic_rows(6, 20)).unwrap();
    engine.append("grow", &synthetic_rows(26, 1)).unwrap();

    let mut request = QueryRequest::all("grow");
    request.page_size = 100;
    let response = engine.query(&request).unwrap();
    assert_eq!(response.total_elements, 26);
    assert_eq!(ids(&response), (1..=26).collect::<Vec<i64>>());
}

#[test]
#[timeout(5000)]
fn is_null_and_is_not_null_partition_the_table() {
    let engine = TableEngine::new();
    engine.create_schema("nulls", people_columns()).unwrap();
    engine.append("nulls", &people_rows()).unwrap();

    let mut request = QueryRequest::all("nulls");
    request.filters = vec![FilterCriteria::new("score", FilterOperation::IsNull)];
    let null_ids = ids(&engine.query(&request).unwrap());

    request.filters = vec![FilterCriteria::new("score", FilterOperation::IsNotNull)];
    let not_null_ids = ids(&engine.query(&request).unwrap());

    let mut all: Vec<i64> = null_ids.iter().chain(&not_null_ids).copied().collect();
    all.sort_unstable();
    assert_eq!(all, vec![1, 2, 3, 4]);
    assert_eq!(null_ids, vec![2]);
}

#[test]
#[timeout(5000)]
fn sort_direction_reverses_non_null_rows_only() {
    let engine = TableEngine::new();
    engine.create_schema("dir", people_columns()).unwrap();
    engine.append("dir", &people_rows()).unwrap();

    let mut request = QueryRequest::all("dir");
    request.sorts = vec![SortSpecification::new("score", SortDirection::Asc)];
    let asc = ids(&engine.query(&request).unwrap());
    request.sorts = vec![SortSpecification::new("score", SortDirection::Desc)];
    let desc = ids(&engine.query(&request).unwrap());

    // Null rows stay in front; the non-null tail reverses.
    assert_eq!(asc[0], 2);
    assert_eq!(desc[0], 2);
    let reversed_tail: Vec<i64> = asc[1..].iter().rev().copied().collect();
    assert_eq!(desc[1..], reversed_tail[..]);
}

#[test]
#[timeout(5000)]
fn sessions_are_independent() {
    let engine = TableEngine::new();
    engine.create_schema("a", people_columns()).unwrap();
    engine.create_schema("b", people_columns()).unwrap();
    engine.append("a", &people_rows()).unwrap();
    engine.append("b", &synthetic_rows(100, 2)).unwrap();

    assert_eq!(engine.query(&QueryRequest::all("a")).unwrap().total_elements, 4);
    assert_eq!(engine.query(&QueryRequest::all("b")).unwrap().total_elements, 2);

    engine.clear_session("a").unwrap();
    assert_eq!(engine.query(&QueryRequest::all("a")).unwrap().total_elements, 0);
    assert_eq!(engine.query(&QueryRequest::all("b")).unwrap().total_elements, 2);
}

#[test]
#[timeout(5000)]
fn failed_batch_leaves_previous_rows_intact() {
    let engine = TableEngine::new();
    engine.create_schema("atomic", people_columns()).unwrap();
    engine.append("atomic", &people_rows()).unwrap();

    let mut bad = synthetic_rows(10, 2);
    bad[1].insert("id".into(), json!("not-a-number"));
    assert!(engine.append("atomic", &bad).is_err());

    let response = engine.query(&QueryRequest::all("atomic")).unwrap();
    assert_eq!(response.total_elements, 4);
    assert_eq!(engine.metrics("atomic").unwrap().row_count, 4);
}

#[test]
#[timeout(5000)]
fn metrics_accumulate_queries_per_session() {
    let engine = TableEngine::new();
    engine.create_schema("m", people_columns()).unwrap();
    engine.append("m", &people_rows()).unwrap();
    for _ in 0..5 {
        engine.query(&QueryRequest::all("m")).unwrap();
    }

    let report = engine.metrics("m").unwrap();
    assert_eq!(report.total_queries, 5);
    assert_eq!(report.row_count, 4);
    assert!(report.min_query_time_ms <= report.max_query_time_ms);
    assert_eq!(report.implementation, "columnar");
}

#[test]
#[timeout(10000)]
fn concurrent_queries_share_a_session() {
    use std::sync::Arc;
    use std::thread;

    let engine = Arc::new(TableEngine::new());
    engine.create_schema("shared", people_columns()).unwrap();
    engine.append("shared", &synthetic_rows(1, 500)).unwrap();

    let mut handles = Vec::new();
    for t in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let mut request = QueryRequest::all("shared");
                request.filters = vec![FilterCriteria::new("active", FilterOperation::Equals)
                    .with_values(vec![json!(t % 2 == 0)])];
                let response = engine.query(&request).unwrap();
                assert_eq!(response.total_elements, 250);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.metrics("shared").unwrap().total_queries, 200);
}
