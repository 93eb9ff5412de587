//! Query contract types and index-based evaluation over column buffers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::Schema;
use crate::store::ColumnStore;
use crate::value::{self, Value};

/// Backend tag reported in every response and container header.
pub const IMPLEMENTATION: &str = "columnar";

/// Filter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperation {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// Connective carried by each filter. Accepted on the wire for
/// compatibility; evaluation is always a conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub column: String,
    pub operation: FilterOperation,
    #[serde(default)]
    pub values: Vec<JsonValue>,
    #[serde(default)]
    pub logical_operator: LogicalOperator,
}

impl FilterCriteria {
    pub fn new(column: impl Into<String>, operation: FilterOperation) -> Self {
        Self {
            column: column.into(),
            operation,
            values: Vec::new(),
            logical_operator: LogicalOperator::default(),
        }
    }

    pub fn with_values(mut self, values: Vec<JsonValue>) -> Self {
        self.values = values;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpecification {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
    /// Lower priority sorts first when several sorts are given.
    #[serde(default)]
    pub priority: u32,
}

impl SortSpecification {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

fn default_page_size() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub session_id: String,
    #[serde(default)]
    pub filters: Vec<FilterCriteria>,
    #[serde(default)]
    pub sorts: Vec<SortSpecification>,
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl QueryRequest {
    /// Request matching every row of a session, first page, default size.
    pub fn all(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            filters: Vec::new(),
            sorts: Vec::new(),
            search_term: None,
            page: 0,
            page_size: default_page_size(),
        }
    }
}

/// One materialized row, column name to JSON scalar, in schema order.
pub type ResponseRow = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub data: Vec<ResponseRow>,
    pub total_elements: u64,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub query_time_ms: u64,
    pub implementation: String,
}

impl QueryResponse {
    /// Zero-row response, used for sessions with no schema.
    pub(crate) fn empty(page: usize, page_size: usize) -> Self {
        Self {
            data: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            current_page: page,
            page_size,
            query_time_ms: 0,
            implementation: IMPLEMENTATION.to_string(),
        }
    }
}

/// Evaluates a query against one session. Search and filters build a
/// vector of matching row indices in insertion order, sorting reorders
/// the indices, and only the requested page is materialized into rows.
/// `query_time_ms` is left at zero; the caller stamps it after timing
/// the whole call.
pub fn evaluate(schema: &Schema, store: &ColumnStore, request: &QueryRequest) -> QueryResponse {
    let mut matched = matching_indices(schema, store, request);
    if !request.sorts.is_empty() {
        sort_indices(schema, store, &mut matched, &request.sorts);
    }

    let total = matched.len();
    let page_size = request.page_size.max(1);
    let total_pages = total.div_ceil(page_size);
    let start = request.page.saturating_mul(page_size);
    let page_rows: &[usize] = if start >= total {
        &[]
    } else {
        &matched[start..(start + page_size).min(total)]
    };

    let data = page_rows
        .iter()
        .map(|&row| materialize_row(schema, store, row))
        .collect();

    QueryResponse {
        data,
        total_elements: total as u64,
        total_pages,
        current_page: request.page,
        page_size: request.page_size,
        query_time_ms: 0,
        implementation: IMPLEMENTATION.to_string(),
    }
}

fn matching_indices(schema: &Schema, store: &ColumnStore, request: &QueryRequest) -> Vec<usize> {
    // Blank terms impose no constraint, but a non-blank term matches with
    // its whitespace intact.
    let search = request
        .search_term
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_lowercase);

    let mut matched = Vec::new();
    for row in 0..store.row_count() {
        if let Some(term) = &search {
            if !matches_search(schema, store, row, term) {
                continue;
            }
        }
        if !request
            .filters
            .iter()
            .all(|f| matches_filter(schema, store, row, f))
        {
            continue;
        }
        matched.push(row);
    }
    matched
}

/// Case-insensitive substring match over the string form of every
/// searchable column; null cells never match.
fn matches_search(schema: &Schema, store: &ColumnStore, row: usize, lower_term: &str) -> bool {
    for (index, column) in schema.columns().iter().enumerate() {
        if !column.searchable || store.is_null(index, row) {
            continue;
        }
        if store
            .cell(index, row)
            .to_text()
            .to_lowercase()
            .contains(lower_term)
        {
            return true;
        }
    }
    false
}

fn matches_filter(
    schema: &Schema,
    store: &ColumnStore,
    row: usize,
    filter: &FilterCriteria,
) -> bool {
    // A filter naming an unknown column never constrains the row.
    let Some(column) = schema.index_of(&filter.column) else {
        return true;
    };

    // A null cell satisfies IS_NULL and nothing else.
    if store.is_null(column, row) {
        return filter.operation == FilterOperation::IsNull;
    }
    match filter.operation {
        FilterOperation::IsNull => return false,
        FilterOperation::IsNotNull => return true,
        _ => {}
    }
    // Every remaining operation needs at least one operand.
    let Some(operand) = filter.values.first() else {
        return false;
    };

    let cell = store.cell(column, row);
    match filter.operation {
        FilterOperation::Equals => value::compare(&cell, operand) == Ordering::Equal,
        FilterOperation::NotEquals => value::compare(&cell, operand) != Ordering::Equal,
        FilterOperation::Gt => value::compare(&cell, operand) == Ordering::Greater,
        FilterOperation::Gte => value::compare(&cell, operand) != Ordering::Less,
        FilterOperation::Lt => value::compare(&cell, operand) == Ordering::Less,
        FilterOperation::Lte => value::compare(&cell, operand) != Ordering::Greater,
        FilterOperation::Contains | FilterOperation::StartsWith | FilterOperation::EndsWith => {
            matches_text(&cell, operand, filter.operation)
        }
        FilterOperation::In => filter.values.iter().any(|v| value::loose_eq(&cell, v)),
        FilterOperation::NotIn => !filter.values.iter().any(|v| value::loose_eq(&cell, v)),
        FilterOperation::IsNull | FilterOperation::IsNotNull => {
            unreachable!("null operations handled before operand checks")
        }
    }
}

fn matches_text(cell: &Value, operand: &JsonValue, operation: FilterOperation) -> bool {
    let cell_text = cell.to_text().to_lowercase();
    let operand_text = value::json_text(operand).to_lowercase();
    match operation {
        FilterOperation::Contains => cell_text.contains(&operand_text),
        FilterOperation::StartsWith => cell_text.starts_with(&operand_text),
        FilterOperation::EndsWith => cell_text.ends_with(&operand_text),
        _ => unreachable!("not a text operation"),
    }
}

/// Sorts row indices by each sort in priority order. Nulls sort first
/// under both directions; the direction only flips comparisons between
/// two non-null values. Sorts naming unknown columns are skipped, and
/// ties keep insertion order (the sort is stable).
fn sort_indices(
    schema: &Schema,
    store: &ColumnStore,
    indices: &mut [usize],
    sorts: &[SortSpecification],
) {
    let mut ordered: Vec<&SortSpecification> = sorts.iter().collect();
    ordered.sort_by_key(|s| s.priority);
    let keys: Vec<(usize, SortDirection)> = ordered
        .iter()
        .filter_map(|s| schema.index_of(&s.column).map(|c| (c, s.direction)))
        .collect();
    if keys.is_empty() {
        return;
    }

    indices.sort_by(|&a, &b| {
        for &(column, direction) in &keys {
            let ordering = match (store.is_null(column, a), store.is_null(column, b)) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => {
                    let cmp =
                        value::compare_cells(&store.cell(column, a), &store.cell(column, b));
                    match direction {
                        SortDirection::Asc => cmp,
                        SortDirection::Desc => cmp.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn materialize_row(schema: &Schema, store: &ColumnStore, row: usize) -> ResponseRow {
    let mut out = ResponseRow::new();
    for (index, column) in schema.columns().iter().enumerate() {
        out.insert(column.name.clone(), store.cell(index, row).to_json());
    }
    out
}
