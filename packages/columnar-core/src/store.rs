//! Session column store: one typed buffer per schema column.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::column::ColumnBuffer;
use crate::error::Result;
use crate::schema::Schema;
use crate::value::{self, Value};

/// One external row: column name to JSON scalar.
pub type Row = serde_json::Map<String, JsonValue>;

/// Columnar storage for one session. Capacity is tracked explicitly and
/// is always a whole number of chunks; appends that would exceed it grow
/// every buffer first.
#[derive(Debug)]
pub struct ColumnStore {
    buffers: Vec<ColumnBuffer>,
    row_count: usize,
    capacity: usize,
    chunk_size: usize,
}

impl ColumnStore {
    pub fn new(schema: &Schema, chunk_size: usize, initial_chunks: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let capacity = chunk_size * initial_chunks.max(1);
        let buffers = schema
            .columns()
            .iter()
            .map(|c| ColumnBuffer::with_capacity(c.kind, capacity))
            .collect();
        Self {
            buffers,
            row_count: 0,
            capacity,
            chunk_size,
        }
    }

    /// Rebuilds a store from buffers read out of a container.
    pub(crate) fn from_buffers(
        buffers: Vec<ColumnBuffer>,
        row_count: usize,
        chunk_size: usize,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        let capacity = row_count.div_ceil(chunk_size).max(1) * chunk_size;
        let mut store = Self {
            buffers,
            row_count,
            capacity,
            chunk_size,
        };
        for buffer in &mut store.buffers {
            buffer.grow_to(capacity);
        }
        store
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffers(&self) -> &[ColumnBuffer] {
        &self.buffers
    }

    /// Appends external rows. Every cell of every row is decoded before
    /// any buffer is touched, so a decode failure leaves the store
    /// unchanged. Missing keys append as null.
    pub fn append(&mut self, schema: &Schema, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut staged: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = Vec::with_capacity(schema.len());
            for column in schema.columns() {
                let raw = row.get(&column.name).unwrap_or(&JsonValue::Null);
                cells.push(value::decode(column.kind, &column.name, raw)?);
            }
            staged.push(cells);
        }

        let new_row_count = self.row_count + rows.len();
        if new_row_count > self.capacity {
            self.grow(new_row_count);
        }
        for cells in &staged {
            for (buffer, cell) in self.buffers.iter_mut().zip(cells) {
                buffer.push(cell);
            }
        }
        self.row_count = new_row_count;
        Ok(())
    }

    /// Grows every buffer to the smallest chunk multiple holding `required`
    /// rows. Existing data is copied into the fresh allocations.
    fn grow(&mut self, required: usize) {
        let new_capacity = required.div_ceil(self.chunk_size) * self.chunk_size;
        debug!(
            "growing column buffers from {} to {} rows",
            self.capacity, new_capacity
        );
        for buffer in &mut self.buffers {
            buffer.grow_to(new_capacity);
        }
        self.capacity = new_capacity;
    }

    /// Decoded value of one cell; `Value::Null` when the null flag is set.
    pub fn cell(&self, column: usize, row: usize) -> Value {
        self.buffers[column].get(row)
    }

    pub fn is_null(&self, column: usize, row: usize) -> bool {
        self.buffers[column].is_null(row)
    }

    /// Linear scan of the `id` column for the first row whose string form
    /// equals `record_id`. There is no secondary index.
    pub fn find_by_id(&self, schema: &Schema, record_id: &str) -> Option<usize> {
        let id_column = schema.index_of("id")?;
        (0..self.row_count).find(|&row| {
            !self.is_null(id_column, row) && self.cell(id_column, row).to_text() == record_id
        })
    }

    /// Decodes `raw` for the column's kind and overwrites one cell.
    pub fn update_cell(
        &mut self,
        schema: &Schema,
        column: usize,
        row: usize,
        raw: &JsonValue,
    ) -> Result<()> {
        let definition = &schema.columns()[column];
        let decoded = value::decode(definition.kind, &definition.name, raw)?;
        self.buffers[column].set(row, &decoded);
        Ok(())
    }

    /// Deep copy of every buffer. Used to take export snapshots so file
    /// I/O can run outside the session lock.
    pub fn snapshot_buffers(&self) -> Vec<ColumnBuffer> {
        self.buffers.to_vec()
    }
}
