//! Session registry and the public engine operations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::export;
use crate::metrics::{MetricsReport, SessionMetrics};
use crate::query::{self, QueryRequest, QueryResponse};
use crate::schema::{ColumnDefinition, Schema};
use crate::store::{ColumnStore, Row};

/// Schema plus buffers for one session, locked as a unit so readers
/// always see them consistent with each other.
#[derive(Debug)]
struct TableState {
    schema: Schema,
    store: ColumnStore,
}

#[derive(Debug)]
struct Session {
    state: RwLock<TableState>,
    metrics: Mutex<SessionMetrics>,
}

/// The engine facade. Holds every live session; sessions are fully
/// independent, so operations take the registry lock only long enough to
/// clone a session handle, then work under that session's own lock.
#[derive(Debug)]
pub struct TableEngine {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    config: EngineConfig,
}

impl Default for TableEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TableEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn session(&self, session_id: &str) -> Result<Option<Arc<Session>>> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| EngineError::LockPoisoned)?
            .get(session_id)
            .cloned())
    }

    fn require_session(&self, session_id: &str) -> Result<Arc<Session>> {
        self.session(session_id)?
            .ok_or_else(|| EngineError::SessionNotFound {
                session: session_id.to_string(),
            })
    }

    /// Creates the schema for a session. Any prior schema, data, and
    /// metrics under the same id are discarded.
    pub fn create_schema(&self, session_id: &str, columns: Vec<ColumnDefinition>) -> Result<()> {
        let schema = Schema::new(columns)?;
        let store = ColumnStore::new(&schema, self.config.chunk_size, self.config.initial_chunks);
        let session = Arc::new(Session {
            state: RwLock::new(TableState { schema, store }),
            metrics: Mutex::new(SessionMetrics::default()),
        });
        self.sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned)?
            .insert(session_id.to_string(), session);
        debug!("created schema for session '{}'", session_id);
        Ok(())
    }

    /// Appends rows to a session created by `create_schema`. The append is
    /// atomic: on any decode failure no row of the batch is stored.
    pub fn append(&self, session_id: &str, rows: &[Row]) -> Result<()> {
        let session = self.require_session(session_id)?;
        let started = Instant::now();
        let row_count = {
            let mut state = session
                .state
                .write()
                .map_err(|_| EngineError::LockPoisoned)?;
            let TableState { schema, store } = &mut *state;
            store.append(schema, rows)?;
            store.row_count()
        };
        let elapsed = started.elapsed().as_millis() as u64;
        session
            .metrics
            .lock()
            .map_err(|_| EngineError::LockPoisoned)?
            .record_load(elapsed, row_count);
        debug!(
            "appended {} rows to session '{}' ({} total)",
            rows.len(),
            session_id,
            row_count
        );
        Ok(())
    }

    /// Evaluates a query. A session that was never created yields an empty
    /// response rather than an error, so clients can poll before loading.
    pub fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();
        let Some(session) = self.session(&request.session_id)? else {
            return Ok(QueryResponse::empty(request.page, request.page_size));
        };
        let mut response = {
            let state = session
                .state
                .read()
                .map_err(|_| EngineError::LockPoisoned)?;
            query::evaluate(&state.schema, &state.store, request)
        };
        let elapsed = started.elapsed().as_millis() as u64;
        response.query_time_ms = elapsed;
        session
            .metrics
            .lock()
            .map_err(|_| EngineError::LockPoisoned)?
            .record_query(elapsed);
        Ok(response)
    }

    /// Ordered column definitions of a session; empty when unknown.
    pub fn get_schema(&self, session_id: &str) -> Result<Vec<ColumnDefinition>> {
        match self.session(session_id)? {
            Some(session) => Ok(session
                .state
                .read()
                .map_err(|_| EngineError::LockPoisoned)?
                .schema
                .columns()
                .to_vec()),
            None => Ok(Vec::new()),
        }
    }

    /// Drops a session, releasing its buffers and metrics. Unknown ids are
    /// a no-op.
    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned)?
            .remove(session_id);
        if removed.is_some() {
            debug!("cleared session '{}'", session_id);
        }
        Ok(())
    }

    /// Overwrites one cell in the row whose `id` column's string form
    /// equals `record_id`. Reports success as a boolean: unknown session,
    /// missing column, missing row, and decode failures all come back
    /// `false` rather than erroring.
    pub fn update_field_value(
        &self,
        session_id: &str,
        record_id: &str,
        field_name: &str,
        new_value: &JsonValue,
    ) -> Result<bool> {
        let Some(session) = self.session(session_id)? else {
            return Ok(false);
        };
        let mut state = session
            .state
            .write()
            .map_err(|_| EngineError::LockPoisoned)?;
        let TableState { schema, store } = &mut *state;
        let Some(column) = schema.index_of(field_name) else {
            return Ok(false);
        };
        let Some(row) = store.find_by_id(schema, record_id) else {
            return Ok(false);
        };
        Ok(store.update_cell(schema, column, row, new_value).is_ok())
    }

    /// Exports a session to a container file. The buffers are snapshotted
    /// under the session read lock; file I/O runs after it is released.
    pub fn export(&self, session_id: &str, destination: &Path) -> Result<()> {
        let session = self.require_session(session_id)?;
        let (schema, row_count, buffers) = {
            let state = session
                .state
                .read()
                .map_err(|_| EngineError::LockPoisoned)?;
            (
                state.schema.clone(),
                state.store.row_count(),
                state.store.snapshot_buffers(),
            )
        };
        export::write_container(destination, &schema, row_count, &buffers)
    }

    /// Loads a container file into a session, replacing any existing state
    /// under the same id. Returns the imported row count.
    pub fn import(&self, session_id: &str, source: &Path) -> Result<usize> {
        let contents = export::read_container(source)?;
        let row_count = contents.row_count;
        let schema = Schema::new(contents.columns)?;
        let store =
            ColumnStore::from_buffers(contents.buffers, row_count, self.config.chunk_size);
        let session = Arc::new(Session {
            state: RwLock::new(TableState { schema, store }),
            metrics: Mutex::new(SessionMetrics::default()),
        });
        self.sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned)?
            .insert(session_id.to_string(), session);
        debug!("imported {} rows into session '{}'", row_count, session_id);
        Ok(row_count)
    }

    /// Load and query statistics for a session; all-zero when unknown.
    pub fn metrics(&self, session_id: &str) -> Result<MetricsReport> {
        match self.session(session_id)? {
            Some(session) => Ok(session
                .metrics
                .lock()
                .map_err(|_| EngineError::LockPoisoned)?
                .report()),
            None => Ok(SessionMetrics::default().report()),
        }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| EngineError::LockPoisoned)?
            .len())
    }
}
