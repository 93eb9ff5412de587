//! Engine configuration.

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Buffer growth unit in rows; capacity is always a multiple of this
    pub chunk_size: usize,
    /// Initial buffer capacity in chunks
    pub initial_chunks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            initial_chunks: 1,
        }
    }
}
