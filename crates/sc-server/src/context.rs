//! Application context shared by all request handlers via axum state.

use std::sync::Arc;

use sc_core::config::Config;
use sc_db::pool::DbPool;
use sc_stream::ChunkFetcher;
use tokio_util::sync::CancellationToken;

/// Cheaply cloneable: every field is a pool handle, an `Arc`, or a token.
#[derive(Clone)]
pub struct AppContext {
    /// Job bookkeeping database.
    pub db: DbPool,
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
    /// Chunk store all downloads read from.
    pub fetcher: Arc<dyn ChunkFetcher>,
    /// Cancelled on shutdown; parent of every request's fetch token.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(db: DbPool, config: Config, fetcher: Arc<dyn ChunkFetcher>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            fetcher,
            shutdown: CancellationToken::new(),
        }
    }
}
