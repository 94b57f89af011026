/// Endpoint persistence
///
/// The endpoint list is owned by an [`EndpointStore`]: a pooled LibSQL
/// (SQLite) database in production, or process memory for `:memory:`.
pub mod memory;
pub mod migrations;
pub mod models;
pub mod repository;

pub use memory::MemoryStore;
pub use models::{Endpoint, NewEndpoint};
pub use repository::{EndpointStore, LibsqlStore, StoreError};

use anyhow::Result;
use std::sync::Arc;

/// Path that selects the in-process store
pub const IN_MEMORY: &str = ":memory:";

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

/// Open the store configured by `path`
pub async fn open_store(path: &str) -> Result<Arc<dyn EndpointStore>> {
    if path == IN_MEMORY {
        tracing::warn!("Using an in-memory endpoint store, endpoints are lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!("Opening endpoint database at {}", path);
    Ok(Arc::new(LibsqlStore::open(path).await?))
}
