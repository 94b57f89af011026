use anyhow::Context;
use async_trait::async_trait;
use libsql::{Row, params};

use super::models::{Endpoint, NewEndpoint};
use crate::monitoring::types::{EndpointKind, ProbeOutcome, UnknownKind};
use crate::pool::{LibsqlManager, LibsqlPool};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),

    #[error("Endpoint {0} not found")]
    NotFound(i64),

    #[error("Corrupt endpoint row: {0}")]
    Corrupt(#[from] UnknownKind),
}

/// Persistence for the monitored endpoint list
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// All endpoints, ordered by id
    async fn list(&self) -> Result<Vec<Endpoint>, StoreError>;

    /// A single endpoint by id
    async fn get(&self, id: i64) -> Result<Option<Endpoint>, StoreError>;

    /// Store a new endpoint with no probe results and return its id
    async fn add(&self, endpoint: NewEndpoint) -> Result<i64, StoreError>;

    /// Remove an endpoint
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Overwrite the probed fields of an endpoint
    async fn update(&self, id: i64, outcome: ProbeOutcome) -> Result<(), StoreError>;
}

/// LibSQL endpoint store
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Open (or create) the database file at `path` and bring its schema up to date
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let database = libsql::Builder::new_local(path)
            .build()
            .await
            .with_context(|| format!("failed to open database at {path}"))?;
        let pool: LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(database))
            .config(deadpool::managed::PoolConfig::default())
            .build()?;

        let conn = pool.get().await?;
        super::initialize_database(&conn).await?;
        drop(conn);

        Ok(Self::new_from_pool(pool))
    }

    /// Create a store from an already migrated pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }
}

fn endpoint_from_row(row: &Row) -> Result<Endpoint, StoreError> {
    let kind: String = row.get(2)?;

    Ok(Endpoint {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind.parse()?,
        up: row.get::<Option<i64>>(3)?.map(|v| v != 0),
        registered: row.get::<Option<i64>>(4)?.map(|v| v != 0),
        latency_ms: row.get::<Option<f64>>(5)?,
    })
}

#[async_trait]
impl EndpointStore for LibsqlStore {
    async fn list(&self) -> Result<Vec<Endpoint>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query("SELECT id, name, kind, up, registered, latency_ms FROM endpoints ORDER BY id", ())
            .await?;

        let mut endpoints = Vec::new();
        while let Some(row) = rows.next().await? {
            endpoints.push(endpoint_from_row(&row)?);
        }

        Ok(endpoints)
    }

    async fn get(&self, id: i64) -> Result<Option<Endpoint>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, name, kind, up, registered, latency_ms FROM endpoints WHERE id = ?",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(endpoint_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn add(&self, endpoint: NewEndpoint) -> Result<i64, StoreError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO endpoints (name, kind, up, registered, latency_ms) VALUES (?, ?, NULL, NULL, NULL)",
            params![endpoint.name, endpoint.kind.as_str()],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let deleted = conn.execute("DELETE FROM endpoints WHERE id = ?", params![id]).await?;

        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn update(&self, id: i64, outcome: ProbeOutcome) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE endpoints SET up = ?, registered = ?, latency_ms = ? WHERE id = ?",
                params![
                    i64::from(outcome.up()),
                    outcome.registered().map(i64::from),
                    outcome.latency_ms(),
                    id
                ],
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Reachability;
    use tempfile::TempDir;

    async fn create_test_store() -> anyhow::Result<(LibsqlStore, TempDir)> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let store = LibsqlStore::open(&db_path.to_string_lossy()).await?;
        Ok((store, temp_dir))
    }

    fn new_endpoint(name: &str, kind: EndpointKind) -> NewEndpoint {
        NewEndpoint { name: name.to_string(), kind }
    }

    #[tokio::test]
    async fn test_add_starts_unprobed() -> anyhow::Result<()> {
        let (store, _dir) = create_test_store().await?;

        let id = store.add(new_endpoint("example.com", EndpointKind::Domain)).await?;
        let endpoint = store.get(id).await?.expect("endpoint was just added");

        assert_eq!(endpoint.name, "example.com");
        assert_eq!(endpoint.kind, EndpointKind::Domain);
        assert_eq!((endpoint.up, endpoint.registered, endpoint.latency_ms), (None, None, None));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_overwrites_probe_fields() -> anyhow::Result<()> {
        let (store, _dir) = create_test_store().await?;
        let id = store.add(new_endpoint("example.com", EndpointKind::Domain)).await?;

        store
            .update(id, ProbeOutcome::checked(Some(true), Reachability::Up { latency_ms: 12.0 }))
            .await?;
        let endpoint = store.get(id).await?.unwrap();
        assert_eq!((endpoint.up, endpoint.registered, endpoint.latency_ms), (Some(true), Some(true), Some(12.0)));

        store.update(id, ProbeOutcome::unregistered()).await?;
        let endpoint = store.get(id).await?.unwrap();
        assert_eq!((endpoint.up, endpoint.registered, endpoint.latency_ms), (Some(false), Some(false), None));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_list() -> anyhow::Result<()> {
        let (store, _dir) = create_test_store().await?;
        let first = store.add(new_endpoint("example.com", EndpointKind::Domain)).await?;
        let second = store.add(new_endpoint("127.0.0.1:80", EndpointKind::Hostname)).await?;

        store.delete(first).await?;

        let ids: Vec<i64> = store.list().await?.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second]);
        assert!(matches!(store.delete(first).await, Err(StoreError::NotFound(id)) if id == first));
        assert!(matches!(
            store.update(first, ProbeOutcome::unregistered()).await,
            Err(StoreError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("reopen.db").to_string_lossy().to_string();

        let store = LibsqlStore::open(&db_path).await?;
        store.add(new_endpoint("localhost:5000", EndpointKind::Hostname)).await?;
        drop(store);

        let reopened = LibsqlStore::open(&db_path).await?;
        let endpoints = reopened.list().await?;
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].kind, EndpointKind::Hostname);
        Ok(())
    }
}
