use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{Endpoint, NewEndpoint};
use super::repository::{EndpointStore, StoreError};
use crate::monitoring::types::ProbeOutcome;

/// Volatile endpoint store, used when the database path is `:memory:`.
///
/// Pooled libsql connections to `:memory:` would each open their own empty
/// database, so the list lives in process memory instead.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    last_id: i64,
    endpoints: BTreeMap<i64, Endpoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EndpointStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Endpoint>, StoreError> {
        Ok(self.state.read().await.endpoints.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Endpoint>, StoreError> {
        Ok(self.state.read().await.endpoints.get(&id).cloned())
    }

    async fn add(&self, endpoint: NewEndpoint) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = state.last_id;
        state.endpoints.insert(
            id,
            Endpoint {
                id,
                name: endpoint.name,
                kind: endpoint.kind,
                up: None,
                registered: None,
                latency_ms: None,
            },
        );
        Ok(id)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match self.state.write().await.endpoints.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn update(&self, id: i64, outcome: ProbeOutcome) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let endpoint = state.endpoints.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        endpoint.apply(outcome);
        Ok(())
    }
}
