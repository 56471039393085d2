use crate::{Binding, Result, SelectQuery, UpdateRequest};
use async_trait::async_trait;

/// Read/write access to the backing graph store.
#[async_trait]
pub trait TripleStore: Send + Sync {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<Binding>>;
    async fn update(&self, request: &UpdateRequest) -> Result<()>;
}
