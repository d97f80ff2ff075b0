//! Persistence seam for the routing table.

use async_trait::async_trait;

use crate::{Result, route::RoutingTable};

/// Durable storage for a [`RoutingTable`].
///
/// `load` returns `Ok(None)` when no record exists yet and an error when a
/// record exists but cannot be read as a table. `save` must replace the record
/// atomically: a concurrent reader sees either the old or the new table.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    async fn load(&self) -> Result<Option<RoutingTable>>;
    async fn save(&self, table: &RoutingTable) -> Result<()>;
}
