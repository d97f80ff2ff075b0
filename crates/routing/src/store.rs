use std::sync::RwLock;

use {
    relay_common::ChatId,
    tokio::sync::Mutex,
    tracing::{info, warn},
};

use crate::{
    Result,
    backend::RoutingBackend,
    route::{Route, RoutingTable, remove_chat},
};

/// The authoritative routing table, shared by the relay and admin paths.
///
/// Readers get a full copy of the last committed table and never wait on
/// disk I/O. Mutations are serialized; each one builds the next table, saves
/// it through the backend, and only then swaps it in. A failed save leaves
/// the committed table untouched.
pub struct RoutingStore {
    backend: Box<dyn RoutingBackend>,
    table: RwLock<RoutingTable>,
    write: Mutex<()>,
}

impl RoutingStore {
    /// Load the table from `backend`. A missing record yields an empty table;
    /// a malformed one is returned as an error.
    pub async fn open(backend: impl RoutingBackend + 'static) -> Result<Self> {
        let table = backend.load().await?.unwrap_or_default();
        info!(
            sources = table.sources.len(),
            dests = table.dests.len(),
            "routing table loaded"
        );
        Ok(Self {
            backend: Box::new(backend),
            table: RwLock::new(table),
            write: Mutex::new(()),
        })
    }

    /// Copy of the committed table.
    pub fn snapshot(&self) -> RoutingTable {
        self.table.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the whole table.
    pub async fn save(&self, table: RoutingTable) -> Result<()> {
        self.mutate(move |current| *current = table).await
    }

    pub async fn add_source(&self, route: Route) -> Result<()> {
        self.mutate(|t| t.sources.push(route)).await?;
        info!(chat_id = route.chat_id, topic_id = ?route.topic_id, "source added");
        Ok(())
    }

    /// Remove every source with `chat_id`, whatever its topic.
    pub async fn remove_sources(&self, chat_id: ChatId) -> Result<usize> {
        let removed = self.mutate(|t| remove_chat(&mut t.sources, chat_id)).await?;
        info!(chat_id, removed, "sources removed");
        Ok(removed)
    }

    pub async fn add_dest(&self, route: Route) -> Result<()> {
        self.mutate(|t| t.dests.push(route)).await?;
        info!(chat_id = route.chat_id, topic_id = ?route.topic_id, "destination added");
        Ok(())
    }

    /// Remove every destination with `chat_id`, whatever its topic.
    pub async fn remove_dests(&self, chat_id: ChatId) -> Result<usize> {
        let removed = self.mutate(|t| remove_chat(&mut t.dests, chat_id)).await?;
        info!(chat_id, removed, "destinations removed");
        Ok(removed)
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut RoutingTable) -> R) -> Result<R> {
        let _guard = self.write.lock().await;
        let mut next = self.snapshot();
        let out = f(&mut next);
        if let Err(e) = self.backend.save(&next).await {
            warn!(error = %e, "failed to persist routing table, change discarded");
            return Err(e);
        }
        *self.table.write().unwrap_or_else(|e| e.into_inner()) = next;
        Ok(out)
    }
}
