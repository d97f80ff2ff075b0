//! In-memory backend for tests and ephemeral runs.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{Error, Result, backend::RoutingBackend, route::RoutingTable};

/// Keeps the last saved table in memory. Saves can be made to fail on demand.
#[derive(Default)]
pub struct MemoryBackend {
    table: Mutex<Option<RoutingTable>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing durable record.
    pub fn with_table(table: RoutingTable) -> Self {
        Self {
            table: Mutex::new(Some(table)),
            ..Self::default()
        }
    }

    /// Make every subsequent `save` return an error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The currently stored record.
    pub fn stored(&self) -> Option<RoutingTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RoutingBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<RoutingTable>> {
        Ok(self.stored())
    }

    async fn save(&self, table: &RoutingTable) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::message("memory backend configured to fail saves"));
        }
        *self.table.lock().unwrap_or_else(|e| e.into_inner()) = Some(table.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
