//! JSON file-backed routing table with atomic writes.

use std::path::PathBuf;

use {async_trait::async_trait, tokio::fs, tracing::debug};

use crate::{Error, Result, backend::RoutingBackend, route::RoutingTable};

/// Default file name, shared with earlier deployments.
pub const DEFAULT_ROUTING_FILE: &str = "config.json";

/// Stores the table as a single pretty-printed JSON document.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_ROUTING_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RoutingBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<RoutingTable>> {
        if !fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "no routing file, starting empty");
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path).await?;
        let table =
            serde_json::from_str(&data).map_err(|e| Error::malformed(&self.path, e))?;
        Ok(Some(table))
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn save(&self, table: &RoutingTable) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(table)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(
            path = %self.path.display(),
            sources = table.sources.len(),
            dests = table.dests.len(),
            "saved routing table"
        );
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::route::Route, tempfile::TempDir};

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(tmp.path().join("config.json"));
        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(tmp.path().join("config.json"));
        let table = RoutingTable {
            sources: vec![Route::chat(1001), Route::topic(1001, 5)],
            dests: vec![Route::topic(-1003003, 9)],
        };
        backend.save(&table).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), Some(table));
        assert!(!tmp.path().join("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("routes.json");
        let backend = JsonFileBackend::new(&path);
        backend.save(&RoutingTable::default()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn saved_file_uses_flat_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let backend = JsonFileBackend::new(&path);
        backend
            .save(&RoutingTable {
                sources: vec![Route::chat(10)],
                dests: Vec::new(),
            })
            .await
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["sources"][0]["chat_id"], 10);
        assert!(raw["sources"][0]["topic_id"].is_null());
        assert_eq!(raw["dests"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"sources": "oops"}"#).unwrap();
        let err = JsonFileBackend::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }), "got {err:?}");
    }
}
