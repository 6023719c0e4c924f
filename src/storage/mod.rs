//! Local persistence for the last-selected organization
//!
//! A single mutable slot behind a small port so the core is testable with an
//! in-memory fake and portable across storage backends. Writes are
//! last-write-wins; this is per-device state, not a synchronized resource.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::utils::error::{CoreError, CoreResult};

/// Port for the persisted "last selected organization id" value
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// Read the persisted selection, if any
    async fn get(&self) -> CoreResult<Option<String>>;
    /// Persist a new selection
    async fn set(&self, org_id: &str) -> CoreResult<()>;
    /// Remove the persisted selection
    async fn clear(&self) -> CoreResult<()>;
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SelectionDocument {
    #[serde(default)]
    last_org_id: Option<String>,
}

/// File-backed selection store; survives process restarts
pub struct FileSelectionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileSelectionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform data directory
    /// (e.g. `~/.local/share/tenantry/selection.json`)
    pub fn default_path() -> CoreResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| CoreError::Storage("no platform data directory".to_string()))?;
        Ok(base.join("tenantry").join("selection.json"))
    }

    async fn read_document(&self) -> CoreResult<SelectionDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).or_else(|e| {
                // A corrupt selection file is not fatal; treat it as empty
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt selection file");
                Ok(SelectionDocument::default())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SelectionDocument::default()),
            Err(e) => Err(CoreError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_document(&self, doc: &SelectionDocument) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CoreError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| CoreError::Storage(format!("failed to encode selection: {}", e)))?;
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            CoreError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

#[async_trait]
impl SelectionStore for FileSelectionStore {
    async fn get(&self) -> CoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_document().await?.last_org_id)
    }

    async fn set(&self, org_id: &str) -> CoreResult<()> {
        let _guard = self.lock.lock().await;
        self.write_document(&SelectionDocument {
            last_org_id: Some(org_id.to_string()),
        })
        .await
    }

    async fn clear(&self) -> CoreResult<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// In-memory selection store for tests and ephemeral embedders
#[derive(Default)]
pub struct MemorySelectionStore {
    value: Mutex<Option<String>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, for tests that start with a persisted selection
    pub fn with_selection(org_id: &str) -> Self {
        Self {
            value: Mutex::new(Some(org_id.to_string())),
        }
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn get(&self) -> CoreResult<Option<String>> {
        Ok(self.value.lock().await.clone())
    }

    async fn set(&self, org_id: &str) -> CoreResult<()> {
        *self.value.lock().await = Some(org_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> CoreResult<()> {
        *self.value.lock().await = None;
        Ok(())
    }
}
