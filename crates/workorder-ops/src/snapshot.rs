//! JSON snapshot of the reference store
//!
//! The operator CLI keeps every work order in one file. A missing file is an
//! empty store; writes go through a sibling temp file and a rename.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use workorder_lifecycle::{InMemoryStore, WorkOrder};

/// Current snapshot format
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    #[serde(default)]
    pub work_orders: Vec<WorkOrder>,
}

impl Snapshot {
    pub fn new(work_orders: Vec<WorkOrder>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            work_orders,
        }
    }
}

/// Load the store from `path`, or an empty store if the file does not exist
pub fn load(path: &Path) -> Result<InMemoryStore> {
    if !path.exists() {
        debug!(path = %path.display(), "No snapshot yet, starting empty");
        return Ok(InMemoryStore::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    anyhow::ensure!(
        snapshot.format_version == FORMAT_VERSION,
        "unsupported snapshot format {} (expected {})",
        snapshot.format_version,
        FORMAT_VERSION
    );

    debug!(path = %path.display(), orders = snapshot.work_orders.len(), "Snapshot loaded");
    Ok(InMemoryStore::from_orders(snapshot.work_orders))
}

/// Write every order held by `store` to `path`
pub fn save(store: &InMemoryStore, path: &Path) -> Result<()> {
    let snapshot = Snapshot::new(store.snapshot()?);
    let json = serde_json::to_string_pretty(&snapshot)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;

    debug!(path = %path.display(), orders = snapshot.work_orders.len(), "Snapshot saved");
    Ok(())
}
