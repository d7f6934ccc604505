//! Single writer for the tracking file

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::TrackingCounters;
use crate::agent::Role;
use crate::error::TrackingError;

/// Owns the tracking file; every update rewrites it in full through a
/// temporary file and a rename
#[derive(Debug)]
pub struct TrackingStore {
    path: PathBuf,
    counters: Mutex<TrackingCounters>,
}

impl TrackingStore {
    /// Load the counters at `path`, creating the file with zeros if missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TrackingError> {
        let path = path.into();
        let counters = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str::<TrackingCounters>(&content)?.normalized()
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let counters = TrackingCounters::default();
            std::fs::write(&path, serde_json::to_string_pretty(&counters)?)?;
            tracing::info!(path = %path.display(), "initialized tracking file");
            counters
        };

        Ok(Self {
            path,
            counters: Mutex::new(counters),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count one generated agent and persist the result
    ///
    /// The in-memory counters only change once the file has been written.
    pub async fn record(
        &self,
        role: Role,
        multi_role: bool,
    ) -> Result<TrackingCounters, TrackingError> {
        let mut counters = self.counters.lock().await;
        let mut updated = counters.clone();
        updated.record(role, multi_role);
        self.persist(&updated).await?;
        *counters = updated;
        tracing::debug!(%role, total = counters.total_agents, "tracking updated");
        Ok(counters.clone())
    }

    /// Current counters
    pub async fn snapshot(&self) -> TrackingCounters {
        self.counters.lock().await.clone()
    }

    async fn persist(&self, counters: &TrackingCounters) -> Result<(), TrackingError> {
        let json = serde_json::to_string_pretty(counters)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
