//! Export and import of memory state.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Message;
use super::stats::ContextStats;
use super::summary::CompressedSummary;
use crate::{Error, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a [`MemoryStore`](super::MemoryStore).
///
/// Tiers and counters are carried verbatim so an import reproduces the
/// exporting store exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub short_term: Vec<Message>,
    pub medium_term: Vec<CompressedSummary>,
    pub long_term: BTreeMap<String, Value>,
    /// Every appended message, including compressed ones.
    #[serde(default)]
    pub history: Vec<Message>,
    pub stats: ContextStats,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(raw)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub(crate) fn check_version(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(())
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        tracing::debug!(path = %path.display(), messages = self.short_term.len(), "Saved memory snapshot");
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&raw)
    }
}
