//! Tiered per-unit memory with token-budget compression.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::config::{CompressionMode, MemoryConfig};
use super::message::{Message, MessageDraft, MessageId};
use super::snapshot::{SNAPSHOT_VERSION, SessionSnapshot};
use super::stats::ContextStats;
use super::summary::CompressedSummary;
use crate::Result;

/// Point-in-time footprint of a store, reported with unit results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub short_term_messages: usize,
    pub medium_term_summaries: usize,
    pub long_term_facts: usize,
    pub total_tokens: usize,
    pub compression_count: usize,
    pub total_appended: usize,
}

/// Memory owned by a single task unit.
///
/// Three tiers: raw recent messages (`short_term`), one summary per
/// compression (`medium_term`), and explicitly managed facts (`long_term`).
/// Every appended message is also kept in `history`, which compression
/// never touches and which backs [`context_window`](Self::context_window).
/// The store has a single writer, so nothing here is synchronized.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: MemoryConfig,
    short_term: Vec<Message>,
    medium_term: Vec<CompressedSummary>,
    long_term: BTreeMap<String, Value>,
    history: Vec<Message>,
    stats: ContextStats,
    compression_pending: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Appends a message and compresses if a limit was crossed.
    ///
    /// In [`CompressionMode::Deferred`] the compression is only flagged and
    /// runs at the next [`compact_if_needed`](Self::compact_if_needed).
    pub fn append(&mut self, draft: impl Into<MessageDraft>) -> MessageId {
        let message = draft.into().into_message();
        let id = message.id.clone();
        self.stats.record(&message);
        self.history.push(message.clone());
        self.short_term.push(message);

        if self.should_compress() {
            match self.config.compression {
                CompressionMode::Inline => {
                    self.compress();
                }
                CompressionMode::Deferred => self.compression_pending = true,
            }
        }
        id
    }

    pub fn append_value(&mut self, value: &Value) -> MessageId {
        self.append(MessageDraft::from_value(value))
    }

    pub fn should_compress(&self) -> bool {
        self.stats.total_tokens as f64 > self.config.token_threshold()
            || self.short_term.len() > self.config.message_ceiling
    }

    pub fn compression_pending(&self) -> bool {
        self.compression_pending
    }

    pub fn compact_if_needed(&mut self) -> bool {
        if self.should_compress() {
            self.compress();
            true
        } else {
            self.compression_pending = false;
            false
        }
    }

    /// Summarizes the whole short-term tier into `medium_term` and keeps only
    /// the newest `retention_window` messages.
    pub fn compress(&mut self) -> Option<&CompressedSummary> {
        self.compression_pending = false;
        if self.short_term.is_empty() {
            return None;
        }

        let summary = CompressedSummary::from_messages(&self.short_term);
        let tokens_before = self.stats.total_tokens;
        let keep = self.config.retention_window.min(self.short_term.len());
        let split = self.short_term.len() - keep;
        self.short_term.drain(..split);

        self.stats.rebuild(&self.short_term);
        self.stats.compression_count += 1;

        debug!(
            summarized = summary.metadata.original_message_count,
            retained = self.short_term.len(),
            tokens_before,
            tokens_after = self.stats.total_tokens,
            ratio = summary.metadata.compression_ratio,
            "Compressed short-term memory"
        );

        self.medium_term.push(summary);
        self.medium_term.last()
    }

    /// Longest chronological suffix of the full message history within
    /// `max_tokens`, including messages already compressed out of
    /// short-term memory.
    pub fn context_window(&self, max_tokens: usize) -> &[Message] {
        let mut used = 0usize;
        let mut start = self.history.len();
        for (index, message) in self.history.iter().enumerate().rev() {
            if used + message.token_count > max_tokens {
                break;
            }
            used += message.token_count;
            start = index;
        }
        &self.history[start..]
    }

    /// Every message appended, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn short_term(&self) -> &[Message] {
        &self.short_term
    }

    pub fn medium_term(&self) -> &[CompressedSummary] {
        &self.medium_term
    }

    pub fn long_term(&self) -> &BTreeMap<String, Value> {
        &self.long_term
    }

    pub fn stats(&self) -> &ContextStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.short_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty()
    }

    pub fn set_fact(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.long_term.insert(key.into(), value.into())
    }

    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.long_term.get(key)
    }

    pub fn remove_fact(&mut self, key: &str) -> Option<Value> {
        self.long_term.remove(key)
    }

    pub fn usage(&self) -> MemoryUsage {
        MemoryUsage {
            short_term_messages: self.short_term.len(),
            medium_term_summaries: self.medium_term.len(),
            long_term_facts: self.long_term.len(),
            total_tokens: self.stats.total_tokens,
            compression_count: self.stats.compression_count,
            total_appended: self.stats.total_appended,
        }
    }

    pub fn export_session(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            short_term: self.short_term.clone(),
            medium_term: self.medium_term.clone(),
            long_term: self.long_term.clone(),
            history: self.history.clone(),
            stats: self.stats,
        }
    }

    /// Replaces all tiers and counters with the snapshot's.
    ///
    /// The store keeps its own configuration. Imported state is not
    /// compressed even if it exceeds this store's limits. Snapshots written
    /// without a history fall back to their short-term messages.
    pub fn import_session(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        snapshot.check_version()?;
        self.history = if snapshot.history.is_empty() {
            snapshot.short_term.clone()
        } else {
            snapshot.history
        };
        self.short_term = snapshot.short_term;
        self.medium_term = snapshot.medium_term;
        self.long_term = snapshot.long_term;
        self.stats = snapshot.stats;
        self.compression_pending =
            self.config.compression == CompressionMode::Deferred && self.should_compress();
        Ok(())
    }

    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.export_session().save(path).await
    }

    pub async fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = SessionSnapshot::load(path).await?;
        self.import_session(snapshot)
    }
}
