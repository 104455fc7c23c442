//! Execution logging
//!
//! One append-only entry per agent invocation, success or failure. Entries
//! carry an integrity hash of the input snapshot so they can be verified
//! after the fact.

use crate::models::ExecutionLogEntry;
use crate::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Sink for execution log entries. Must accept entries for invocations that
/// already failed; a sink failure is reported by the caller, never allowed
/// to mask the original error.
#[async_trait::async_trait]
pub trait ExecutionLogSink: Send + Sync {
    async fn record(&self, entry: ExecutionLogEntry) -> Result<()>;
}

/// In-memory execution log store
pub struct InMemoryExecutionLog {
    entries: Arc<RwLock<HashMap<Uuid, ExecutionLogEntry>>>,
}

impl InMemoryExecutionLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Retrieve an entry by ID
    pub async fn get(&self, entry_id: Uuid) -> Option<ExecutionLogEntry> {
        let entries = self.entries.read().await;
        entries.get(&entry_id).cloned()
    }

    /// List all entry IDs for a user (sorted by created_at)
    pub async fn list_for_user(&self, user_id: Uuid) -> Vec<Uuid> {
        let entries = self.entries.read().await;

        let mut items: Vec<_> = entries
            .iter()
            .filter(|(_, entry)| entry.context.user_id == user_id)
            .map(|(id, entry)| (*id, entry.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);

        items.into_iter().map(|(id, _)| id).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All entries, unordered. For inspection in tests.
    pub async fn entries(&self) -> Vec<ExecutionLogEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Verify an entry's input snapshot against its stored hash
    pub async fn verify_integrity(&self, entry_id: Uuid) -> bool {
        let entries = self.entries.read().await;

        if let Some(entry) = entries.get(&entry_id) {
            compute_input_hash(&entry.input) == entry.input_hash
        } else {
            false
        }
    }
}

impl Default for InMemoryExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ExecutionLogSink for InMemoryExecutionLog {
    async fn record(&self, entry: ExecutionLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.entry_id, entry);
        Ok(())
    }
}

/// Compute SHA256 hash of an input snapshot for integrity verification
/// Uses zero-copy streaming serialization into hasher
pub fn compute_input_hash(input: &Value) -> String {
    let mut hasher = Sha256::new();

    // Stream JSON directly into hasher (no intermediate String)
    if serde_json::to_writer(&mut HashWriter(&mut hasher), input).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
