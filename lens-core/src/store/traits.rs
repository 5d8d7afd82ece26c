use chrono::{DateTime, Utc};

use crate::types::{AnalysisRecord, NewAnalysis, RecordId, StoreStats};

/// The record store abstraction. The history service reads and deletes
/// through this trait; the analysis pipeline appends through it.
///
/// There is no update operation: records are immutable once inserted.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    // ── Writes ─────────────────────────────────────────────────────

    /// Append a record stamped with an explicit creation time.
    /// The store assigns the identifier.
    async fn insert_at(
        &self,
        analysis: &NewAnalysis,
        created_at: DateTime<Utc>,
    ) -> crate::error::Result<AnalysisRecord>;

    /// Append a record stamped with the current time.
    async fn insert(&self, analysis: &NewAnalysis) -> crate::error::Result<AnalysisRecord> {
        self.insert_at(analysis, Utc::now()).await
    }

    /// Delete a record by ID. Returns `false` when no such record existed.
    async fn delete(&self, id: &RecordId) -> crate::error::Result<bool>;

    /// Delete every record. Returns count deleted.
    async fn clear(&self) -> crate::error::Result<u64>;

    // ── Reads ──────────────────────────────────────────────────────

    /// All records in insertion order.
    async fn list_all(&self) -> crate::error::Result<Vec<AnalysisRecord>>;

    /// Get a record by its ID.
    async fn get(&self, id: &RecordId) -> crate::error::Result<Option<AnalysisRecord>>;

    // ── Metrics ────────────────────────────────────────────────────

    /// Get summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}
