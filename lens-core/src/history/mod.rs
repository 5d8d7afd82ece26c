//! History query service: the contract between the history view and the
//! record store.
//!
//! [`LocalHistoryService`] serves directly from a [`RecordStore`](crate::store::RecordStore);
//! [`HttpHistoryService`] talks to the retrieval endpoint exposed by `lens-server`.

mod http;
mod local;

pub use http::HttpHistoryService;
pub use local::LocalHistoryService;

use crate::types::{AnalysisRecord, HistoryEntry, RecordId};

/// Generic message shown to users when history cannot be retrieved.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch history";

/// Read and delete access to the signed-in history.
#[async_trait::async_trait]
pub trait HistoryService: Send + Sync {
    /// Every stored entry, most recent first.
    async fn list_history(&self) -> crate::error::Result<Vec<HistoryEntry>>;

    /// Delete one entry. Deleting an unknown id succeeds.
    async fn delete_entry(&self, id: &RecordId) -> crate::error::Result<()>;

    /// Delete every entry.
    async fn clear_history(&self) -> crate::error::Result<()>;
}

/// Order records newest first. The sort is stable, so records sharing a
/// timestamp keep their insertion order.
pub fn order_newest_first(mut records: Vec<AnalysisRecord>) -> Vec<AnalysisRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

/// Reshape stored records into the client-facing entry form.
pub fn to_entries(records: Vec<AnalysisRecord>) -> Vec<HistoryEntry> {
    records.into_iter().map(HistoryEntry::from).collect()
}
