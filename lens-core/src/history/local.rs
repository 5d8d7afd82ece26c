use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{LensError, ServiceError};
use crate::store::RecordStore;
use crate::types::{HistoryEntry, NewAnalysis, RecordId};

use super::{HistoryService, order_newest_first, to_entries};

/// History service reading straight from a record store.
///
/// Store failures on the read and delete paths are reported as
/// [`ServiceError::StorageUnavailable`]; the underlying detail only reaches
/// the log.
#[derive(Clone)]
pub struct LocalHistoryService {
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for LocalHistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHistoryService").finish_non_exhaustive()
    }
}

impl LocalHistoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Persist a completed analysis and return it in entry form.
    /// Validation failures pass through unchanged so callers can reject
    /// the payload.
    pub async fn record(&self, analysis: &NewAnalysis) -> crate::error::Result<HistoryEntry> {
        let record = self.store.insert(analysis).await?;
        info!(id = %record.id, "Recorded analysis");
        Ok(record.into())
    }
}

fn unavailable(operation: &str, err: &LensError) -> LensError {
    warn!(operation, error = %err, "History store operation failed");
    ServiceError::StorageUnavailable(err.to_string()).into()
}

#[async_trait::async_trait]
impl HistoryService for LocalHistoryService {
    async fn list_history(&self) -> crate::error::Result<Vec<HistoryEntry>> {
        let records = self
            .store
            .list_all()
            .await
            .map_err(|e| unavailable("list_history", &e))?;
        debug!(count = records.len(), "Loaded history");
        Ok(to_entries(order_newest_first(records)))
    }

    async fn delete_entry(&self, id: &RecordId) -> crate::error::Result<()> {
        let removed = self
            .store
            .delete(id)
            .await
            .map_err(|e| unavailable("delete_entry", &e))?;
        if removed {
            info!(%id, "Deleted history entry");
        } else {
            debug!(%id, "Delete of unknown history entry treated as success");
        }
        Ok(())
    }

    async fn clear_history(&self) -> crate::error::Result<()> {
        let count = self
            .store
            .clear()
            .await
            .map_err(|e| unavailable("clear_history", &e))?;
        info!(count, "Cleared history");
        Ok(())
    }
}
