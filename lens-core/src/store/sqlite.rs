use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{LensError, StoreError};
use crate::types::{AnalysisRecord, NewAnalysis, RecordId, StoreStats};

use super::RecordStore;
use super::schema;

const RECORD_COLUMNS: &str = "seq, id, input_text, techniques, created_at";

/// SQLite-backed implementation of `RecordStore`.
///
/// A single connection behind a mutex serializes writers, so concurrent
/// inserts and deletes never interleave within one statement.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        debug!(path = %path.display(), "Opened record store");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("record store mutex poisoned".to_string()))
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;",
        )
        .map_err(StoreError::Sqlite)?;

        // WAL is ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO lens_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        let version: String = conn
            .query_row(
                "SELECT value FROM lens_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        if version != schema::SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database schema version {version} is not supported (expected {})",
                schema::SCHEMA_VERSION
            ))
            .into());
        }

        Ok(())
    }

    /// Timestamps are stored as fixed-width RFC 3339 text so that
    /// lexicographic and chronological order agree.
    fn format_timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(text: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
    }

    /// Helper: read a full record from a row selected with `RECORD_COLUMNS`.
    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnalysisRecord> {
        let techniques_json: String = row.get("techniques")?;
        let created_at: String = row.get("created_at")?;

        let techniques = serde_json::from_str(&techniques_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
        })?;

        Ok(AnalysisRecord {
            id: RecordId(row.get("id")?),
            input_text: row.get("input_text")?,
            techniques,
            created_at: Self::parse_timestamp(&created_at, 4)?,
        })
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    // ── Writes ─────────────────────────────────────────────────────

    async fn insert_at(
        &self,
        analysis: &NewAnalysis,
        created_at: DateTime<Utc>,
    ) -> crate::error::Result<AnalysisRecord> {
        analysis.validate()?;

        let techniques_json =
            serde_json::to_string(&analysis.techniques).map_err(StoreError::Serialization)?;
        // Match the stored precision so the returned record equals a later read.
        let created_at = created_at.trunc_subsecs(6);
        let id = RecordId::generate();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records (id, input_text, techniques, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id.as_str(),
                analysis.input_text,
                techniques_json,
                Self::format_timestamp(created_at)
            ],
        )
        .map_err(StoreError::Sqlite)?;

        debug!(%id, techniques = analysis.techniques.len(), "Inserted analysis record");

        Ok(AnalysisRecord {
            id,
            input_text: analysis.input_text.clone(),
            techniques: analysis.techniques.clone(),
            created_at,
        })
    }

    async fn delete(&self, id: &RecordId) -> crate::error::Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM records WHERE id = ?1", params![id.as_str()])
            .map_err(StoreError::Sqlite)?;
        debug!(%id, deleted, "Deleted analysis record");
        Ok(deleted > 0)
    }

    async fn clear(&self) -> crate::error::Result<u64> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM records", [])
            .map_err(StoreError::Sqlite)?;
        debug!(deleted, "Cleared analysis records");
        #[allow(clippy::cast_possible_truncation)]
        Ok(deleted as u64)
    }

    // ── Reads ──────────────────────────────────────────────────────

    async fn list_all(&self) -> crate::error::Result<Vec<AnalysisRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {RECORD_COLUMNS} FROM records ORDER BY seq ASC"
            ))
            .map_err(StoreError::Sqlite)?;
        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(records)
    }

    async fn get(&self, id: &RecordId) -> crate::error::Result<Option<AnalysisRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
            params![id.as_str()],
            Self::row_to_record,
        )
        .optional()
        .map_err(StoreError::Sqlite)
        .map_err(LensError::Store)
    }

    // ── Metrics ────────────────────────────────────────────────────

    async fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.lock()?;

        let total_records: u64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_techniques: u64 = conn
            .query_row(
                "SELECT COALESCE(SUM(json_array_length(techniques)), 0) FROM records",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        let (oldest, newest): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT MIN(created_at), MAX(created_at) FROM records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(StoreError::Sqlite)?;

        let oldest = oldest
            .map(|s| Self::parse_timestamp(&s, 0))
            .transpose()
            .map_err(StoreError::Sqlite)?;
        let newest = newest
            .map(|s| Self::parse_timestamp(&s, 1))
            .transpose()
            .map_err(StoreError::Sqlite)?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_records,
            total_techniques,
            oldest,
            newest,
            db_size_bytes,
        })
    }
}


// ── Property-based tests ──────────────────────────────────────────────
#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::TechniqueDetection;
    use proptest::prelude::*;

    /// Strategy for technique detections with in-range confidences
    /// (three decimal places, as the analysis engine reports them).
    fn arb_technique() -> impl Strategy<Value = TechniqueDetection> {
        ("T[0-9]{4}", "[A-Za-z ]{1,30}", 0u32..=1000).prop_map(|(id, name, milli)| {
            TechniqueDetection::new(id, name, f64::from(milli) / 1000.0)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Record round-trip: insert then retrieve preserves text and techniques in order.
        #[test]
        fn record_roundtrip(
            text in "[a-zA-Z0-9 .,!?]{0,200}[a-zA-Z]",
            techniques in proptest::collection::vec(arb_technique(), 0..6),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = SqliteStore::in_memory().unwrap();
                let record = store
                    .insert(&NewAnalysis::new(text.clone(), techniques.clone()))
                    .await
                    .unwrap();
                let fetched = store.get(&record.id).await.unwrap().expect("record should exist");

                prop_assert_eq!(fetched.input_text, text);
                prop_assert_eq!(fetched.techniques, techniques);
                prop_assert_eq!(fetched.created_at, record.created_at);
                Ok(())
            })?;
        }
    }
}
