// Integration test utilities and fixtures for Technique Lens.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use lens_core::history::LocalHistoryService;
use lens_core::store::RecordStore;
use lens_core::store::sqlite::SqliteStore;
use lens_core::types::{AnalysisRecord, NewAnalysis, TechniqueDetection};

/// Fixed reference time so ordering assertions are deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// `base_time() + minutes`.
pub fn minutes(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

/// A small, varied set of analyses.
pub fn sample_analyses() -> Vec<NewAnalysis> {
    vec![
        NewAnalysis::new(
            "Your account has been suspended. Verify your identity within 24 hours.",
            vec![
                TechniqueDetection::new("T1", "Spoofing", 0.8),
                TechniqueDetection::new("T2", "Urgency", 0.6),
            ],
        ),
        NewAnalysis::new(
            "Hi team, the quarterly invoice is attached for review.",
            vec![],
        ),
        NewAnalysis::new(
            "This is the CEO. I need gift cards purchased before the board meeting.",
            vec![
                TechniqueDetection::new("T3", "Authority", 0.9),
                TechniqueDetection::new("T2", "Urgency", 0.7),
                TechniqueDetection::new("T4", "Pretexting", 0.5),
                TechniqueDetection::new("T5", "Secrecy", 0.4),
            ],
        ),
    ]
}

/// An in-memory store with one record per timestamp, inserted in the
/// given order. Returns the store and the inserted records.
pub async fn seeded_store(
    times: &[DateTime<Utc>],
) -> anyhow::Result<(Arc<SqliteStore>, Vec<AnalysisRecord>)> {
    let store = Arc::new(SqliteStore::in_memory().context("open in-memory store")?);
    let analyses = sample_analyses();
    let mut records = Vec::with_capacity(times.len());
    for (i, at) in times.iter().enumerate() {
        let analysis = &analyses[i % analyses.len()];
        records.push(store.insert_at(analysis, *at).await?);
    }
    Ok((store, records))
}

/// A history endpoint running on an ephemeral local port.
#[derive(Debug)]
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    pub async fn start(store: Arc<SqliteStore>) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind test listener")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let service = Arc::new(LocalHistoryService::new(store.clone()));
        let handle = tokio::spawn(lens_server::serve(listener, service, async {
            let _ = rx.await;
        }));
        Ok(Self {
            base_url: format!("http://{addr}"),
            store,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Stop accepting connections and wait for the server task to end.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("server task panicked")??;
        }
        Ok(())
    }
}

/// A fresh temporary directory for export artifacts.
pub fn temp_dir() -> anyhow::Result<tempfile::TempDir> {
    tempfile::tempdir().context("create tempdir")
}
