// Technique Lens history endpoint. Serves the record store over HTTP.
//
// Routes:
//   GET    /api/history      every entry, newest first
//   POST   /api/history      record a completed analysis
//   DELETE /api/history      remove every entry
//   DELETE /api/history/:id  remove one entry
//   GET    /healthz          liveness probe

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use lens_core::error::{LensError, StoreError};
use lens_core::history::{FETCH_FAILED_MESSAGE, HistoryService, LocalHistoryService};
use lens_core::types::{HistoryEntry, NewAnalysis, RecordId};

const DELETE_FAILED_MESSAGE: &str = "Failed to delete history entry";
const CLEAR_FAILED_MESSAGE: &str = "Failed to clear history";
const RECORD_FAILED_MESSAGE: &str = "Failed to record analysis";

type SharedService = Arc<LocalHistoryService>;

// ── Errors ────────────────────────────────────────────────────────

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// A failed request. Internal errors carry a fixed message; the cause
/// only goes to the log.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

// ── Server ────────────────────────────────────────────────────────

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/history",
            get(list_history)
                .post(record_analysis)
                .delete(clear_history),
        )
        .route("/api/history/:id", delete(delete_entry))
        .with_state(service)
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    service: SharedService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("History endpoint listening on http://{addr}");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

// ── Handlers ──────────────────────────────────────────────────────

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_history(
    State(service): State<SharedService>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    service.list_history().await.map(Json).map_err(|e| {
        error!(error = %e, "GET /api/history failed");
        ApiError::internal(FETCH_FAILED_MESSAGE)
    })
}

async fn record_analysis(
    State(service): State<SharedService>,
    payload: Result<Json<NewAnalysis>, JsonRejection>,
) -> Result<(StatusCode, Json<HistoryEntry>), ApiError> {
    let Json(analysis) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected analysis payload");
        ApiError::bad_request(rejection.body_text())
    })?;

    match service.record(&analysis).await {
        Ok(entry) => Ok((StatusCode::CREATED, Json(entry))),
        Err(LensError::Store(StoreError::InvalidRecord(reason))) => {
            warn!(%reason, "Rejected invalid analysis");
            Err(ApiError::bad_request(reason))
        }
        Err(e) => {
            error!(error = %e, "POST /api/history failed");
            Err(ApiError::internal(RECORD_FAILED_MESSAGE))
        }
    }
}

async fn delete_entry(
    State(service): State<SharedService>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = RecordId::from(id);
    match service.delete_entry(&id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!(%id, error = %e, "DELETE /api/history/:id failed");
            Err(ApiError::internal(DELETE_FAILED_MESSAGE))
        }
    }
}

async fn clear_history(State(service): State<SharedService>) -> Result<StatusCode, ApiError> {
    match service.clear_history().await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!(error = %e, "DELETE /api/history failed");
            Err(ApiError::internal(CLEAR_FAILED_MESSAGE))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::oneshot;

    use lens_core::history::HttpHistoryService;
    use lens_core::store::RecordStore;
    use lens_core::store::sqlite::SqliteStore;
    use lens_core::types::{AnalysisRecord, StoreStats, TechniqueDetection};

    use super::*;

    struct Running {
        base_url: String,
        _shutdown: oneshot::Sender<()>,
    }

    async fn spawn(store: Arc<dyn RecordStore>) -> Running {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let service = Arc::new(LocalHistoryService::new(store));
        tokio::spawn(serve(listener, service, async {
            let _ = rx.await;
        }));
        Running {
            base_url: format!("http://{addr}"),
            _shutdown: tx,
        }
    }

    fn client() -> reqwest::Client {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        reqwest::Client::new()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn analysis(text: &str) -> NewAnalysis {
        NewAnalysis::new(text, vec![TechniqueDetection::new("T1", "Spoofing", 0.9)])
    }

    /// Store that fails every call.
    struct OfflineStore;

    #[async_trait::async_trait]
    impl RecordStore for OfflineStore {
        async fn insert_at(
            &self,
            _analysis: &NewAnalysis,
            _created_at: DateTime<Utc>,
        ) -> lens_core::error::Result<AnalysisRecord> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }

        async fn delete(&self, _id: &RecordId) -> lens_core::error::Result<bool> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }

        async fn clear(&self) -> lens_core::error::Result<u64> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }

        async fn list_all(&self) -> lens_core::error::Result<Vec<AnalysisRecord>> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }

        async fn get(&self, _id: &RecordId) -> lens_core::error::Result<Option<AnalysisRecord>> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }

        async fn stats(&self) -> lens_core::error::Result<StoreStats> {
            Err(StoreError::Unavailable("disk detached".into()).into())
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_in_wire_format() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store.insert_at(&analysis("first"), at(0)).await.unwrap();
        store.insert_at(&analysis("second"), at(60)).await.unwrap();
        let server = spawn(store).await;

        let remote = HttpHistoryService::new(&server.base_url).unwrap();
        let entries = remote.list_history().await.unwrap();
        let texts: Vec<&str> = entries.iter().map(|e| e.input_text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);

        let raw: serde_json::Value = client()
            .get(format!("{}/api/history", server.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(raw[0]["inputText"], "second");
        assert_eq!(raw[0]["techniques"][0]["id"], "T1");
        assert_eq!(raw[1]["timestamp"], "2023-11-14T22:13:20Z");
    }

    #[tokio::test]
    async fn store_failure_is_a_generic_500() {
        let server = spawn(Arc::new(OfflineStore)).await;

        let resp = client()
            .get(format!("{}/api/history", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Failed to fetch history" }));

        let resp = client()
            .delete(format!("{}/api/history", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.text().await.unwrap();
        assert!(!body.contains("disk detached"));
    }

    #[tokio::test]
    async fn post_records_and_validates() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let server = spawn(store.clone()).await;
        let url = format!("{}/api/history", server.base_url);

        let resp = client()
            .post(&url)
            .json(&serde_json::json!({
                "inputText": "verify your account",
                "techniques": [{ "id": "T2", "name": "Urgency", "confidence": 0.7 }]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: HistoryEntry = resp.json().await.unwrap();
        assert!(store.get(&created.id).await.unwrap().is_some());

        let resp = client()
            .post(&url)
            .json(&serde_json::json!({ "inputText": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        let resp = client()
            .post(&url)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn deletes_are_idempotent() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let keep = store.insert_at(&analysis("keep"), at(0)).await.unwrap();
        let gone = store.insert_at(&analysis("gone"), at(1)).await.unwrap();
        let server = spawn(store.clone()).await;

        for _ in 0..2 {
            let resp = client()
                .delete(format!("{}/api/history/{}", server.base_url, gone.id))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
        }
        let remaining = store.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);

        let remote = HttpHistoryService::new(&server.base_url).unwrap();
        remote.clear_history().await.unwrap();
        remote.clear_history().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let server = spawn(Arc::new(SqliteStore::in_memory().unwrap())).await;
        let resp = client()
            .get(format!("{}/healthz", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }
}
