use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::error::{LensError, ServiceError};
use crate::types::{HistoryEntry, NewAnalysis, RecordId};

use super::HistoryService;

/// History service backed by a remote retrieval endpoint.
#[derive(Debug, Clone)]
pub struct HttpHistoryService {
    client: Client,
    base_url: Url,
}

impl HttpHistoryService {
    /// Create a client for the endpoint rooted at `base_url`
    /// (e.g. `http://127.0.0.1:7878`).
    pub fn new(base_url: &str) -> crate::error::Result<Self> {
        ensure_crypto_provider();
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::Network(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// `<base>/api/history[/<id>]`, with the id percent-encoded as a path segment.
    fn history_url(&self, id: Option<&RecordId>) -> crate::error::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ServiceError::Network(format!("base URL cannot be a base: {}", self.base_url))
            })?;
            segments.pop_if_empty().extend(["api", "history"]);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    /// Submit a completed analysis to the remote store.
    pub async fn record(&self, analysis: &NewAnalysis) -> crate::error::Result<HistoryEntry> {
        let url = self.history_url(None)?;
        debug!(%url, "Submitting analysis");
        let resp = self
            .client
            .post(url)
            .json(analysis)
            .send()
            .await
            .map_err(network)?;
        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()).into())
    }

    async fn delete(&self, id: Option<&RecordId>) -> crate::error::Result<()> {
        let url = self.history_url(id)?;
        debug!(%url, "Deleting remote history");
        let resp = self.client.delete(url).send().await.map_err(network)?;
        // Deleting something already gone is a success.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(resp).await?;
        Ok(())
    }
}

fn network(err: reqwest::Error) -> LensError {
    ServiceError::Network(err.to_string()).into()
}

async fn check_status(resp: reqwest::Response) -> crate::error::Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::Status { status, body }.into())
}

/// reqwest is built without a bundled TLS provider; install aws-lc-rs once
/// per process before the first client is created.
fn ensure_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing the race to another thread is fine.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
}

#[async_trait::async_trait]
impl HistoryService for HttpHistoryService {
    async fn list_history(&self) -> crate::error::Result<Vec<HistoryEntry>> {
        let url = self.history_url(None)?;
        debug!(%url, "Fetching remote history");
        let resp = self.client.get(url).send().await.map_err(network)?;
        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()).into())
    }

    async fn delete_entry(&self, id: &RecordId) -> crate::error::Result<()> {
        self.delete(Some(id)).await
    }

    async fn clear_history(&self) -> crate::error::Result<()> {
        self.delete(None).await
    }
}
