use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ── Identifiers ────────────────────────────────────────────────────

/// Opaque record identifier assigned by the store on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ── Records ────────────────────────────────────────────────────────

/// A single technique detected by the analysis engine.
///
/// Embedded in its parent record; it has no identity or lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDetection {
    /// Technique code, e.g. `T1566`.
    pub id: String,
    /// Human-readable technique name.
    pub name: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

impl TechniqueDetection {
    pub fn new(id: impl Into<String>, name: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            confidence,
        }
    }
}

/// A completed analysis waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    pub input_text: String,
    #[serde(default)]
    pub techniques: Vec<TechniqueDetection>,
}

impl NewAnalysis {
    pub fn new(input_text: impl Into<String>, techniques: Vec<TechniqueDetection>) -> Self {
        Self {
            input_text: input_text.into(),
            techniques,
        }
    }

    /// Reject empty input text and out-of-range confidences.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.input_text.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "input text must not be empty".to_string(),
            ));
        }
        for technique in &self.techniques {
            if !technique.confidence.is_finite() || !(0.0..=1.0).contains(&technique.confidence)
            {
                return Err(StoreError::InvalidRecord(format!(
                    "confidence {} for technique {} is outside [0, 1]",
                    technique.confidence, technique.id
                )));
            }
        }
        Ok(())
    }
}

/// A persisted analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: RecordId,
    pub input_text: String,
    pub techniques: Vec<TechniqueDetection>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing shape of a record, as served by the retrieval endpoint
/// and held by the history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: RecordId,
    pub input_text: String,
    pub techniques: Vec<TechniqueDetection>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Arithmetic mean of the technique confidences; `None` without techniques.
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.techniques.is_empty() {
            return None;
        }
        let sum: f64 = self.techniques.iter().map(|t| t.confidence).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / self.techniques.len() as f64;
        mean.is_finite().then_some(mean)
    }

    /// Mean confidence as a whole percentage, rounded half away from zero.
    pub fn confidence_percent(&self) -> Option<u8> {
        self.mean_confidence().map(|mean| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = (mean * 100.0).round().clamp(0.0, 100.0) as u8;
            percent
        })
    }
}

impl From<AnalysisRecord> for HistoryEntry {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            input_text: record.input_text,
            techniques: record.techniques,
            timestamp: record.created_at,
        }
    }
}

// ── Metrics ────────────────────────────────────────────────────────

/// Summary statistics about the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_records: u64,
    pub total_techniques: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub db_size_bytes: u64,
}
