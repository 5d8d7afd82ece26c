//! History export. Serializes entries to CSV or PDF and writes the artifact.

mod csv;
mod pdf;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::ExportError;
use crate::progress::ProgressReporter;
use crate::types::HistoryEntry;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    /// Upper-case label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Pdf => "PDF",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Serialize entries in the given order.
pub fn render(
    format: ExportFormat,
    entries: &[HistoryEntry],
    progress: &dyn ProgressReporter,
) -> Result<Vec<u8>, ExportError> {
    progress.start(&format!("Exporting {}", format.label()), entries.len() as u64);
    let bytes = match format {
        ExportFormat::Csv => csv::render(entries, progress).map(String::into_bytes),
        ExportFormat::Pdf => pdf::render(entries, progress),
    };
    progress.finish();
    bytes
}

/// Artifact file name, e.g. `history-20250301T100000.123Z.csv`.
pub fn file_name(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "history-{}.{}",
        at.format("%Y%m%dT%H%M%S%.3fZ"),
        format.as_str()
    )
}

/// Render `entries` and write them into `dir`, returning the artifact path.
pub async fn write_export(
    dir: &Path,
    format: ExportFormat,
    entries: &[HistoryEntry],
    progress: &dyn ProgressReporter,
) -> Result<PathBuf, ExportError> {
    let bytes = render(format, entries, progress)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(format, Utc::now()));
    tokio::fs::write(&path, &bytes).await?;
    info!(
        path = %path.display(),
        entries = entries.len(),
        bytes = bytes.len(),
        "Exported history"
    );
    Ok(path)
}
