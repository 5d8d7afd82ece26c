use std::fmt::Write as _;

use chrono::SecondsFormat;

use crate::error::ExportError;
use crate::progress::ProgressReporter;
use crate::types::HistoryEntry;

const HEADER: &str = "id,timestamp,input_text,technique_ids,technique_names,mean_confidence";

pub(super) fn render(
    entries: &[HistoryEntry],
    progress: &dyn ProgressReporter,
) -> Result<String, ExportError> {
    let mut out = String::with_capacity(64 * (entries.len() + 1));
    out.push_str(HEADER);
    out.push('\n');

    for entry in entries {
        let ids: Vec<&str> = entry.techniques.iter().map(|t| t.id.as_str()).collect();
        let names: Vec<&str> = entry.techniques.iter().map(|t| t.name.as_str()).collect();
        let confidence = entry
            .confidence_percent()
            .map(|p| p.to_string())
            .unwrap_or_default();

        writeln!(
            out,
            "{},{},{},{},{},{}",
            csv_escape(entry.id.as_str()),
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            csv_escape(&entry.input_text),
            csv_escape(&ids.join(";")),
            csv_escape(&names.join(";")),
            confidence,
        )
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
        progress.advance(1);
    }

    Ok(out)
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}
