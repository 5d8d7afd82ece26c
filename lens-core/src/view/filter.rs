use crate::types::HistoryEntry;

/// Entries whose input text, technique id, or technique name contains
/// `query` case-insensitively. A blank query keeps everything; otherwise the
/// query is matched as typed, surrounding whitespace included.
pub fn filter_entries(entries: &[HistoryEntry], query: &str) -> Vec<HistoryEntry> {
    if query.trim().is_empty() {
        return entries.to_vec();
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| matches(entry, &needle))
        .cloned()
        .collect()
}

/// `needle` must already be lower-cased.
fn matches(entry: &HistoryEntry, needle: &str) -> bool {
    entry.input_text.to_lowercase().contains(needle)
        || entry.techniques.iter().any(|t| {
            t.id.to_lowercase().contains(needle) || t.name.to_lowercase().contains(needle)
        })
}
