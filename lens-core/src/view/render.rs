//! Presentation of history entries as rows, plus the empty-state copy.

use std::fmt::Write as _;

use chrono::{Local, TimeZone};

use crate::types::{HistoryEntry, RecordId};

/// Mean technique confidence as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceDisplay {
    Percent(u8),
    Unavailable,
}

impl ConfidenceDisplay {
    pub fn of(entry: &HistoryEntry) -> Self {
        entry
            .confidence_percent()
            .map_or(Self::Unavailable, Self::Percent)
    }
}

impl std::fmt::Display for ConfidenceDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Unavailable => f.write_str("—"),
        }
    }
}

/// Row layout limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub preview_chars: usize,
    pub badge_limit: usize,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            preview_chars: 80,
            badge_limit: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: RecordId,
    pub date: String,
    pub time: String,
    pub preview: String,
    /// Technique ids, at most `badge_limit` of them.
    pub badges: Vec<String>,
    /// Techniques not shown as badges.
    pub overflow: usize,
    pub confidence: ConfidenceDisplay,
}

impl HistoryRow {
    /// Badges with the `+N` overflow marker appended when needed.
    pub fn badge_labels(&self) -> Vec<String> {
        let mut labels = self.badges.clone();
        if self.overflow > 0 {
            labels.push(format!("+{}", self.overflow));
        }
        labels
    }
}

/// Row in the local time zone.
pub fn build_row(entry: &HistoryEntry, layout: RowLayout) -> HistoryRow {
    build_row_in(entry, layout, &Local)
}

pub fn build_row_in<Tz: TimeZone>(entry: &HistoryEntry, layout: RowLayout, tz: &Tz) -> HistoryRow
where
    Tz::Offset: std::fmt::Display,
{
    let at = entry.timestamp.with_timezone(tz);
    let badges: Vec<String> = entry
        .techniques
        .iter()
        .take(layout.badge_limit)
        .map(|t| t.id.clone())
        .collect();
    HistoryRow {
        id: entry.id.clone(),
        date: at.format("%Y-%m-%d").to_string(),
        time: at.format("%H:%M:%S").to_string(),
        preview: preview(&entry.input_text, layout.preview_chars),
        overflow: entry.techniques.len() - badges.len(),
        badges,
        confidence: ConfidenceDisplay::of(entry),
    }
}

/// First `max_chars` characters of `text` on one line, with `…` if cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

/// What to show when no rows are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// A search is active but nothing matched.
    NoResults,
    /// There is nothing recorded at all.
    NoHistory,
}

impl EmptyState {
    pub fn title(self) -> &'static str {
        match self {
            Self::NoResults => "No Results Found",
            Self::NoHistory => "No History Yet",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NoResults => "Try a different search term",
            Self::NoHistory => "Your analysis results will appear here",
        }
    }

    pub fn call_to_action(self) -> Option<&'static str> {
        match self {
            Self::NoResults => None,
            Self::NoHistory => Some("Start Analyzing"),
        }
    }
}

/// Plain-text table for terminal output.
pub fn render_table(rows: &[HistoryRow]) -> String {
    let id_width = rows
        .iter()
        .map(|r| r.id.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max(2);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:<8}  {:<id_width$}  {:>10}  {:<20}  TEXT",
        "DATE", "TIME", "ID", "CONFIDENCE", "TECHNIQUES"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<10}  {:<8}  {:<id_width$}  {:>10}  {:<20}  {}",
            row.date,
            row.time,
            row.id.as_str(),
            row.confidence.to_string(),
            row.badge_labels().join(" "),
            row.preview
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::types::TechniqueDetection;

    fn entry(techniques: Vec<TechniqueDetection>) -> HistoryEntry {
        HistoryEntry {
            id: RecordId::from("r1"),
            input_text: "Dear customer,\nyour account has been suspended".into(),
            techniques,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap(),
        }
    }

    fn techniques(n: usize) -> Vec<TechniqueDetection> {
        (1..=n)
            .map(|i| TechniqueDetection::new(format!("T{i}"), format!("Technique {i}"), 0.5))
            .collect()
    }

    #[test]
    fn confidence_renders_percent_or_dash() {
        let e = entry(vec![
            TechniqueDetection::new("T1", "Spoofing", 0.8),
            TechniqueDetection::new("T2", "Urgency", 0.6),
        ]);
        assert_eq!(ConfidenceDisplay::of(&e).to_string(), "70%");
        assert_eq!(ConfidenceDisplay::of(&entry(vec![])).to_string(), "—");
    }

    #[test]
    fn badges_are_limited_with_overflow() {
        let row = build_row_in(&entry(techniques(5)), RowLayout::default(), &Utc);
        assert_eq!(row.badges, ["T1", "T2", "T3"]);
        assert_eq!(row.overflow, 2);
        assert_eq!(row.badge_labels(), ["T1", "T2", "T3", "+2"]);

        let row = build_row_in(&entry(techniques(2)), RowLayout::default(), &Utc);
        assert_eq!(row.overflow, 0);
        assert_eq!(row.badge_labels(), ["T1", "T2"]);
    }

    #[test]
    fn date_and_time_follow_the_time_zone() {
        let e = entry(vec![]);
        let utc = build_row_in(&e, RowLayout::default(), &Utc);
        assert_eq!((utc.date.as_str(), utc.time.as_str()), ("2025-03-01", "23:30:00"));

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = build_row_in(&e, RowLayout::default(), &plus_two);
        assert_eq!((local.date.as_str(), local.time.as_str()), ("2025-03-02", "01:30:00"));
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 80), "line one line two");
        assert_eq!(preview("Dear customer, your account", 14), "Dear customer,…");
        assert_eq!(preview("Dear customer, your account", 15), "Dear customer,…");
        assert_eq!(preview("ééééé", 3), "ééé…");
    }

    #[test]
    fn empty_state_copy() {
        assert_eq!(EmptyState::NoResults.title(), "No Results Found");
        assert_eq!(EmptyState::NoResults.call_to_action(), None);
        assert_eq!(
            EmptyState::NoHistory.description(),
            "Your analysis results will appear here"
        );
        assert_eq!(EmptyState::NoHistory.call_to_action(), Some("Start Analyzing"));
    }

    #[test]
    fn table_has_header_and_one_line_per_row() {
        let rows = vec![
            build_row_in(&entry(techniques(4)), RowLayout::default(), &Utc),
            build_row_in(&entry(vec![]), RowLayout::default(), &Utc),
        ];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("DATE"));
        assert!(lines[1].contains("T1 T2 T3 +1"));
        assert!(lines[1].contains("50%"));
        assert!(lines[2].contains('—'));
    }
}
