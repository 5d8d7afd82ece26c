//! PDF export: one Helvetica font in `WinAnsiEncoding`, A4 pages, plain
//! text lines.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::error::ExportError;
use crate::progress::ProgressReporter;
use crate::types::HistoryEntry;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 14;
const LINES_PER_PAGE: usize = 52;
const WRAP_COLUMNS: usize = 90;

/// WinAnsi code points in 0x80..=0x9F. Everything else in the encoding
/// coincides with Latin-1.
const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8A, 'Š'),
    (0x8B, '‹'),
    (0x8C, 'Œ'),
    (0x8E, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9A, 'š'),
    (0x9B, '›'),
    (0x9C, 'œ'),
    (0x9E, 'ž'),
    (0x9F, 'Ÿ'),
];

pub(super) fn render(
    entries: &[HistoryEntry],
    progress: &dyn ProgressReporter,
) -> Result<Vec<u8>, ExportError> {
    let mut lines = vec![
        format!("Analysis History ({} entries)", entries.len()),
        String::new(),
    ];
    for entry in entries {
        lines.extend(entry_lines(entry));
        progress.advance(1);
    }

    let pages: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();
    let mut document = build_document(&pages)?;

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

fn entry_lines(entry: &HistoryEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        entry.id
    )];

    for (i, chunk) in wrap(&entry.input_text, WRAP_COLUMNS).into_iter().enumerate() {
        let label = if i == 0 { "  Text: " } else { "        " };
        lines.push(format!("{label}{chunk}"));
    }

    if entry.techniques.is_empty() {
        lines.push("  Techniques: none".to_string());
    } else {
        let listed: Vec<String> = entry
            .techniques
            .iter()
            .map(|t| format!("{} {} ({:.0}%)", t.id, t.name, t.confidence * 100.0))
            .collect();
        for (i, chunk) in wrap(&listed.join(", "), WRAP_COLUMNS)
            .into_iter()
            .enumerate()
        {
            let label = if i == 0 { "  Techniques: " } else { "              " };
            lines.push(format!("{label}{chunk}"));
        }
    }

    let confidence = entry
        .confidence_percent()
        .map_or_else(|| "-".to_string(), |p| format!("{p}%"));
    lines.push(format!("  Mean confidence: {confidence}"));
    lines.push(String::new());
    lines
}

/// Greedy word wrap by character count; overlong words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);

        while current.chars().count() > width {
            let head: String = current.chars().take(width).collect();
            current = current.chars().skip(width).collect();
            lines.push(head);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for a `WinAnsiEncoding` font. Characters the encoding
/// cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(_, mapped)| *mapped == c)
            .map(|(byte, _)| *byte),
    }
}

fn page_content(lines: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(line))],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Ok(Content { operations }.encode()?)
}

fn build_document(pages: &[&[String]]) -> Result<Document, ExportError> {
    let mut doc = Document::with_version("1.4");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len())
        .map_err(|_| ExportError::Serialization("too many pages".to_string()))?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::progress::NoopReporter;
    use crate::types::{RecordId, TechniqueDetection};

    fn entry(id: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            id: RecordId::from(id),
            input_text: text.into(),
            techniques: vec![TechniqueDetection::new("T1", "Spoofing", 0.8)],
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    /// Every `Tj` operand across all pages, in reading order.
    fn shown_lines(pdf: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(pdf).unwrap();
        let mut shown = Vec::new();
        for page_id in doc.get_pages().into_values() {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            for op in content.operations {
                if op.operator == "Tj" {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        shown.push(bytes.clone());
                    }
                }
            }
        }
        shown
    }

    #[test]
    fn document_parses_back() {
        let pdf = render(&[entry("r1", "phishing email")], &NoopReporter).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let lines = shown_lines(&pdf);
        assert_eq!(lines[0], b"Analysis History (1 entries)");
        assert!(lines.contains(&b"  Text: phishing email".to_vec()));
        assert!(lines.contains(&b"  Techniques: T1 Spoofing (80%)".to_vec()));
        assert!(lines.contains(&b"  Mean confidence: 80%".to_vec()));
    }

    #[test]
    fn font_declares_win_ansi_encoding() {
        let pdf = render(&[entry("r1", "a")], &NoopReporter).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let font = doc
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .find(|d| d.get(b"Type").and_then(Object::as_name_str).ok() == Some("Font"))
            .unwrap();
        assert_eq!(
            font.get(b"Encoding").and_then(Object::as_name_str).unwrap(),
            "WinAnsiEncoding"
        );
    }

    #[test]
    fn accented_text_and_dashes_survive() {
        let text = "Überweisung dringend, Konto gesperrt — bitte bestätigen";
        let pdf = render(&[entry("r1", text)], &NoopReporter).unwrap();

        let expected =
            b"  Text: \xDCberweisung dringend, Konto gesperrt \x97 bitte best\xE4tigen".to_vec();
        let lines = shown_lines(&pdf);
        assert!(lines.contains(&expected));
        assert!(lines.iter().all(|l| !l.contains(&b'?')));
    }

    #[test]
    fn parentheses_are_kept_verbatim() {
        let pdf = render(&[entry("r1", r"call (555) now \ ok")], &NoopReporter).unwrap();
        assert!(shown_lines(&pdf).contains(&br"  Text: call (555) now \ ok".to_vec()));
    }

    #[test]
    fn long_histories_span_pages() {
        // 2 title lines plus 5 lines per entry
        let entries: Vec<_> = (0..30).map(|i| entry(&format!("r{i}"), "short")).collect();
        let pdf = render(&entries, &NoopReporter).unwrap();
        assert_eq!(Document::load_mem(&pdf).unwrap().get_pages().len(), 3);
    }

    #[test]
    fn win_ansi_maps_latin1_and_punctuation() {
        assert_eq!(win_ansi("café"), b"caf\xE9");
        assert_eq!(win_ansi("“€” – …"), b"\x93\x80\x94 \x96 \x85");
        assert_eq!(win_ansi("Привет"), b"??????");
        assert_eq!(win_ansi("a\u{7}b"), b"a?b");
    }

    #[test]
    fn wrap_splits_on_words_and_long_tokens() {
        assert_eq!(wrap("one two three", 7), ["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap("   ", 10), [""]);
    }
}
