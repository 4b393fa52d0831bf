/*!
 * Structural parser for line-oriented markup.
 *
 * Every line is classified as a marker, an empty line, or a translatable
 * line. Translatable lines may start with a recognised marker prefix
 * (`\v 3 `, `\q1 `, `\p \v 1 `...) which is kept verbatim and excluded from
 * the span sent for translation.
 *
 * Only a curated marker set is recognised. Any other backslash token is
 * ordinary text and will be translated along with the rest of the line.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{DocumentElement, ElementKind, LineEnding, ParsedDocument};

/// Lines that are structure only and never translated
static MARKER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Identification and remarks
        r"^\\(?:id|ide|usfm|rem|sts)(?:\s.*)?$",
        // Running headings and table of contents entries
        r"^\\(?:h|toc[1-3]|toca[1-3])(?:\s.*)?$",
        // Chapter numbers
        r"^\\(?:c|cp)\s+\S+\s*$",
        // Alternate chapter number, usually closed with `\ca*`
        r"^\\ca\s+[^\s\\]+\s*(?:\\ca\*)?\s*$",
        // Paragraph, poetry, list and section markers with no trailing text
        r"^\\(?:p|m|po|pr|pc|pm|pmo|pmc|pmr|pi[1-3]?|mi|nb|cls|b|q[1-4]?|qc|qr|qa|qm[1-3]?|li[1-4]?|s[1-4]?|ms[1-3]?)\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid marker pattern"))
    .collect()
});

/// Leading markers with arguments that precede translatable text
static PREFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Verse number, optionally behind a paragraph or poetry marker
        r"^(?:\\(?:p|m|pi[1-3]?|q[1-4]?|li[1-4]?|nb|mi|pc|qc|qr)\s+)?\\v\s+\d+[a-z]?(?:-\d+[a-z]?)?(?:\s+|$)",
        // Paragraph, poetry, heading and title markers followed by text
        r"^\\(?:p|m|po|pr|pc|pm|pmo|pi[1-3]?|mi|nb|cls|q[1-4]?|qc|qr|qa|qm[1-3]?|li[1-4]?|s[1-4]?|ms[1-3]?|mr|sr|r|d|sp|mt[1-4]?|mte[1-4]?|imt[1-4]?|is[1-4]?|ip|cl|cd)(?:\s+|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid prefix pattern"))
    .collect()
});

/// Parse a structural document into elements and translatable spans
///
/// The parser is total: every line is classified and nothing fails. A
/// trailing newline does not produce an extra element.
pub fn parse_document(text: &str) -> ParsedDocument {
    let mut document = ParsedDocument::default();

    for (line_index, (line, line_ending)) in split_lines(text).into_iter().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            document.elements.push(DocumentElement::structural(ElementKind::Empty, line, line_index, line_ending));
            continue;
        }

        if is_marker_line(trimmed) {
            document.elements.push(DocumentElement::structural(ElementKind::Marker, line, line_index, line_ending));
            continue;
        }

        let (prefix, candidate) = split_prefix(trimmed);
        let candidate = candidate.trim();

        if candidate.is_empty() {
            // A marker-only line outside the curated set must still stay untranslated
            debug!("Line {} has no text after its prefix, keeping as marker", line_index + 1);
            document.elements.push(DocumentElement::structural(ElementKind::Marker, line, line_index, line_ending));
            continue;
        }

        let translation_index = document.translatable_spans.len();
        document.translatable_spans.push(candidate.to_string());
        document.elements.push(DocumentElement::translatable(
            line,
            line_index,
            line_ending,
            prefix.to_string(),
            translation_index,
        ));
    }

    debug!(
        "Parsed {} lines, {} translatable spans",
        document.elements.len(),
        document.translatable_spans.len()
    );

    document
}

/// Check a trimmed line against the curated marker set
pub fn is_marker_line(trimmed: &str) -> bool {
    MARKER_PATTERNS.iter().any(|pattern| pattern.is_match(trimmed))
}

/// Split a trimmed line into its recognised prefix and the remaining text
///
/// Returns an empty prefix when no known pattern matches.
pub fn split_prefix(trimmed: &str) -> (&str, &str) {
    PREFIX_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(trimmed))
        .map(|m| trimmed.split_at(m.end()))
        .unwrap_or(("", trimmed))
}

/// Split text into lines, remembering each line's terminator
fn split_lines(text: &str) -> Vec<(&str, LineEnding)> {
    text.split_inclusive('\n')
        .map(|piece| {
            if let Some(line) = piece.strip_suffix("\r\n") {
                (line, LineEnding::CrLf)
            } else if let Some(line) = piece.strip_suffix('\n') {
                (line, LineEnding::Lf)
            } else {
                (piece, LineEnding::None)
            }
        })
        .collect()
}
