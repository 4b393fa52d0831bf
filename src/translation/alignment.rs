/*!
 * Alignment of remote translation output to source lines.
 *
 * The remote service answers either with a delimited table (one row per
 * source sentence) or with plain text (one line per source line). The shape
 * is decided once, when the result is parsed, and alignment then maps it
 * back onto the source lines.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Header keywords naming the source column of a tabular result
const SOURCE_KEYWORDS: &[&str] = &["source", "src", "original", "input"];

/// Header keywords naming the translated column of a tabular result
const TARGET_KEYWORDS: &[&str] = &["target", "translation", "translated", "tgt", "output"];

/// Sentence terminators followed by optional closing quotes or brackets, then whitespace
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([.!?।॥؟։።。]+["'”’»)\]]*)\s+"#).expect("Invalid sentence boundary regex")
});

/// Parsed remote result
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResult {
    /// Translated column of a delimited table, one row per source sentence
    Tabular(Vec<String>),
    /// One translated line per source line
    Plain(Vec<String>),
}

impl RemoteResult {
    /// Decide the result shape from the raw artifact body
    pub fn detect(raw: &str) -> Self {
        let header = raw.lines().map(str::trim).find(|line| !line.is_empty());

        if let Some(header) = header {
            let delimiter = if header.contains('\t') { b'\t' } else { b',' };
            if let Some(rows) = read_tabular(raw, delimiter) {
                debug!("Remote result is tabular with {} rows", rows.len());
                return Self::Tabular(rows);
            }
        }

        let lines: Vec<String> = raw.lines().map(|line| line.trim().to_string()).collect();
        debug!("Remote result is plain text with {} lines", lines.len());
        Self::Plain(lines)
    }

    /// Number of translated entries (rows or lines)
    pub fn len(&self) -> usize {
        match self {
            Self::Tabular(rows) => rows.len(),
            Self::Plain(lines) => lines.len(),
        }
    }

    /// Check whether the result holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read the translated column of a delimited table, if the header names one
fn read_tabular(raw: &str, delimiter: u8) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.trim_start().as_bytes());

    let headers = reader.headers().ok()?.clone();
    if headers.len() < 2 || !headers.iter().all(is_column_name) {
        return None;
    }

    let column_matching = |keywords: &[&str], excluded: &[&str]| {
        headers.iter().position(|name| {
            let name = name.to_lowercase();
            keywords.iter().any(|k| name.contains(k)) && !excluded.iter().any(|k| name.contains(k))
        })
    };

    column_matching(SOURCE_KEYWORDS, TARGET_KEYWORDS)?;
    let target_column = column_matching(TARGET_KEYWORDS, SOURCE_KEYWORDS)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.get(target_column).unwrap_or("").to_string()),
            Err(e) => {
                warn!("Skipping malformed result row: {}", e);
                rows.push(String::new());
            }
        }
    }

    Some(rows)
}

/// A header cell is one short token such as `source` or `translated_text`
fn is_column_name(cell: &str) -> bool {
    !cell.is_empty()
        && cell.chars().count() <= 32
        && cell.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Split a line into sentences at terminal punctuation
///
/// A boundary needs whitespace after the terminator (and any closing quote
/// or bracket), so abbreviations inside words and numbers like `3.5` do not
/// split.
pub fn split_sentences(line: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for captures in SENTENCE_BOUNDARY.captures_iter(line) {
        let (Some(whole), Some(terminator)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let sentence = line[start..terminator.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = whole.end();
    }

    let rest = line[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// Map a remote result back onto the source lines
///
/// The output always has exactly one entry per source line. Missing
/// translations are empty strings, surplus entries are ignored.
pub fn align(source_lines: &[String], result: &RemoteResult) -> Vec<String> {
    let aligned: Vec<String> = match result {
        RemoteResult::Plain(lines) => (0..source_lines.len())
            .map(|i| lines.get(i).cloned().unwrap_or_default())
            .collect(),
        RemoteResult::Tabular(rows) => {
            let mut rows = rows.iter();
            source_lines
                .iter()
                .map(|line| {
                    let sentence_count = split_sentences(line).len();
                    rows.by_ref()
                        .take(sentence_count)
                        .map(|row| row.trim())
                        .filter(|row| !row.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        }
    };

    let filled = aligned.iter().filter(|line| !line.is_empty()).count();
    if filled < source_lines.len() {
        debug!("{} of {} source lines have no translation", source_lines.len() - filled, source_lines.len());
    }
    if result.len() > source_lines.len() && matches!(result, RemoteResult::Plain(_)) {
        debug!("Ignoring {} surplus result lines", result.len() - source_lines.len());
    }

    aligned
}

/// Collapse whitespace for comparison
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check whether a translation merely echoes its source
pub fn is_echo(source: &str, translated: &str) -> bool {
    normalize(source) == normalize(translated)
}
