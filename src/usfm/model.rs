/*!
 * Document model for parsed structural markup.
 */

use serde::{Deserialize, Serialize};

/// Classification of a single document line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Non-translatable structure (book id, chapter, bare paragraph marker)
    Marker,
    /// Blank or whitespace-only line
    Empty,
    /// Line carrying prose, possibly behind a marker prefix
    Translatable,
}

/// Line terminator that followed a line in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// Last line without a terminator
    None,
}

impl LineEnding {
    /// The literal terminator text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::None => "",
        }
    }
}

/// One line of a structural document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    /// Line classification
    pub kind: ElementKind,

    /// The line exactly as it appeared, without its terminator
    pub original_line: String,

    /// Zero-based line number
    pub line_index: usize,

    /// Terminator to re-emit after the line
    pub line_ending: LineEnding,

    /// Leading marker text kept verbatim (translatable lines only)
    pub prefix: Option<String>,

    /// Position in the flat span sequence (translatable lines only)
    pub translation_index: Option<usize>,
}

impl DocumentElement {
    /// Create a marker or empty element
    pub fn structural(kind: ElementKind, original_line: &str, line_index: usize, line_ending: LineEnding) -> Self {
        Self {
            kind,
            original_line: original_line.to_string(),
            line_index,
            line_ending,
            prefix: None,
            translation_index: None,
        }
    }

    /// Create a translatable element
    pub fn translatable(
        original_line: &str,
        line_index: usize,
        line_ending: LineEnding,
        prefix: String,
        translation_index: usize,
    ) -> Self {
        Self {
            kind: ElementKind::Translatable,
            original_line: original_line.to_string(),
            line_index,
            line_ending,
            prefix: Some(prefix),
            translation_index: Some(translation_index),
        }
    }

    /// Whitespace preceding the first visible character of the line
    pub fn indentation(&self) -> &str {
        let trimmed = self.original_line.trim_start();
        &self.original_line[..self.original_line.len() - trimmed.len()]
    }

    /// Check whether this element is translatable
    pub fn is_translatable(&self) -> bool {
        self.kind == ElementKind::Translatable
    }
}

/// Result of parsing a document: the elements plus the extracted spans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Every line of the document, in order
    pub elements: Vec<DocumentElement>,

    /// Translatable text, indexed by `translation_index`
    pub translatable_spans: Vec<String>,
}

impl ParsedDocument {
    /// Number of translatable spans
    pub fn translatable_count(&self) -> usize {
        self.translatable_spans.len()
    }

    /// Translatable elements in document order
    pub fn translatable_elements(&self) -> impl Iterator<Item = &DocumentElement> {
        self.elements.iter().filter(|e| e.is_translatable())
    }

    /// The spans as source lines for alignment
    pub fn source_lines(&self) -> &[String] {
        &self.translatable_spans
    }

    /// The spans joined one per line, as sent to the remote service
    pub fn source_text(&self) -> String {
        self.translatable_spans.join("\n")
    }

    /// Book identifier from the `\id` line, if any
    pub fn book_id(&self) -> Option<String> {
        self.elements.iter().find_map(|e| {
            let line = e.original_line.trim();
            let rest = line.strip_prefix("\\id")?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            rest.split_whitespace().next().map(|code| code.to_uppercase())
        })
    }
}
