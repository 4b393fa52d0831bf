/*!
 * Translatable segments of a document and their edit state.
 *
 * A segment is one translatable unit (normally a verse line) together with
 * its current translation, the last persisted translation and its edit
 * flags. Manual edits take precedence: automated translations never
 * overwrite a segment with a pending manual edit until the edit is saved
 * or discarded.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::usfm::ParsedDocument;

/// Book code used when a document has no `\id` line
pub const DEFAULT_BOOK: &str = "DOC";

static CHAPTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\c\s+(\S+)").expect("Invalid chapter regex"));

static VERSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\v\s+(\d+[a-z]?(?:-\d+[a-z]?)?)").expect("Invalid verse regex"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{M}\p{N}'’-]+").expect("Invalid word regex"));

/// One translatable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable key, e.g. `GEN.1.3`
    pub id: String,
    /// Text in the source language
    pub source_text: String,
    /// Current translation
    pub translated_text: Option<String>,
    /// Translation as last persisted
    pub original_translated_text: Option<String>,
    /// Position in the document's span sequence
    pub translation_index: Option<usize>,
    /// Edited by hand since the last save
    pub manual_edit: bool,
    /// Currently being translated by a batch run
    pub in_progress: bool,
}

impl Segment {
    pub fn new(id: impl Into<String>, source_text: impl Into<String>, translation_index: Option<usize>) -> Self {
        Self {
            id: id.into(),
            source_text: source_text.into(),
            translated_text: None,
            original_translated_text: None,
            translation_index,
            manual_edit: false,
            in_progress: false,
        }
    }

    /// The current translation differs from the persisted one
    pub fn is_dirty(&self) -> bool {
        self.translated_text != self.original_translated_text
    }

    /// Has a non-blank translation
    pub fn is_translated(&self) -> bool {
        self.translated_text.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}

/// Ordered, id-indexed set of segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentCollection {
    segments: Vec<Segment>,
    index: HashMap<String, usize>,
}

impl SegmentCollection {
    /// Build from segments, keeping the first of any duplicate ids
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut collection = Self::default();
        for segment in segments {
            collection.push(segment);
        }
        collection
    }

    fn push(&mut self, segment: Segment) -> bool {
        if self.index.contains_key(&segment.id) {
            return false;
        }
        self.index.insert(segment.id.clone(), self.segments.len());
        self.segments.push(segment);
        true
    }

    /// One segment per translatable line
    ///
    /// Verse lines are keyed `BOOK.CHAPTER.VERSE`; any other translatable
    /// line (headings, poetry continuations) is keyed `BOOK.L<line>`.
    pub fn from_document(document: &ParsedDocument) -> Self {
        let book = document.book_id().unwrap_or_else(|| DEFAULT_BOOK.to_string());
        let mut chapter = "0".to_string();
        let mut collection = Self::default();

        for element in &document.elements {
            if let Some(captures) = CHAPTER.captures(element.original_line.trim()) {
                chapter = captures[1].to_string();
                continue;
            }

            let Some(index) = element.translation_index else {
                continue;
            };
            let source = document.translatable_spans.get(index).cloned().unwrap_or_default();
            let line_id = format!("{}.L{}", book, element.line_index + 1);

            let verse_id = element
                .prefix
                .as_deref()
                .and_then(|prefix| VERSE.captures(prefix))
                .map(|captures| format!("{}.{}.{}", book, chapter, &captures[1]));

            let id = match verse_id {
                Some(id) if !collection.index.contains_key(&id) => id,
                _ => line_id,
            };
            collection.push(Segment::new(id, source, Some(index)));
        }

        debug!("Built {} segments for {}", collection.len(), book);
        collection
    }

    /// One segment per unique word of the document
    pub fn word_tokens(document: &ParsedDocument) -> Self {
        let mut seen = HashSet::new();
        let mut collection = Self::default();

        for span in &document.translatable_spans {
            for word in WORD.find_iter(span).map(|m| m.as_str()) {
                if seen.insert(word.to_string()) {
                    collection.push(Segment::new(format!("word:{}", word), word, None));
                }
            }
        }

        collection
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Segment> {
        self.index.get(id).map(|&i| &self.segments[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Segment> {
        self.index.get(id).map(|&i| &mut self.segments[i])
    }

    /// Store an automated translation
    ///
    /// Returns false when the segment is unknown or has a pending manual edit.
    pub fn apply_translation(&mut self, id: &str, text: &str) -> bool {
        let Some(segment) = self.get_mut(id) else {
            return false;
        };
        segment.in_progress = false;
        if segment.manual_edit {
            debug!("Keeping manual edit of {}", id);
            return false;
        }
        segment.translated_text = Some(text.to_string());
        true
    }

    /// Store a manual edit
    pub fn edit_translation(&mut self, id: &str, text: &str) -> bool {
        let Some(segment) = self.get_mut(id) else {
            return false;
        };
        segment.translated_text = Some(text.to_string());
        segment.manual_edit = true;
        true
    }

    /// Flag segments as being translated
    pub fn mark_in_progress<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            if let Some(segment) = self.get_mut(id) {
                segment.in_progress = true;
            }
        }
    }

    /// Clear every in-progress flag
    pub fn clear_in_progress(&mut self) {
        for segment in &mut self.segments {
            segment.in_progress = false;
        }
    }

    /// Forget automated translations, keeping pending manual edits
    pub fn clear_automated(&mut self) -> usize {
        let mut cleared = 0;
        for segment in self.segments.iter_mut().filter(|s| !s.manual_edit) {
            if segment.translated_text.take().is_some() {
                cleared += 1;
            }
        }
        cleared
    }

    /// Segments without a translation, in order
    pub fn untranslated(&self) -> Vec<Segment> {
        self.segments.iter().filter(|s| !s.is_translated()).cloned().collect()
    }

    /// Accept current translations as persisted
    pub fn mark_saved(&mut self) {
        for segment in &mut self.segments {
            segment.original_translated_text = segment.translated_text.clone();
            segment.manual_edit = false;
        }
    }

    /// At least one segment carries a saved translation
    pub fn has_saved_translations(&self) -> bool {
        self.segments.iter().any(|s| s.original_translated_text.is_some())
    }

    /// Revert every segment to its persisted translation
    pub fn discard(&mut self) {
        for segment in &mut self.segments {
            segment.translated_text = segment.original_translated_text.clone();
            segment.manual_edit = false;
            segment.in_progress = false;
        }
    }

    /// Ids of segments whose translation changed since the last save
    pub fn dirty_ids(&self) -> Vec<String> {
        self.segments.iter().filter(|s| s.is_dirty()).map(|s| s.id.clone()).collect()
    }

    /// Flat span vector for reconstruction, blank where untranslated
    pub fn translated_spans(&self, count: usize) -> Vec<String> {
        let mut spans = vec![String::new(); count];
        for segment in &self.segments {
            if let (Some(index), Some(text)) = (segment.translation_index, segment.translated_text.as_ref()) {
                if let Some(slot) = spans.get_mut(index) {
                    *slot = text.clone();
                }
            }
        }
        spans
    }
}
