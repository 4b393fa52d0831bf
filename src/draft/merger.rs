/*!
 * Textual merging of translations into a draft.
 *
 * Edits are applied by literal, boundary-aware substitution over the whole
 * draft: every occurrence of the old text becomes the new text. Occurrences
 * that already sit inside an occurrence of the new text are left alone, so
 * applying the same edit twice changes nothing. A missing old text is a
 * no-op, never an error.
 */

use anyhow::Result;
use log::{debug, info};
use regex::Regex;

use super::segments::SegmentCollection;
use super::{Draft, DraftStore};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Draft merge operations
pub struct DraftMerger;

impl DraftMerger {
    /// Replace every boundary-delimited occurrence of `old` with `new`
    ///
    /// Returns the new content and the number of replacements made.
    pub fn merge_edit(content: &str, old: &str, new: &str) -> (String, usize) {
        if old.is_empty() || old == new {
            return (content.to_string(), 0);
        }

        let pattern = match Regex::new(&regex::escape(old)) {
            Ok(pattern) => pattern,
            Err(e) => {
                debug!("Cannot build pattern for '{}': {}", old, e);
                return (content.to_string(), 0);
            }
        };

        let check_start = old.chars().next().is_some_and(is_word_char);
        let check_end = old.chars().next_back().is_some_and(is_word_char);

        // Ranges already holding the replacement text
        let protected: Vec<(usize, usize)> = if new.contains(old) {
            content.match_indices(new).map(|(start, text)| (start, start + text.len())).collect()
        } else {
            Vec::new()
        };

        let mut output = String::with_capacity(content.len());
        let mut last = 0;
        let mut replaced = 0;

        for m in pattern.find_iter(content) {
            let before_ok = !check_start || !content[..m.start()].chars().next_back().is_some_and(is_word_char);
            let after_ok = !check_end || !content[m.end()..].chars().next().is_some_and(is_word_char);
            let inside_new = protected.iter().any(|&(start, end)| m.start() >= start && m.end() <= end);

            if before_ok && after_ok && !inside_new {
                output.push_str(&content[last..m.start()]);
                output.push_str(new);
                last = m.end();
                replaced += 1;
            }
        }
        output.push_str(&content[last..]);

        (output, replaced)
    }

    /// Apply a segment edit to the draft and record it on the segment
    ///
    /// An empty or missing `old` falls back to the segment's source text.
    pub fn apply_segment_edit(
        draft: &mut Draft,
        segments: &mut SegmentCollection,
        key: &str,
        old: Option<&str>,
        new: &str,
    ) -> usize {
        let old = match old.filter(|text| !text.is_empty()) {
            Some(text) => text.to_string(),
            None => match segments.get(key) {
                Some(segment) => segment.source_text.clone(),
                None => {
                    debug!("No segment {} and no old text, nothing to merge", key);
                    return 0;
                }
            },
        };

        let (content, replaced) = Self::merge_edit(&draft.content, &old, new);
        draft.content = content;
        segments.edit_translation(key, new);

        debug!("Merged edit of {} into draft {} ({} occurrences)", key, draft.scope, replaced);
        replaced
    }

    /// Rebuild draft content from the current segment translations
    ///
    /// The base is the current draft content, or the raw source when the
    /// draft is empty. Each translated segment replaces its last persisted
    /// translation when that is still in the base, otherwise its source
    /// text. Longer texts are substituted first.
    pub fn regenerate(draft: &mut Draft, raw_source: &str, segments: &SegmentCollection) -> usize {
        let mut content = if draft.content.trim().is_empty() {
            raw_source.to_string()
        } else {
            draft.content.clone()
        };

        let mut edits: Vec<(String, String)> = segments
            .iter()
            .filter_map(|segment| {
                let new = segment.translated_text.as_ref().filter(|text| !text.trim().is_empty())?;
                let old = segment
                    .original_translated_text
                    .as_ref()
                    .filter(|text| !text.is_empty() && content.contains(text.as_str()))
                    .unwrap_or(&segment.source_text);
                Some((old.clone(), new.clone()))
            })
            .collect();
        edits.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut total = 0;
        for (old, new) in edits {
            let (merged, replaced) = Self::merge_edit(&content, &old, &new);
            content = merged;
            total += replaced;
        }

        info!("Regenerated draft {} with {} substitutions", draft.scope, total);
        draft.content = content;
        total
    }

    /// Persist the draft and its segments, then make them the new baseline
    pub async fn save(draft: &mut Draft, segments: &mut SegmentCollection, store: &dyn DraftStore) -> Result<()> {
        let mut persisted = draft.clone();
        persisted.baseline = draft.content.clone();

        store.store_draft(&persisted).await?;

        let mut saved_segments = segments.clone();
        saved_segments.mark_saved();
        let records: Vec<_> = saved_segments.iter().cloned().collect();
        store.store_segments(&draft.scope, &records).await?;

        draft.baseline = persisted.baseline;
        *segments = saved_segments;
        info!("Saved draft {} ({} segments)", draft.scope, records.len());
        Ok(())
    }

    /// Reset the draft and its segments to the last persisted state
    pub fn discard(draft: &mut Draft, segments: &mut SegmentCollection) {
        draft.content = draft.baseline.clone();
        segments.discard();
        info!("Discarded unsaved changes to draft {}", draft.scope);
    }
}
