/*!
 * Database entity models.
 *
 * These structures map directly to database tables and convert to and
 * from the draft domain types.
 */

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, Segment};

/// Row of the `drafts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Draft identifier (UUID)
    pub id: String,
    /// Book or project scope, unique
    pub scope: String,
    /// Current content
    pub content: String,
    /// Last saved content
    pub baseline: String,
    /// SHA256 of the source document the draft was generated from
    pub source_hash: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl DraftRecord {
    /// Create a record for a draft
    pub fn from_draft(draft: &Draft, source_hash: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: draft.draft_id.clone(),
            scope: draft.scope.clone(),
            content: draft.content.clone(),
            baseline: draft.baseline.clone(),
            source_hash: source_hash.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Convert back into a draft
    pub fn into_draft(self) -> Draft {
        Draft {
            draft_id: self.id,
            scope: self.scope,
            content: self.content,
            baseline: self.baseline,
        }
    }
}

/// Row of the `segments` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Scope the segment belongs to
    pub scope: String,
    /// Segment key within the scope
    pub segment_id: String,
    /// Order within the document
    pub position: i64,
    /// Source text
    pub source_text: String,
    /// Working translation
    pub translated_text: Option<String>,
    /// Translation as of the last save
    pub saved_text: Option<String>,
    /// Working translation is a pending manual edit
    pub manual_edit: bool,
    /// Position in the document's span sequence
    pub translation_index: Option<i64>,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl SegmentRecord {
    /// Create a record for a segment at the given position
    pub fn from_segment(scope: &str, position: usize, segment: &Segment) -> Self {
        Self {
            scope: scope.to_string(),
            segment_id: segment.id.clone(),
            position: position as i64,
            source_text: segment.source_text.clone(),
            translated_text: segment.translated_text.clone(),
            saved_text: segment.original_translated_text.clone(),
            manual_edit: segment.manual_edit,
            translation_index: segment.translation_index.map(|i| i as i64),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Convert back into a segment with its working and saved translations
    pub fn into_segment(self) -> Segment {
        let mut segment = Segment::new(
            self.segment_id,
            self.source_text,
            self.translation_index.and_then(|i| usize::try_from(i).ok()),
        );
        segment.translated_text = self.translated_text;
        segment.original_translated_text = self.saved_text;
        segment.manual_edit = self.manual_edit;
        segment
    }
}
