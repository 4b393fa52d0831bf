/*!
 * Persisted translation drafts.
 *
 * - `segments`: Translatable units and their edit state
 * - `merger`: Folding edits and regenerated translations into a draft
 */

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod merger;
pub mod segments;

pub use merger::DraftMerger;
pub use segments::{Segment, SegmentCollection};

/// Reconstructed document for one scope, with its last persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Unique draft identifier
    pub draft_id: String,
    /// Book or project the draft belongs to
    pub scope: String,
    /// Current text
    pub content: String,
    /// Text as last persisted
    pub baseline: String,
}

impl Draft {
    /// Create a draft that has never been saved
    pub fn new(scope: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            draft_id: Uuid::new_v4().to_string(),
            scope: scope.into(),
            content: content.into(),
            baseline: String::new(),
        }
    }

    /// Rebuild a draft loaded from storage
    pub fn persisted(draft_id: impl Into<String>, scope: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            draft_id: draft_id.into(),
            scope: scope.into(),
            baseline: content.clone(),
            content,
        }
    }

    /// Content differs from the last persisted version
    pub fn is_dirty(&self) -> bool {
        self.content != self.baseline
    }
}

/// Storage for drafts and their segments
///
/// Each call stands alone; callers must not rely on two calls being
/// applied atomically.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Insert or replace the draft for its scope
    async fn store_draft(&self, draft: &Draft) -> Result<()>;

    /// Insert or replace the segments of a scope
    async fn store_segments(&self, scope: &str, segments: &[Segment]) -> Result<()>;

    /// Load the draft of a scope
    async fn fetch_draft(&self, scope: &str) -> Result<Option<Draft>>;

    /// Load the segments of a scope, in document order
    async fn fetch_segments(&self, scope: &str) -> Result<Vec<Segment>>;
}
