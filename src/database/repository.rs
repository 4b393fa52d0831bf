/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for draft and segment storage,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{DraftRecord, SegmentRecord};
use crate::draft::{Draft, DraftStore, Segment};
use crate::translation::UsageCounter;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // =========================================================================
    // Draft Operations
    // =========================================================================

    /// Insert or update the draft of a scope
    ///
    /// The draft id and creation time of an existing scope are kept. An
    /// empty source hash keeps the stored one.
    pub async fn save_draft(&self, record: &DraftRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .with_connection(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO drafts (id, scope, content, baseline, source_hash, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(scope) DO UPDATE SET
                        content = excluded.content,
                        baseline = excluded.baseline,
                        source_hash = CASE WHEN excluded.source_hash = '' THEN drafts.source_hash
                                           ELSE excluded.source_hash END,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        record.id,
                        record.scope,
                        record.content,
                        record.baseline,
                        record.source_hash,
                        record.created_at,
                        record.updated_at,
                    ],
                )?;
                debug!("Stored draft for scope {}", record.scope);
                Ok(())
            })
            .await
    }

    /// Get the draft of a scope
    pub async fn load_draft(&self, scope: &str) -> Result<Option<DraftRecord>> {
        let scope = scope.to_string();

        self.db
            .with_connection(move |conn| Self::load_draft_sync(conn, &scope))
            .await
    }

    fn load_draft_sync(conn: &Connection, scope: &str) -> Result<Option<DraftRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT id, scope, content, baseline, source_hash, created_at, updated_at
                FROM drafts WHERE scope = ?1
                "#,
                [scope],
                |row| {
                    Ok(DraftRecord {
                        id: row.get(0)?,
                        scope: row.get(1)?,
                        content: row.get(2)?,
                        baseline: row.get(3)?,
                        source_hash: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// List stored scopes with their last update time, most recent first
    pub async fn list_scopes(&self) -> Result<Vec<(String, String)>> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT scope, updated_at FROM drafts ORDER BY updated_at DESC")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
                Ok(rows)
            })
            .await
    }

    // =========================================================================
    // Segment Operations
    // =========================================================================

    /// Insert or update segments of a scope (batch upsert)
    pub async fn upsert_segments(&self, scope: &str, records: Vec<SegmentRecord>) -> Result<usize> {
        let scope = scope.to_string();

        self.db
            .in_transaction(move |tx| {
                let written = Self::write_segments(tx, &scope, &records)?;
                debug!("Stored {} segments for scope {}", written, scope);
                Ok(written)
            })
            .await
    }

    /// Replace every segment of a scope with a freshly built set
    pub async fn replace_segments(&self, scope: &str, records: Vec<SegmentRecord>) -> Result<usize> {
        let scope = scope.to_string();

        self.db
            .in_transaction(move |tx| {
                let removed = tx.execute("DELETE FROM segments WHERE scope = ?1", [&scope])?;
                let written = Self::write_segments(tx, &scope, &records)?;
                debug!("Replaced {} segments of scope {} with {}", removed, scope, written);
                Ok(written)
            })
            .await
    }

    fn write_segments(conn: &Connection, scope: &str, records: &[SegmentRecord]) -> Result<usize> {
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO segments (scope, segment_id, position, source_text, translated_text,
                                  saved_text, manual_edit, translation_index, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(scope, segment_id) DO UPDATE SET
                position = excluded.position,
                source_text = excluded.source_text,
                translated_text = excluded.translated_text,
                saved_text = excluded.saved_text,
                manual_edit = excluded.manual_edit,
                translation_index = excluded.translation_index,
                updated_at = excluded.updated_at
            "#,
        )?;

        for record in records {
            stmt.execute(params![
                scope,
                record.segment_id,
                record.position,
                record.source_text,
                record.translated_text,
                record.saved_text,
                record.manual_edit,
                record.translation_index,
                record.updated_at,
            ])?;
        }

        Ok(records.len())
    }

    /// Get all segments of a scope in document order
    pub async fn load_segments(&self, scope: &str) -> Result<Vec<SegmentRecord>> {
        let scope = scope.to_string();

        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT scope, segment_id, position, source_text, translated_text,
                           saved_text, manual_edit, translation_index, updated_at
                    FROM segments WHERE scope = ?1 ORDER BY position
                    "#,
                )?;

                let records = stmt
                    .query_map([&scope], |row| {
                        Ok(SegmentRecord {
                            scope: row.get(0)?,
                            segment_id: row.get(1)?,
                            position: row.get(2)?,
                            source_text: row.get(3)?,
                            translated_text: row.get(4)?,
                            saved_text: row.get(5)?,
                            manual_edit: row.get(6)?,
                            translation_index: row.get(7)?,
                            updated_at: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(records)
            })
            .await
    }

    // =========================================================================
    // Usage Operations
    // =========================================================================

    /// Last saved quota counter
    pub async fn load_usage(&self) -> Result<Option<UsageCounter>> {
        self.db
            .with_connection(|conn| {
                let counter = conn
                    .query_row("SELECT count, date FROM usage_counter WHERE id = 1", [], |row| {
                        Ok(UsageCounter {
                            count: row.get(0)?,
                            date: row.get(1)?,
                        })
                    })
                    .optional()?;
                Ok(counter)
            })
            .await
    }

    /// Store the quota counter
    pub async fn save_usage(&self, counter: &UsageCounter) -> Result<()> {
        let counter = counter.clone();

        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO usage_counter (id, count, date) VALUES (1, ?1, ?2)",
                    params![counter.count, counter.date],
                )?;
                Ok(())
            })
            .await
    }

    /// Delete the draft and segments of a scope
    pub async fn delete_scope(&self, scope: &str) -> Result<usize> {
        let scope = scope.to_string();

        self.db
            .in_transaction(move |tx| {
                let segments = tx.execute("DELETE FROM segments WHERE scope = ?1", [&scope])?;
                let drafts = tx.execute("DELETE FROM drafts WHERE scope = ?1", [&scope])?;
                Ok(segments + drafts)
            })
            .await
    }
}

#[async_trait]
impl DraftStore for Repository {
    async fn store_draft(&self, draft: &Draft) -> Result<()> {
        self.save_draft(&DraftRecord::from_draft(draft, "")).await
    }

    async fn store_segments(&self, scope: &str, segments: &[Segment]) -> Result<()> {
        let records = segments
            .iter()
            .enumerate()
            .map(|(position, segment)| SegmentRecord::from_segment(scope, position, segment))
            .collect();
        self.upsert_segments(scope, records).await?;
        Ok(())
    }

    async fn fetch_draft(&self, scope: &str) -> Result<Option<Draft>> {
        Ok(self.load_draft(scope).await?.map(DraftRecord::into_draft))
    }

    async fn fetch_segments(&self, scope: &str) -> Result<Vec<Segment>> {
        Ok(self
            .load_segments(scope)
            .await?
            .into_iter()
            .map(SegmentRecord::into_segment)
            .collect())
    }
}
