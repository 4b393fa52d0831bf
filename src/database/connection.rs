/*!
 * SQLite handle shared by the draft repository.
 *
 * The connection lives behind a `parking_lot` mutex; async callers hop onto
 * the blocking pool before touching it.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

const IN_MEMORY: &str = ":memory:";

/// Shared SQLite connection for drafts, segments and the usage counter
#[derive(Clone)]
pub struct DatabaseConnection {
    location: PathBuf,
    inner: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the store in the per-user data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) a store file, creating missing parent directories
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let location = db_path.as_ref().to_path_buf();
        if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create draft store directory: {:?}", parent))?;
        }

        info!("Opening draft store at {:?}", location);
        let conn = Connection::open(&location)
            .with_context(|| format!("Failed to open draft store: {:?}", location))?;
        Self::wrap(conn, location)
    }

    /// Throwaway store used by tests and dry runs
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory draft store");
        let conn = Connection::open_in_memory().context("Failed to open in-memory draft store")?;
        Self::wrap(conn, PathBuf::from(IN_MEMORY))
    }

    fn wrap(conn: Connection, location: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location,
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/versedraft/versedraft.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the draft store"))?;
        Ok(base.join("versedraft").join("versedraft.db"))
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    pub fn is_in_memory(&self) -> bool {
        self.location.as_os_str() == IN_MEMORY
    }

    /// Run a read or single-statement write on the blocking pool
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner.lock()))
            .await
            .context("Draft store task panicked")?
    }

    /// Run several writes atomically; nothing is committed if `f` fails
    pub async fn in_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.lock();
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .context("Draft store transaction panicked")?
    }

    /// Counts shown by `versedraft list`
    pub fn stats(&self) -> Result<DatabaseStats> {
        let conn = self.inner.lock();
        let (draft_count, segment_count, translated_segments, pending_edits) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM drafts),
                (SELECT COUNT(*) FROM segments),
                (SELECT COUNT(*) FROM segments WHERE COALESCE(translated_text, '') != ''),
                (SELECT COUNT(*) FROM segments WHERE manual_edit = 1)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        drop(conn);

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.location).map(|meta| meta.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            draft_count,
            segment_count,
            translated_segments,
            pending_edits,
            file_size_bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub draft_count: i64,
    pub segment_count: i64,
    /// Segments carrying any translation, saved or not
    pub translated_segments: i64,
    /// Segments whose current text came from a manual edit
    pub pending_edits: i64,
    pub file_size_bytes: u64,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} drafts, {} segments ({} translated, {} edited by hand), {} KB on disk",
            self.draft_count,
            self.segment_count,
            self.translated_segments,
            self.pending_edits,
            self.file_size_bytes / 1024
        )
    }
}
