/*!
 * Draft store schema.
 *
 * Versions are tracked with SQLite's `user_version` pragma. Each entry of
 * `MIGRATIONS` moves the store from version `n - 1` to `n`.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Ordered migrations; the last entry's version is the current schema
const MIGRATIONS: &[(i32, &str)] = &[(
    1,
    r#"
    CREATE TABLE drafts (
        id TEXT PRIMARY KEY,
        scope TEXT NOT NULL UNIQUE,
        content TEXT NOT NULL,
        baseline TEXT NOT NULL,
        source_hash TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE segments (
        scope TEXT NOT NULL,
        segment_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        source_text TEXT NOT NULL,
        translated_text TEXT,
        saved_text TEXT,
        manual_edit INTEGER NOT NULL DEFAULT 0,
        translation_index INTEGER,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (scope, segment_id)
    );
    CREATE INDEX idx_segments_scope_position ON segments(scope, position);

    -- single row: the daily submission quota
    CREATE TABLE usage_counter (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        count INTEGER NOT NULL,
        date TEXT NOT NULL
    );
    "#,
)];

pub fn current_version() -> i32 {
    MIGRATIONS.last().map(|(version, _)| *version).unwrap_or(0)
}

/// Bring a freshly opened store up to the current schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let found = stored_version(conn)?;
    let target = current_version();
    if found > target {
        bail!(
            "Draft store uses schema v{} but this build only knows v{}",
            found,
            target
        );
    }
    if found == target {
        debug!("Draft store schema is current (v{})", found);
        return Ok(());
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > found) {
        info!("Applying draft store migration v{}", version);
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Draft store migration v{} failed", version))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }
    Ok(())
}

fn stored_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read draft store schema version")
}
