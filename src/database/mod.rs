/*!
 * Database module for persistent storage of drafts.
 *
 * This module provides SQLite-based persistence for:
 * - Drafts, one per scope, with their last saved baseline
 * - Segments with their saved translations
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{DraftRecord, SegmentRecord};
pub use repository::Repository;
