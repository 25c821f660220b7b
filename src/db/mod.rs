//! SQLite persistence for stories, votes, chunks, embeddings, and
//! estimations.
use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub mod chunks;
pub mod estimations;
pub mod models;
pub mod stories;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    creator_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    source TEXT,
    final_points INTEGER,
    round INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    completed_at DATETIME
);

CREATE INDEX IF NOT EXISTS idx_stories_source ON stories(source);
CREATE INDEX IF NOT EXISTS idx_stories_status ON stories(status);

CREATE TABLE IF NOT EXISTS votes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id INTEGER NOT NULL,
    user_name TEXT NOT NULL,
    points INTEGER NOT NULL,
    round INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(story_id, user_name, round),
    FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_votes_story ON votes(story_id);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type TEXT NOT NULL,
    source_id INTEGER NOT NULL,
    chunk_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    strategy TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_type, source_id);

CREATE TABLE IF NOT EXISTS embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chunk_id INTEGER NOT NULL,
    vector BLOB NOT NULL,
    model_id TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (chunk_id) REFERENCES chunks(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_embeddings_chunk ON embeddings(chunk_id);
CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model_id);

CREATE TABLE IF NOT EXISTS estimations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id INTEGER NOT NULL,
    vote_id INTEGER,
    points INTEGER NOT NULL,
    reasoning TEXT NOT NULL,
    evidence_json TEXT NOT NULL,
    model_id TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE,
    FOREIGN KEY (vote_id) REFERENCES votes(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_estimations_story ON estimations(story_id);
"#;

#[derive(Error, Debug)]
pub enum DbError {
    /// Points outside the planning scale are rejected before they reach
    /// a vote row.
    #[error("invalid story points: {0}")]
    InvalidPoints(u32),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// A wrapper around a SQLite connection initialized with the application
/// schema.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open a database connection at the given path and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        info!("Initializing database: {}", path.display());

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        info!("Database initialized successfully");

        Ok(Self { conn })
    }

    /// Open an in-memory database connection (useful for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Summary counts for the `stats` command.
    pub fn stats(&self) -> DbResult<Stats> {
        let stories: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        let archive_stories: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM stories WHERE source = 'archive' AND final_points IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let chunks: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let estimations: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM estimations", [], |row| row.get(0))?;

        let mut stmt = self
            .conn
            .prepare("SELECT model_id, COUNT(*) FROM embeddings GROUP BY model_id ORDER BY model_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let embeddings_by_model = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Stats {
            stories,
            archive_stories,
            chunks,
            embeddings_by_model,
            estimations,
        })
    }

    /// Delete all derived AI data: chunks (embeddings cascade) and
    /// estimations. Stories and votes are untouched.
    pub fn clear_ai_data(&self) -> DbResult<(usize, usize)> {
        let chunks = self.conn.execute("DELETE FROM chunks", [])?;
        let estimations = self.conn.execute("DELETE FROM estimations", [])?;
        Ok((chunks, estimations))
    }
}

/// Counts reported by [`Db::stats`].
#[derive(Debug, Clone)]
pub struct Stats {
    pub stories: i64,
    pub archive_stories: i64,
    pub chunks: i64,
    pub embeddings_by_model: Vec<(String, i64)>,
    pub estimations: i64,
}
