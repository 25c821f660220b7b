//! Chunk and embedding persistence.

use rusqlite::{OptionalExtension, Row, params};

use super::{Db, DbResult, models::*};
use crate::embedder::{decode_vector, encode_vector};

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        id: row.get(0)?,
        source_type: row.get(1)?,
        source_id: row.get(2)?,
        chunk_index: row.get::<_, i64>(3)? as usize,
        text: row.get(4)?,
        strategy: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn embedding_from_row(row: &Row<'_>) -> rusqlite::Result<EmbeddingRecord> {
    let blob: Vec<u8> = row.get(2)?;
    Ok(EmbeddingRecord {
        id: row.get(0)?,
        chunk_id: row.get(1)?,
        vector: decode_vector(&blob),
        model_id: row.get(3)?,
        dimension: row.get::<_, i64>(4)? as usize,
        created_at: row.get(5)?,
    })
}

impl Db {
    pub fn create_chunk(
        &self,
        source_type: &str,
        source_id: i64,
        chunk_index: usize,
        text: &str,
        strategy: &str,
    ) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO chunks (source_type, source_id, chunk_index, text, strategy)
             VALUES (?, ?, ?, ?, ?)",
            params![source_type, source_id, chunk_index as i64, text, strategy],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Chunks for one source, in chunking order.
    pub fn list_chunks(&self, source_type: &str, source_id: i64) -> DbResult<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_type, source_id, chunk_index, text, strategy, created_at
             FROM chunks WHERE source_type = ? AND source_id = ? ORDER BY chunk_index",
        )?;
        let rows = stmt.query_map(params![source_type, source_id], chunk_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Delete all chunks for a source. Embeddings go with them via the
    /// foreign-key cascade.
    pub fn delete_chunks_for_source(&self, source_type: &str, source_id: i64) -> DbResult<usize> {
        let rows = self.conn.execute(
            "DELETE FROM chunks WHERE source_type = ? AND source_id = ?",
            params![source_type, source_id],
        )?;
        Ok(rows)
    }

    pub fn create_embedding(
        &self,
        chunk_id: i64,
        vector: &[f32],
        model_id: &str,
    ) -> DbResult<i64> {
        let blob = encode_vector(vector);
        self.conn.execute(
            "INSERT INTO embeddings (chunk_id, vector, model_id, dimension)
             VALUES (?, ?, ?, ?)",
            params![chunk_id, blob, model_id, vector.len() as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Latest embedding for a chunk, optionally pinned to one model.
    pub fn get_embedding(
        &self,
        chunk_id: i64,
        model_id: Option<&str>,
    ) -> DbResult<Option<EmbeddingRecord>> {
        let record = match model_id {
            Some(model) => self
                .conn
                .query_row(
                    "SELECT id, chunk_id, vector, model_id, dimension, created_at
                     FROM embeddings WHERE chunk_id = ? AND model_id = ?
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![chunk_id, model],
                    embedding_from_row,
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    "SELECT id, chunk_id, vector, model_id, dimension, created_at
                     FROM embeddings WHERE chunk_id = ?
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![chunk_id],
                    embedding_from_row,
                )
                .optional()?,
        };
        Ok(record)
    }

    pub fn count_embeddings(&self) -> DbResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_chunks(&self) -> DbResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_listing_ordered_by_index() {
        let db = Db::open_in_memory().unwrap();

        db.create_chunk("story", 1, 2, "third", "story_aware").unwrap();
        db.create_chunk("story", 1, 0, "first", "story_aware").unwrap();
        db.create_chunk("story", 1, 1, "second", "story_aware").unwrap();
        db.create_chunk("story", 2, 0, "other story", "story_aware")
            .unwrap();

        let chunks = db.list_chunks("story", 1).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "first");
        assert_eq!(chunks[2].text, "third");
    }

    #[test]
    fn test_embedding_roundtrip() {
        let db = Db::open_in_memory().unwrap();
        let chunk_id = db.create_chunk("story", 1, 0, "text", "fixed_size_500_50").unwrap();

        db.create_embedding(chunk_id, &[0.25, -0.5, 1.0], "mock_embedding_3")
            .unwrap();

        let record = db.get_embedding(chunk_id, None).unwrap().unwrap();
        assert_eq!(record.vector, vec![0.25, -0.5, 1.0]);
        assert_eq!(record.dimension, 3);
        assert_eq!(record.model_id, "mock_embedding_3");
    }

    #[test]
    fn test_get_embedding_latest_wins() {
        let db = Db::open_in_memory().unwrap();
        let chunk_id = db.create_chunk("story", 1, 0, "text", "story_aware").unwrap();

        db.create_embedding(chunk_id, &[1.0], "mock_embedding_1").unwrap();
        db.create_embedding(chunk_id, &[2.0], "mock_embedding_1").unwrap();

        let record = db.get_embedding(chunk_id, None).unwrap().unwrap();
        assert_eq!(record.vector, vec![2.0]);

        // Model filter bypasses newer rows of other models
        db.create_embedding(chunk_id, &[3.0], "openai_text-embedding-3-small")
            .unwrap();
        let pinned = db
            .get_embedding(chunk_id, Some("mock_embedding_1"))
            .unwrap()
            .unwrap();
        assert_eq!(pinned.vector, vec![2.0]);
    }

    #[test]
    fn test_delete_chunks_cascades_embeddings() {
        let db = Db::open_in_memory().unwrap();
        let chunk_id = db.create_chunk("story", 1, 0, "text", "story_aware").unwrap();
        db.create_embedding(chunk_id, &[0.1], "mock_embedding_1").unwrap();
        assert_eq!(db.count_embeddings().unwrap(), 1);

        assert_eq!(db.delete_chunks_for_source("story", 1).unwrap(), 1);
        assert_eq!(db.count_chunks().unwrap(), 0);
        assert_eq!(db.count_embeddings().unwrap(), 0);
    }
}
