//! Estimation record persistence. Estimations are append-only; the latest
//! row for a story is the current one.

use rusqlite::{OptionalExtension, Row, params};

use super::{Db, DbResult, models::*};

fn estimation_from_row(row: &Row<'_>) -> rusqlite::Result<EstimationRecord> {
    Ok(EstimationRecord {
        id: row.get(0)?,
        story_id: row.get(1)?,
        vote_id: row.get(2)?,
        points: row.get::<_, i64>(3)? as u32,
        reasoning: row.get(4)?,
        evidence_json: row.get(5)?,
        model_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Db {
    pub fn save_estimation(
        &self,
        story_id: i64,
        vote_id: Option<i64>,
        points: u32,
        reasoning: &str,
        evidence_json: &str,
        model_id: &str,
    ) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO estimations (story_id, vote_id, points, reasoning, evidence_json, model_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![story_id, vote_id, points as i64, reasoning, evidence_json, model_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent estimation for a story. Older rows are superseded,
    /// not deleted.
    pub fn latest_estimation(&self, story_id: i64) -> DbResult<Option<EstimationRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, story_id, vote_id, points, reasoning, evidence_json, model_id, created_at
                 FROM estimations WHERE story_id = ?
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![story_id],
                estimation_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count_estimations(&self) -> DbResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM estimations", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_estimation_supersedes() {
        let db = Db::open_in_memory().unwrap();
        let story = db.create_story("Story", None, "alice", None).unwrap();

        db.save_estimation(story, None, 5, "first pass", "[]", "ollama_llama3")
            .unwrap();
        db.save_estimation(story, None, 8, "second pass", "[]", "ollama_llama3")
            .unwrap();

        let latest = db.latest_estimation(story).unwrap().unwrap();
        assert_eq!(latest.points, 8);
        assert_eq!(latest.reasoning, "second pass");
        assert_eq!(db.count_estimations().unwrap(), 2);
    }

    #[test]
    fn test_latest_estimation_missing() {
        let db = Db::open_in_memory().unwrap();
        let story = db.create_story("Story", None, "alice", None).unwrap();
        assert!(db.latest_estimation(story).unwrap().is_none());
    }

    #[test]
    fn test_estimation_cascades_with_story() {
        let db = Db::open_in_memory().unwrap();
        let story = db.create_story("Story", None, "alice", None).unwrap();
        db.save_estimation(story, None, 5, "reasoning", "[]", "ollama_llama3")
            .unwrap();

        db.conn
            .execute("DELETE FROM stories WHERE id = ?", params![story])
            .unwrap();
        assert_eq!(db.count_estimations().unwrap(), 0);
    }
}
