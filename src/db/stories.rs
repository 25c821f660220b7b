//! Story and vote persistence.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::{Db, DbError, DbResult, models::*};
use crate::consensus;

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<StoryRecord> {
    Ok(StoryRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        creator_name: row.get(3)?,
        status: row.get(4)?,
        source: row.get(5)?,
        final_points: row.get::<_, Option<i64>>(6)?.map(|p| p as u32),
        round: row.get::<_, i64>(7)? as u32,
        created_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<VoteRecord> {
    Ok(VoteRecord {
        id: row.get(0)?,
        story_id: row.get(1)?,
        user_name: row.get(2)?,
        points: row.get::<_, i64>(3)? as u32,
        round: row.get::<_, i64>(4)? as u32,
        created_at: row.get(5)?,
    })
}

const STORY_COLUMNS: &str =
    "id, title, description, creator_name, status, source, final_points, round, created_at, completed_at";

impl Db {
    /// Insert a new story and return its id.
    pub fn create_story(
        &self,
        title: &str,
        description: Option<&str>,
        creator_name: &str,
        source: Option<&str>,
    ) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO stories (title, description, creator_name, source) VALUES (?, ?, ?, ?)",
            params![title, description, creator_name, source],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_story(&self, id: i64) -> DbResult<Option<StoryRecord>> {
        let story = self
            .conn
            .query_row(
                &format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?"),
                params![id],
                story_from_row,
            )
            .optional()?;
        Ok(story)
    }

    pub fn list_stories(&self) -> DbResult<Vec<StoryRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STORY_COLUMNS} FROM stories ORDER BY id"))?;
        let rows = stmt.query_map([], story_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Archived stories that carry an agreed final estimate. These form the
    /// evidence corpus for AI estimation.
    pub fn list_archive_stories_with_points(&self) -> DbResult<Vec<StoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STORY_COLUMNS} FROM stories
             WHERE source = 'archive' AND final_points IS NOT NULL
             ORDER BY id"
        ))?;
        let rows = stmt.query_map([], story_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Record the agreed estimate and mark the story completed.
    pub fn complete_story(&self, id: i64, points: u32) -> DbResult<bool> {
        if !consensus::is_valid_points(points) {
            return Err(DbError::InvalidPoints(points));
        }
        let rows = self.conn.execute(
            "UPDATE stories SET final_points = ?, status = 'completed', completed_at = ? WHERE id = ?",
            params![points as i64, Utc::now(), id],
        )?;
        Ok(rows > 0)
    }

    pub fn update_story_status(&self, id: i64, status: &str) -> DbResult<bool> {
        let rows = self.conn.execute(
            "UPDATE stories SET status = ? WHERE id = ?",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    /// Cast or overwrite a vote. One row per (story, user, round); a second
    /// vote in the same round replaces the first.
    pub fn cast_vote(
        &self,
        story_id: i64,
        user_name: &str,
        points: u32,
        round: u32,
    ) -> DbResult<i64> {
        if !consensus::is_valid_points(points) {
            return Err(DbError::InvalidPoints(points));
        }
        let id: i64 = self.conn.query_row(
            r#"
            INSERT INTO votes (story_id, user_name, points, round, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(story_id, user_name, round) DO UPDATE SET
                points = excluded.points,
                created_at = excluded.created_at
            RETURNING id
            "#,
            params![story_id, user_name, points as i64, round as i64, Utc::now()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Votes for one round of a story, in the order they were first cast.
    pub fn list_votes(&self, story_id: i64, round: u32) -> DbResult<Vec<VoteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, story_id, user_name, points, round, created_at
             FROM votes WHERE story_id = ? AND round = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![story_id, round as i64], vote_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All votes for a story across rounds, for combined-text summaries.
    pub fn list_all_votes(&self, story_id: i64) -> DbResult<Vec<VoteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, story_id, user_name, points, round, created_at
             FROM votes WHERE story_id = ? ORDER BY round, id",
        )?;
        let rows = stmt.query_map(params![story_id], vote_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn clear_votes_for_round(&self, story_id: i64, round: u32) -> DbResult<usize> {
        let rows = self.conn.execute(
            "DELETE FROM votes WHERE story_id = ? AND round = ?",
            params![story_id, round as i64],
        )?;
        Ok(rows)
    }
}
