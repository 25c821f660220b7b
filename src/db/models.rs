//! Typed rows for the planning tables.

use chrono::{DateTime, Utc};

/// A story under estimation, or an archived story used as evidence.
#[derive(Debug, Clone)]
pub struct StoryRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub creator_name: String,
    pub status: String,
    /// Where the story came from; archived reference stories carry `"archive"`.
    pub source: Option<String>,
    pub final_points: Option<u32>,
    pub round: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One participant's vote in a given round. At most one per
/// (story, user, round); re-voting overwrites.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub id: i64,
    pub story_id: i64,
    pub user_name: String,
    pub points: u32,
    pub round: u32,
    pub created_at: DateTime<Utc>,
}

/// A text fragment produced by a chunking strategy.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub chunk_index: usize,
    pub text: String,
    pub strategy: String,
    pub created_at: DateTime<Utc>,
}

/// A stored vector for one chunk. The blob is little-endian float32;
/// `dimension` is recorded for sanity checks, not for decoding.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: i64,
    pub chunk_id: i64,
    pub vector: Vec<f32>,
    pub model_id: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
}

/// A persisted AI estimation for a story. New estimations supersede old
/// ones; retrieval is latest-wins.
#[derive(Debug, Clone)]
pub struct EstimationRecord {
    pub id: i64,
    pub story_id: i64,
    pub vote_id: Option<i64>,
    pub points: u32,
    pub reasoning: String,
    pub evidence_json: String,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
}
