//! AI story estimation: retrieve similar archived stories and ask a
//! language model for a point estimate grounded in them.

pub mod prompt;
pub mod reasoner;
pub mod service;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::models::StoryRecord;
use crate::db::{Db, DbError};
use crate::embedder::{EmbedderError, EmbeddingProvider};
use crate::similarity::{self, SimilarityError};

pub use reasoner::Reasoner;
pub use service::{EstimationEvent, EstimationService, EstimationSettings};

/// The virtual team member estimations are attributed to.
pub const AI_USER_NAME: &str = "AI Assistant";

#[must_use]
pub fn is_ai_user(user_name: &str) -> bool {
    user_name == AI_USER_NAME
}

#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("story not found: {0}")]
    StoryNotFound(i64),

    /// The archive holds no estimated stories to compare against.
    #[error("no estimated archive stories available as evidence")]
    NoEvidence,

    /// Evidence exists but nothing clears the similarity threshold.
    #[error("no archive stories similar enough to the target")]
    NoSimilarStories,

    #[error(transparent)]
    Embedding(#[from] EmbedderError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error("model call failed: {0}")]
    ModelCallFailed(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// One retrieved archive story backing an estimate. Serialized as JSON
/// alongside the persisted estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub story_id: i64,
    pub title: String,
    pub points: u32,
    pub similarity: f32,
}

/// The outcome of a full estimation run.
#[derive(Debug, Clone)]
pub struct Estimation {
    pub points: u32,
    pub reasoning: String,
    pub evidence: Vec<Evidence>,
    pub model_id: String,
}

/// Retrieve the archive stories most similar to `story`.
///
/// Each archive story is represented by the stored embedding of its first
/// chunk (the title chunk under story-aware chunking). Stories without a
/// chunk or a stored embedding for the provider's model are skipped; a
/// stored embedding of the wrong dimension is a data error and fails the
/// call.
pub fn gather_evidence(
    db: &Db,
    provider: &dyn EmbeddingProvider,
    story: &StoryRecord,
    top_k: usize,
    min_similarity: f32,
) -> Result<Vec<Evidence>, EstimationError> {
    let archive = db.list_archive_stories_with_points()?;
    let archive: Vec<_> = archive.into_iter().filter(|s| s.id != story.id).collect();
    if archive.is_empty() {
        return Err(EstimationError::NoEvidence);
    }

    let query_text = match &story.description {
        Some(description) => format!("{} {}", story.title, description),
        None => story.title.clone(),
    };
    let (query, _) = provider.generate(&query_text)?;

    let model_id = provider.model_id();
    let mut candidates = Vec::new();
    for candidate in &archive {
        let chunks = db.list_chunks("story", candidate.id)?;
        let Some(first) = chunks.first() else {
            continue;
        };
        let Some(embedding) = db.get_embedding(first.id, Some(model_id.as_str()))? else {
            continue;
        };
        candidates.push((candidate.id, embedding.vector));
    }

    if candidates.is_empty() {
        return Err(EstimationError::NoEvidence);
    }
    debug!("Ranking {} archive candidates", candidates.len());

    let hits = similarity::find_similar(&query, &candidates, top_k, min_similarity)?;
    if hits.is_empty() {
        return Err(EstimationError::NoSimilarStories);
    }

    let evidence = hits
        .iter()
        .filter_map(|hit| {
            archive.iter().find(|s| s.id == hit.id).map(|s| Evidence {
                story_id: s.id,
                title: s.title.clone(),
                // Guarded by the archive listing
                points: s.final_points.unwrap_or_default(),
                similarity: hit.similarity,
            })
        })
        .collect();

    Ok(evidence)
}

/// Run the full estimation for one story: gather evidence, ask the
/// reasoner, parse the points, and persist the result.
pub fn estimate_story(
    db: &Db,
    provider: &dyn EmbeddingProvider,
    reasoner: &dyn Reasoner,
    story_id: i64,
    top_k: usize,
    min_similarity: f32,
    max_tokens: u32,
) -> Result<Estimation, EstimationError> {
    let story = db
        .get_story(story_id)?
        .ok_or(EstimationError::StoryNotFound(story_id))?;

    let evidence = gather_evidence(db, provider, &story, top_k, min_similarity)?;

    let request = prompt::build_prompt(&story, &evidence);
    let response = reasoner.complete(&request, max_tokens)?;
    let points = prompt::extract_points(&response);

    // Only the strongest matches are kept with the record
    let top_evidence: Vec<Evidence> = evidence.into_iter().take(3).collect();
    let evidence_json = serde_json::to_string(&top_evidence).unwrap_or_else(|_| "[]".to_string());

    let model_id = reasoner.model_id();
    db.save_estimation(story_id, None, points, &response, &evidence_json, &model_id)?;
    info!("Estimated story {story_id} at {points} points");

    Ok(Estimation {
        points,
        reasoning: response,
        evidence: top_evidence,
        model_id,
    })
}
