//! Cosine similarity and top-K retrieval over embedding vectors.
//!
//! Pure functions with no side effects; callers bring their own candidate
//! set (typically the persisted first-chunk embeddings of archive stories).

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SimilarityError {
    /// Comparing vectors from different models is a data error, never coerced.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// A ranked retrieval hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub id: i64,
    pub similarity: f32,
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns exactly `0.0` when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (mag_a * mag_b))
}

/// Rank `candidates` against `query` and return up to `top_k` hits at or
/// above `min_similarity`, sorted by descending similarity.
///
/// Ties preserve candidate input order. An empty candidate list or
/// `top_k == 0` yields an empty result without error; a candidate with a
/// mismatched dimension fails the whole call.
pub fn find_similar(
    query: &[f32],
    candidates: &[(i64, Vec<f32>)],
    top_k: usize,
    min_similarity: f32,
) -> Result<Vec<SimilarityHit>, SimilarityError> {
    let mut hits = Vec::new();

    for (id, vector) in candidates {
        let similarity = cosine_similarity(query, vector)?;
        if similarity >= min_similarity {
            hits.push(SimilarityHit {
                id: *id,
                similarity,
            });
        }
    }

    // Stable sort keeps input order for equal scores
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);

    Ok(hits)
}
