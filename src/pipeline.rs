//! Chunk-and-embed pipeline over the story archive.
//!
//! Processing is idempotent per (story, strategy): a story that already has
//! chunks is skipped, so repeated runs only pick up new stories. Each chunk
//! is committed with its embedding as it is produced; a failed embedding is
//! logged and skipped without aborting the batch.

use tracing::{info, warn};

use crate::chunker::ChunkStrategy;
use crate::db::models::StoryRecord;
use crate::db::{Db, DbResult};
use crate::embedder::EmbeddingProvider;
use crate::preprocess::Preprocessor;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub processed: usize,
    pub skipped: usize,
    pub chunks: usize,
    pub embeddings: usize,
    pub failures: usize,
}

/// Chunk and embed every archived story with an agreed estimate.
pub fn process_stories(
    db: &Db,
    provider: &dyn EmbeddingProvider,
    strategy: &dyn ChunkStrategy,
) -> DbResult<ProcessReport> {
    let stories = db.list_archive_stories_with_points()?;
    info!("Processing {} archive stories", stories.len());

    let mut report = ProcessReport::default();
    for story in &stories {
        process_story(db, provider, strategy, story, &mut report)?;
    }

    info!(
        "Processed {} stories ({} skipped, {} chunks, {} embeddings, {} failures)",
        report.processed, report.skipped, report.chunks, report.embeddings, report.failures
    );
    Ok(report)
}

/// Chunk and embed a single story, accumulating into `report`.
pub fn process_story(
    db: &Db,
    provider: &dyn EmbeddingProvider,
    strategy: &dyn ChunkStrategy,
    story: &StoryRecord,
    report: &mut ProcessReport,
) -> DbResult<()> {
    let existing = db.list_chunks("story", story.id)?;
    if !existing.is_empty() {
        report.skipped += 1;
        return Ok(());
    }

    let votes = db.list_all_votes(story.id)?;
    let preprocessor = Preprocessor::new();
    let combined = preprocessor.story_combined_text(story, &votes, &[]);

    let chunks = strategy.chunk(&combined);
    let strategy_name = strategy.name();

    for chunk in &chunks {
        let chunk_id = db.create_chunk("story", story.id, chunk.index, &chunk.text, &strategy_name)?;
        report.chunks += 1;

        match provider.generate(&chunk.text) {
            Ok((vector, _)) => {
                db.create_embedding(chunk_id, &vector, &provider.model_id())?;
                report.embeddings += 1;
            }
            Err(e) => {
                warn!("Embedding failed for story {} chunk {}: {e}", story.id, chunk.index);
                report.failures += 1;
            }
        }
    }

    report.processed += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::story::StoryChunker;
    use crate::embedder::{EmbedderError, MockProvider};

    fn seed_archive_story(db: &Db, title: &str, points: u32) -> i64 {
        let id = db
            .create_story(title, Some("As a user I want things."), "alice", Some("archive"))
            .unwrap();
        db.complete_story(id, points).unwrap();
        id
    }

    #[test]
    fn test_process_creates_chunks_and_embeddings() {
        let db = Db::open_in_memory().unwrap();
        let story = seed_archive_story(&db, "Login page", 5);
        db.cast_vote(story, "alice", 5, 1).unwrap();
        db.cast_vote(story, "bob", 5, 1).unwrap();

        let provider = MockProvider::new(32);
        let strategy = StoryChunker::default();
        let report = process_stories(&db, &provider, &strategy).unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 0);
        assert!(report.chunks >= 2); // at least title + description
        assert_eq!(report.embeddings, report.chunks);
        assert_eq!(report.failures, 0);

        let chunks = db.list_chunks("story", story).unwrap();
        assert_eq!(chunks.len(), report.chunks);
        assert!(chunks[0].text.starts_with("Title:"));
        for chunk in &chunks {
            let embedding = db.get_embedding(chunk.id, None).unwrap().unwrap();
            assert_eq!(embedding.vector.len(), 32);
        }
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        seed_archive_story(&db, "Login page", 5);

        let provider = MockProvider::new(16);
        let strategy = StoryChunker::default();

        let first = process_stories(&db, &provider, &strategy).unwrap();
        assert_eq!(first.processed, 1);
        let chunk_count = db.count_chunks().unwrap();

        let second = process_stories(&db, &provider, &strategy).unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(db.count_chunks().unwrap(), chunk_count);
    }

    #[test]
    fn test_non_archive_stories_are_ignored() {
        let db = Db::open_in_memory().unwrap();
        db.create_story("Live story", None, "alice", None).unwrap();

        let provider = MockProvider::new(16);
        let strategy = StoryChunker::default();
        let report = process_stories(&db, &provider, &strategy).unwrap();

        assert_eq!(report, ProcessReport::default());
    }

    struct FailingProvider;

    impl EmbeddingProvider for FailingProvider {
        fn generate(&self, _text: &str) -> Result<(Vec<f32>, usize), EmbedderError> {
            Err(EmbedderError::GenerationFailed("backend down".to_string()))
        }

        fn model_id(&self) -> String {
            "failing".to_string()
        }

        fn max_context(&self) -> usize {
            512
        }
    }

    #[test]
    fn test_embedding_failure_skips_chunk_and_continues() {
        let db = Db::open_in_memory().unwrap();
        let story = seed_archive_story(&db, "Login page", 5);

        let strategy = StoryChunker::default();
        let report = process_stories(&db, &FailingProvider, &strategy).unwrap();

        assert_eq!(report.processed, 1);
        assert!(report.chunks > 0);
        assert_eq!(report.embeddings, 0);
        assert_eq!(report.failures, report.chunks);

        // Chunks survive even when their embeddings did not
        assert_eq!(db.list_chunks("story", story).unwrap().len(), report.chunks);
    }
}
