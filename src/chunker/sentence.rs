//! Sentence-bounded chunking.

use regex::Regex;

use super::{Chunk, ChunkStrategy};

/// Accumulates sentences into chunks, flushing just before a chunk would
/// exceed `max_sentences` or `max_chunk_size` characters. The final partial
/// accumulation is always flushed.
pub struct SentenceChunker {
    max_sentences: usize,
    max_chunk_size: usize,
    sentence_end: Regex,
}

impl SentenceChunker {
    #[must_use]
    pub fn new(max_sentences: usize, max_chunk_size: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
            max_chunk_size,
            // fixed pattern, compilation cannot fail
            sentence_end: Regex::new(r"[.!?]+\s+").unwrap(),
        }
    }

    /// Split text on sentence-terminating punctuation followed by whitespace.
    pub(crate) fn split_sentences(&self, text: &str) -> Vec<String> {
        self.sentence_end
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(5, 1000)
    }
}

impl ChunkStrategy for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let sentences = self.split_sentences(text);

        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_length = 0;
        let mut index = 0;

        for sentence in sentences {
            let sentence_length = sentence.chars().count();

            // Flush checks run against the accumulation as it stood before
            // this sentence, so a chunk closes just before it would overflow
            let would_overflow = current.len() >= self.max_sentences
                || current_length + sentence_length > self.max_chunk_size;
            if would_overflow && !current.is_empty() {
                let joined = current.join(" ");
                let trimmed = joined.trim();
                if !trimmed.is_empty() {
                    let mut chunk = Chunk::new(trimmed.to_string(), index);
                    chunk.sentence_count = Some(current.len());
                    chunks.push(chunk);
                    index += 1;
                }
                current.clear();
                current_length = 0;
            }

            current_length += sentence.chars().count();
            current.push(sentence);
        }

        if !current.is_empty() {
            let joined = current.join(" ");
            let trimmed = joined.trim();
            if !trimmed.is_empty() {
                let mut chunk = Chunk::new(trimmed.to_string(), index);
                chunk.sentence_count = Some(current.len());
                chunks.push(chunk);
            }
        }

        chunks
    }

    fn name(&self) -> String {
        format!("sentence_{}", self.max_sentences)
    }
}
