//! Paragraph-bounded chunking.

use super::{Chunk, ChunkStrategy, FixedSizeChunker};

/// Splits on blank-line boundaries, falling back to single newlines and
/// finally to fixed-size chunking when the text has no usable paragraph
/// structure at all.
pub struct ParagraphChunker {
    max_paragraphs: usize,
    max_chunk_size: usize,
}

impl ParagraphChunker {
    #[must_use]
    pub fn new(max_paragraphs: usize, max_chunk_size: usize) -> Self {
        Self {
            max_paragraphs: max_paragraphs.max(1),
            max_chunk_size,
        }
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self::new(3, 1500)
    }
}

impl ChunkStrategy for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        // No blank-line structure: retry on single newlines
        if paragraphs.len() <= 1 {
            paragraphs = text
                .split('\n')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
        }

        // Still one monolithic block: delegate to fixed-size chunking
        if paragraphs.len() == 1 && text.chars().count() > self.max_chunk_size {
            return FixedSizeChunker::new(self.max_chunk_size, 100).chunk(text);
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_length = 0;
        let mut index = 0;

        for paragraph in paragraphs {
            let paragraph_length = paragraph.chars().count();

            let would_overflow = current.len() >= self.max_paragraphs
                || current_length + paragraph_length > self.max_chunk_size;
            if would_overflow && !current.is_empty() {
                let joined = current.join("\n\n");
                let trimmed = joined.trim();
                if !trimmed.is_empty() {
                    let mut chunk = Chunk::new(trimmed.to_string(), index);
                    chunk.paragraph_count = Some(current.len());
                    chunks.push(chunk);
                    index += 1;
                }
                current.clear();
                current_length = 0;
            }

            current_length += paragraph_length;
            current.push(paragraph);
        }

        if !current.is_empty() {
            let joined = current.join("\n\n");
            let trimmed = joined.trim();
            if !trimmed.is_empty() {
                let mut chunk = Chunk::new(trimmed.to_string(), index);
                chunk.paragraph_count = Some(current.len());
                chunks.push(chunk);
            }
        }

        chunks
    }

    fn name(&self) -> String {
        format!("paragraph_{}", self.max_paragraphs)
    }
}
