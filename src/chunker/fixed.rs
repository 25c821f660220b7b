//! Fixed-size chunking with word-boundary backoff and overlap.

use super::{Chunk, ChunkStrategy};

/// Advances a `chunk_size`-character window over the text, backing off to
/// the last space inside the window so words are not split, and restarting
/// each window `overlap` characters before the previous end.
pub struct FixedSizeChunker {
    chunk_size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

impl ChunkStrategy for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Offsets are character positions, not byte positions
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < chars.len() {
            let mut end = start + self.chunk_size;

            if end < chars.len() {
                // Back off to the last space strictly after the window start
                if let Some(offset) = chars[start..end].iter().rposition(|c| *c == ' ') {
                    if offset > 0 {
                        end = start + offset;
                    }
                }
            } else {
                end = chars.len();
            }

            let raw: String = chars[start..end].iter().collect();
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let mut chunk = Chunk::new(trimmed.to_string(), index);
                chunk.start_pos = Some(start);
                chunk.end_pos = Some(end);
                chunks.push(chunk);
                index += 1;
            }

            let next = if self.overlap > 0 && end > self.overlap {
                end - self.overlap
            } else {
                end
            };
            // Overlap must never stall the window
            start = if next > start { next } else { end };
        }

        chunks
    }

    fn name(&self) -> String {
        format!("fixed_size_{}_{}", self.chunk_size, self.overlap)
    }
}
