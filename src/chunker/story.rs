//! Structure-aware chunking for combined story text.
//!
//! Expects the labeled format produced by
//! [`Preprocessor::story_combined_text`](crate::preprocess::Preprocessor::story_combined_text):
//! `Title:`, `Description:`, `Voting:` and `Comments:` sections in order.
//! Sections absent from the input produce no chunk.

use regex::Regex;

use super::{Chunk, ChunkStrategy, Section, SentenceChunker};

#[derive(Debug, Default)]
struct StorySections {
    title: Option<String>,
    description: Option<String>,
    voting: Option<String>,
    comments: Option<String>,
}

/// The title is always its own chunk (the densest single piece of context);
/// a long description is re-split sentence-wise and re-labeled; voting and
/// comment summaries each become one chunk.
pub struct StoryChunker {
    chunk_description: bool,
    max_description_chunk_size: usize,
    label: Regex,
}

impl StoryChunker {
    #[must_use]
    pub fn new(chunk_description: bool, max_description_chunk_size: usize) -> Self {
        Self {
            chunk_description,
            max_description_chunk_size,
            // fixed pattern, compilation cannot fail
            label: Regex::new(r"(?i)(title|description|voting|comments):").unwrap(),
        }
    }

    /// Greedy label scan: each section's content runs until the next known
    /// label or the end of the text. The first occurrence of a label wins.
    fn parse_sections(&self, text: &str) -> StorySections {
        let matches: Vec<(usize, usize, String)> = self
            .label
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?.as_str().to_lowercase();
                Some((whole.start(), whole.end(), name))
            })
            .collect();

        let mut sections = StorySections::default();
        for (i, (_, content_start, name)) in matches.iter().enumerate() {
            let content_end = matches
                .get(i + 1)
                .map(|(next_start, _, _)| *next_start)
                .unwrap_or(text.len());
            let mut content = text[*content_start..content_end].trim();

            // A title is a single line
            if name == "title" {
                if let Some(newline) = content.find('\n') {
                    content = content[..newline].trim_end();
                }
            }

            if content.is_empty() {
                continue;
            }

            let slot = match name.as_str() {
                "title" => &mut sections.title,
                "description" => &mut sections.description,
                "voting" => &mut sections.voting,
                _ => &mut sections.comments,
            };
            if slot.is_none() {
                *slot = Some(content.to_string());
            }
        }

        sections
    }
}

impl Default for StoryChunker {
    fn default() -> Self {
        Self::new(true, 800)
    }
}

impl ChunkStrategy for StoryChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let sections = self.parse_sections(text);
        let mut chunks = Vec::new();
        let mut index = 0;

        if let Some(title) = sections.title {
            let mut chunk = Chunk::new(format!("Title: {title}"), index);
            chunk.section = Some(Section::Title);
            chunks.push(chunk);
            index += 1;
        }

        if let Some(description) = sections.description {
            let too_long = description.chars().count() > self.max_description_chunk_size;
            if self.chunk_description && too_long {
                let splitter = SentenceChunker::new(5, self.max_description_chunk_size);
                for sub in splitter.chunk(&description) {
                    let mut chunk = Chunk::new(format!("Description: {}", sub.text), index);
                    chunk.section = Some(Section::Description);
                    chunk.sub_index = Some(sub.index);
                    chunks.push(chunk);
                    index += 1;
                }
            } else {
                let mut chunk = Chunk::new(format!("Description: {description}"), index);
                chunk.section = Some(Section::Description);
                chunks.push(chunk);
                index += 1;
            }
        }

        if let Some(voting) = sections.voting {
            let mut chunk = Chunk::new(format!("Voting: {voting}"), index);
            chunk.section = Some(Section::Voting);
            chunks.push(chunk);
            index += 1;
        }

        if let Some(comments) = sections.comments {
            let mut chunk = Chunk::new(format!("Comments: {comments}"), index);
            chunk.section = Some(Section::Comments);
            chunks.push(chunk);
        }

        chunks
    }

    fn name(&self) -> String {
        "story_aware".to_string()
    }
}
