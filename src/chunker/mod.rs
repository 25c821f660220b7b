//! Chunking strategies for estimation text.
//!
//! Splits normalized story/comment text into bounded-size units for
//! embedding. Four interchangeable strategies are provided; a closed
//! registry resolves them by string key so an unknown key is a hard
//! configuration error rather than a silent fallback.

pub mod fixed;
pub mod paragraph;
pub mod sentence;
pub mod story;

use std::str::FromStr;

use thiserror::Error;

pub use fixed::FixedSizeChunker;
pub use paragraph::ParagraphChunker;
pub use sentence::SentenceChunker;
pub use story::StoryChunker;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("unknown chunking strategy: {0}")]
    UnknownStrategy(String),
}

/// Labeled section of a structure-aware story chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Description,
    Voting,
    Comments,
}

impl Section {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Title => "title",
            Section::Description => "description",
            Section::Voting => "voting",
            Section::Comments => "comments",
        }
    }
}

/// One extracted span of text, with the strategy-specific fields that
/// produced it. `text` is always non-empty and trimmed; `index` is dense
/// within one `chunk` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    /// Character offsets, fixed-size strategy only.
    pub start_pos: Option<usize>,
    pub end_pos: Option<usize>,
    pub sentence_count: Option<usize>,
    pub paragraph_count: Option<usize>,
    pub section: Option<Section>,
    /// Position within a sub-chunked description.
    pub sub_index: Option<usize>,
}

impl Chunk {
    pub(crate) fn new(text: String, index: usize) -> Self {
        Self {
            text,
            index,
            start_pos: None,
            end_pos: None,
            sentence_count: None,
            paragraph_count: None,
            section: None,
            sub_index: None,
        }
    }
}

/// A chunking strategy. Implementations never fail: empty input produces
/// an empty sequence.
pub trait ChunkStrategy: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<Chunk>;

    /// Stable tag persisted alongside produced chunks.
    fn name(&self) -> String;
}

/// Closed set of strategy keys accepted from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Fixed,
    Sentence,
    Paragraph,
    Story,
}

impl FromStr for StrategyKind {
    type Err = ChunkerError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key.to_lowercase().as_str() {
            "fixed" | "fixed_size" => Ok(StrategyKind::Fixed),
            "sentence" => Ok(StrategyKind::Sentence),
            "paragraph" => Ok(StrategyKind::Paragraph),
            "story" | "story_aware" => Ok(StrategyKind::Story),
            other => Err(ChunkerError::UnknownStrategy(other.to_string())),
        }
    }
}

impl StrategyKind {
    /// Instantiate the strategy with its default configuration.
    #[must_use]
    pub fn build(self) -> Box<dyn ChunkStrategy> {
        match self {
            StrategyKind::Fixed => Box::new(FixedSizeChunker::default()),
            StrategyKind::Sentence => Box::new(SentenceChunker::default()),
            StrategyKind::Paragraph => Box::new(ParagraphChunker::default()),
            StrategyKind::Story => Box::new(StoryChunker::default()),
        }
    }
}

/// Resolve a strategy by string key with default configuration.
pub fn strategy_for_key(key: &str) -> Result<Box<dyn ChunkStrategy>, ChunkerError> {
    Ok(key.parse::<StrategyKind>()?.build())
}

/// Recommended default strategy for a content type. Unrecognized types get
/// the generic fixed-size strategy.
#[must_use]
pub fn default_for_content_type(content_type: &str) -> Box<dyn ChunkStrategy> {
    match content_type {
        "story" => Box::new(StoryChunker::default()),
        "comment" => Box::new(SentenceChunker::new(3, 1000)),
        _ => Box::new(FixedSizeChunker::new(500, 50)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_key_resolution() {
        assert_eq!("fixed".parse::<StrategyKind>().unwrap(), StrategyKind::Fixed);
        assert_eq!("Story".parse::<StrategyKind>().unwrap(), StrategyKind::Story);
        assert_eq!(
            "story_aware".parse::<StrategyKind>().unwrap(),
            StrategyKind::Story
        );
        assert_eq!(
            "bogus".parse::<StrategyKind>(),
            Err(ChunkerError::UnknownStrategy("bogus".to_string()))
        );
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(strategy_for_key("fixed").unwrap().name(), "fixed_size_500_50");
        assert_eq!(strategy_for_key("sentence").unwrap().name(), "sentence_5");
        assert_eq!(strategy_for_key("paragraph").unwrap().name(), "paragraph_3");
        assert_eq!(strategy_for_key("story").unwrap().name(), "story_aware");
    }

    #[test]
    fn test_content_type_defaults() {
        assert_eq!(default_for_content_type("story").name(), "story_aware");
        assert_eq!(default_for_content_type("comment").name(), "sentence_3");
        assert_eq!(default_for_content_type("event").name(), "fixed_size_500_50");
    }

    #[test]
    fn test_all_strategies_reject_empty_input() {
        for key in ["fixed", "sentence", "paragraph", "story"] {
            let strategy = strategy_for_key(key).unwrap();
            assert!(strategy.chunk("").is_empty(), "strategy {key}");
        }
    }
}
