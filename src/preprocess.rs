//! Text normalization for story and comment content.
//!
//! Cleans raw text (HTML entities, markup tags, whitespace) before chunking
//! and builds the canonical combined story text that the story-aware chunker
//! expects (`Title:` / `Description:` / `Voting:` / `Comments:` sections).

use std::collections::BTreeMap;

use regex::Regex;

use crate::db::models::{StoryRecord, VoteRecord};

pub struct Preprocessor {
    whitespace: Regex,
    tag: Regex,
    url: Regex,
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // patterns are fixed literals, compilation cannot fail
            whitespace: Regex::new(r"\s+").unwrap(),
            tag: Regex::new(r"<[^>]+>").unwrap(),
            url: Regex::new(r#"https?://[^\s<>"']+"#).unwrap(),
        }
    }

    /// Clean raw text: decode HTML entities, strip markup tags, collapse
    /// whitespace.
    ///
    /// With `preserve_structure` the line breaks survive (whitespace is
    /// collapsed per line and blank lines are dropped); without it all
    /// whitespace becomes single spaces. Empty input yields an empty string.
    #[must_use]
    pub fn clean(&self, text: &str, preserve_structure: bool) -> String {
        if text.is_empty() {
            return String::new();
        }

        let decoded = html_escape::decode_html_entities(text);
        let stripped = self.tag.replace_all(&decoded, "");

        let collapsed = if preserve_structure {
            stripped
                .split('\n')
                .map(|line| self.whitespace.replace_all(line.trim(), " ").into_owned())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            self.whitespace.replace_all(&stripped, " ").into_owned()
        };

        collapsed.trim().to_string()
    }

    /// All URLs found in `text`, in order of appearance.
    #[must_use]
    pub fn extract_urls(&self, text: &str) -> Vec<String> {
        self.url
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Replace every URL in `text` with `placeholder`.
    #[must_use]
    pub fn remove_urls(&self, text: &str, placeholder: &str) -> String {
        self.url.replace_all(text, placeholder).into_owned()
    }

    /// Build the combined section text for a story, cleaned and labeled so
    /// the story-aware chunker can split it back apart.
    ///
    /// Sections with no content are omitted entirely.
    #[must_use]
    pub fn story_combined_text(
        &self,
        story: &StoryRecord,
        votes: &[VoteRecord],
        comment_types: &[&str],
    ) -> String {
        let mut parts = vec![format!("Title: {}", self.clean(&story.title, false))];

        if let Some(ref description) = story.description {
            let cleaned = self.clean(description, true);
            if !cleaned.is_empty() {
                parts.push(format!("Description: {cleaned}"));
            }
        }

        if !votes.is_empty() {
            parts.push(format!("Voting: {}", summarize_votes(votes)));
        }

        if !comment_types.is_empty() {
            parts.push(format!("Comments: {}", summarize_comments(comment_types)));
        }

        parts.join("\n")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-round vote summary, e.g. `Round 1: alice:5, bob:8; Round 2: alice:8`.
fn summarize_votes(votes: &[VoteRecord]) -> String {
    let mut rounds: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for vote in votes {
        rounds
            .entry(vote.round)
            .or_default()
            .push(format!("{}:{}", vote.user_name, vote.points));
    }

    rounds
        .iter()
        .map(|(round, entries)| format!("Round {round}: {}", entries.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Comment counts grouped by type, e.g. `2 reasoning comment(s); 1 general comment(s)`.
fn summarize_comments(comment_types: &[&str]) -> String {
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for t in comment_types {
        *by_type.entry(t).or_default() += 1;
    }

    by_type
        .iter()
        .map(|(t, count)| format!("{count} {t} comment(s)"))
        .collect::<Vec<_>>()
        .join("; ")
}
