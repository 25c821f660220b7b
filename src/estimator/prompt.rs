//! Prompt construction and point extraction.

use std::sync::OnceLock;

use regex::Regex;

use super::Evidence;
use crate::db::models::StoryRecord;

/// Valid estimation results, smallest first. Zero is a valid vote but
/// never a model estimate.
const SNAP_SCALE: [u32; 10] = [1, 2, 3, 5, 8, 13, 21, 34, 55, 89];

const DEFAULT_POINTS: u32 = 5;

/// Build the estimation prompt: ranked evidence lines, the target story,
/// and the fixed response format the extractor expects.
#[must_use]
pub fn build_prompt(story: &StoryRecord, evidence: &[Evidence]) -> String {
    let mut context = String::from("Here are similar stories with their story points:\n\n");
    for (i, item) in evidence.iter().enumerate() {
        context.push_str(&format!(
            "{}. [{} SP] (similarity: {:.2}) - {}\n",
            i + 1,
            item.points,
            item.similarity,
            item.title
        ));
    }

    let description = story.description.as_deref().unwrap_or("(no description)");

    format!(
        "You are an experienced Scrum Master estimating user stories in story points \
         (Fibonacci: 1, 2, 3, 5, 8, 13, 21).\n\n\
         {context}\n\
         Based on these similar stories, estimate the following new story:\n\n\
         **Title:** {}\n\
         **Description:** {}\n\n\
         Reply in exactly this format:\n\n\
         STORY POINTS: [number]\n\n\
         REASONING:\n\
         [Your reasoning based on the similar stories - at most 3 sentences]\n\n\
         COMPARISON:\n\
         [Compare the new story with the 2-3 most similar archive stories - short and precise]\n",
        story.title, description
    )
}

fn points_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Infallible: the pattern is a literal
    RE.get_or_init(|| Regex::new(r"(?i)STORY POINTS:\s*(\d+)").unwrap())
}

fn leading_integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)").unwrap())
}

/// Pull a point value out of a model response. Total: falls back to the
/// first leading integer, then to 5.
#[must_use]
pub fn extract_points(text: &str) -> u32 {
    if let Some(caps) = points_label_re().captures(text) {
        if let Ok(points) = caps[1].parse::<u32>() {
            return snap_to_scale(points);
        }
    }

    if let Some(caps) = leading_integer_re().captures(text) {
        if let Ok(points) = caps[1].parse::<u32>() {
            return points;
        }
    }

    DEFAULT_POINTS
}

/// Snap upward to the nearest scale value; values above the scale clamp
/// to its maximum.
fn snap_to_scale(points: u32) -> u32 {
    for value in SNAP_SCALE {
        if value >= points {
            return value;
        }
    }
    SNAP_SCALE[SNAP_SCALE.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn story(title: &str, description: Option<&str>) -> StoryRecord {
        StoryRecord {
            id: 1,
            title: title.to_string(),
            description: description.map(String::from),
            creator_name: "alice".to_string(),
            status: "voting".to_string(),
            source: None,
            final_points: None,
            round: 1,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_prompt_contains_evidence_and_format() {
        let evidence = vec![
            Evidence {
                story_id: 7,
                title: "Login page".to_string(),
                points: 5,
                similarity: 0.91,
            },
            Evidence {
                story_id: 9,
                title: "Signup page".to_string(),
                points: 8,
                similarity: 0.84,
            },
        ];
        let prompt = build_prompt(&story("New login flow", Some("OAuth support")), &evidence);

        assert!(prompt.contains("1. [5 SP] (similarity: 0.91) - Login page"));
        assert!(prompt.contains("2. [8 SP] (similarity: 0.84) - Signup page"));
        assert!(prompt.contains("**Title:** New login flow"));
        assert!(prompt.contains("**Description:** OAuth support"));
        assert!(prompt.contains("STORY POINTS:"));
        assert!(prompt.contains("REASONING:"));
        assert!(prompt.contains("COMPARISON:"));
    }

    #[test]
    fn test_prompt_missing_description_placeholder() {
        let prompt = build_prompt(&story("Bare story", None), &[]);
        assert!(prompt.contains("**Description:** (no description)"));
    }

    #[test]
    fn test_extract_labeled_points() {
        assert_eq!(extract_points("STORY POINTS: 8\n\nREASONING:\n..."), 8);
        assert_eq!(extract_points("story points: 13"), 13);
    }

    #[test]
    fn test_extract_snaps_upward() {
        assert_eq!(extract_points("STORY POINTS: 4"), 5);
        assert_eq!(extract_points("STORY POINTS: 6"), 8);
        assert_eq!(extract_points("STORY POINTS: 9"), 13);
        assert_eq!(extract_points("STORY POINTS: 90"), 89);
        assert_eq!(extract_points("STORY POINTS: 0"), 1);
    }

    #[test]
    fn test_extract_fallback_leading_integer() {
        // No label, but the reply starts with a number
        assert_eq!(extract_points("4 points, maybe 5"), 4);
        assert_eq!(extract_points("  7\nbecause..."), 7);
    }

    #[test]
    fn test_extract_default() {
        assert_eq!(extract_points("I cannot estimate this."), 5);
        assert_eq!(extract_points(""), 5);
    }
}
