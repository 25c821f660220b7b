//! Vote consensus classification for a single Planning Poker round.
//!
//! Pure functions over the multiset of submitted point values: no state,
//! no I/O, safe to call from any number of concurrent callers.

/// Permitted point values for a vote submission.
pub const VOTE_SCALE: [u32; 11] = [0, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89];

/// Whether `points` is a member of the estimation scale.
#[must_use]
pub fn is_valid_points(points: u32) -> bool {
    VOTE_SCALE.contains(&points)
}

/// Outcome classification for one voting round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every participant submitted the identical value.
    Consensus,
    /// At least one vote differs (or no votes were cast).
    Divergence,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Consensus => "consensus",
            Outcome::Divergence => "divergence",
        }
    }
}

/// Result of classifying a round's votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    pub outcome: Outcome,
    /// The value to propose to the facilitator. On divergence this is the
    /// highest submitted value, trending toward the cautious estimate.
    pub suggested: Option<u32>,
    /// The next most defensible value to open discussion around.
    pub alternative: Option<u32>,
}

/// Classify the votes of one round.
///
/// - empty input → divergence with no suggestion
/// - all values identical → consensus with that value
/// - otherwise → divergence, suggested = highest value, alternative per
///   [`alternative_value`]
#[must_use]
pub fn classify(vote_values: &[u32]) -> RoundOutcome {
    if vote_values.is_empty() {
        return RoundOutcome {
            outcome: Outcome::Divergence,
            suggested: None,
            alternative: None,
        };
    }

    let first = vote_values[0];
    if vote_values.iter().all(|&v| v == first) {
        return RoundOutcome {
            outcome: Outcome::Consensus,
            suggested: Some(first),
            alternative: None,
        };
    }

    // vote_values is non-empty here, so max() always yields a value
    let highest = vote_values.iter().copied().max().unwrap_or(first);
    RoundOutcome {
        outcome: Outcome::Divergence,
        suggested: Some(highest),
        alternative: alternative_value(vote_values, highest),
    }
}

/// Most frequent value in the submissions; ties broken by first occurrence
/// in input order. `None` for empty input.
#[must_use]
pub fn majority_value(vote_values: &[u32]) -> Option<u32> {
    let mut best: Option<(u32, usize)> = None;
    for &candidate in vote_values {
        let count = vote_values.iter().filter(|&&v| v == candidate).count();
        match best {
            Some((winner, winner_count))
                if winner_count >= count || winner == candidate => {}
            _ => best = Some((candidate, count)),
        }
    }
    best.map(|(v, _)| v)
}

/// Alternative value to surface next to the highest submission:
///
/// 1. the most frequent value, when it differs from the highest and was
///    submitted more than once;
/// 2. else the second-highest distinct value;
/// 3. else `None` (a single vote has no alternative).
#[must_use]
pub fn alternative_value(vote_values: &[u32], highest: u32) -> Option<u32> {
    if vote_values.len() <= 1 {
        return None;
    }

    if let Some(majority) = majority_value(vote_values) {
        let count = vote_values.iter().filter(|&&v| v == majority).count();
        if majority != highest && count > 1 {
            return Some(majority);
        }
    }

    let mut distinct: Vec<u32> = vote_values.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();
    if distinct.len() >= 2 {
        return Some(distinct[1]);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_votes() {
        let result = classify(&[]);
        assert_eq!(result.outcome, Outcome::Divergence);
        assert_eq!(result.suggested, None);
        assert_eq!(result.alternative, None);
    }

    #[test]
    fn test_perfect_consensus() {
        let result = classify(&[5, 5, 5]);
        assert_eq!(result.outcome, Outcome::Consensus);
        assert_eq!(result.suggested, Some(5));
        assert_eq!(result.alternative, None);
    }

    #[test]
    fn test_single_vote_is_consensus() {
        let result = classify(&[13]);
        assert_eq!(result.outcome, Outcome::Consensus);
        assert_eq!(result.suggested, Some(13));
    }

    #[test]
    fn test_divergence_second_highest() {
        // all distinct: no repeated majority, fall through to second-highest
        let result = classify(&[5, 8, 13]);
        assert_eq!(result.outcome, Outcome::Divergence);
        assert_eq!(result.suggested, Some(13));
        assert_eq!(result.alternative, Some(8));
    }

    #[test]
    fn test_divergence_majority_alternative() {
        // 3 occurs twice and is not the highest value
        let result = classify(&[3, 3, 8]);
        assert_eq!(result.outcome, Outcome::Divergence);
        assert_eq!(result.suggested, Some(8));
        assert_eq!(result.alternative, Some(3));
    }

    #[test]
    fn test_divergence_majority_is_highest() {
        // 8 is both most frequent and highest; alternative falls back to
        // the second-highest distinct value
        let result = classify(&[8, 8, 5]);
        assert_eq!(result.outcome, Outcome::Divergence);
        assert_eq!(result.suggested, Some(8));
        assert_eq!(result.alternative, Some(5));
    }

    #[test]
    fn test_two_votes_divergent() {
        let result = classify(&[2, 13]);
        assert_eq!(result.outcome, Outcome::Divergence);
        assert_eq!(result.suggested, Some(13));
        assert_eq!(result.alternative, Some(2));
    }

    #[test]
    fn test_majority_tie_prefers_first_encountered() {
        // 5 and 8 both occur twice; first encountered wins
        assert_eq!(majority_value(&[5, 8, 5, 8]), Some(5));
        assert_eq!(majority_value(&[8, 5, 8, 5]), Some(8));
    }

    #[test]
    fn test_zero_votes_allowed_on_scale() {
        assert!(is_valid_points(0));
        assert!(is_valid_points(89));
        assert!(!is_valid_points(4));
        assert!(!is_valid_points(100));
    }

    #[test]
    fn test_classification_totality() {
        // every non-empty input yields exactly consensus or divergence,
        // and all-equal input is always consensus
        for votes in [
            vec![1],
            vec![0, 0],
            vec![1, 2, 3, 5, 8, 13, 21, 34, 55, 89],
            vec![89; 7],
            vec![5, 5, 5, 8],
        ] {
            let result = classify(&votes);
            let all_equal = votes.iter().all(|&v| v == votes[0]);
            if all_equal {
                assert_eq!(result.outcome, Outcome::Consensus);
                assert_eq!(result.suggested, Some(votes[0]));
                assert_eq!(result.alternative, None);
            } else {
                assert_eq!(result.outcome, Outcome::Divergence);
                assert_eq!(result.suggested, votes.iter().copied().max());
            }
        }
    }
}
