//! Token-set-ratio fuzzy scoring (spec §4.D tier 3), the Rust-native equivalent of the
//! reference implementation's `rapidfuzz`/`fuzzywuzzy` token-set ratio.

use std::collections::BTreeSet;

/// Scores `candidate` against `query` on a 0..=100 scale. Both strings are expected to
/// already be ASCII-folded and lowercased (the tries only ever key on the fold).
///
/// Token-set ratio tokenises both strings, takes the intersection and the two
/// symmetric differences, and scores the best of three comparisons (intersection vs. full
/// sorted sets) via normalised Levenshtein similarity - this is robust to reordered or
/// partially-overlapping tokens ("san jose costa rica" vs "san jose") in a way plain edit
/// distance is not.
pub fn token_set_ratio(query: &str, candidate: &str) -> u8 {
    let query_tokens: BTreeSet<&str> = query.split_whitespace().collect();
    let candidate_tokens: BTreeSet<&str> = candidate.split_whitespace().collect();

    if query_tokens.is_empty() || candidate_tokens.is_empty() {
        return 0;
    }

    let intersection: BTreeSet<&str> =
        query_tokens.intersection(&candidate_tokens).copied().collect();

    let sorted_join = |tokens: &BTreeSet<&str>| -> String {
        let mut v: Vec<&str> = tokens.iter().copied().collect();
        v.sort_unstable();
        v.join(" ")
    };

    let intersection_str = sorted_join(&intersection);
    let query_str = sorted_join(&query_tokens);
    let candidate_str = sorted_join(&candidate_tokens);

    let scores = [
        ratio(&intersection_str, &query_str),
        ratio(&intersection_str, &candidate_str),
        ratio(&query_str, &candidate_str),
    ];

    scores.into_iter().max().unwrap_or(0)
}

fn ratio(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(token_set_ratio("new york", "new york"), 100);
    }

    #[test]
    fn reordered_tokens_score_highly() {
        let score = token_set_ratio("york new", "new york");
        assert!(score >= 90, "expected high score for reordered tokens, got {score}");
    }

    #[test]
    fn superset_of_tokens_still_scores_well() {
        let score = token_set_ratio("san jose", "san jose costa rica");
        assert!(score >= 60, "expected decent score for a token superset, got {score}");
    }

    #[test]
    fn unrelated_strings_score_low() {
        let score = token_set_ratio("tokyo", "reykjavik");
        assert!(score < 50, "expected a low score for unrelated strings, got {score}");
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(token_set_ratio("", "anything"), 0);
        assert_eq!(token_set_ratio("anything", ""), 0);
    }
}
