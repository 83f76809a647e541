//! Approximate token matching for card search.
//!
//! # Responsibility
//! - Tokenize queries and card fields into comparable term sets.
//! - Score query terms against card tokens with a substring-aware
//!   similarity measure.
//! - Decide relevance from term coverage.
//!
//! # Invariants
//! - Pure functions only; no I/O, no errors.
//! - A query term is satisfied by the first card token scoring at or above
//!   [`MIN_TOKEN_SCORE`]; there is no best-of-all-tokens pass.
//! - Coverage uses integer-floor percentage, so exactly half the terms
//!   matching counts as relevant.

use crate::model::card::Card;
use std::collections::BTreeSet;

/// Minimum 0-100 similarity for one query term to match one card token.
/// Tuning constant, adjustable with [`MIN_TERM_COVERAGE_PCT`].
pub const MIN_TOKEN_SCORE: u32 = 80;

/// Minimum percentage of query terms that must match.
pub const MIN_TERM_COVERAGE_PCT: usize = 50;

/// Splits text into the set of lowercase whitespace-delimited terms.
/// Duplicates collapse.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|term| term.to_lowercase())
        .collect()
}

/// Tokens of the fixed concatenation of a card's comparable fields:
/// id, title, desc, and tags.
pub fn card_tokens(card: &Card) -> BTreeSet<String> {
    let mut tokens = tokenize(&format!("{} {} {}", card.id, card.title, card.desc));
    for tag in &card.tags {
        tokens.extend(tokenize(tag));
    }
    tokens
}

/// Substring-aware similarity between two terms on a 0-100 scale.
///
/// The shorter term is compared against every equal-length character window
/// of the longer one and the best normalized Levenshtein similarity wins,
/// so a term matching as a substring of a longer token scores 100.
pub fn partial_similarity(a: &str, b: &str) -> u32 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if short_len == long_chars.len() {
        return to_scale(strsim::normalized_levenshtein(short, long));
    }

    let mut best = 0.0_f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let score = strsim::normalized_levenshtein(short, &candidate);
        if score > best {
            best = score;
        }
        if best >= 1.0 {
            break;
        }
    }
    to_scale(best)
}

/// Returns whether enough query terms find a sufficiently similar card
/// token.
///
/// The caller guarantees a non-empty query term set; an empty card token
/// set never matches.
pub fn is_relevant(query_terms: &BTreeSet<String>, card_tokens: &BTreeSet<String>) -> bool {
    if query_terms.is_empty() {
        return false;
    }

    let matched = query_terms
        .iter()
        .filter(|term| {
            card_tokens
                .iter()
                .any(|token| partial_similarity(term, token) >= MIN_TOKEN_SCORE)
        })
        .count();

    matched * 100 / query_terms.len() >= MIN_TERM_COVERAGE_PCT
}

fn to_scale(normalized: f64) -> u32 {
    // Round, don't truncate: 1 edit in 5 chars is 0.8, which floating point
    // represents just under, and it must still reach a score of 80.
    (normalized * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::{card_tokens, is_relevant, partial_similarity, tokenize};
    use crate::model::card::Card;

    fn sample_card() -> Card {
        Card {
            id: 7,
            title: "category theory notes".to_string(),
            desc: "lecture summaries".to_string(),
            content: "long body text".to_string(),
            tags: vec!["math".to_string()],
            modified: 0,
            modified_by: "UNKNOWN".to_string(),
        }
    }

    #[test]
    fn tokenize_lowercases_and_collapses_duplicates() {
        let terms = tokenize("Cat cat  DOG");
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("cat"));
        assert!(terms.contains("dog"));
    }

    #[test]
    fn substring_term_scores_full_marks() {
        assert_eq!(partial_similarity("cat", "category"), 100);
        assert_eq!(partial_similarity("category", "cat"), 100);
        assert_eq!(partial_similarity("notes", "notes"), 100);
    }

    #[test]
    fn unrelated_terms_score_low() {
        assert!(partial_similarity("zzz", "category") < 80);
        assert_eq!(partial_similarity("", "anything"), 0);
    }

    #[test]
    fn near_match_clears_threshold() {
        // One substitution in a five-char window.
        assert!(partial_similarity("notas", "notes") >= 80);
    }

    #[test]
    fn relevance_requires_half_the_terms() {
        let card = card_tokens(&sample_card());

        assert!(is_relevant(&tokenize("cat"), &card));
        assert!(!is_relevant(&tokenize("zzz"), &card));
        // 1 of 2 terms is exactly 50% and counts.
        assert!(is_relevant(&tokenize("category zzz"), &card));
        // 1 of 3 terms floors to 33%.
        assert!(!is_relevant(&tokenize("category zzz qqq"), &card));
    }

    #[test]
    fn card_id_is_searchable() {
        let card = card_tokens(&sample_card());
        assert!(is_relevant(&tokenize("7"), &card));
    }

    #[test]
    fn empty_card_token_set_never_matches() {
        assert!(!is_relevant(&tokenize("anything"), &Default::default()));
    }
}
