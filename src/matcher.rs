//! Resolve ranked classifier labels to knowledge-base entries.
//!
//! Direct normalized-key lookup first, then heuristic substring scoring
//! across every entry. The weights are a tuning surface, not a principled
//! model; changing them changes which borderline photos match.

use crate::knowledge::{normalize_label, KnowledgeBase};
use crate::types::{Candidate, PlantRecord};
use tracing::debug;

/// Candidates whose normalized label contains any of these terms are not
/// plants and are skipped by fuzzy scoring.
const NON_PLANT_TERMS: &[&str] = &["pot", "container", "soil", "vase", "basket"];

/// Generic plant-related terms that earn a small score bonus when a token
/// matches nothing in an entry.
const PLANT_TERMS: &[&str] = &[
    "plant",
    "leaf",
    "flower",
    "tree",
    "herb",
    "vegetable",
    "fruit",
];

/// Weight for a token found in an entry's common name.
const COMMON_NAME_WEIGHT: f32 = 3.0;

/// Weight for a token found in common name + scientific name.
const SEARCH_TEXT_WEIGHT: f32 = 1.5;

/// Bonus for a token that merely contains a generic plant term.
const GENERIC_TERM_BONUS: f32 = 0.5;

/// Resolve a ranked candidate list to a knowledge-base entry.
///
/// Direct match runs first: candidates are tried in rank order and the
/// first whose normalized label is an exact key wins outright, so a direct
/// hit never falls through to fuzzy scoring. Only when no candidate has a
/// direct key does fuzzy scoring run, tracking the single highest-scoring
/// entry across all candidates and entries; the best entry is accepted only
/// if its score strictly exceeds `score_floor`.
///
/// Given identical inputs the result is deterministic: ties keep the
/// earliest-inserted entry.
#[must_use]
pub fn resolve<'kb>(
    candidates: &[Candidate],
    knowledge: &'kb KnowledgeBase,
    score_floor: f32,
    min_token_len: usize,
) -> Option<&'kb PlantRecord> {
    for candidate in candidates {
        let key = normalize_label(&candidate.label);
        if let Some(entry) = knowledge.lookup(&key) {
            debug!(label = %candidate.label, key = %key, "direct match");
            return Some(entry);
        }
    }

    let mut best_score = 0.0f32;
    let mut best: Option<&PlantRecord> = None;

    for candidate in candidates {
        let label = normalize_label(&candidate.label);

        if NON_PLANT_TERMS.iter().any(|term| label.contains(term)) {
            debug!(label = %label, "skipping non-plant candidate");
            continue;
        }

        let tokens: Vec<&str> = label
            .split(' ')
            .filter(|token| token.len() > min_token_len)
            .collect();

        for (_, entry) in knowledge.entries() {
            let score = score_entry(&tokens, candidate.probability, entry);
            if score > best_score && score > score_floor {
                best_score = score;
                best = Some(entry);
            }
        }
    }

    if best.is_some() {
        debug!(score = best_score, "fuzzy match");
    }
    best
}

/// Accumulate the fuzzy score of one candidate's tokens against one entry.
fn score_entry(tokens: &[&str], probability: f32, entry: &PlantRecord) -> f32 {
    let common_name = entry.common_name.to_lowercase();
    let search_text = format!("{} {}", entry.common_name, entry.scientific_name).to_lowercase();

    let mut score = 0.0f32;
    for token in tokens {
        #[allow(clippy::cast_precision_loss)]
        let token_len = token.len() as f32;

        if common_name.contains(token) {
            score += token_len * probability * COMMON_NAME_WEIGHT;
        } else if search_text.contains(token) {
            score += token_len * probability * SEARCH_TEXT_WEIGHT;
        } else if PLANT_TERMS.iter().any(|term| token.contains(term)) {
            score += probability * GENERIC_TERM_BONUS;
        }
    }
    score
}
