//! Classifier post-processing: softmax and top-K candidate selection.

use crate::types::Candidate;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Entry for min-heap based top-K selection
struct ScoreEntry {
    index: usize,
    score: f32,
}

impl PartialEq for ScoreEntry {
    fn eq(&self, other: &Self) -> bool {
        // Use total ordering for consistent behavior with NaN values.
        self.score.total_cmp(&other.score) == Ordering::Equal
    }
}

impl Eq for ScoreEntry {}

impl PartialOrd for ScoreEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoreEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (smallest at top, gets popped first)
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
    }
}

/// Numerically stable softmax over raw logits.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.iter().map(|&e| e / sum).collect()
}

/// Select the top-K classes from raw logits as ranked candidates.
///
/// Softmax runs over the full logit vector so probabilities form a
/// distribution, then a bounded min-heap keeps selection at O(n log k).
/// Candidates come back sorted by descending probability.
#[must_use]
pub fn top_k_candidates(logits: &[f32], labels: &[String], top_k: usize) -> Vec<Candidate> {
    if logits.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let probabilities = softmax(logits);
    let k = top_k.min(probabilities.len());

    let mut heap: BinaryHeap<ScoreEntry> = BinaryHeap::with_capacity(k + 1);
    for (index, &score) in probabilities.iter().enumerate() {
        heap.push(ScoreEntry { index, score });
        if heap.len() > k {
            heap.pop(); // Remove smallest
        }
    }

    let mut candidates: Vec<Candidate> = heap
        .into_iter()
        .map(|entry| Candidate {
            label: labels
                .get(entry.index)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", entry.index)),
            probability: entry.score,
            index: entry.index,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });

    candidates
}
