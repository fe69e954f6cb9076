// src/matching/text.rs

use strsim::normalized_levenshtein;

use crate::matching::address::normalize;

/// Edit-distance similarity ratio of two already-normalized strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b).clamp(0.0, 1.0)
}

/// Similarity of two free-text fields (titles), no bonuses.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    ratio(&normalize(a), &normalize(b))
}
