// src/matching/value.rs

use crate::config::NEUTRAL_SIMILARITY;

// (max relative difference, similarity), checked in order
const VALUE_STEPS: [(f64, f64); 4] = [(0.10, 1.0), (0.20, 0.8), (0.30, 0.6), (0.50, 0.4)];
const VALUE_FLOOR: f64 = 0.2;

/// Coarse similarity of two monetary values (or areas).
///
/// Missing or non-positive values are neutral (0.5). Otherwise the relative
/// difference `|v1 - v2| / max(v1, v2)` is mapped through a fixed step table.
pub fn value_similarity(v1: Option<f64>, v2: Option<f64>) -> f64 {
    let (v1, v2) = match (v1, v2) {
        (Some(a), Some(b)) if a > 0.0 && b > 0.0 && a.is_finite() && b.is_finite() => (a, b),
        _ => return NEUTRAL_SIMILARITY,
    };

    let diff = (v1 - v2).abs() / v1.max(v2);
    VALUE_STEPS
        .iter()
        .find(|(max_diff, _)| diff <= *max_diff)
        .map_or(VALUE_FLOOR, |(_, similarity)| *similarity)
}
