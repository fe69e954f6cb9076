// src/matching/classifier.rs

use log::{debug, info};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{
    MatchingConfig, ADDRESS_REASON_THRESHOLD, AREA_REASON_THRESHOLD, NEUTRAL_SIMILARITY,
    TITLE_REASON_THRESHOLD, VALUE_REASON_THRESHOLD,
};
use crate::errors::ConfigError;
use crate::matching::address::{address_similarity, normalize};
use crate::matching::text::text_similarity;
use crate::matching::value::value_similarity;
use crate::models::{DuplicatePair, DuplicatePairId, Listing, MatchReason, ScoreBreakdown};
use crate::results::DedupStats;

/// Comparisons only ever happen between listings sharing this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub city: String,
    pub state: String,
}

/// Bucket of a listing, or `None` when city or state is missing.
pub fn bucket_key(listing: &Listing) -> Option<BucketKey> {
    let city = listing.city.as_deref().map(normalize).filter(|c| !c.is_empty())?;
    let state = listing
        .state
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())?;
    Some(BucketKey { city, state })
}

/// Overall score of a compared pair with its per-signal similarities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub pairs: Vec<DuplicatePair>,
    /// Pairs inside the optional review band. Never treated as duplicates.
    pub review_candidates: Vec<DuplicatePair>,
    pub stats: DedupStats,
}

// Scored pair inside one bucket, by pool position
struct Candidate {
    a: usize,
    b: usize,
    score: PairScore,
}

#[derive(Default)]
struct BucketOutcome {
    candidates: Vec<Candidate>,
    comparisons: usize,
    same_source_skipped: usize,
}

/// Finds listings from different sources that describe the same property.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    config: MatchingConfig,
}

impl DuplicateDetector {
    pub fn new(config: MatchingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Scores a pair. Listings in different (city, state) buckets, or without
    /// a bucket, always score 0.
    pub fn score_pair(&self, a: &Listing, b: &Listing) -> PairScore {
        match (bucket_key(a), bucket_key(b)) {
            (Some(ka), Some(kb)) if ka == kb => self.score_within_bucket(a, b),
            _ => PairScore::default(),
        }
    }

    fn score_within_bucket(&self, a: &Listing, b: &Listing) -> PairScore {
        let breakdown = signals(a, b);
        let weights = &self.config.weights;
        let weighted = weights.address * breakdown.address
            + weights.title * breakdown.title
            + weights.category * breakdown.category
            + weights.value * breakdown.value
            + weights.area * breakdown.area;
        PairScore {
            score: weighted / weights.total(),
            breakdown,
        }
    }

    /// Runs the full pairwise comparison over the active pool.
    pub fn find_duplicates(&self, listings: &[Listing]) -> DedupResult {
        info!(
            "Starting duplicate detection over {} listings (threshold {:.2}{})...",
            listings.len(),
            self.config.similarity_threshold,
            self.config
                .review_threshold
                .map(|r| format!(", review band from {:.2}", r))
                .unwrap_or_default()
        );
        let start_time = Instant::now();

        let mut stats = DedupStats {
            total_listings: listings.len(),
            ..DedupStats::default()
        };

        let mut buckets: BTreeMap<BucketKey, Vec<usize>> = BTreeMap::new();
        for (idx, listing) in listings.iter().enumerate() {
            if !listing.is_active {
                stats.inactive_skipped += 1;
                continue;
            }
            match bucket_key(listing) {
                Some(key) => buckets.entry(key).or_default().push(idx),
                None => {
                    debug!("Listing {} has no city/state, not compared", listing.id);
                    stats.missing_location_skipped += 1;
                }
            }
        }
        stats.buckets = buckets.len();
        debug!("Partitioned pool into {} (city, state) buckets", buckets.len());

        let outcomes: Vec<BucketOutcome> = buckets
            .par_iter()
            .map(|(key, indices)| self.compare_bucket(key, listings, indices))
            .collect();

        let mut candidates = Vec::new();
        for outcome in outcomes {
            stats.comparisons += outcome.comparisons;
            stats.same_source_skipped += outcome.same_source_skipped;
            candidates.extend(outcome.candidates);
        }
        candidates.sort_by_key(|c| (c.a, c.b));

        let mut pairs = Vec::new();
        let mut review_candidates = Vec::new();
        for candidate in candidates {
            let score = candidate.score.score;
            if score >= self.config.similarity_threshold {
                pairs.push(build_pair(listings, &candidate));
            } else if self.config.review_threshold.map_or(false, |r| score >= r) {
                review_candidates.push(build_pair(listings, &candidate));
            }
        }

        stats.pairs_found = pairs.len();
        stats.review_candidates = review_candidates.len();
        stats.avg_score = if pairs.is_empty() {
            0.0
        } else {
            pairs.iter().map(|p| p.score).sum::<f64>() / pairs.len() as f64
        };

        info!(
            "Duplicate detection complete: {} comparisons across {} buckets, {} duplicate pairs, {} review candidates in {:.2?}",
            stats.comparisons,
            stats.buckets,
            stats.pairs_found,
            stats.review_candidates,
            start_time.elapsed()
        );

        DedupResult {
            pairs,
            review_candidates,
            stats,
        }
    }

    fn compare_bucket(&self, key: &BucketKey, listings: &[Listing], indices: &[usize]) -> BucketOutcome {
        let mut outcome = BucketOutcome::default();
        let source_keys: Vec<Option<String>> =
            indices.iter().map(|&i| listings[i].source_key()).collect();

        for i in 0..indices.len() {
            for j in (i + 1)..indices.len() {
                // Lots from the same auctioneer are distinct by construction
                if let (Some(s1), Some(s2)) = (&source_keys[i], &source_keys[j]) {
                    if s1 == s2 {
                        outcome.same_source_skipped += 1;
                        continue;
                    }
                }

                let (a, b) = (indices[i], indices[j]);
                let score = self.score_within_bucket(&listings[a], &listings[b]);
                outcome.comparisons += 1;
                outcome.candidates.push(Candidate { a, b, score });
            }
        }

        debug!(
            "Bucket {}/{}: {} listings, {} comparisons",
            key.city,
            key.state,
            indices.len(),
            outcome.comparisons
        );
        outcome
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn signals(a: &Listing, b: &Listing) -> ScoreBreakdown {
    let address = match (non_empty(&a.address), non_empty(&b.address)) {
        (Some(x), Some(y)) => address_similarity(x, y),
        _ => 0.0,
    };
    let title = match (non_empty(&a.title), non_empty(&b.title)) {
        (Some(x), Some(y)) => text_similarity(x, y),
        _ => NEUTRAL_SIMILARITY,
    };
    let category = match (a.category, b.category) {
        (Some(x), Some(y)) if x == y => 1.0,
        _ => 0.0,
    };
    ScoreBreakdown {
        address,
        title,
        category,
        value: value_similarity(a.reference_value(), b.reference_value()),
        area: value_similarity(a.area_total, b.area_total),
    }
}

fn reasons(a: &Listing, breakdown: &ScoreBreakdown) -> Vec<MatchReason> {
    let mut reasons = Vec::new();
    if breakdown.address > ADDRESS_REASON_THRESHOLD {
        reasons.push(MatchReason::Address {
            similarity: breakdown.address,
        });
    }
    if breakdown.title > TITLE_REASON_THRESHOLD {
        reasons.push(MatchReason::Title {
            similarity: breakdown.title,
        });
    }
    if breakdown.category >= 1.0 {
        if let Some(category) = a.category {
            reasons.push(MatchReason::Category { category });
        }
    }
    if breakdown.value >= VALUE_REASON_THRESHOLD {
        reasons.push(MatchReason::Value {
            similarity: breakdown.value,
        });
    }
    if breakdown.area >= AREA_REASON_THRESHOLD {
        reasons.push(MatchReason::Area {
            similarity: breakdown.area,
        });
    }
    reasons
}

fn build_pair(listings: &[Listing], candidate: &Candidate) -> DuplicatePair {
    let a = &listings[candidate.a];
    let b = &listings[candidate.b];
    DuplicatePair {
        id: DuplicatePairId::new(),
        listing_a: a.id.clone(),
        listing_b: b.id.clone(),
        score: candidate.score.score,
        breakdown: candidate.score.breakdown,
        reasons: reasons(a, &candidate.score.breakdown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, PropertyCategory, SourceId};

    fn listing(id: &str, source: &str, city: &str, state: &str, address: &str) -> Listing {
        let mut l = Listing::new(id);
        l.source_id = Some(SourceId(source.to_string()));
        l.city = Some(city.to_string());
        l.state = Some(state.to_string());
        l.address = Some(address.to_string());
        l.category = Some(PropertyCategory::House);
        l.evaluation_value = Some(Amount::Value(200_000.0));
        l
    }

    fn detector() -> DuplicateDetector {
        DuplicateDetector::new(MatchingConfig::default()).unwrap()
    }

    #[test]
    fn bucket_key_normalizes_city_and_state() {
        let a = listing("a", "s1", "São Paulo", " sp ", "Rua A, 1");
        let key = bucket_key(&a).unwrap();
        assert_eq!(key.city, "sao paulo");
        assert_eq!(key.state, "SP");

        let mut b = a.clone();
        b.city = None;
        assert!(bucket_key(&b).is_none());
    }

    #[test]
    fn cross_bucket_pairs_score_zero() {
        let a = listing("a", "s1", "Campinas", "SP", "Rua das Flores, 123");
        let b = listing("b", "s2", "Valinhos", "SP", "Rua das Flores, 123");
        assert_eq!(detector().score_pair(&a, &b).score, 0.0);
    }

    #[test]
    fn missing_title_and_area_are_neutral() {
        let a = listing("a", "s1", "Campinas", "SP", "Rua das Flores, 123");
        let b = listing("b", "s2", "Campinas", "SP", "Rua das Flores, 123");
        let score = detector().score_pair(&a, &b);
        assert_eq!(score.breakdown.title, 0.5);
        assert_eq!(score.breakdown.area, 0.5);
        assert!((score.score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn review_band_collects_near_misses() {
        let config = MatchingConfig {
            review_threshold: Some(0.4),
            ..MatchingConfig::default()
        };
        let detector = DuplicateDetector::new(config).unwrap();
        let a = listing("a", "s1", "Campinas", "SP", "Rua das Flores, 123");
        let mut b = listing("b", "s2", "Campinas", "SP", "Avenida Brasil, 900");
        b.evaluation_value = Some(Amount::Value(190_000.0));

        let score = detector.score_pair(&a, &b).score;
        assert!(score < 0.75 && score >= 0.4, "score was {score}");

        let result = detector.find_duplicates(&[a, b]);
        assert!(result.pairs.is_empty());
        assert_eq!(result.review_candidates.len(), 1);
        assert_eq!(result.stats.review_candidates, 1);
    }

    #[test]
    fn inactive_and_unlocated_listings_are_skipped() {
        let a = listing("a", "s1", "Campinas", "SP", "Rua das Flores, 123");
        let mut b = listing("b", "s2", "Campinas", "SP", "Rua das Flores, 123");
        b.is_active = false;
        let mut c = listing("c", "s3", "Campinas", "SP", "Rua das Flores, 123");
        c.state = None;

        let result = detector().find_duplicates(&[a, b, c]);
        assert!(result.pairs.is_empty());
        assert_eq!(result.stats.inactive_skipped, 1);
        assert_eq!(result.stats.missing_location_skipped, 1);
        assert_eq!(result.stats.comparisons, 0);
    }

    #[test]
    fn reported_pairs_carry_reasons_and_pool_order() {
        let a = listing("a", "s1", "Campinas", "SP", "Rua das Flores, 123");
        let b = listing("b", "s2", "Campinas", "SP", "R. das Flores, 123");
        let result = detector().find_duplicates(&[b.clone(), a.clone()]);
        assert_eq!(result.pairs.len(), 1);
        let pair = &result.pairs[0];
        assert_eq!(pair.listing_a.0, "b");
        assert_eq!(pair.listing_b.0, "a");
        assert!(pair
            .reasons
            .iter()
            .any(|r| matches!(r, MatchReason::Address { .. })));
        assert!(pair
            .reasons
            .contains(&MatchReason::Category { category: PropertyCategory::House }));
        assert!(!pair.reasons.iter().any(|r| matches!(r, MatchReason::Title { .. })));
    }
}
