// src/matching/survivor.rs

use log::{debug, info, warn};
use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Instant;

use crate::config::{read_env, SURVIVOR_STRATEGY_ENV};
use crate::errors::ConfigError;
use crate::models::{Amount, AuctionDate, CanonicalAssignment, DuplicatePair, Listing, ListingId};
use crate::results::SurvivorStats;

// Completeness weights
const LONG_TITLE_CHARS: usize = 20;
const LONG_DESCRIPTION_CHARS: usize = 100;
const TITLE_POINTS: f64 = 1.0;
const DESCRIPTION_POINTS: f64 = 2.0;
const ADDRESS_POINTS: f64 = 2.0;
const NEIGHBORHOOD_POINTS: f64 = 1.0;
const APPRAISAL_POINTS: f64 = 2.0;
const ROUND_VALUE_POINTS: f64 = 1.5;
const ROUND_DATE_POINTS: f64 = 1.0;
const AREA_POINTS: f64 = 1.0;
const IMAGE_POINTS: f64 = 1.0;
const DISCOUNT_POINTS: f64 = 0.5;
const PAYMENT_FLAG_POINTS: f64 = 0.5;
// A second-round price is the freshest price a listing can carry
const SECOND_ROUND_BONUS: f64 = 2.0;

/// How duplicate pairs are turned into canonical assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurvivorStrategy {
    /// Each reported pair is decided on its own. A listing may lose one pair
    /// and win another.
    #[default]
    Pairwise,
    /// Pairs are merged into connected components with one canonical each.
    Clustered,
}

impl FromStr for SurvivorStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pairwise" => Ok(Self::Pairwise),
            "clustered" | "cluster" => Ok(Self::Clustered),
            other => Err(ConfigError::UnknownSurvivorStrategy(other.to_string())),
        }
    }
}

impl SurvivorStrategy {
    pub fn from_env() -> Result<Self, ConfigError> {
        read_env(SURVIVOR_STRATEGY_ENV)
            .map_or(Ok(Self::default()), |value| value.parse())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurvivorOutcome {
    pub assignments: Vec<CanonicalAssignment>,
    pub stats: SurvivorStats,
}

fn has_text(value: &Option<String>, min_chars: usize) -> bool {
    value
        .as_deref()
        .map_or(false, |v| v.trim().chars().count() >= min_chars.max(1))
}

fn has_amount(value: &Option<Amount>) -> bool {
    matches!(value, Some(Amount::Value(v)) if *v > 0.0)
}

fn has_date(value: &Option<AuctionDate>) -> bool {
    matches!(value, Some(AuctionDate::Date(_)))
}

/// Fixed-weight sum over the fields a listing actually carries.
pub fn completeness_score(listing: &Listing) -> f64 {
    let mut score = 0.0;
    if has_text(&listing.title, LONG_TITLE_CHARS) {
        score += TITLE_POINTS;
    }
    if has_text(&listing.description, LONG_DESCRIPTION_CHARS) {
        score += DESCRIPTION_POINTS;
    }
    if has_text(&listing.address, 1) {
        score += ADDRESS_POINTS;
    }
    if has_text(&listing.neighborhood, 1) {
        score += NEIGHBORHOOD_POINTS;
    }
    if has_amount(&listing.evaluation_value) {
        score += APPRAISAL_POINTS;
    }
    if has_amount(&listing.first_auction_value) {
        score += ROUND_VALUE_POINTS;
    }
    if has_date(&listing.first_auction_date) {
        score += ROUND_DATE_POINTS;
    }
    if has_amount(&listing.second_auction_value) {
        score += ROUND_VALUE_POINTS + SECOND_ROUND_BONUS;
    }
    if has_date(&listing.second_auction_date) {
        score += ROUND_DATE_POINTS;
    }
    if listing.area_total.map_or(false, |a| a > 0.0) {
        score += AREA_POINTS;
    }
    if has_text(&listing.image_url, 1) {
        score += IMAGE_POINTS;
    }
    if listing.discount_percentage.is_some() {
        score += DISCOUNT_POINTS;
    }
    for flag in [
        listing.accepts_financing,
        listing.accepts_fgts,
        listing.accepts_installments,
    ] {
        if flag.is_some() {
            score += PAYMENT_FLAG_POINTS;
        }
    }
    score
}

/// Picks the canonical listing for reported duplicate pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurvivorSelector {
    strategy: SurvivorStrategy,
}

impl SurvivorSelector {
    pub fn new(strategy: SurvivorStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SurvivorStrategy {
        self.strategy
    }

    pub fn select(&self, listings: &[Listing], pairs: &[DuplicatePair]) -> SurvivorOutcome {
        info!(
            "Selecting survivors for {} duplicate pairs ({:?})...",
            pairs.len(),
            self.strategy
        );
        let start_time = Instant::now();

        let positions: HashMap<&ListingId, usize> = listings
            .iter()
            .enumerate()
            .map(|(idx, l)| (&l.id, idx))
            .collect();
        let scores: Vec<f64> = listings.iter().map(completeness_score).collect();

        // Resolve pair ids to pool positions, first-encountered listing first
        let mut resolved = Vec::with_capacity(pairs.len());
        for pair in pairs {
            match (positions.get(&pair.listing_a), positions.get(&pair.listing_b)) {
                (Some(&a), Some(&b)) if a != b => resolved.push((a.min(b), a.max(b))),
                _ => warn!(
                    "Pair ({}, {}) references listings outside the pool, skipping",
                    pair.listing_a, pair.listing_b
                ),
            }
        }

        let mut outcome = match self.strategy {
            SurvivorStrategy::Pairwise => select_pairwise(listings, &scores, &resolved),
            SurvivorStrategy::Clustered => select_clustered(listings, &scores, &resolved),
        };
        outcome.stats.pairs_considered = resolved.len();
        outcome.stats.duplicates_marked = outcome
            .assignments
            .iter()
            .map(|a| &a.duplicate_id)
            .collect::<HashSet<_>>()
            .len();

        info!(
            "Survivor selection complete: {} duplicates marked, {} unresolved in {:.2?}",
            outcome.stats.duplicates_marked,
            outcome.stats.unresolved,
            start_time.elapsed()
        );
        outcome
    }

    /// Flags duplicates and sets their canonical reference. A listing that
    /// already points at a canonical keeps its first reference. Returns the
    /// number of listings changed.
    pub fn apply(listings: &mut [Listing], assignments: &[CanonicalAssignment]) -> usize {
        let positions: HashMap<ListingId, usize> = listings
            .iter()
            .enumerate()
            .map(|(idx, l)| (l.id.clone(), idx))
            .collect();

        let mut changed = 0;
        for assignment in assignments {
            let Some(&idx) = positions.get(&assignment.duplicate_id) else {
                warn!("Assignment for unknown listing {}", assignment.duplicate_id);
                continue;
            };
            let listing = &mut listings[idx];
            if listing.canonical_id.is_some() {
                debug!(
                    "Listing {} already points at a canonical record, keeping it",
                    listing.id
                );
                continue;
            }
            listing.is_duplicate = true;
            listing.canonical_id = Some(assignment.canonical_id.clone());
            changed += 1;
        }
        changed
    }
}

fn assignment(listings: &[Listing], scores: &[f64], duplicate: usize, canonical: usize) -> CanonicalAssignment {
    CanonicalAssignment {
        duplicate_id: listings[duplicate].id.clone(),
        canonical_id: listings[canonical].id.clone(),
        duplicate_score: scores[duplicate],
        canonical_score: scores[canonical],
    }
}

fn select_pairwise(listings: &[Listing], scores: &[f64], pairs: &[(usize, usize)]) -> SurvivorOutcome {
    let mut outcome = SurvivorOutcome::default();

    for &(first, second) in pairs {
        let winner = match (listings[first].is_promotable(), listings[second].is_promotable()) {
            (false, false) => {
                warn!(
                    "Neither {} nor {} can be canonical (missing source or location)",
                    listings[first].id, listings[second].id
                );
                outcome.stats.unresolved += 1;
                continue;
            }
            (true, false) => first,
            (false, true) => second,
            // Ties favor the listing encountered first
            (true, true) => {
                if scores[second] > scores[first] {
                    second
                } else {
                    first
                }
            }
        };
        let loser = if winner == first { second } else { first };
        outcome
            .assignments
            .push(assignment(listings, scores, loser, winner));
    }
    outcome
}

fn select_clustered(listings: &[Listing], scores: &[f64], pairs: &[(usize, usize)]) -> SurvivorOutcome {
    let mut outcome = SurvivorOutcome::default();

    let mut graph: UnGraph<usize, ()> = Graph::new_undirected();
    let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
    for &(a, b) in pairs {
        let na = *nodes.entry(a).or_insert_with(|| graph.add_node(a));
        let nb = *nodes.entry(b).or_insert_with(|| graph.add_node(b));
        if !graph.contains_edge(na, nb) {
            graph.add_edge(na, nb, ());
        }
    }
    debug!(
        "Built duplicate graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let mut components: Vec<Vec<usize>> = kosaraju_scc(&graph)
        .into_iter()
        .map(|component| {
            let mut members: Vec<usize> = component.into_iter().map(|n| graph[n]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    components.sort_by_key(|members| members[0]);

    for members in components {
        // Highest completeness wins, earliest pool position breaks ties
        let canonical = members
            .iter()
            .copied()
            .filter(|&idx| listings[idx].is_promotable())
            .fold(None, |best: Option<usize>, idx| match best {
                Some(b) if scores[b] >= scores[idx] => Some(b),
                _ => Some(idx),
            });

        let Some(canonical) = canonical else {
            warn!(
                "Cluster of {} listings has no promotable record, leaving it unresolved",
                members.len()
            );
            outcome.stats.unresolved += 1;
            continue;
        };

        for idx in members.into_iter().filter(|&idx| idx != canonical) {
            outcome
                .assignments
                .push(assignment(listings, scores, idx, canonical));
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DuplicatePairId, ScoreBreakdown, SourceId};

    fn listing(id: &str, source: &str) -> Listing {
        let mut l = Listing::new(id);
        l.source_id = Some(SourceId(source.to_string()));
        l.city = Some("Campinas".to_string());
        l.state = Some("SP".to_string());
        l.address = Some("Rua das Flores, 123".to_string());
        l
    }

    fn pair(a: &str, b: &str) -> DuplicatePair {
        DuplicatePair {
            id: DuplicatePairId::new(),
            listing_a: ListingId(a.to_string()),
            listing_b: ListingId(b.to_string()),
            score: 0.9,
            breakdown: ScoreBreakdown::default(),
            reasons: Vec::new(),
        }
    }

    #[test]
    fn second_round_value_carries_a_bonus() {
        let mut with_second = listing("a", "s1");
        with_second.second_auction_value = Some(Amount::Value(100.0));
        let mut with_first = listing("b", "s2");
        with_first.first_auction_value = Some(Amount::Value(100.0));
        assert!(completeness_score(&with_second) > completeness_score(&with_first));
    }

    #[test]
    fn short_text_does_not_count() {
        let mut l = listing("a", "s1");
        let base = completeness_score(&l);
        l.title = Some("Casa".to_string());
        assert_eq!(completeness_score(&l), base);
        l.title = Some("Casa térrea com 3 dormitórios".to_string());
        assert_eq!(completeness_score(&l), base + TITLE_POINTS);
    }

    #[test]
    fn pairwise_marks_less_complete_listing() {
        let a = listing("a", "s1");
        let mut b = listing("b", "s2");
        b.image_url = Some("https://img/1.jpg".to_string());
        let listings = vec![a, b];

        let outcome = SurvivorSelector::new(SurvivorStrategy::Pairwise)
            .select(&listings, &[pair("a", "b")]);
        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].duplicate_id.0, "a");
        assert_eq!(outcome.assignments[0].canonical_id.0, "b");
    }

    #[test]
    fn pairwise_tie_keeps_first_encountered() {
        let listings = vec![listing("a", "s1"), listing("b", "s2")];
        let outcome = SurvivorSelector::default().select(&listings, &[pair("b", "a")]);
        assert_eq!(outcome.assignments[0].canonical_id.0, "a");
        assert_eq!(outcome.assignments[0].duplicate_id.0, "b");
    }

    #[test]
    fn unpromotable_listing_never_wins() {
        let mut a = listing("a", "s1");
        a.source_id = None;
        a.image_url = Some("https://img/1.jpg".to_string());
        a.description = Some("x".repeat(200));
        let b = listing("b", "s2");
        let listings = vec![a, b];

        let outcome = SurvivorSelector::default().select(&listings, &[pair("a", "b")]);
        assert_eq!(outcome.assignments[0].canonical_id.0, "b");

        let mut orphan = listings.clone();
        orphan[1].city = None;
        let outcome = SurvivorSelector::default().select(&orphan, &[pair("a", "b")]);
        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.stats.unresolved, 1);
    }

    #[test]
    fn pairwise_can_leave_inconsistent_chains() {
        // a < b < c in completeness; pairs a~b and b~c only
        let a = listing("a", "s1");
        let mut b = listing("b", "s2");
        b.image_url = Some("https://img/b.jpg".to_string());
        let mut c = listing("c", "s3");
        c.image_url = Some("https://img/c.jpg".to_string());
        c.neighborhood = Some("Centro".to_string());
        let listings = vec![a, b, c];

        let pairs = [pair("a", "b"), pair("b", "c")];
        let outcome = SurvivorSelector::default().select(&listings, &pairs);
        assert_eq!(outcome.assignments.len(), 2);
        assert_eq!(outcome.assignments[0].canonical_id.0, "b");
        assert_eq!(outcome.assignments[1].duplicate_id.0, "b");
        assert_eq!(outcome.assignments[1].canonical_id.0, "c");
    }

    #[test]
    fn clustered_picks_one_canonical_per_component() {
        let a = listing("a", "s1");
        let mut b = listing("b", "s2");
        b.image_url = Some("https://img/b.jpg".to_string());
        let mut c = listing("c", "s3");
        c.image_url = Some("https://img/c.jpg".to_string());
        c.neighborhood = Some("Centro".to_string());
        let d = listing("d", "s4");
        let e = listing("e", "s5");
        let listings = vec![a, b, c, d, e];

        let pairs = [pair("a", "b"), pair("b", "c"), pair("d", "e")];
        let outcome = SurvivorSelector::new(SurvivorStrategy::Clustered).select(&listings, &pairs);

        let canonical_of = |id: &str| {
            outcome
                .assignments
                .iter()
                .find(|a| a.duplicate_id.0 == id)
                .map(|a| a.canonical_id.0.clone())
        };
        assert_eq!(canonical_of("a").as_deref(), Some("c"));
        assert_eq!(canonical_of("b").as_deref(), Some("c"));
        assert_eq!(canonical_of("c"), None);
        assert_eq!(canonical_of("e").as_deref(), Some("d"));
        assert_eq!(outcome.stats.duplicates_marked, 3);
    }

    #[test]
    fn apply_sets_flags_and_keeps_first_reference() {
        let mut listings = vec![listing("a", "s1"), listing("b", "s2"), listing("c", "s3")];
        let assignments = vec![
            CanonicalAssignment {
                duplicate_id: ListingId("a".to_string()),
                canonical_id: ListingId("b".to_string()),
                duplicate_score: 1.0,
                canonical_score: 2.0,
            },
            CanonicalAssignment {
                duplicate_id: ListingId("a".to_string()),
                canonical_id: ListingId("c".to_string()),
                duplicate_score: 1.0,
                canonical_score: 3.0,
            },
        ];
        let changed = SurvivorSelector::apply(&mut listings, &assignments);
        assert_eq!(changed, 1);
        assert!(listings[0].is_duplicate);
        assert_eq!(listings[0].canonical_id.as_ref().map(|id| id.0.as_str()), Some("b"));
        assert!(!listings[1].is_duplicate);
    }

    #[test]
    fn strategy_parses_from_text() {
        assert_eq!("Clustered".parse::<SurvivorStrategy>(), Ok(SurvivorStrategy::Clustered));
        assert_eq!(" pairwise ".parse::<SurvivorStrategy>(), Ok(SurvivorStrategy::Pairwise));
        assert!("transitive".parse::<SurvivorStrategy>().is_err());
    }
}
