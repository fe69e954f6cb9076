// tests/properties.rs

use auction_dedupe_lib::{
    audit::QualityAuditor,
    config::{AuditConfig, MatchingConfig},
    matching::{address_similarity, normalize, value_similarity, DuplicateDetector},
    models::{Amount, AuctionDate, Listing, SourceId},
    validation::{validate_dates, validate_values},
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

const STATES: [&str; 6] = ["SP", "RJ", "MG", "XX", "", "rs"];
const CITIES: [&str; 4] = ["Campinas", "Santos", "Porto Alegre", "Curitiba"];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn arb_listing() -> impl Strategy<Value = Listing> {
    (
        "[a-z0-9]{8}",
        0..STATES.len(),
        0..CITIES.len(),
        proptest::option::of(0.0f64..2_000_000.0),
        proptest::option::of(0.0f64..2_000_000.0),
        proptest::option::of(-40i64..400),
    )
        .prop_map(|(id, state, city, first, second, offset)| {
            let mut listing = Listing::new(id);
            listing.state = Some(STATES[state].to_string());
            listing.city = Some(CITIES[city].to_string());
            listing.first_auction_value = first.map(Amount::Value);
            listing.second_auction_value = second.map(Amount::Value);
            listing.first_auction_date =
                offset.map(|days| AuctionDate::Date(today() + Duration::days(days)));
            listing
        })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(text in "[A-Za-zÀ-ÿ0-9 .,/º-]{0,40}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_is_idempotent_on_abbreviation_fragments(
        text in "(n|no|num|numero|s|r|av|ap|[0-9]|º|°|ª| |\\.|/|-){0,24}"
    ) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn address_is_fully_similar_to_itself(address in "[A-Za-z][A-Za-z0-9 ,.]{0,30}") {
        prop_assert_eq!(address_similarity(&address, &address), 1.0);
    }

    #[test]
    fn value_is_fully_similar_to_itself(value in 0.01f64..1e9) {
        prop_assert_eq!(value_similarity(Some(value), Some(value)), 1.0);
    }

    #[test]
    fn validated_values_are_ordered(
        first in -1_000_000.0f64..5_000_000.0,
        second in -1_000_000.0f64..5_000_000.0,
        appraisal in proptest::option::of(1.0f64..5_000_000.0),
    ) {
        let mut listing = Listing::new("p");
        listing.evaluation_value = appraisal.map(Amount::Value);
        listing.first_auction_value = Some(Amount::Value(first));
        listing.second_auction_value = Some(Amount::Value(second));

        let outcome = validate_values(listing, &AuditConfig::default());
        let first = outcome.listing.first_auction_value.as_ref().and_then(Amount::parsed);
        let second = outcome.listing.second_auction_value.as_ref().and_then(Amount::parsed);
        prop_assert!(second.unwrap() <= first.unwrap());
    }

    #[test]
    fn validated_dates_are_ordered(d1 in -60i64..500, d2 in -60i64..500) {
        let mut listing = Listing::new("p");
        listing.first_auction_date = Some(AuctionDate::Date(today() + Duration::days(d1)));
        listing.second_auction_date =
            Some(AuctionDate::Text((today() + Duration::days(d2)).format("%d/%m/%Y").to_string()));

        let outcome = validate_dates(listing, &AuditConfig::default(), today());
        let first = outcome.listing.first_auction_date.as_ref().and_then(AuctionDate::parsed);
        let second = outcome.listing.second_auction_date.as_ref().and_then(AuctionDate::parsed);
        prop_assert!(first.unwrap() <= second.unwrap());
    }

    #[test]
    fn different_buckets_always_score_zero(
        a in arb_listing(),
        b in arb_listing(),
    ) {
        let mut b = b;
        b.city = Some(format!("{} do Norte", a.city.as_deref().unwrap_or("Cidade")));
        b.source_id = Some(SourceId("other".to_string()));
        let detector = DuplicateDetector::new(MatchingConfig::default()).unwrap();
        prop_assert_eq!(detector.score_pair(&a, &b).score, 0.0);
    }

    #[test]
    fn batch_partition_is_complete_and_order_independent(
        (listings, shuffled) in proptest::collection::vec(arb_listing(), 0..20)
            .prop_flat_map(|listings| {
                let shuffled = Just(listings.clone()).prop_shuffle();
                (Just(listings), shuffled)
            })
    ) {
        let auditor = QualityAuditor::new(AuditConfig::default()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let total = listings.len();

        let forward = auditor.audit_batch_at(listings, now);
        let other = auditor.audit_batch_at(shuffled, now);

        prop_assert_eq!(forward.passed.len() + forward.failed.len(), total);
        prop_assert_eq!(forward.stats, other.stats);

        let mut forward_passed: Vec<String> = forward.passed.iter().map(|l| format!("{:?}", l)).collect();
        let mut other_passed: Vec<String> = other.passed.iter().map(|l| format!("{:?}", l)).collect();
        forward_passed.sort();
        other_passed.sort();
        prop_assert_eq!(forward_passed, other_passed);

        let failed: HashSet<String> = forward.failed.iter().map(|r| format!("{:?}", r.original)).collect();
        let other_failed: HashSet<String> = other.failed.iter().map(|r| format!("{:?}", r.original)).collect();
        prop_assert_eq!(failed, other_failed);
    }
}
