// src/validation/dates.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::{debug, trace};

use crate::config::AuditConfig;
use crate::errors::{ValidationError, ValidationWarning};
use crate::models::{Amount, AuctionDate, FieldCorrection, Listing, ListingField};
use crate::validation::{FieldReport, ValidationOutcome};

/// Parses a scraped round date using the configured date, then datetime,
/// formats. RFC 3339 timestamps are accepted as well.
pub fn parse_auction_date(raw: &str, config: &AuditConfig) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    config
        .date_formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            config
                .datetime_formats
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

enum Resolved {
    Missing,
    Date(NaiveDate),
    Unparseable(String),
}

fn resolve(value: Option<&AuctionDate>, config: &AuditConfig) -> Resolved {
    match value {
        None => Resolved::Missing,
        Some(AuctionDate::Date(date)) => Resolved::Date(*date),
        Some(AuctionDate::Text(text)) if text.trim().is_empty() => Resolved::Missing,
        Some(AuctionDate::Text(text)) => match parse_auction_date(text, config) {
            Some(date) => {
                trace!("Parsed round date {:?} as {}", text, date);
                Resolved::Date(date)
            }
            None => Resolved::Unparseable(text.clone()),
        },
    }
}

fn amount_text(amount: Option<&Amount>) -> Option<String> {
    amount.map(|a| match a {
        Amount::Value(v) => v.to_string(),
        Amount::Text(t) => t.clone(),
    })
}

/// Parses both round dates, puts them in chronological order and checks they
/// fall inside the accepted window around `today`.
///
/// When the second round precedes the first, both dates are swapped together
/// with their paired values.
pub fn validate_dates(
    mut listing: Listing,
    config: &AuditConfig,
    today: NaiveDate,
) -> ValidationOutcome {
    let mut report = FieldReport::default();

    let mut first = None;
    let mut second = None;
    for (field, slot, target) in [
        (ListingField::FirstAuctionDate, &mut listing.first_auction_date, &mut first),
        (ListingField::SecondAuctionDate, &mut listing.second_auction_date, &mut second),
    ] {
        match resolve(slot.as_ref(), config) {
            Resolved::Missing => *slot = None,
            Resolved::Date(date) => {
                *slot = Some(AuctionDate::Date(date));
                *target = Some(date);
            }
            Resolved::Unparseable(raw) => {
                report
                    .errors
                    .push(ValidationError::UnparseableDate { field, raw });
            }
        }
    }

    if let (Some(d1), Some(d2)) = (first, second) {
        if d2 < d1 {
            debug!(
                "Listing {}: second round {} precedes first round {}, swapping rounds",
                listing.id, d2, d1
            );
            report.corrections.push(FieldCorrection::new(
                ListingField::FirstAuctionDate,
                Some(d1.to_string()),
                Some(d2.to_string()),
            ));
            report.corrections.push(FieldCorrection::new(
                ListingField::SecondAuctionDate,
                Some(d2.to_string()),
                Some(d1.to_string()),
            ));
            std::mem::swap(&mut listing.first_auction_date, &mut listing.second_auction_date);
            std::mem::swap(&mut first, &mut second);

            if listing.first_auction_value.is_some() || listing.second_auction_value.is_some() {
                report.corrections.push(FieldCorrection::new(
                    ListingField::FirstAuctionValue,
                    amount_text(listing.first_auction_value.as_ref()),
                    amount_text(listing.second_auction_value.as_ref()),
                ));
                report.corrections.push(FieldCorrection::new(
                    ListingField::SecondAuctionValue,
                    amount_text(listing.second_auction_value.as_ref()),
                    amount_text(listing.first_auction_value.as_ref()),
                ));
                std::mem::swap(
                    &mut listing.first_auction_value,
                    &mut listing.second_auction_value,
                );
            }
            report.warnings.push(ValidationWarning::DatesSwapped);
        }
    }

    // Windows beyond chrono's range clamp to the calendar bounds
    let earliest = Duration::try_days(config.date_window_past_days)
        .and_then(|window| today.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);
    let latest = Duration::try_days(config.date_window_future_days)
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX);
    for (field, date) in [
        (ListingField::FirstAuctionDate, first),
        (ListingField::SecondAuctionDate, second),
    ] {
        let Some(date) = date else { continue };
        if date < earliest || date > latest {
            debug!(
                "Listing {}: {} {} outside [{}, {}]",
                listing.id, field, date, earliest, latest
            );
            report.errors.push(ValidationError::DateOutOfWindow {
                field,
                date,
                earliest,
                latest,
            });
        } else if date < today {
            report
                .warnings
                .push(ValidationWarning::PastAuctionDate { field, date });
        }
    }

    ValidationOutcome::new(listing, report)
}
