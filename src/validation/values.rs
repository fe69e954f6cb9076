// src/validation/values.rs

use log::debug;

use crate::config::AuditConfig;
use crate::errors::{ValidationError, ValidationWarning};
use crate::models::{Amount, FieldCorrection, Listing, ListingField};
use crate::utils::round_to;
use crate::validation::{FieldReport, ValidationOutcome};

/// Parses a scraped monetary string such as "R$ 1.234.567,89" or
/// "1,234,567.89".
///
/// When both separators occur, the one that occurs last is the decimal mark.
/// With a single kind of separator, several occurrences or exactly three
/// trailing digits mean it groups thousands; otherwise it is the decimal mark.
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace("r$", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if !digits.chars().any(|c| c.is_ascii_digit())
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let normalized = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            digits.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => single_separator(digits, '.'),
        (None, Some(_)) => single_separator(digits, ','),
        (None, None) => digits.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| if negative { -v } else { v })
}

fn single_separator(digits: &str, separator: char) -> String {
    let occurrences = digits.matches(separator).count();
    let trailing = digits.rsplit(separator).next().map_or(0, str::len);
    if occurrences > 1 || trailing == 3 {
        digits.replace(separator, "")
    } else {
        digits.replace(separator, ".")
    }
}

fn amount_text(amount: Option<&Amount>) -> Option<String> {
    amount.map(|a| match a {
        Amount::Value(v) => v.to_string(),
        Amount::Text(t) => t.clone(),
    })
}

/// Parses one amount in place. Returns the parsed value, negative ones
/// included, so the rounds can still be ordered.
fn resolve_amount(
    slot: &mut Option<Amount>,
    field: ListingField,
    report: &mut FieldReport,
) -> Option<f64> {
    let value = match slot.as_ref()? {
        Amount::Value(v) if v.is_finite() => *v,
        Amount::Value(v) => {
            report.errors.push(ValidationError::UnparseableValue {
                field,
                raw: v.to_string(),
            });
            return None;
        }
        Amount::Text(text) if text.trim().is_empty() => {
            *slot = None;
            return None;
        }
        Amount::Text(text) => match parse_money(text) {
            Some(v) => v,
            None => {
                report.errors.push(ValidationError::UnparseableValue {
                    field,
                    raw: text.clone(),
                });
                return None;
            }
        },
    };

    *slot = Some(Amount::Value(value));
    if value < 0.0 {
        report
            .errors
            .push(ValidationError::NegativeValue { field, value });
    }
    Some(value)
}

/// Parses appraisal and round values, orders the rounds and recomputes the
/// discount from appraisal and second-round value.
pub fn validate_values(mut listing: Listing, config: &AuditConfig) -> ValidationOutcome {
    let mut report = FieldReport::default();

    let appraisal = resolve_amount(
        &mut listing.evaluation_value,
        ListingField::EvaluationValue,
        &mut report,
    );
    let mut first = resolve_amount(
        &mut listing.first_auction_value,
        ListingField::FirstAuctionValue,
        &mut report,
    );
    let mut second = resolve_amount(
        &mut listing.second_auction_value,
        ListingField::SecondAuctionValue,
        &mut report,
    );

    if let (Some(v1), Some(v2)) = (first, second) {
        if v2 > v1 {
            debug!(
                "Listing {}: second round value {} exceeds first round value {}, swapping",
                listing.id, v2, v1
            );
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
            std::mem::swap(&mut first, &mut second);
            report.warnings.push(ValidationWarning::ValuesSwapped);
        }
    }

    if let (Some(appraisal), Some(first_value)) = (appraisal, first) {
        if appraisal > 0.0 && first_value > appraisal {
            report.warnings.push(ValidationWarning::StaleAppraisal {
                first_value,
                appraisal,
            });
        }
    }

    if let (Some(appraisal), Some(second_value)) = (appraisal, second) {
        if appraisal > 0.0 && second_value >= 0.0 {
            let computed = round_to((1.0 - second_value / appraisal) * 100.0, 2);
            match listing.discount_percentage {
                None => listing.discount_percentage = Some(computed),
                Some(source) if (source - computed).abs() <= config.discount_tolerance => {}
                Some(source) => {
                    debug!(
                        "Listing {}: source discount {:.2} replaced by computed {:.2}",
                        listing.id, source, computed
                    );
                    report.corrections.push(FieldCorrection::new(
                        ListingField::DiscountPercentage,
                        Some(source.to_string()),
                        Some(computed.to_string()),
                    ));
                    report.warnings.push(ValidationWarning::DiscountRecomputed {
                        source_value: source,
                        computed,
                    });
                    listing.discount_percentage = Some(computed);
                }
            }
        }
    }

    if let Some(discount) = listing.discount_percentage {
        if !(0.0..=100.0).contains(&discount) {
            report
                .errors
                .push(ValidationError::DiscountOutOfRange { value: discount });
        }
    }

    ValidationOutcome::new(listing, report)
}
