// src/errors.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ListingField;

/// A data-quality problem that blocks a record from entering the catalog.
///
/// Validators only emit these after their correction rules have had a chance
/// to fix the triggering condition.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("state {raw:?} is not a valid code and could not be inferred from city or address")]
    UnresolvableState { raw: Option<String> },

    #[error("{field} {raw:?} does not match any accepted date format")]
    UnparseableDate { field: ListingField, raw: String },

    #[error("{field} {date} falls outside the accepted window [{earliest}, {latest}]")]
    DateOutOfWindow {
        field: ListingField,
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("{field} {raw:?} is not a monetary value")]
    UnparseableValue { field: ListingField, raw: String },

    #[error("{field} is negative ({value})")]
    NegativeValue { field: ListingField, value: f64 },

    #[error("discount {value:.2}% is outside [0, 100]")]
    DiscountOutOfRange { value: f64 },
}

/// A non-blocking observation carried as audit metadata.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    #[error("state inferred as {state} from {via}")]
    StateInferred {
        raw: Option<String>,
        state: String,
        via: StateInferenceSource,
    },

    #[error("second round date preceded first round date; rounds swapped")]
    DatesSwapped,

    #[error("second round value exceeded first round value; values swapped")]
    ValuesSwapped,

    #[error("{field} {date} is already in the past")]
    PastAuctionDate { field: ListingField, date: NaiveDate },

    #[error("first round value {first_value} exceeds appraisal {appraisal}; appraisal may be stale")]
    StaleAppraisal { first_value: f64, appraisal: f64 },

    #[error("discount recomputed from {source_value:.2}% to {computed:.2}%")]
    DiscountRecomputed { source_value: f64, computed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateInferenceSource {
    CapitalCity,
    Address,
}

impl std::fmt::Display for StateInferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapitalCity => write!(f, "capital city"),
            Self::Address => write!(f, "address"),
        }
    }
}

/// Malformed configuration. The only error the core returns as `Err`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("review threshold {review} must be below the duplicate threshold {threshold}")]
    ReviewBandEmpty { review: f64, threshold: f64 },

    #[error("weight for {signal} must be a non-negative number, got {weight}")]
    InvalidWeight { signal: &'static str, weight: f64 },

    #[error("signal weights sum to zero")]
    ZeroTotalWeight,

    #[error("valid state set is empty")]
    EmptyStateSet,

    #[error("capital {city:?} maps to unknown state {state:?}")]
    UnknownCapitalState { city: String, state: String },

    #[error("date window must not be negative (past={past}, future={future})")]
    NegativeDateWindow { past: i64, future: i64 },

    #[error("date window exceeds {max} days (past={past}, future={future})")]
    DateWindowTooLarge { past: i64, future: i64, max: i64 },

    #[error("no accepted date formats configured")]
    NoDateFormats,

    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidEnvValue { key: &'static str, value: String },

    #[error("unknown survivor strategy {0:?} (expected \"pairwise\" or \"clustered\")")]
    UnknownSurvivorStrategy(String),
}
