// src/models.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationWarning};
use crate::utils::extract_domain;

//------------------------------------------------------------------------------
// IDENTIFIER TYPES
//------------------------------------------------------------------------------

/// Strongly typed identifier for Listing records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Identifier of the auction house a listing was scraped from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

/// Strongly typed identifier for DuplicatePair records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuplicatePairId(pub String);

impl DuplicatePairId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for DuplicatePairId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//------------------------------------------------------------------------------
// ENUMERATIONS
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCategory {
    Apartment,
    House,
    Land,
    Commercial,
    Rural,
    Parking,
    Other,
}

impl PropertyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Land => "land",
            Self::Commercial => "commercial",
            Self::Rural => "rural",
            Self::Parking => "parking",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionType {
    Judicial,
    Extrajudicial,
    Unknown,
}

/// Fields the validators read or rewrite. Used to label errors and corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    State,
    FirstAuctionDate,
    SecondAuctionDate,
    EvaluationValue,
    FirstAuctionValue,
    SecondAuctionValue,
    DiscountPercentage,
}

impl ListingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::FirstAuctionDate => "first_auction_date",
            Self::SecondAuctionDate => "second_auction_date",
            Self::EvaluationValue => "evaluation_value",
            Self::FirstAuctionValue => "first_auction_value",
            Self::SecondAuctionValue => "second_auction_value",
            Self::DiscountPercentage => "discount_percentage",
        }
    }
}

impl std::fmt::Display for ListingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------------------------------------------------------------------------
// RAW FIELD VALUES
//------------------------------------------------------------------------------

/// A monetary field as scraped: either already numeric or the raw page text
/// (e.g. "R$ 1.234.567,89"). The value validator turns text into numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Value(f64),
    Text(String),
}

impl Amount {
    /// The numeric value, if this amount has already been parsed.
    pub fn parsed(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

/// A round date as scraped: ISO dates deserialize straight into `Date`,
/// anything else is kept as text until the date validator parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuctionDate {
    Date(NaiveDate),
    Text(String),
}

impl AuctionDate {
    pub fn parsed(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(_) => None,
        }
    }
}

impl From<NaiveDate> for AuctionDate {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

//------------------------------------------------------------------------------
// CORE DOMAIN MODELS
//------------------------------------------------------------------------------

/// One scraped snapshot of a property auction offer from one source.
///
/// Anything the source page did not show is `None`. Records are mutated only
/// by the quality auditor (field corrections) and the survivor selector
/// (duplicate flag and canonical reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,

    // identity
    #[serde(default)]
    pub source_id: Option<SourceId>,
    #[serde(default)]
    pub source_url: Option<String>,

    // descriptive
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<PropertyCategory>,
    #[serde(default)]
    pub jurisdiction_type: Option<JurisdictionType>,

    // location
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Total area in square meters
    #[serde(default)]
    pub area_total: Option<f64>,

    // financial
    #[serde(default)]
    pub evaluation_value: Option<Amount>,
    #[serde(default)]
    pub first_auction_value: Option<Amount>,
    #[serde(default)]
    pub first_auction_date: Option<AuctionDate>,
    #[serde(default)]
    pub second_auction_value: Option<Amount>,
    #[serde(default)]
    pub second_auction_date: Option<AuctionDate>,
    #[serde(default)]
    pub discount_percentage: Option<f64>,

    // payment facilitation
    #[serde(default)]
    pub accepts_financing: Option<bool>,
    #[serde(default)]
    pub accepts_fgts: Option<bool>,
    #[serde(default)]
    pub accepts_installments: Option<bool>,

    // media
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub audit: Option<AuditMetadata>,

    // lifecycle
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub canonical_id: Option<ListingId>,
}

fn default_active() -> bool {
    true
}

impl Listing {
    /// An empty, active listing with only its id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ListingId(id.into()),
            source_id: None,
            source_url: None,
            title: None,
            description: None,
            category: None,
            jurisdiction_type: None,
            state: None,
            city: None,
            neighborhood: None,
            address: None,
            coordinates: None,
            area_total: None,
            evaluation_value: None,
            first_auction_value: None,
            first_auction_date: None,
            second_auction_value: None,
            second_auction_date: None,
            discount_percentage: None,
            accepts_financing: None,
            accepts_fgts: None,
            accepts_installments: None,
            image_url: None,
            audit: None,
            is_active: true,
            is_duplicate: false,
            canonical_id: None,
        }
    }

    /// Identity used to keep lots of the same auctioneer apart: the source id,
    /// or the source url host when the id is missing.
    pub fn source_key(&self) -> Option<String> {
        if let Some(source_id) = self.source_id.as_ref().filter(|s| !s.0.trim().is_empty()) {
            return Some(source_id.0.trim().to_lowercase());
        }
        self.source_url.as_deref().and_then(extract_domain)
    }

    /// Appraisal value when known, otherwise the first-round value.
    pub fn reference_value(&self) -> Option<f64> {
        self.evaluation_value
            .as_ref()
            .and_then(Amount::parsed)
            .filter(|v| *v > 0.0)
            .or_else(|| self.first_auction_value.as_ref().and_then(Amount::parsed))
    }

    /// Whether this record may survive as the canonical one of a duplicate set.
    pub fn is_promotable(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().map_or(false, |v| !v.trim().is_empty())
        }
        self.source_key().is_some() && present(&self.state) && present(&self.city)
    }

    pub fn passed_audit(&self) -> bool {
        self.audit
            .as_ref()
            .map_or(false, |audit| audit.status == AuditStatus::Passed)
    }
}

//------------------------------------------------------------------------------
// AUDIT MODELS
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Passed,
    Failed,
}

/// One field rewrite applied by a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCorrection {
    pub field: ListingField,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FieldCorrection {
    pub fn new(field: ListingField, from: Option<String>, to: Option<String>) -> Self {
        Self { field, from, to }
    }
}

/// Stamp left on every audited record, passed or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub status: AuditStatus,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub corrections: Vec<FieldCorrection>,
    pub rule_version: String,
    pub audited_at: DateTime<Utc>,
}

/// A record the auditor refused, kept with its pre-audit form for a
/// dead-letter store or manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedListing {
    pub original: Listing,
    pub annotated: Listing,
    pub errors: Vec<ValidationError>,
}

//------------------------------------------------------------------------------
// MATCHING MODELS
//------------------------------------------------------------------------------

/// Why a pair was reported, one entry per signal above its explanatory threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum MatchReason {
    Address { similarity: f64 },
    Title { similarity: f64 },
    Category { category: PropertyCategory },
    Value { similarity: f64 },
    Area { similarity: f64 },
}

/// Per-signal similarities of a compared pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub address: f64,
    pub title: f64,
    pub category: f64,
    pub value: f64,
    pub area: f64,
}

/// Two listings judged to describe the same property. `listing_a` is the one
/// that comes first in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub id: DuplicatePairId,
    pub listing_a: ListingId,
    pub listing_b: ListingId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reasons: Vec<MatchReason>,
}

/// Survivor decision for one duplicate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAssignment {
    pub duplicate_id: ListingId,
    pub canonical_id: ListingId,
    pub duplicate_score: f64,
    pub canonical_score: f64,
}
