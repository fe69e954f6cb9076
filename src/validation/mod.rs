// src/validation/mod.rs
//
// Per-field validators. Each one takes a listing by value and hands back the
// corrected listing together with what it found, so a caller cannot drop the
// report without also dropping the data.

pub mod dates;
pub mod state;
pub mod values;

pub use dates::{parse_auction_date, validate_dates};
pub use state::validate_state;
pub use values::{parse_money, validate_values};

use crate::errors::{ValidationError, ValidationWarning};
use crate::models::{FieldCorrection, Listing};

/// Errors, warnings and corrections produced by one or more validators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub corrections: Vec<FieldCorrection>,
}

impl FieldReport {
    pub fn merge(&mut self, other: FieldReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.corrections.extend(other.corrections);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[must_use = "a validation outcome carries errors that decide whether the listing is accepted"]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub listing: Listing,
    pub report: FieldReport,
}

impl ValidationOutcome {
    pub fn new(listing: Listing, report: FieldReport) -> Self {
        Self { listing, report }
    }

    pub fn into_parts(self) -> (Listing, FieldReport) {
        (self.listing, self.report)
    }

    pub fn is_valid(&self) -> bool {
        !self.report.has_errors()
    }
}
