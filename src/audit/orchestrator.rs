// src/audit/orchestrator.rs

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::config::AuditConfig;
use crate::errors::ConfigError;
use crate::models::{AuditMetadata, AuditStatus, Listing, RejectedListing};
use crate::validation::{validate_dates, validate_state, validate_values, FieldReport};

/// Result of auditing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Accepted(Listing),
    Rejected(RejectedListing),
}

impl AuditOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The audited record, stamped with its metadata.
    pub fn listing(&self) -> &Listing {
        match self {
            Self::Accepted(listing) => listing,
            Self::Rejected(rejected) => &rejected.annotated,
        }
    }

    pub fn was_corrected(&self) -> bool {
        self.listing()
            .audit
            .as_ref()
            .map_or(false, |audit| !audit.corrections.is_empty())
    }
}

/// Runs the field validators on one record and decides whether it enters the
/// pool. Holds nothing but its configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct QualityAuditor {
    config: AuditConfig,
}

impl QualityAuditor {
    pub fn new(config: AuditConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn audit(&self, listing: Listing) -> AuditOutcome {
        self.audit_at(listing, Utc::now())
    }

    /// Audits `listing` as of `now`. The date window is centered on the UTC
    /// date of `now`, which is also the stamp written to the audit metadata.
    pub fn audit_at(&self, listing: Listing, now: DateTime<Utc>) -> AuditOutcome {
        if listing.audit.is_some() {
            warn!("Listing {} already carries audit metadata; re-auditing", listing.id);
        }
        let original = listing.clone();
        let mut report = FieldReport::default();

        // Order matters: state, then dates (which may swap paired values),
        // then values.
        let (listing, state_report) = validate_state(listing, &self.config).into_parts();
        report.merge(state_report);
        let (listing, dates_report) =
            validate_dates(listing, &self.config, now.date_naive()).into_parts();
        report.merge(dates_report);
        let (mut listing, values_report) = validate_values(listing, &self.config).into_parts();
        report.merge(values_report);

        let status = if report.has_errors() {
            AuditStatus::Failed
        } else {
            AuditStatus::Passed
        };
        debug!(
            "Listing {} audited: {:?} ({} errors, {} warnings, {} corrections)",
            listing.id,
            status,
            report.errors.len(),
            report.warnings.len(),
            report.corrections.len()
        );

        let errors = report.errors.clone();
        listing.audit = Some(AuditMetadata {
            status,
            errors: report.errors,
            warnings: report.warnings,
            corrections: report.corrections,
            rule_version: self.config.rule_version.clone(),
            audited_at: now,
        });

        match status {
            AuditStatus::Passed => AuditOutcome::Accepted(listing),
            AuditStatus::Failed => AuditOutcome::Rejected(RejectedListing {
                original,
                annotated: listing,
                errors,
            }),
        }
    }
}
