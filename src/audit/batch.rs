// src/audit/batch.rs

use chrono::{DateTime, Utc};
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use crate::audit::orchestrator::{AuditOutcome, QualityAuditor};
use crate::models::{Listing, RejectedListing};
use crate::results::AuditStats;

/// Partition of one audited batch. Input order is preserved inside each
/// partition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchAuditResult {
    pub passed: Vec<Listing>,
    pub failed: Vec<RejectedListing>,
    pub stats: AuditStats,
}

fn stats_of(outcome: &AuditOutcome) -> AuditStats {
    AuditStats {
        total: 1,
        passed: usize::from(outcome.is_accepted()),
        failed: usize::from(!outcome.is_accepted()),
        corrected: usize::from(outcome.was_corrected()),
    }
}

impl QualityAuditor {
    pub fn audit_batch(&self, listings: Vec<Listing>) -> BatchAuditResult {
        self.audit_batch_at(listings, Utc::now())
    }

    /// Audits every record independently and partitions them by outcome.
    pub fn audit_batch_at(&self, listings: Vec<Listing>, now: DateTime<Utc>) -> BatchAuditResult {
        let start = Instant::now();
        info!("Starting quality audit of {} listings", listings.len());

        let outcomes: Vec<AuditOutcome> = listings
            .into_par_iter()
            .map(|listing| self.audit_at(listing, now))
            .collect();

        let stats = outcomes
            .par_iter()
            .map(stats_of)
            .reduce(AuditStats::default, |a, b| a + b);

        let mut result = BatchAuditResult {
            passed: Vec::with_capacity(stats.passed),
            failed: Vec::with_capacity(stats.failed),
            stats,
        };
        for outcome in outcomes {
            match outcome {
                AuditOutcome::Accepted(listing) => result.passed.push(listing),
                AuditOutcome::Rejected(rejected) => result.failed.push(rejected),
            }
        }

        info!(
            "Quality audit complete: {} passed, {} failed, {} corrected ({:.1}% pass rate) in {:.2?}",
            result.stats.passed,
            result.stats.failed,
            result.stats.corrected,
            result.stats.pass_rate(),
            start.elapsed()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use chrono::TimeZone;

    #[test]
    fn batch_partitions_and_counts() {
        let auditor = QualityAuditor::new(AuditConfig::default()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();

        let mut ok = Listing::new("ok");
        ok.state = Some("RJ".into());
        let mut inferred = Listing::new("inferred");
        inferred.state = Some("XX".into());
        inferred.city = Some("Salvador".into());
        let bad = Listing::new("bad");

        let result = auditor.audit_batch_at(vec![ok, inferred, bad], now);
        assert_eq!(
            result.stats,
            AuditStats {
                total: 3,
                passed: 2,
                failed: 1,
                corrected: 1,
            }
        );
        let passed: Vec<_> = result.passed.iter().map(|l| l.id.0.as_str()).collect();
        assert_eq!(passed, vec!["ok", "inferred"]);
        assert!(result.passed.iter().all(Listing::passed_audit));
        assert_eq!(result.failed[0].original.id.0, "bad");
        assert!(!result.failed[0].original.passed_audit());
    }

    #[test]
    fn empty_batch_has_zero_rates() {
        let auditor = QualityAuditor::new(AuditConfig::default()).unwrap();
        let result = auditor.audit_batch(Vec::new());
        assert_eq!(result.stats, AuditStats::default());
        assert_eq!(result.stats.pass_rate(), 0.0);
    }
}
