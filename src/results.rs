// src/results.rs

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::utils::percentage;

/// Counters of one batch audit. Built by addition so it does not depend on
/// the order records were audited in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Records with at least one corrected field, passed or failed
    pub corrected: usize,
}

impl AuditStats {
    pub fn pass_rate(&self) -> f64 {
        percentage(self.passed, self.total)
    }

    pub fn correction_rate(&self) -> f64 {
        percentage(self.corrected, self.total)
    }
}

impl Add for AuditStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            corrected: self.corrected + other.corrected,
        }
    }
}

impl AddAssign for AuditStats {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Statistics of one duplicate-detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupStats {
    pub total_listings: usize,
    pub buckets: usize,
    pub comparisons: usize,
    pub inactive_skipped: usize,
    pub missing_location_skipped: usize,
    /// Pairs never compared because both listings came from the same source
    pub same_source_skipped: usize,
    pub pairs_found: usize,
    pub review_candidates: usize,
    /// Average overall score of the reported pairs
    pub avg_score: f64,
}

/// Outcome of survivor selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivorStats {
    pub pairs_considered: usize,
    pub duplicates_marked: usize,
    /// Pairs (or clusters) without any promotable record
    pub unresolved: usize,
}

/// Complete pipeline run statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: DateTime<Utc>,
    pub rule_version: String,
    pub audit: AuditStats,
    pub dedup: DedupStats,
    pub survivors: SurvivorStats,
    pub audit_time: f64,
    pub matching_time: f64,
    pub survivor_time: f64,
    pub total_processing_time: f64,
}

/// Logs a human-readable summary of a pipeline run.
pub fn log_report(stats: &PipelineStats) {
    info!("========== PIPELINE RUN {} ==========", stats.run_id);
    info!("Rule version: {}", stats.rule_version);
    info!(
        "Audit: {} records, {} passed ({:.1}%), {} failed, {} corrected ({:.1}%) in {:.2}s",
        stats.audit.total,
        stats.audit.passed,
        stats.audit.pass_rate(),
        stats.audit.failed,
        stats.audit.corrected,
        stats.audit.correction_rate(),
        stats.audit_time
    );
    info!(
        "Matching: {} buckets, {} comparisons, {} same-source skips, {} pairs (avg score {:.3}), {} review candidates in {:.2}s",
        stats.dedup.buckets,
        stats.dedup.comparisons,
        stats.dedup.same_source_skipped,
        stats.dedup.pairs_found,
        stats.dedup.avg_score,
        stats.dedup.review_candidates,
        stats.matching_time
    );
    info!(
        "Survivors: {} pairs considered, {} duplicates marked, {} unresolved in {:.2}s",
        stats.survivors.pairs_considered,
        stats.survivors.duplicates_marked,
        stats.survivors.unresolved,
        stats.survivor_time
    );
    info!("Total processing time: {:.2}s", stats.total_processing_time);
}
