// src/main.rs
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    time::Instant,
};
use uuid::Uuid;

use auction_dedupe_lib::{
    audit::{BatchAuditResult, QualityAuditor},
    config::{AuditConfig, MatchingConfig},
    matching::{DedupResult, DuplicateDetector, SurvivorSelector, SurvivorStrategy},
    models::{CanonicalAssignment, DuplicatePair, Listing, RejectedListing},
    results::{self, PipelineStats},
};

const USAGE: &str = "Usage: auction_dedupe <listings.json> [report.json]";

/// Everything one run produces, written out as JSON.
#[derive(Debug, Serialize)]
struct RunReport {
    accepted: Vec<Listing>,
    rejected: Vec<RejectedListing>,
    pairs: Vec<DuplicatePair>,
    review_candidates: Vec<DuplicatePair>,
    assignments: Vec<CanonicalAssignment>,
    stats: PipelineStats,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    info!("Starting auction listing audit and deduplication pipeline");

    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using environment variables from system"),
    }

    let mut args = std::env::args().skip(1);
    let input = args.next().context(USAGE)?;
    let output = args.next();

    let audit_config = AuditConfig::from_env().context("Invalid audit configuration")?;
    let matching_config = MatchingConfig::from_env().context("Invalid matching configuration")?;
    let strategy = SurvivorStrategy::from_env().context("Invalid survivor strategy")?;

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read listings from {}", input))?;
    let listings: Vec<Listing> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse listings in {}", input))?;
    info!("Loaded {} listings from {}", listings.len(), input);

    let report = run_pipeline(listings, audit_config, matching_config, strategy)?;
    results::log_report(&report.stats);

    match output {
        Some(path) => {
            let file =
                File::create(&path).with_context(|| format!("Failed to create {}", path))?;
            write_report(BufWriter::new(file), &report)?;
            info!("Report written to {}", path);
        }
        None => write_report(io::stdout().lock(), &report)?,
    }

    Ok(())
}

fn run_pipeline(
    listings: Vec<Listing>,
    audit_config: AuditConfig,
    matching_config: MatchingConfig,
    strategy: SurvivorStrategy,
) -> Result<RunReport> {
    let start_time = Instant::now();
    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now();

    let auditor = QualityAuditor::new(audit_config).context("Failed to initialize auditor")?;
    let detector =
        DuplicateDetector::new(matching_config).context("Failed to initialize duplicate detector")?;
    let selector = SurvivorSelector::new(strategy);
    let rule_version = auditor.config().rule_version.clone();
    debug!("Matching configuration: {:?}", detector.config());

    info!("Pipeline {} started. Progress: [0/3] phases", run_id);

    // Phase 1: Quality audit
    info!("Phase 1: Quality audit");
    let phase1_start = Instant::now();
    let BatchAuditResult {
        passed: mut accepted,
        failed: rejected,
        stats: audit_stats,
    } = auditor.audit_batch_at(listings, run_timestamp);
    let audit_time = phase1_start.elapsed();
    debug_assert!(accepted.iter().all(Listing::passed_audit));
    info!(
        "Accepted {} of {} listings in {:.2?}. Phase 1 complete.",
        accepted.len(),
        audit_stats.total,
        audit_time
    );

    // Phase 2: Duplicate detection over the accepted pool
    info!("Phase 2: Duplicate detection");
    let phase2_start = Instant::now();
    let DedupResult {
        pairs,
        review_candidates,
        stats: dedup_stats,
    } = detector.find_duplicates(&accepted);
    let matching_time = phase2_start.elapsed();
    info!(
        "Found {} duplicate pairs in {:.2?}. Phase 2 complete.",
        pairs.len(),
        matching_time
    );

    // Phase 3: Survivor selection
    info!("Phase 3: Survivor selection ({:?})", selector.strategy());
    let phase3_start = Instant::now();
    let outcome = selector.select(&accepted, &pairs);
    let flagged = SurvivorSelector::apply(&mut accepted, &outcome.assignments);
    debug!("{} listings flagged as duplicates", flagged);
    let survivor_time = phase3_start.elapsed();
    info!(
        "Marked {} duplicates in {:.2?}. Phase 3 complete.",
        outcome.stats.duplicates_marked, survivor_time
    );

    let stats = PipelineStats {
        run_id,
        run_timestamp,
        rule_version,
        audit: audit_stats,
        dedup: dedup_stats,
        survivors: outcome.stats,
        audit_time: audit_time.as_secs_f64(),
        matching_time: matching_time.as_secs_f64(),
        survivor_time: survivor_time.as_secs_f64(),
        total_processing_time: start_time.elapsed().as_secs_f64(),
    };

    Ok(RunReport {
        accepted,
        rejected,
        pairs,
        review_candidates,
        assignments: outcome.assignments,
        stats,
    })
}

fn write_report<W: Write>(mut writer: W, report: &RunReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report).context("Failed to serialize report")?;
    writeln!(writer).context("Failed to write report")?;
    writer.flush().context("Failed to flush report")?;
    Ok(())
}
