// src/lib.rs
pub mod audit;
pub mod config;
pub mod errors;
pub mod matching;
pub mod models;
pub mod results;
pub mod utils;
pub mod validation;

// Re-export common types for easier access
pub use models::{
    Amount, AuctionDate, AuditMetadata, AuditStatus, CanonicalAssignment, DuplicatePair, Listing,
    ListingId, PropertyCategory, RejectedListing, SourceId,
};

// Re-export important functionality
pub use audit::{AuditOutcome, BatchAuditResult, QualityAuditor};
pub use config::{AuditConfig, MatchingConfig};
pub use errors::{ConfigError, ValidationError, ValidationWarning};
pub use matching::{DuplicateDetector, SurvivorSelector, SurvivorStrategy};
