// src/audit/mod.rs

// Module declarations
mod batch;
mod orchestrator;

pub use batch::BatchAuditResult;
pub use orchestrator::{AuditOutcome, QualityAuditor};
