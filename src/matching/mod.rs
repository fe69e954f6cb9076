// src/matching/mod.rs

pub mod address;
pub mod classifier;
pub mod survivor;
pub mod text;
pub mod value;

pub use address::{address_similarity, extract_components, normalize, AddressComponents};
pub use classifier::{bucket_key, BucketKey, DedupResult, DuplicateDetector, PairScore};
pub use survivor::{completeness_score, SurvivorOutcome, SurvivorSelector, SurvivorStrategy};
pub use text::text_similarity;
pub use value::value_similarity;
