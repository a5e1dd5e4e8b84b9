//! BalNLP Data Tools: corpus curation for low-resource language modeling.
//!
//! This crate removes the documents that hurt downstream training:
//!
//! - **Normalization** (`normalize`): canonical forms (raw, Unicode NFC,
//!   whitespace-collapsed) and their SHA-1 content hashes.
//! - **Exact deduplication** (`exact`): first-occurrence-preserving removal of
//!   identical or canonically identical documents.
//! - **Repetition filters** (`repetition`): reject documents dominated by one
//!   character or one word.
//! - **Near deduplication** (`dedup`): Jaccard similarity over word or
//!   character shingles, with an opt-in MinHash + LSH candidate index.
//! - **Pipeline** (`pipeline`): the three stages chained in order.
//!
//! Every stage returns an order-preserving subsequence of its input.
//!
//! ## Usage
//!
//! ```rust
//! use balnlp_data_tools::dedup::{NearDedupConfig, NearDeduplicator};
//! use balnlp_data_tools::exact::ExactDeduplicator;
//! use balnlp_data_tools::repetition::RepetitionFilter;
//!
//! let docs = vec!["doc one".to_string(), "doc one".to_string(), "doc two".to_string()];
//!
//! let unique = ExactDeduplicator::new().remove_all_duplicates(&docs);
//! let varied = RepetitionFilter::default().remove_repetitive(&unique);
//!
//! let near = NearDeduplicator::new(NearDedupConfig {
//!     shingle_size: 1,
//!     ..Default::default()
//! })
//! .unwrap();
//! let curated = near.remove_near_duplicates(&varied);
//! assert_eq!(curated.len(), 2);
//! ```

pub mod dedup;
pub mod error;
pub mod exact;
pub mod normalize;
pub mod pipeline;
pub mod repetition;
pub mod shingle;

#[cfg(feature = "python")]
pub mod python;

// Re-export main types
pub use dedup::{
    CandidateIndex, MinHashSignature, NearDedupConfig, NearDedupSession, NearDeduplicator,
};
pub use error::{DataToolsError, Result};
pub use exact::ExactDeduplicator;
pub use normalize::{canonicalize, content_hash, ContentHash, Document, Normalization};
pub use pipeline::{CurationConfig, CurationPipeline, CurationReport, CurationStats};
pub use repetition::{CharRepetitionFilter, RepetitionFilter, WordRepetitionFilter};
pub use shingle::{jaccard, ShingleMode, ShingleSet};

/// Remove exact and canonically exact duplicates (all normalizations).
pub fn remove_exact_duplicates<S: AsRef<str>>(documents: &[S]) -> Vec<String> {
    ExactDeduplicator::new().remove_all_duplicates(documents)
}

/// Remove near-duplicates under `config`.
pub fn remove_near_duplicates<S: AsRef<str> + Sync>(
    documents: &[S],
    config: NearDedupConfig,
) -> Result<Vec<String>> {
    Ok(NearDeduplicator::new(config)?.remove_near_duplicates(documents))
}

/// Remove degenerate repetitive documents with the default thresholds.
pub fn remove_repetitive<S: AsRef<str> + Sync>(documents: &[S]) -> Vec<String> {
    RepetitionFilter::default().remove_repetitive(documents)
}
