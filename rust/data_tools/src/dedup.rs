//! Near-duplicate removal over shingle sets.
//!
//! Documents are accepted strictly in input order. Each new document's
//! shingle set is compared against every previously accepted document and
//! rejected on the first Jaccard similarity at or above the threshold.
//!
//! The default comparison is exhaustive and therefore O(n²) in the number of
//! accepted documents. For large corpora an opt-in MinHash + LSH candidate
//! index narrows the comparisons to bucket-colliding documents:
//! - **MinHash**: compact signatures that preserve Jaccard similarity
//! - **Locality-Sensitive Hashing (LSH)**: band the signature into buckets
//!
//! Candidates are still verified with exact Jaccard, so every rejection is
//! backed by a real match against an accepted document. Pairs that share no
//! bucket are never compared, which lowers recall.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::{DataToolsError, Result};
use crate::shingle::{jaccard, ShingleMode, ShingleSet};

/// Accepted-set size from which the inner comparison loop runs on rayon.
const PARALLEL_COMPARE_MIN: usize = 4096;

/// How candidate documents are selected for the exact Jaccard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateIndex {
    /// Compare against every accepted document.
    #[default]
    Exhaustive,
    /// Compare only against documents sharing at least one LSH bucket.
    MinHashLsh {
        /// Number of MinHash permutations (more = more accurate, slower)
        num_perm: usize,
        /// Number of LSH bands (num_perm must be divisible by num_bands)
        num_bands: usize,
    },
}

/// Configuration for near-duplicate removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearDedupConfig {
    /// Shingle (n-gram) size in words or characters
    pub shingle_size: usize,
    /// Jaccard similarity at or above which a document is a duplicate
    pub threshold: f64,
    pub mode: ShingleMode,
    pub index: CandidateIndex,
}

impl Default for NearDedupConfig {
    fn default() -> Self {
        Self {
            shingle_size: 3,
            threshold: 0.8,
            mode: ShingleMode::Word,
            index: CandidateIndex::Exhaustive,
        }
    }
}

impl NearDedupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shingle_size == 0 {
            return Err(DataToolsError::InvalidConfig(
                "shingle_size must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DataToolsError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if let CandidateIndex::MinHashLsh {
            num_perm,
            num_bands,
        } = self.index
        {
            if num_perm == 0 || num_bands == 0 {
                return Err(DataToolsError::InvalidConfig(
                    "num_perm and num_bands must be greater than zero".into(),
                ));
            }
            if num_perm % num_bands != 0 {
                return Err(DataToolsError::InvalidConfig(format!(
                    "num_perm ({num_perm}) must be divisible by num_bands ({num_bands})"
                )));
            }
        }
        Ok(())
    }
}

/// A MinHash signature: compact representation of a document's shingle set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSignature {
    /// The MinHash values (one per permutation)
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Compute the signature of a shingle set.
    ///
    /// For each "permutation" (simulated via different hash seeds),
    /// the MinHash value is the minimum hash of all shingles.
    pub fn compute(shingles: &ShingleSet, num_perm: usize) -> Self {
        let values = (0..num_perm as u64)
            .map(|seed| {
                shingles
                    .iter()
                    .map(|shingle| xxh3_64_with_seed(&shingle.to_le_bytes(), seed))
                    .min()
                    .unwrap_or(u64::MAX)
            })
            .collect();
        Self { values }
    }

    /// Estimate Jaccard similarity as the fraction of matching slots.
    pub fn estimate_similarity(&self, other: &MinHashSignature) -> f64 {
        if self.values.is_empty() || self.values.len() != other.values.len() {
            return 0.0;
        }
        let matches = self
            .values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a == b)
            .count();
        matches as f64 / self.values.len() as f64
    }
}

/// Band buckets over the signatures of accepted documents.
#[derive(Debug, Clone)]
struct LshIndex {
    num_perm: usize,
    rows_per_band: usize,
    /// One bucket map per band: bucket hash → accepted positions
    bands: Vec<HashMap<u64, Vec<usize>>>,
}

impl LshIndex {
    fn new(num_perm: usize, num_bands: usize) -> Self {
        Self {
            num_perm,
            rows_per_band: num_perm / num_bands,
            bands: vec![HashMap::new(); num_bands],
        }
    }

    fn bucket_keys(&self, signature: &MinHashSignature) -> Vec<u64> {
        (0..self.bands.len())
            .map(|band_idx| {
                let start = band_idx * self.rows_per_band;
                let band_slice = &signature.values[start..start + self.rows_per_band];
                let mut band_bytes = Vec::with_capacity(band_slice.len() * 8);
                for &val in band_slice {
                    band_bytes.extend_from_slice(&val.to_le_bytes());
                }
                xxh3_64_with_seed(&band_bytes, band_idx as u64)
            })
            .collect()
    }

    /// Accepted positions sharing any bucket with `keys`, ascending.
    fn candidates(&self, keys: &[u64]) -> Vec<usize> {
        let mut found: Vec<usize> = keys
            .iter()
            .zip(&self.bands)
            .filter_map(|(key, buckets)| buckets.get(key))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    fn insert(&mut self, keys: &[u64], position: usize) {
        for (key, buckets) in keys.iter().zip(self.bands.iter_mut()) {
            buckets.entry(*key).or_default().push(position);
        }
    }
}

/// The near-duplicate engine.
///
/// Holds configuration only; every call to
/// [`remove_near_duplicates`](Self::remove_near_duplicates) starts from an
/// empty accepted set. Use [`session`](Self::session) for incremental use.
#[derive(Debug, Clone)]
pub struct NearDeduplicator {
    config: NearDedupConfig,
}

impl NearDeduplicator {
    /// Create a new deduplicator with the given config.
    pub fn new(config: NearDedupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NearDedupConfig {
        &self.config
    }

    /// Shingle set of `text` under this configuration.
    pub fn shingles(&self, text: &str) -> ShingleSet {
        ShingleSet::from_text(text, self.config.shingle_size, self.config.mode)
    }

    /// Start an empty accepted set.
    pub fn session(&self) -> NearDedupSession<'_> {
        let lsh = match self.config.index {
            CandidateIndex::Exhaustive => None,
            CandidateIndex::MinHashLsh {
                num_perm,
                num_bands,
            } => Some(LshIndex::new(num_perm, num_bands)),
        };
        NearDedupSession {
            dedup: self,
            accepted: Vec::new(),
            lsh,
        }
    }

    /// Remove near-duplicates, keeping the first document of each cluster.
    ///
    /// Blank documents and documents too short to yield a shingle are dropped.
    pub fn remove_near_duplicates<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Vec<String> {
        // Shingling is independent per document; acceptance below is not.
        let shingle_sets: Vec<ShingleSet> = documents
            .par_iter()
            .map(|doc| self.shingles(doc.as_ref()))
            .collect();

        let mut session = self.session();
        let mut unique = Vec::new();
        for (doc, shingles) in documents.iter().zip(shingle_sets) {
            let doc = doc.as_ref();
            if !doc.trim().is_empty() && session.accept_shingles(shingles) {
                unique.push(doc.to_owned());
            }
        }

        debug!(
            "near dedup kept {} of {} documents (threshold={}, shingle_size={})",
            unique.len(),
            documents.len(),
            self.config.threshold,
            self.config.shingle_size
        );
        unique
    }
}

/// Running accepted set for sequential near-duplicate decisions.
#[derive(Debug)]
pub struct NearDedupSession<'a> {
    dedup: &'a NearDeduplicator,
    accepted: Vec<ShingleSet>,
    lsh: Option<LshIndex>,
}

impl NearDedupSession<'_> {
    /// Offer one document; returns `true` when it is accepted.
    pub fn insert(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let shingles = self.dedup.shingles(text);
        self.accept_shingles(shingles)
    }

    /// Number of accepted documents so far.
    pub fn accepted_len(&self) -> usize {
        self.accepted.len()
    }

    /// Forget every accepted document.
    pub fn reset(&mut self) {
        self.accepted.clear();
        if let Some(lsh) = self.lsh.as_mut() {
            lsh.bands.iter_mut().for_each(HashMap::clear);
        }
    }

    fn accept_shingles(&mut self, shingles: ShingleSet) -> bool {
        if shingles.is_empty() {
            return false;
        }
        let threshold = self.dedup.config.threshold;

        let keys = match &self.lsh {
            Some(lsh) => {
                let signature = MinHashSignature::compute(&shingles, lsh.num_perm);
                let keys = lsh.bucket_keys(&signature);
                let duplicate = lsh
                    .candidates(&keys)
                    .into_iter()
                    .any(|pos| jaccard(&shingles, &self.accepted[pos]) >= threshold);
                if duplicate {
                    return false;
                }
                Some(keys)
            }
            None => {
                let duplicate = if self.accepted.len() >= PARALLEL_COMPARE_MIN {
                    self.accepted
                        .par_iter()
                        .any(|old| jaccard(&shingles, old) >= threshold)
                } else {
                    self.accepted
                        .iter()
                        .any(|old| jaccard(&shingles, old) >= threshold)
                };
                if duplicate {
                    return false;
                }
                None
            }
        };

        let position = self.accepted.len();
        if let (Some(lsh), Some(keys)) = (self.lsh.as_mut(), keys) {
            lsh.insert(&keys, position);
        }
        self.accepted.push(shingles);
        true
    }
}
