//! End-to-end curation: exact → repetition → near-duplicate filtering.

use log::info;
use serde::{Deserialize, Serialize};

use crate::dedup::{NearDedupConfig, NearDeduplicator};
use crate::error::Result;
use crate::exact::ExactDeduplicator;
use crate::repetition::RepetitionFilter;

/// Which stages run. A disabled stage passes documents through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Run all three exact passes (Unicode, whitespace, raw)
    pub exact: bool,
    pub repetition: Option<RepetitionFilter>,
    pub near: Option<NearDedupConfig>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            exact: true,
            repetition: Some(RepetitionFilter::default()),
            near: Some(NearDedupConfig::default()),
        }
    }
}

/// Document counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurationStats {
    pub input: usize,
    pub after_exact: usize,
    pub after_repetition: usize,
    pub after_near: usize,
}

/// Output of [`CurationPipeline::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurationReport {
    /// Surviving documents in first-occurrence order
    pub documents: Vec<String>,
    pub stats: CurationStats,
}

/// Configured chain of curation stages.
#[derive(Debug, Clone)]
pub struct CurationPipeline {
    exact: Option<ExactDeduplicator>,
    repetition: Option<RepetitionFilter>,
    near: Option<NearDeduplicator>,
}

impl CurationPipeline {
    pub fn new(config: CurationConfig) -> Result<Self> {
        if let Some(filter) = &config.repetition {
            filter.validate()?;
        }
        let near = config.near.map(NearDeduplicator::new).transpose()?;
        Ok(Self {
            exact: config.exact.then(ExactDeduplicator::new),
            repetition: config.repetition,
            near,
        })
    }

    pub fn run<S: AsRef<str> + Sync>(&self, documents: &[S]) -> CurationReport {
        let mut stats = CurationStats {
            input: documents.len(),
            ..Default::default()
        };

        let mut current: Vec<String> = match &self.exact {
            Some(exact) => exact.remove_all_duplicates(documents),
            None => documents.iter().map(|d| d.as_ref().to_owned()).collect(),
        };
        stats.after_exact = current.len();

        if let Some(filter) = &self.repetition {
            current = filter.remove_repetitive(&current);
        }
        stats.after_repetition = current.len();

        if let Some(near) = &self.near {
            current = near.remove_near_duplicates(&current);
        }
        stats.after_near = current.len();

        info!(
            "Curation complete: {} → {} (exact) → {} (repetition) → {} (near) documents",
            stats.input, stats.after_exact, stats.after_repetition, stats.after_near
        );

        CurationReport {
            documents: current,
            stats,
        }
    }
}
