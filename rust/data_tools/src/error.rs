//! Errors raised while configuring curation stages.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = DataToolsError> = std::result::Result<T, E>;

/// Failures reported by the curation stages.
///
/// The filters themselves never fail on input text; only a malformed
/// configuration is rejected, at construction time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataToolsError {
    /// A stage configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
