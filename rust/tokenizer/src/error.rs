//! Error handling for training, encoding and persistence.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = TokenizerError> = std::result::Result<T, E>;

/// One of the three files of a persisted tokenizer bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Config,
    Vocab,
    Merges,
}

impl Artifact {
    /// File name inside the bundle directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Config => "tokenizer_config.json",
            Artifact::Vocab => "vocab.json",
            Artifact::Merges => "merges.txt",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Config => "config",
            Artifact::Vocab => "vocab",
            Artifact::Merges => "merges",
        };
        f.write_str(name)
    }
}

/// Failures raised by the tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Encode/decode/save called before `train` or `load`.
    #[error("tokenizer is not trained; call train() or load() first")]
    NotTrained,
    /// Training configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A mandatory bundle file does not exist.
    #[error("missing {artifact} artifact at {path:?}")]
    MissingArtifact { artifact: Artifact, path: PathBuf },
    /// A bundle file exists but could not be parsed.
    #[error("malformed {artifact} artifact: {reason}")]
    CorruptArtifact { artifact: Artifact, reason: String },
    /// A special token needed for encoding is absent from the vocabulary.
    #[error("special token {0:?} is not in the vocabulary")]
    MissingSpecialToken(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
}

impl TokenizerError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    pub(crate) fn corrupt(artifact: Artifact, reason: impl Into<String>) -> Self {
        Self::CorruptArtifact {
            artifact,
            reason: reason.into(),
        }
    }
}
