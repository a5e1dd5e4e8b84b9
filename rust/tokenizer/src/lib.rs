//! BalNLP Tokenizer: character-level BPE subword tokenizer.
//!
//! This crate learns a subword vocabulary for a curated corpus and applies it
//! deterministically. It supports:
//!
//! - Character-level BPE over whitespace-separated words
//! - Special tokens at the lowest IDs (`<pad>`, `<unk>`, `<s>`, `</s>`, ...)
//! - Parallel pair counting on large corpora via rayon
//! - Persistence to a directory bundle (`tokenizer_config.json`,
//!   `vocab.json`, `merges.txt`)
//! - Encode/decode with ranked merge rules
//!
//! ## Architecture
//!
//! 1. Count word frequencies and split every word into characters
//! 2. Iteratively merge the most frequent adjacent symbol pair
//! 3. Stop at the merge budget (`vocab_size - specials - reserved_margin`)
//!    or when no pair is left
//! 4. Assemble the vocabulary: specials, characters, merged tokens, space
//!
//! ## Usage
//!
//! ```rust
//! use balnlp_tokenizer::{BpeTokenizer, TrainerConfig};
//!
//! let mut tokenizer = BpeTokenizer::new(TrainerConfig {
//!     vocab_size: 300,
//!     ..Default::default()
//! });
//! tokenizer.train(&["hello world", "hello there"]).unwrap();
//!
//! let encoded = tokenizer.encode("hello world").unwrap();
//! let decoded = tokenizer.decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello world");
//! ```

pub mod error;
pub mod persist;
pub mod tokenizer;
pub mod trainer;
pub mod vocab;

#[cfg(feature = "python")]
pub mod python;

// Re-export main types
pub use error::{Artifact, Result, TokenizerError};
pub use tokenizer::{BpeTokenizer, TrainedModel, VocabStats};
pub use trainer::{Trainer, TrainerConfig, SPACE_TOKEN};
pub use vocab::{MergeRule, MergeRules, TokenId, Vocab};
