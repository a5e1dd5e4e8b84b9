//! Degenerate-repetition filters.
//!
//! Two independent predicates: a document dominated by one character, or a
//! document whose words are mostly repeats. Documents below the minimum size
//! are never rejected. Thresholds are exclusive upper bounds.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DataToolsError, Result};

/// Rejects documents where the most frequent character exceeds a ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharRepetitionFilter {
    /// Maximum allowed share of the most frequent character
    pub repeat_threshold: f64,
    /// Minimum length (in characters) before the filter applies
    pub min_length: usize,
}

impl Default for CharRepetitionFilter {
    fn default() -> Self {
        Self {
            repeat_threshold: 0.6,
            min_length: 10,
        }
    }
}

impl CharRepetitionFilter {
    pub fn new(repeat_threshold: f64, min_length: usize) -> Result<Self> {
        let filter = Self {
            repeat_threshold,
            min_length,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratio("char repeat_threshold", self.repeat_threshold)
    }

    /// Share of `text` taken by its most frequent character, or `None` when
    /// the text is shorter than `min_length`.
    pub fn dominant_ratio(&self, text: &str) -> Option<f64> {
        let mut counts: HashMap<char, usize> = HashMap::new();
        let mut total = 0usize;
        for ch in text.chars() {
            *counts.entry(ch).or_insert(0) += 1;
            total += 1;
        }
        if total == 0 || total < self.min_length {
            return None;
        }
        let max = counts.values().copied().max().unwrap_or(0);
        Some(max as f64 / total as f64)
    }

    pub fn is_repetitive(&self, text: &str) -> bool {
        self.dominant_ratio(text)
            .is_some_and(|ratio| ratio > self.repeat_threshold)
    }

    pub fn remove_repetitive<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Vec<String> {
        keep_where(documents, |doc| !self.is_repetitive(doc))
    }
}

/// Rejects documents whose word repetition ratio exceeds a threshold.
///
/// The repetition ratio is `1 - distinct / total` over whitespace-split words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordRepetitionFilter {
    pub repeat_threshold: f64,
    /// Minimum number of words before the filter applies
    pub min_words: usize,
}

impl Default for WordRepetitionFilter {
    fn default() -> Self {
        Self {
            repeat_threshold: 0.5,
            min_words: 5,
        }
    }
}

impl WordRepetitionFilter {
    pub fn new(repeat_threshold: f64, min_words: usize) -> Result<Self> {
        let filter = Self {
            repeat_threshold,
            min_words,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratio("word repeat_threshold", self.repeat_threshold)
    }

    pub fn repetition_ratio(&self, text: &str) -> Option<f64> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() || words.len() < self.min_words {
            return None;
        }
        let distinct: HashSet<&str> = words.iter().copied().collect();
        Some(1.0 - distinct.len() as f64 / words.len() as f64)
    }

    pub fn is_repetitive(&self, text: &str) -> bool {
        self.repetition_ratio(text)
            .is_some_and(|ratio| ratio > self.repeat_threshold)
    }

    pub fn remove_repetitive<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Vec<String> {
        keep_where(documents, |doc| !self.is_repetitive(doc))
    }
}

/// Character filter followed by word filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepetitionFilter {
    pub chars: CharRepetitionFilter,
    pub words: WordRepetitionFilter,
}

impl Default for RepetitionFilter {
    fn default() -> Self {
        Self {
            chars: CharRepetitionFilter {
                repeat_threshold: 0.7,
                ..Default::default()
            },
            words: WordRepetitionFilter {
                repeat_threshold: 0.6,
                ..Default::default()
            },
        }
    }
}

impl RepetitionFilter {
    /// Build the combined filter from the two thresholds, keeping default minimums.
    pub fn new(char_repeat_threshold: f64, word_repeat_threshold: f64) -> Result<Self> {
        Ok(Self {
            chars: CharRepetitionFilter::new(char_repeat_threshold, 10)?,
            words: WordRepetitionFilter::new(word_repeat_threshold, 5)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.chars.validate()?;
        self.words.validate()
    }

    pub fn is_repetitive(&self, text: &str) -> bool {
        self.chars.is_repetitive(text) || self.words.is_repetitive(text)
    }

    pub fn remove_repetitive<S: AsRef<str> + Sync>(&self, documents: &[S]) -> Vec<String> {
        let survivors = self.chars.remove_repetitive(documents);
        self.words.remove_repetitive(&survivors)
    }
}

fn validate_ratio(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DataToolsError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

/// Parallel order-preserving filter.
fn keep_where<S, F>(documents: &[S], keep: F) -> Vec<String>
where
    S: AsRef<str> + Sync,
    F: Fn(&str) -> bool + Sync,
{
    documents
        .par_iter()
        .map(|doc| doc.as_ref())
        .filter(|doc| keep(doc))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_filter_rejects_dominant_char() {
        let filter = CharRepetitionFilter::default();
        assert!(filter.is_repetitive("aaaaaaaaaaaaaaab"));
        assert!(!filter.is_repetitive("the quick brown fox"));
    }

    #[test]
    fn test_char_filter_boundary_is_exclusive() {
        let filter = CharRepetitionFilter::default();
        // exactly min_length chars, 6 of 10 are 'a' -> ratio == 0.6
        let text = "aaaaaabcde";
        assert_eq!(text.chars().count(), filter.min_length);
        assert_eq!(filter.dominant_ratio(text), Some(0.6));
        assert!(!filter.is_repetitive(text));
        assert!(filter.is_repetitive("aaaaaaabcd"));
    }

    #[test]
    fn test_short_documents_never_rejected() {
        let chars = CharRepetitionFilter::default();
        let words = WordRepetitionFilter::default();
        assert!(!chars.is_repetitive("aaaaaaaaa"));
        assert!(!words.is_repetitive("spam spam spam spam"));
        assert!(!chars.is_repetitive(""));
        assert!(!words.is_repetitive("   "));
    }

    #[test]
    fn test_char_filter_counts_scalars_not_bytes() {
        let filter = CharRepetitionFilter::default();
        // 10 characters, 20 bytes; dominant 'ب' is 5/10
        let text = "بببببلوچیا";
        assert_eq!(filter.dominant_ratio(text), Some(0.5));
    }

    #[test]
    fn test_word_filter_boundary_is_exclusive() {
        let filter = WordRepetitionFilter::default();
        // 10 words, 5 distinct -> ratio == 0.5
        let text = "a b c d e a b c d e";
        assert_eq!(filter.repetition_ratio(text), Some(0.5));
        assert!(!filter.is_repetitive(text));
        assert!(filter.is_repetitive("spam spam spam spam eggs"));
    }

    #[test]
    fn test_combined_filter_preserves_order() {
        let filter = RepetitionFilter::default();
        let docs = [
            "a perfectly ordinary sentence about nothing",
            "zzzzzzzzzzzzzzzzzzzz",
            "buy buy buy buy buy buy now",
            "another ordinary line",
        ];
        assert_eq!(filter.remove_repetitive(&docs), vec![docs[0], docs[3]]);
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        assert!(CharRepetitionFilter::new(1.5, 10).is_err());
        assert!(WordRepetitionFilter::new(-0.1, 5).is_err());
        assert!(RepetitionFilter::new(0.7, 0.6).is_ok());
    }
}
