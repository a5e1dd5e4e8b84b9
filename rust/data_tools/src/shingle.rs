//! Word and character n-gram shingling plus Jaccard similarity.
//!
//! Shingles are stored as 64-bit xxh3 fingerprints rather than owned strings,
//! which keeps one retained set per accepted document cheap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Granularity of an n-gram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShingleMode {
    /// N consecutive whitespace-separated words
    #[default]
    Word,
    /// N consecutive characters of the trimmed text
    Char,
}

/// Set of shingle fingerprints for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShingleSet {
    hashes: HashSet<u64>,
}

impl ShingleSet {
    /// Build the shingle set of `text`.
    ///
    /// Empty when the text has fewer than `size` units (words or characters),
    /// or when `size` is zero.
    pub fn from_text(text: &str, size: usize, mode: ShingleMode) -> Self {
        if size == 0 {
            return Self::default();
        }
        match mode {
            ShingleMode::Word => Self::words(text, size),
            ShingleMode::Char => Self::chars(text, size),
        }
    }

    fn words(text: &str, size: usize) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < size {
            return Self::default();
        }
        // Words never contain whitespace, so a space-joined window is unambiguous.
        let hashes = words
            .windows(size)
            .map(|window| xxh3_64_with_seed(window.join(" ").as_bytes(), 0))
            .collect();
        Self { hashes }
    }

    fn chars(text: &str, size: usize) -> Self {
        let text = text.trim();
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let count = bounds.len();
        if count < size {
            return Self::default();
        }
        bounds.push(text.len());
        let hashes = (0..=count - size)
            .map(|start| {
                let slice = &text[bounds[start]..bounds[start + size]];
                xxh3_64_with_seed(slice.as_bytes(), 0)
            })
            .collect();
        Self { hashes }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn contains(&self, fingerprint: u64) -> bool {
        self.hashes.contains(&fingerprint)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.hashes.iter().copied()
    }

    /// Jaccard similarity with `other`.
    pub fn jaccard(&self, other: &ShingleSet) -> f64 {
        jaccard(self, other)
    }
}

impl FromIterator<u64> for ShingleSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            hashes: iter.into_iter().collect(),
        }
    }
}

/// `|A ∩ B| / |A ∪ B|`, defined as 0.0 when either set is empty.
pub fn jaccard(a: &ShingleSet, b: &ShingleSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.hashes.iter().filter(|h| large.hashes.contains(*h)).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
