//! Exact and canonically-exact duplicate removal.
//!
//! Each pass keeps the first occurrence of every canonical hash and preserves
//! the relative order of the survivors. Blank documents are not special here;
//! they dedup like any other text.

use std::collections::HashSet;

use crate::normalize::{Document, Normalization};

/// Order applied by [`ExactDeduplicator::remove_all_duplicates`].
const ALL_PASSES: [Normalization; 3] = [
    Normalization::Unicode,
    Normalization::Whitespace,
    Normalization::None,
];

/// Stateless exact deduplicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactDeduplicator;

impl ExactDeduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Keep the first document for each hash of its `normalization` form.
    pub fn remove_duplicates_with<S: AsRef<str>>(
        &self,
        documents: &[S],
        normalization: Normalization,
    ) -> Vec<String> {
        let documents = documents
            .iter()
            .map(|doc| Document::new(doc.as_ref(), normalization));
        self.dedup_documents(documents)
            .into_iter()
            .map(Document::into_text)
            .collect()
    }

    /// Keep the first of each run of documents sharing a hash.
    ///
    /// Documents hashed under different normalizations never compare equal.
    pub fn dedup_documents<I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut seen = HashSet::new();
        documents
            .into_iter()
            .filter(|doc| seen.insert((doc.normalization(), doc.hash())))
            .collect()
    }

    /// Byte-identical duplicates.
    pub fn remove_exact_duplicates<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        self.remove_duplicates_with(documents, Normalization::None)
    }

    /// Duplicates after NFC normalization.
    pub fn remove_normalized_duplicates<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        self.remove_duplicates_with(documents, Normalization::Unicode)
    }

    /// Duplicates after whitespace collapsing.
    pub fn remove_whitespace_duplicates<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        self.remove_duplicates_with(documents, Normalization::Whitespace)
    }

    /// Unicode, then whitespace, then raw passes; each consumes the previous output.
    pub fn remove_all_duplicates<S: AsRef<str>>(&self, documents: &[S]) -> Vec<String> {
        let mut current: Vec<String> = documents.iter().map(|d| d.as_ref().to_owned()).collect();
        for normalization in ALL_PASSES {
            current = self.remove_duplicates_with(&current, normalization);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_documents_keys_on_hash_and_normalization() {
        let docs = vec![
            Document::new("tea  time", Normalization::Whitespace),
            Document::new("tea time", Normalization::Whitespace),
            Document::new("tea time", Normalization::None),
            Document::new("tea time", Normalization::None),
        ];
        let kept = ExactDeduplicator::new().dedup_documents(docs);
        let texts: Vec<(&str, Normalization)> = kept
            .iter()
            .map(|doc| (doc.text(), doc.normalization()))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("tea  time", Normalization::Whitespace),
                ("tea time", Normalization::None),
            ]
        );
    }

    #[test]
    fn test_raw_dedup_counts_blank_entries() {
        let docs = ["a", "b", "a", "c", " ", " "];
        let unique = ExactDeduplicator::new().remove_exact_duplicates(&docs);
        assert_eq!(unique, vec!["a", "b", "c", " "]);
    }

    #[test]
    fn test_first_occurrence_order() {
        let docs = [
            "من بلوچے آں",
            "من ءَ بلوچی دوست بیت",
            "بلوچی زبان زندگ بات",
            "من ءَ بلوچی دوست بیت",
        ];
        let unique = ExactDeduplicator::new().remove_exact_duplicates(&docs);
        assert_eq!(unique, vec![docs[0], docs[1], docs[2]]);
    }

    #[test]
    fn test_idempotent() {
        let dedup = ExactDeduplicator::new();
        let docs = ["x  y", "x y", "x y", "caf\u{0065}\u{0301}", "caf\u{00e9}", ""];
        let once = dedup.remove_all_duplicates(&docs);
        let twice = dedup.remove_all_duplicates(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_whitespace_variants_collapse() {
        let docs = ["hello  world", " hello world ", "hello\tworld", "other"];
        let unique = ExactDeduplicator::new().remove_whitespace_duplicates(&docs);
        assert_eq!(unique, vec!["hello  world", "other"]);
    }

    #[test]
    fn test_remove_all_applies_every_pass() {
        let docs = ["caf\u{0065}\u{0301}", "caf\u{00e9}", "tea  time", "tea time", "tea  time"];
        let unique = ExactDeduplicator::new().remove_all_duplicates(&docs);
        assert_eq!(unique, vec![docs[0], docs[2]]);
    }

    #[test]
    fn test_empty_input() {
        let docs: [&str; 0] = [];
        assert!(ExactDeduplicator::new().remove_all_duplicates(&docs).is_empty());
    }
}
