//! Vocabulary and merge-rule tables for the character-level BPE tokenizer.
//!
//! IDs are dense: a vocabulary of `n` tokens always holds exactly the IDs
//! `0..n`, and the inverse mapping is kept in step with the forward one.
//! Merge rules are ranked by learning order; a lower rank wins at encode time.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Token identifier.
pub type TokenId = u32;

/// Dense token ↔ ID mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocab {
    /// Token ID → token string (index is the ID)
    id_to_token: Vec<String>,
    /// Token string → token ID (for encoding)
    token_to_id: HashMap<String, TokenId>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a vocabulary from `(token, id)` pairs.
    ///
    /// Fails unless the IDs are unique and cover exactly `0..n`.
    pub fn from_entries<I>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, TokenId)>,
    {
        let mut by_id: BTreeMap<TokenId, String> = BTreeMap::new();
        for (token, id) in entries {
            if let Some(previous) = by_id.insert(id, token) {
                return Err(format!("id {id} assigned to more than one token ({previous:?})"));
            }
        }
        let mut vocab = Self::new();
        for (expected, (id, token)) in by_id.into_iter().enumerate() {
            if id as usize != expected {
                return Err(format!("ids are not dense: expected {expected}, found {id}"));
            }
            vocab.push(&token);
        }
        Ok(vocab)
    }

    /// Add `token` with the next free ID, or return its existing ID.
    pub fn push(&mut self, token: &str) -> TokenId {
        if let Some(&id) = self.token_to_id.get(token) {
            return id;
        }
        let id = self.id_to_token.len() as TokenId;
        self.id_to_token.push(token.to_owned());
        self.token_to_id.insert(token.to_owned(), id);
        id
    }

    pub fn get_id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    pub fn get_token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// `(id, token)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> {
        self.id_to_token
            .iter()
            .enumerate()
            .map(|(id, token)| (id as TokenId, token.as_str()))
    }
}

/// Serialized as a JSON object `token → id`, written in ID order.
impl Serialize for Vocab {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (id, token) in self.iter() {
            map.serialize_entry(token, &id)?;
        }
        map.end()
    }
}

/// A single merge rule: `left` + `right` → `left ++ right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeRule {
    pub left: String,
    pub right: String,
    /// Learning order, 0 = learned first
    pub rank: u32,
}

impl MergeRule {
    /// The token produced by this merge.
    pub fn merged(&self) -> String {
        let mut merged = String::with_capacity(self.left.len() + self.right.len());
        merged.push_str(&self.left);
        merged.push_str(&self.right);
        merged
    }
}

/// Ranked merge rules with pair → rank lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRules {
    /// Rules ordered by ascending rank
    rules: Vec<MergeRule>,
    /// left → right → rank, so lookups borrow `&str`
    ranks: HashMap<String, HashMap<String, u32>>,
}

impl MergeRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from `(left, right, rank)` triples.
    ///
    /// Ranks may be sparse. If a pair is listed twice the later rank wins.
    pub fn from_ranked<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (String, String, u32)>,
    {
        let mut by_pair: HashMap<(String, String), u32> = HashMap::new();
        for (left, right, rank) in triples {
            by_pair.insert((left, right), rank);
        }
        let mut rules: Vec<MergeRule> = by_pair
            .into_iter()
            .map(|((left, right), rank)| MergeRule { left, right, rank })
            .collect();
        rules.sort_by_key(|rule| rule.rank);

        let mut merges = Self::new();
        for rule in rules {
            merges.insert(rule);
        }
        merges
    }

    /// Append a rule ranked after every existing one; returns its rank.
    pub fn push(&mut self, left: &str, right: &str) -> u32 {
        let rank = self.next_rank();
        self.insert(MergeRule {
            left: left.to_owned(),
            right: right.to_owned(),
            rank,
        });
        rank
    }

    fn insert(&mut self, rule: MergeRule) {
        self.ranks
            .entry(rule.left.clone())
            .or_default()
            .insert(rule.right.clone(), rule.rank);
        self.rules.push(rule);
    }

    fn next_rank(&self) -> u32 {
        self.rules.last().map_or(0, |rule| rule.rank + 1)
    }

    /// Rank of the `(left, right)` merge, if learned.
    pub fn rank(&self, left: &str, right: &str) -> Option<u32> {
        self.ranks.get(left)?.get(right).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in ascending rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, MergeRule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a MergeRules {
    type Item = &'a MergeRule;
    type IntoIter = std::slice::Iter<'a, MergeRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_dense_ids() {
        let mut vocab = Vocab::new();
        assert_eq!(vocab.push("<pad>"), 0);
        assert_eq!(vocab.push("a"), 1);
        assert_eq!(vocab.push("<pad>"), 0); // already present
        assert_eq!(vocab.push("ab"), 2);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get_token(2), Some("ab"));
        assert_eq!(vocab.get_id("a"), Some(1));
        assert_eq!(vocab.get_token(3), None);
    }

    #[test]
    fn test_from_entries_validates_density() {
        let ok = Vocab::from_entries(vec![("b".to_string(), 1), ("a".to_string(), 0)]).unwrap();
        assert_eq!(ok.iter().collect::<Vec<_>>(), vec![(0, "a"), (1, "b")]);

        assert!(Vocab::from_entries(vec![("a".to_string(), 0), ("b".to_string(), 2)]).is_err());
        assert!(Vocab::from_entries(vec![("a".to_string(), 0), ("b".to_string(), 0)]).is_err());
    }

    #[test]
    fn test_serializes_in_id_order() {
        let mut vocab = Vocab::new();
        vocab.push("z");
        vocab.push("a");
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"{"z":0,"a":1}"#);
    }

    #[test]
    fn test_merge_rules_rank_lookup() {
        let mut merges = MergeRules::new();
        assert_eq!(merges.push("a", "b"), 0);
        assert_eq!(merges.push("ab", "c"), 1);
        assert_eq!(merges.rank("a", "b"), Some(0));
        assert_eq!(merges.rank("ab", "c"), Some(1));
        assert_eq!(merges.rank("b", "a"), None);
        assert_eq!(merges.iter().map(MergeRule::merged).collect::<Vec<_>>(), vec!["ab", "abc"]);
    }

    #[test]
    fn test_from_ranked_sparse_and_duplicates() {
        let merges = MergeRules::from_ranked(vec![
            ("a".to_string(), "b".to_string(), 0),
            ("c".to_string(), "d".to_string(), 2),
            ("a".to_string(), "b".to_string(), 3),
        ]);
        assert_eq!(merges.len(), 2);
        assert_eq!(merges.rank("c", "d"), Some(2));
        assert_eq!(merges.rank("a", "b"), Some(3));
        let ranks: Vec<u32> = merges.iter().map(|rule| rule.rank).collect();
        assert_eq!(ranks, vec![2, 3]);
    }
}
