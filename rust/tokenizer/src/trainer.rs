//! BPE Tokenizer Training
//!
//! Learns character-level merge rules by iteratively finding and merging
//! the most frequent adjacent symbol pair in a word-frequency table.
//!
//! Algorithm:
//! 1. Split documents on whitespace and count word frequencies
//! 2. Represent each distinct word as a sequence of character symbols
//! 3. Count all adjacent pair frequencies, weighted by word count (parallelized with rayon)
//! 4. Merge the most frequent pair, recording it as the next-ranked rule
//! 5. Repeat until the merge budget is spent or no pair is left
//!
//! Ties on frequency go to the lexicographically smallest `(left, right)`
//! pair, so identical input always yields identical rules.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenizerError};
use crate::tokenizer::TrainedModel;
use crate::vocab::{MergeRules, Vocab};

/// Vocabulary entry that separates words in encoded output.
pub const SPACE_TOKEN: &str = " ";

/// Configuration for BPE training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Target vocabulary size; bounds the number of merges learned
    pub vocab_size: usize,
    /// Reserved tokens, assigned the lowest IDs in this order
    pub special_tokens: Vec<String>,
    /// Special token substituted for characters outside the vocabulary
    pub unk_token: String,
    /// Headroom kept out of the merge budget for atomic characters
    pub reserved_margin: usize,
    /// Minimum weighted frequency for a pair to be merged
    pub min_frequency: u64,
    /// Log progress every N merges (0 disables)
    pub log_interval: usize,
    /// Also add corpus characters that no merge rule uses
    pub cover_alphabet: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 5000,
            special_tokens: vec![
                "<pad>".into(),
                "<unk>".into(),
                "<s>".into(),
                "</s>".into(),
            ],
            unk_token: "<unk>".into(),
            reserved_margin: 100,
            min_frequency: 1,
            log_interval: 1000,
            cover_alphabet: false,
        }
    }
}

impl TrainerConfig {
    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        if !self.special_tokens.contains(&self.unk_token) {
            return Err(TokenizerError::InvalidConfig(format!(
                "unk_token {:?} must be one of the special tokens",
                self.unk_token
            )));
        }
        let mut seen = BTreeSet::new();
        for token in &self.special_tokens {
            if token.is_empty() {
                return Err(TokenizerError::InvalidConfig(
                    "special tokens must not be empty".into(),
                ));
            }
            if !seen.insert(token.as_str()) {
                return Err(TokenizerError::InvalidConfig(format!(
                    "special token {token:?} listed more than once"
                )));
            }
        }
        if self.min_frequency == 0 {
            return Err(TokenizerError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        if self.vocab_size > u32::MAX as usize {
            return Err(TokenizerError::InvalidConfig(format!(
                "vocab_size ({}) exceeds the maximum representable token id",
                self.vocab_size
            )));
        }
        Ok(())
    }

    /// Upper bound on learned merges.
    pub fn max_merges(&self) -> usize {
        self.vocab_size
            .saturating_sub(self.special_tokens.len() + self.reserved_margin)
    }
}

/// A distinct word as a sequence of symbol-table indices, with its frequency.
#[derive(Debug, Clone)]
struct Word {
    symbols: Vec<u32>,
    count: u64,
}

/// Interned symbol strings; merges create new entries.
#[derive(Debug, Default)]
struct SymbolTable {
    symbols: Vec<String>,
    index: HashMap<String, u32>,
}

impl SymbolTable {
    fn intern(&mut self, symbol: &str) -> u32 {
        if let Some(&id) = self.index.get(symbol) {
            return id;
        }
        let id = self.symbols.len() as u32;
        self.symbols.push(symbol.to_owned());
        self.index.insert(symbol.to_owned(), id);
        id
    }

    fn get(&self, id: u32) -> &str {
        &self.symbols[id as usize]
    }

    /// Lexicographic order of two pairs by their symbol strings.
    fn cmp_pairs(&self, a: (u32, u32), b: (u32, u32)) -> Ordering {
        (self.get(a.0), self.get(a.1)).cmp(&(self.get(b.0), self.get(b.1)))
    }
}

/// BPE Trainer: learns merge rules from a text corpus.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    /// Create a new trainer with the given configuration.
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train from text files, one document per file.
    pub fn train_from_files<P: AsRef<Path>>(&self, file_paths: &[P]) -> Result<TrainedModel> {
        let mut documents = Vec::with_capacity(file_paths.len());
        for path in file_paths {
            let path = path.as_ref();
            let content = fs::read_to_string(path)
                .map_err(|err| TokenizerError::io(err, Some(path.to_path_buf())))?;
            documents.push(content);
        }
        self.train(&documents)
    }

    /// Train from a single block of text.
    pub fn train_from_text(&self, text: &str) -> Result<TrainedModel> {
        self.train(&[text])
    }

    /// Train from an ordered document sequence.
    pub fn train<S: AsRef<str>>(&self, documents: &[S]) -> Result<TrainedModel> {
        let word_counts = word_frequencies(documents);
        self.train_from_word_counts(&word_counts)
    }

    /// Train from pre-counted words.
    pub fn train_from_word_counts(
        &self,
        word_counts: &HashMap<String, u64>,
    ) -> Result<TrainedModel> {
        self.config.validate()?;

        // Sorted so symbol interning (and thus logs) is reproducible
        let mut distinct: Vec<(&String, &u64)> = word_counts.iter().collect();
        distinct.sort_unstable();

        let mut table = SymbolTable::default();
        let mut alphabet = BTreeSet::new();
        let mut words: Vec<Word> = distinct
            .into_iter()
            .map(|(word, &count)| Word {
                symbols: word
                    .chars()
                    .map(|ch| {
                        alphabet.insert(ch);
                        table.intern(ch.encode_utf8(&mut [0u8; 4]))
                    })
                    .collect(),
                count,
            })
            .collect();

        let max_merges = self.config.max_merges();
        info!(
            "Training BPE: {} unique words, {} base characters, target {} merges",
            words.len(),
            alphabet.len(),
            max_merges
        );

        let mut merges = MergeRules::new();
        for merge_num in 0..max_merges {
            let pair_counts = count_pairs(&words);

            // Highest count first, then the lexicographically smallest pair
            let best_pair = pair_counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| table.cmp_pairs(*b.0, *a.0)));

            match best_pair {
                Some((&(left, right), &count)) if count >= self.config.min_frequency => {
                    let merged = format!("{}{}", table.get(left), table.get(right));
                    let rank = merges.push(table.get(left), table.get(right));
                    let new_id = table.intern(&merged);

                    apply_merge(&mut words, left, right, new_id);

                    if self.config.log_interval > 0
                        && (merge_num + 1) % self.config.log_interval == 0
                    {
                        info!(
                            "  Merge {}/{}: ({:?}, {:?}) → {:?} (rank={}, freq={})",
                            merge_num + 1,
                            max_merges,
                            table.get(left),
                            table.get(right),
                            merged,
                            rank,
                            count
                        );
                    }
                }
                Some((_, &count)) => {
                    info!(
                        "  Stopping early at merge {}: best pair frequency {} below min_frequency={}",
                        merge_num, count, self.config.min_frequency
                    );
                    break;
                }
                None => {
                    info!("  Stopping early at merge {merge_num}: no adjacent pairs left");
                    break;
                }
            }
        }

        let alphabet = if self.config.cover_alphabet {
            alphabet
        } else {
            BTreeSet::new()
        };
        let vocab = assemble_vocab(&self.config.special_tokens, &merges, &alphabet);

        info!(
            "Training complete: {} merges learned, vocab size = {}",
            merges.len(),
            vocab.len()
        );

        Ok(TrainedModel::new(
            vocab,
            merges,
            self.config.special_tokens.clone(),
            self.config.unk_token.clone(),
        ))
    }
}

/// Word → occurrence count over whitespace-split documents.
pub fn word_frequencies<S: AsRef<str>>(documents: &[S]) -> HashMap<String, u64> {
    let mut word_counts: HashMap<String, u64> = HashMap::new();
    for document in documents {
        for word in document.as_ref().split_whitespace() {
            *word_counts.entry(word.to_owned()).or_insert(0) += 1;
        }
    }
    word_counts
}

/// Build the final vocabulary in its fixed construction order:
/// specials, every rule operand (sorted, multi-character ones included),
/// merged tokens (rank order), any extra `alphabet` characters (sorted), then
/// the space token.
/// Tokens already present are skipped, keeping IDs dense.
pub fn assemble_vocab(
    special_tokens: &[String],
    merges: &MergeRules,
    alphabet: &BTreeSet<char>,
) -> Vocab {
    let mut vocab = Vocab::new();
    for token in special_tokens {
        vocab.push(token);
    }

    let operands: BTreeSet<&str> = merges
        .iter()
        .flat_map(|rule| [rule.left.as_str(), rule.right.as_str()])
        .collect();
    for operand in operands {
        vocab.push(operand);
    }

    for rule in merges {
        vocab.push(&rule.merged());
    }

    for ch in alphabet {
        vocab.push(ch.encode_utf8(&mut [0u8; 4]));
    }

    vocab.push(SPACE_TOKEN);
    debug!("Assembled vocabulary with {} tokens", vocab.len());
    vocab
}

/// Adjacent symbol-index pairs, each weighted by the corpus count of the
/// word it occurs in.
fn count_pairs(words: &[Word]) -> HashMap<(u32, u32), u64> {
    let chunk_counts: Vec<HashMap<(u32, u32), u64>> = words
        .par_chunks(1000)
        .map(|chunk| {
            let mut counts: HashMap<(u32, u32), u64> = HashMap::new();
            for word in chunk {
                for window in word.symbols.windows(2) {
                    let pair = (window[0], window[1]);
                    *counts.entry(pair).or_insert(0) += word.count;
                }
            }
            counts
        })
        .collect();

    let mut total_counts: HashMap<(u32, u32), u64> = HashMap::new();
    for chunk in chunk_counts {
        for (pair, count) in chunk {
            *total_counts.entry(pair).or_insert(0) += count;
        }
    }

    total_counts
}

/// Apply a merge to all words: replace all occurrences of (left, right) with new_id.
fn apply_merge(words: &mut [Word], left: u32, right: u32, new_id: u32) {
    words.par_iter_mut().for_each(|word| {
        if word.symbols.len() < 2 {
            return;
        }
        let mut i = 0;
        let mut new_symbols = Vec::with_capacity(word.symbols.len());

        while i < word.symbols.len() {
            if i + 1 < word.symbols.len()
                && word.symbols[i] == left
                && word.symbols[i + 1] == right
            {
                new_symbols.push(new_id);
                i += 2;
            } else {
                new_symbols.push(word.symbols[i]);
                i += 1;
            }
        }

        word.symbols = new_symbols;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vocab_size: usize, reserved_margin: usize) -> TrainerConfig {
        TrainerConfig {
            vocab_size,
            reserved_margin,
            log_interval: 0,
            ..Default::default()
        }
    }

    fn rule_pairs(model: &TrainedModel) -> Vec<(String, String, u32)> {
        model
            .merges()
            .iter()
            .map(|rule| (rule.left.clone(), rule.right.clone(), rule.rank))
            .collect()
    }

    #[test]
    fn test_word_frequencies_skip_blank() {
        let counts = word_frequencies(&["the cat  the", "   ", "\tcat\n"]);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["the"], 2);
        assert_eq!(counts["cat"], 2);
    }

    #[test]
    fn test_frequent_pairs_merge_first() {
        // "ab" appears 5 times, "cd" appears 2 times
        let trainer = Trainer::new(config(6, 0));
        let model = trainer.train_from_text("ab ab ab ab ab cd cd").unwrap();
        let rules = rule_pairs(&model);
        assert_eq!(rules[0], ("a".into(), "b".into(), 0));
        assert_eq!(rules[1], ("c".into(), "d".into(), 1));
    }

    #[test]
    fn test_ties_break_lexicographically() {
        let trainer = Trainer::new(config(5, 0));
        // every pair occurs once; ("b","a") < ("y","z") < ("z","y")
        let model = trainer.train_from_text("zy yz ba").unwrap();
        assert_eq!(rule_pairs(&model)[0], ("b".into(), "a".into(), 0));
    }

    #[test]
    fn test_merges_build_on_previous_merges() {
        let trainer = Trainer::new(config(100, 0));
        let model = trainer.train_from_text("abc abc abc").unwrap();
        let rules = rule_pairs(&model);
        assert_eq!(
            rules,
            vec![
                ("a".into(), "b".into(), 0),
                ("ab".into(), "c".into(), 1),
            ]
        );
    }

    #[test]
    fn test_vocab_construction_order() {
        let trainer = Trainer::new(config(6, 0));
        let model = trainer.train_from_text("ab ab cd").unwrap();
        let tokens: Vec<&str> = model.vocab().iter().map(|(_, token)| token).collect();
        assert_eq!(
            tokens,
            vec!["<pad>", "<unk>", "<s>", "</s>", "a", "b", "c", "d", "ab", "cd", " "]
        );
    }

    #[test]
    fn test_vocab_sorts_merged_operands_with_chars() {
        let trainer = Trainer::new(config(10_000, 0));
        let model = trainer.train_from_text("abc abc abc").unwrap();
        let tokens: Vec<&str> = model.vocab().iter().map(|(_, token)| token).collect();
        // "ab" is an operand of the second rule, so it sorts between "a" and "b"
        assert_eq!(
            tokens,
            vec!["<pad>", "<unk>", "<s>", "</s>", "a", "ab", "b", "c", "abc", " "]
        );
    }

    #[test]
    fn test_stops_when_words_fully_merged() {
        let trainer = Trainer::new(config(10_000, 0));
        let model = trainer.train_from_text("hello hello world").unwrap();
        // "hello" needs 4 merges and "world" 4 more
        assert_eq!(model.merges().len(), 8);
    }

    #[test]
    fn test_min_frequency_cutoff() {
        let trainer = Trainer::new(TrainerConfig {
            min_frequency: 100,
            ..config(300, 0)
        });
        let model = trainer.train_from_text("hello world").unwrap();
        assert_eq!(model.merges().len(), 0);
    }

    #[test]
    fn test_empty_corpus_yields_specials_and_space() {
        let trainer = Trainer::new(config(300, 0));
        let model = trainer.train::<&str>(&[]).unwrap();
        assert_eq!(model.vocab().len(), 5);
        assert_eq!(model.vocab().get_id(SPACE_TOKEN), Some(4));
        assert!(model.merges().is_empty());
    }

    #[test]
    fn test_reserved_margin_limits_merges() {
        // 4 specials + 100 margin leaves exactly 2 merges
        let trainer = Trainer::new(config(106, 100));
        let model = trainer.train_from_text("abcdef abcdef").unwrap();
        assert_eq!(model.merges().len(), 2);
    }

    #[test]
    fn test_cover_alphabet_adds_unmerged_chars() {
        let trainer = Trainer::new(TrainerConfig {
            cover_alphabet: true,
            ..config(5, 0)
        });
        let model = trainer.train_from_text("ab ab x").unwrap();
        let tokens: Vec<&str> = model.vocab().iter().map(|(_, token)| token).collect();
        assert_eq!(
            tokens,
            vec!["<pad>", "<unk>", "<s>", "</s>", "a", "b", "ab", "x", " "]
        );
    }

    #[test]
    fn test_invalid_config() {
        let missing_unk = TrainerConfig {
            special_tokens: vec!["<pad>".into()],
            ..Default::default()
        };
        assert!(matches!(
            Trainer::new(missing_unk).train(&["a b"]),
            Err(TokenizerError::InvalidConfig(_))
        ));

        let duplicated = TrainerConfig {
            special_tokens: vec!["<unk>".into(), "<unk>".into()],
            ..Default::default()
        };
        assert!(duplicated.validate().is_err());
    }

    #[test]
    fn test_train_from_files_reports_path() {
        let trainer = Trainer::new(config(100, 0));
        let err = trainer
            .train_from_files(&["/definitely/not/here.txt"])
            .unwrap_err();
        assert!(matches!(err, TokenizerError::Io { path: Some(_), .. }));
    }
}
