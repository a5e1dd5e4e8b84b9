//! Encoding and decoding with learned merge rules.
//!
//! [`TrainedModel`] is the immutable result of training or loading.
//! [`BpeTokenizer`] wraps an optional model and refuses to encode or decode
//! until one is present.

use std::path::Path;

use rayon::prelude::*;

use crate::error::{Result, TokenizerError};
use crate::persist;
use crate::trainer::{Trainer, TrainerConfig, SPACE_TOKEN};
use crate::vocab::{MergeRules, TokenId, Vocab};

/// Rendered by [`TrainedModel::decode`] for an ID with no vocabulary entry.
pub const UNKNOWN_ID_PLACEHOLDER: char = '?';

/// Vocabulary, merge rules and special tokens produced by training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedModel {
    vocab: Vocab,
    merges: MergeRules,
    special_tokens: Vec<String>,
    unk_token: String,
}

/// Token counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VocabStats {
    pub total: usize,
    pub special: usize,
    /// Single-character tokens, including the space token
    pub single_char: usize,
    /// Multi-character tokens produced by merges
    pub merged: usize,
}

impl TrainedModel {
    pub fn new(
        vocab: Vocab,
        merges: MergeRules,
        special_tokens: Vec<String>,
        unk_token: String,
    ) -> Self {
        Self {
            vocab,
            merges,
            special_tokens,
            unk_token,
        }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn merges(&self) -> &MergeRules {
        &self.merges
    }

    pub fn special_tokens(&self) -> &[String] {
        &self.special_tokens
    }

    pub fn unk_token(&self) -> &str {
        &self.unk_token
    }

    fn is_special(&self, token: &str) -> bool {
        self.special_tokens.iter().any(|special| special == token)
    }

    /// Segment one word into symbols.
    ///
    /// Repeatedly applies the lowest-ranked applicable merge anywhere in the
    /// word (leftmost on ties) until none applies.
    pub fn segment_word(&self, word: &str) -> Vec<String> {
        let mut symbols: Vec<String> = word.chars().map(String::from).collect();

        while symbols.len() > 1 {
            let best = symbols
                .windows(2)
                .enumerate()
                .filter_map(|(i, pair)| {
                    self.merges
                        .rank(&pair[0], &pair[1])
                        .map(|rank| (rank, i))
                })
                .min();

            let Some((_, idx)) = best else {
                break; // No more merges applicable
            };
            let right = symbols.remove(idx + 1);
            symbols[idx].push_str(&right);
        }

        symbols
    }

    /// Encode text to token IDs.
    ///
    /// Words are separated by the space token; symbols missing from the
    /// vocabulary fall back to their characters, then to the unknown token.
    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let unk_id = self.vocab.get_id(&self.unk_token);
        let lookup_unk = || {
            unk_id.ok_or_else(|| TokenizerError::MissingSpecialToken(self.unk_token.clone()))
        };

        let mut ids = Vec::new();
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                match self.vocab.get_id(SPACE_TOKEN) {
                    Some(space_id) => ids.push(space_id),
                    None => ids.push(lookup_unk()?),
                }
            }
            for symbol in self.segment_word(word) {
                if let Some(id) = self.vocab.get_id(&symbol) {
                    ids.push(id);
                    continue;
                }
                for ch in symbol.chars() {
                    match self.vocab.get_id(ch.encode_utf8(&mut [0u8; 4])) {
                        Some(id) => ids.push(id),
                        None => ids.push(lookup_unk()?),
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Decode token IDs to text.
    ///
    /// Special tokens are dropped; unknown IDs render as
    /// [`UNKNOWN_ID_PLACEHOLDER`]. Nothing is inserted between tokens.
    pub fn decode(&self, ids: &[TokenId]) -> String {
        let mut text = String::new();
        for &id in ids {
            match self.vocab.get_token(id) {
                Some(token) if token != SPACE_TOKEN && self.is_special(token) => {}
                Some(token) => text.push_str(token),
                None => text.push(UNKNOWN_ID_PLACEHOLDER),
            }
        }
        text
    }

    /// Encode and map each ID back to its token string.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let ids = self.encode(text)?;
        Ok(ids
            .into_iter()
            .map(|id| {
                self.vocab
                    .get_token(id)
                    .unwrap_or(self.unk_token.as_str())
                    .to_owned()
            })
            .collect())
    }

    pub fn stats(&self) -> VocabStats {
        let mut stats = VocabStats {
            total: self.vocab.len(),
            ..Default::default()
        };
        for (_, token) in self.vocab.iter() {
            if self.is_special(token) {
                stats.special += 1;
            } else if token.chars().count() == 1 {
                stats.single_char += 1;
            } else {
                stats.merged += 1;
            }
        }
        stats
    }
}

/// Trainable, persistable BPE tokenizer.
#[derive(Debug, Clone, Default)]
pub struct BpeTokenizer {
    config: TrainerConfig,
    model: Option<TrainedModel>,
    trained: bool,
}

impl BpeTokenizer {
    /// An untrained tokenizer with the given training configuration.
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            model: None,
            trained: false,
        }
    }

    /// Wrap an existing model.
    pub fn from_model(config: TrainerConfig, model: TrainedModel) -> Self {
        Self {
            config,
            model: Some(model),
            trained: true,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.trained && self.model.is_some()
    }

    /// The trained model, if any.
    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    fn trained_model(&self) -> Result<&TrainedModel> {
        match &self.model {
            Some(model) if self.trained => Ok(model),
            _ => Err(TokenizerError::NotTrained),
        }
    }

    /// Learn merges and vocabulary from `documents`, replacing any prior state.
    pub fn train<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<&TrainedModel> {
        let model = Trainer::new(self.config.clone()).train(documents)?;
        self.trained = true;
        Ok(self.model.insert(model))
    }

    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        self.trained_model()?.encode(text)
    }

    /// Encode many texts in parallel, preserving order.
    pub fn encode_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Result<Vec<Vec<TokenId>>> {
        let model = self.trained_model()?;
        texts
            .par_iter()
            .map(|text| model.encode(text.as_ref()))
            .collect()
    }

    /// Encode `text` and split the IDs into windows of at most `max_length`.
    ///
    /// A sequence that already fits is returned as a single window.
    pub fn encode_chunked(&self, text: &str, max_length: usize) -> Result<Vec<Vec<TokenId>>> {
        if max_length == 0 {
            return Err(TokenizerError::InvalidConfig(
                "max_length must be greater than zero".into(),
            ));
        }
        let ids = self.encode(text)?;
        if ids.len() <= max_length {
            return Ok(vec![ids]);
        }
        Ok(ids.chunks(max_length).map(<[TokenId]>::to_vec).collect())
    }

    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        Ok(self.trained_model()?.decode(ids))
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        self.trained_model()?.tokenize(text)
    }

    /// Number of tokens in the vocabulary (0 when untrained).
    pub fn vocab_size(&self) -> usize {
        self.model.as_ref().map_or(0, |model| model.vocab().len())
    }

    pub fn stats(&self) -> Result<VocabStats> {
        Ok(self.trained_model()?.stats())
    }

    /// Write the tokenizer bundle into `dir`, creating it if needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let model = self.model.as_ref().ok_or(TokenizerError::NotTrained)?;
        persist::save_bundle(dir.as_ref(), model, self.trained)
    }

    /// Load a tokenizer bundle from `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let (config, model) = persist::load_bundle(dir.as_ref())?;
        let trained = config.trained;
        Ok(Self {
            config: TrainerConfig {
                vocab_size: config.vocab_size,
                special_tokens: config.special_tokens,
                unk_token: config.unk_token,
                ..Default::default()
            },
            model: Some(model),
            trained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_merges(pairs: &[(&str, &str)]) -> TrainedModel {
        let mut merges = MergeRules::new();
        for (left, right) in pairs {
            merges.push(left, right);
        }
        let specials: Vec<String> = vec!["<pad>".into(), "<unk>".into()];
        let vocab = crate::trainer::assemble_vocab(&specials, &merges, &Default::default());
        TrainedModel::new(vocab, merges, specials, "<unk>".into())
    }

    fn trained(corpus: &[&str]) -> BpeTokenizer {
        let mut tokenizer = BpeTokenizer::new(TrainerConfig {
            vocab_size: 300,
            log_interval: 0,
            ..Default::default()
        });
        tokenizer.train(corpus).unwrap();
        tokenizer
    }

    #[test]
    fn test_untrained_fails_fast() {
        let tokenizer = BpeTokenizer::default();
        assert!(matches!(tokenizer.encode("hi"), Err(TokenizerError::NotTrained)));
        assert!(matches!(tokenizer.decode(&[0]), Err(TokenizerError::NotTrained)));
        assert!(matches!(tokenizer.save("unused"), Err(TokenizerError::NotTrained)));
        assert_eq!(tokenizer.vocab_size(), 0);
    }

    #[test]
    fn test_lowest_rank_wins_over_leftmost() {
        // ("b","c") learned before ("a","b")
        let model = model_with_merges(&[("b", "c"), ("a", "b")]);
        assert_eq!(model.segment_word("abc"), vec!["a", "bc"]);

        let model = model_with_merges(&[("a", "b"), ("b", "c")]);
        assert_eq!(model.segment_word("abc"), vec!["ab", "c"]);
    }

    #[test]
    fn test_merge_creates_new_adjacency() {
        let model = model_with_merges(&[("a", "b"), ("ab", "c"), ("abc", "d")]);
        assert_eq!(model.segment_word("abcd"), vec!["abcd"]);
        assert_eq!(model.segment_word("abab"), vec!["ab", "ab"]);
    }

    #[test]
    fn test_encode_inserts_space_between_words() {
        let model = model_with_merges(&[("a", "b")]);
        let ab = model.vocab().get_id("ab").unwrap();
        let space = model.vocab().get_id(SPACE_TOKEN).unwrap();
        assert_eq!(model.encode("ab  ab\n").unwrap(), vec![ab, space, ab]);
        assert_eq!(model.encode("").unwrap(), Vec::<TokenId>::new());
        assert_eq!(model.encode(" \t ").unwrap(), Vec::<TokenId>::new());
    }

    #[test]
    fn test_unknown_characters_map_to_unk() {
        let model = model_with_merges(&[("a", "b")]);
        let ab = model.vocab().get_id("ab").unwrap();
        let unk = model.vocab().get_id("<unk>").unwrap();
        assert_eq!(model.encode("abz").unwrap(), vec![ab, unk]);
        let (a, b) = (model.vocab().get_id("a").unwrap(), model.vocab().get_id("b").unwrap());
        assert_eq!(model.encode("ba").unwrap(), vec![b, a]);
    }

    #[test]
    fn test_decode_drops_specials_and_marks_unknown_ids() {
        let model = model_with_merges(&[("a", "b")]);
        let ab = model.vocab().get_id("ab").unwrap();
        let space = model.vocab().get_id(SPACE_TOKEN).unwrap();
        let pad = model.vocab().get_id("<pad>").unwrap();
        assert_eq!(model.decode(&[pad, ab, space, ab, 9999]), "ab ab?");
    }

    #[test]
    fn test_missing_unk_token_is_reported() {
        let mut merges = MergeRules::new();
        merges.push("a", "b");
        let vocab = crate::trainer::assemble_vocab(&[], &merges, &Default::default());
        let model = TrainedModel::new(vocab, merges, vec![], "<unk>".into());
        assert!(model.encode("ab").is_ok());
        assert!(matches!(
            model.encode("xyz"),
            Err(TokenizerError::MissingSpecialToken(_))
        ));
    }

    #[test]
    fn test_train_encode_decode_roundtrip() {
        let corpus = ["hello world hello world hello", "the quick brown fox"];
        let tokenizer = trained(&corpus);
        for text in corpus {
            let encoded = tokenizer.encode(text).unwrap();
            assert_eq!(tokenizer.decode(&encoded).unwrap(), text);
        }
    }

    #[test]
    fn test_compresses_training_text() {
        let tokenizer = trained(&["the quick brown fox jumps over the lazy dog"; 3]);
        let encoded = tokenizer.encode("the quick").unwrap();
        // "the", " ", "quick"
        assert_eq!(encoded.len(), 3);
        assert_eq!(tokenizer.tokenize("the quick").unwrap(), vec!["the", " ", "quick"]);
    }

    #[test]
    fn test_encode_batch_and_chunked() {
        let tokenizer = trained(&["ab cd ab cd"]);
        let batch = tokenizer.encode_batch(&["ab", "cd ab"]).unwrap();
        assert_eq!(batch[0], tokenizer.encode("ab").unwrap());
        assert_eq!(batch[1], tokenizer.encode("cd ab").unwrap());

        let chunks = tokenizer.encode_chunked("ab cd ab cd", 3).unwrap();
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(tokenizer.encode_chunked("ab", 3).unwrap().len(), 1);
        assert!(tokenizer.encode_chunked("ab", 0).is_err());
    }

    #[test]
    fn test_stats() {
        let model = model_with_merges(&[("a", "b"), ("ab", "c")]);
        assert_eq!(
            model.stats(),
            VocabStats {
                total: 8,
                special: 2,
                single_char: 4,
                merged: 2,
            }
        );
    }
}
