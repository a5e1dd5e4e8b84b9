//! Tokenizer bundle persistence.
//!
//! A bundle is a directory holding three UTF-8 files:
//! - `tokenizer_config.json`: `{vocab_size, special_tokens, trained}`
//! - `vocab.json`: token → id object
//! - `merges.txt`: one `"<left> <right>"` rule per line; the 0-based line
//!   index is the rule's rank
//!
//! `merges.txt` is optional on load and yields an empty rule set when absent.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Artifact, Result, TokenizerError};
use crate::tokenizer::TrainedModel;
use crate::vocab::{MergeRules, TokenId, Vocab};

/// Contents of `tokenizer_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Size of the saved vocabulary
    pub vocab_size: usize,
    pub special_tokens: Vec<String>,
    #[serde(default = "default_trained")]
    pub trained: bool,
    /// Extension key; bundles without it fall back to `<unk>`
    #[serde(default = "default_unk_token")]
    pub unk_token: String,
}

fn default_trained() -> bool {
    true
}

fn default_unk_token() -> String {
    "<unk>".into()
}

/// Write `model` as a bundle under `dir`.
pub fn save_bundle(dir: &Path, model: &TrainedModel, trained: bool) -> Result<()> {
    fs::create_dir_all(dir).map_err(|err| TokenizerError::io(err, Some(dir.to_path_buf())))?;

    let config = BundleConfig {
        vocab_size: model.vocab().len(),
        special_tokens: model.special_tokens().to_vec(),
        trained,
        unk_token: model.unk_token().to_owned(),
    };
    let config_json = serde_json::to_string_pretty(&config)
        .map_err(|err| TokenizerError::corrupt(Artifact::Config, err.to_string()))?;
    write_artifact(dir, Artifact::Config, config_json)?;

    let vocab_json = serde_json::to_string_pretty(model.vocab())
        .map_err(|err| TokenizerError::corrupt(Artifact::Vocab, err.to_string()))?;
    write_artifact(dir, Artifact::Vocab, vocab_json)?;

    write_artifact(dir, Artifact::Merges, format_merges(model.merges()))?;
    Ok(())
}

/// Read a bundle from `dir`.
pub fn load_bundle(dir: &Path) -> Result<(BundleConfig, TrainedModel)> {
    let config_text = read_artifact(dir, Artifact::Config)?
        .ok_or_else(|| missing(dir, Artifact::Config))?;
    let config: BundleConfig = serde_json::from_str(&config_text)
        .map_err(|err| TokenizerError::corrupt(Artifact::Config, err.to_string()))?;

    let vocab_text =
        read_artifact(dir, Artifact::Vocab)?.ok_or_else(|| missing(dir, Artifact::Vocab))?;
    let vocab = parse_vocab(&vocab_text)?;

    let merges = match read_artifact(dir, Artifact::Merges)? {
        Some(text) => parse_merges(&text)?,
        None => MergeRules::new(),
    };

    let model = TrainedModel::new(
        vocab,
        merges,
        config.special_tokens.clone(),
        config.unk_token.clone(),
    );
    Ok((config, model))
}

/// Render rules one per line; rank gaps become blank lines so that line
/// index and rank stay equal.
pub fn format_merges(merges: &MergeRules) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(merges.len());
    for rule in merges {
        while lines.len() < rule.rank as usize {
            lines.push(String::new());
        }
        lines.push(format!("{} {}", rule.left, rule.right));
    }
    lines.join("\n")
}

/// Parse `merges.txt`. Blank lines are skipped but still consume a rank.
pub fn parse_merges(text: &str) -> Result<MergeRules> {
    let mut triples = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [left, right] = parts.as_slice() else {
            return Err(TokenizerError::corrupt(
                Artifact::Merges,
                format!("line {}: expected two symbols, found {:?}", idx + 1, line),
            ));
        };
        let rank = u32::try_from(idx).map_err(|_| {
            TokenizerError::corrupt(
                Artifact::Merges,
                format!("line {} exceeds rank range", idx + 1),
            )
        })?;
        triples.push((left.to_string(), right.to_string(), rank));
    }
    Ok(MergeRules::from_ranked(triples))
}

/// Parse `vocab.json`, accepting integer or numeric-string IDs.
pub fn parse_vocab(text: &str) -> Result<Vocab> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(text)
        .map_err(|err| TokenizerError::corrupt(Artifact::Vocab, err.to_string()))?;

    let mut entries = Vec::with_capacity(object.len());
    for (token, value) in object {
        let id = match &value {
            Value::Number(number) => number.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .and_then(|id| TokenId::try_from(id).ok())
        .ok_or_else(|| {
            TokenizerError::corrupt(
                Artifact::Vocab,
                format!("token {token:?} has non-integer id {value}"),
            )
        })?;
        entries.push((token, id));
    }
    Vocab::from_entries(entries).map_err(|reason| TokenizerError::corrupt(Artifact::Vocab, reason))
}

fn write_artifact(dir: &Path, artifact: Artifact, contents: String) -> Result<()> {
    let path = dir.join(artifact.file_name());
    fs::write(&path, contents).map_err(|err| TokenizerError::io(err, Some(path)))
}

/// `Ok(None)` when the file does not exist.
fn read_artifact(dir: &Path, artifact: Artifact) -> Result<Option<String>> {
    let path = dir.join(artifact.file_name());
    match fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => Err(TokenizerError::corrupt(
            artifact,
            format!("{} is not valid UTF-8", path.display()),
        )),
        Err(err) => Err(TokenizerError::io(err, Some(path))),
    }
}

fn missing(dir: &Path, artifact: Artifact) -> TokenizerError {
    TokenizerError::MissingArtifact {
        artifact,
        path: dir.join(artifact.file_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocab_accepts_numeric_strings() {
        let vocab = parse_vocab(r#"{"<pad>": 0, "a": "1", "ab": 2}"#).unwrap();
        assert_eq!(vocab.get_id("a"), Some(1));
        assert_eq!(vocab.get_token(2), Some("ab"));
    }

    #[test]
    fn test_parse_vocab_rejects_bad_ids() {
        for text in [
            r#"{"a": -1}"#,
            r#"{"a": 1.5}"#,
            r#"{"a": "x"}"#,
            r#"{"a": 0, "b": 0}"#,
            r#"{"a": 0, "b": 5}"#,
            r#"["a"]"#,
        ] {
            assert!(
                matches!(
                    parse_vocab(text),
                    Err(TokenizerError::CorruptArtifact { artifact: Artifact::Vocab, .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_parse_merges_line_index_is_rank() {
        let merges = parse_merges("a b\n\nab c\r\n").unwrap();
        assert_eq!(merges.rank("a", "b"), Some(0));
        assert_eq!(merges.rank("ab", "c"), Some(2));
        assert_eq!(format_merges(&merges), "a b\n\nab c");
    }

    #[test]
    fn test_parse_merges_rejects_malformed_line() {
        let err = parse_merges("a b\nlonely\n").unwrap_err();
        assert!(matches!(
            err,
            TokenizerError::CorruptArtifact { artifact: Artifact::Merges, .. }
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: BundleConfig =
            serde_json::from_str(r#"{"vocab_size": 3, "special_tokens": ["<unk>"]}"#).unwrap();
        assert!(config.trained);
        assert_eq!(config.unk_token, "<unk>");
    }
}
