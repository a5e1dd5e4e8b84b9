//! Canonical forms and content hashes used for duplicate comparison.
//!
//! A canonical form is only ever used as a comparison key; the accepted
//! document keeps its original text.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

/// Which canonicalization is applied before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Raw UTF-8 bytes.
    None,
    /// Unicode canonical composition (NFC).
    Unicode,
    /// Runs of whitespace collapsed to one space, ends trimmed.
    Whitespace,
}

/// Return the comparable form of `text` under `normalization`.
pub fn canonicalize(text: &str, normalization: Normalization) -> Cow<'_, str> {
    match normalization {
        Normalization::None => Cow::Borrowed(text),
        Normalization::Unicode => {
            if is_nfc_quick(text.chars()) == IsNormalized::Yes {
                Cow::Borrowed(text)
            } else {
                Cow::Owned(text.nfc().collect())
            }
        }
        Normalization::Whitespace => Cow::Owned(collapse_whitespace(text)),
    }
}

/// Collapse every whitespace run to a single ASCII space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    result
}

/// 160-bit SHA-1 digest of a canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    /// Hash raw bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha1::digest(bytes);
        let mut out = [0u8; 20];
        out.copy_from_slice(digest.as_slice());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Hash the canonical form of `text`.
pub fn content_hash(text: &str, normalization: Normalization) -> ContentHash {
    ContentHash::of_bytes(canonicalize(text, normalization).as_bytes())
}

/// An immutable document together with the hash of its canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    hash: ContentHash,
    normalization: Normalization,
}

impl Document {
    pub fn new(text: impl Into<String>, normalization: Normalization) -> Self {
        let text = text.into();
        let hash = content_hash(&text, normalization);
        Self {
            text,
            hash,
            normalization,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Consume the document, returning the original text.
    pub fn into_text(self) -> String {
        self.text
    }
}
