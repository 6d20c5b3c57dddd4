//! Domain types shared by the indexer and the query engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Content-addressed identity of a document: BLAKE3 over the raw bytes, hex encoded.
///
/// Identical text always yields the same key, so re-indexing overwrites
/// instead of duplicating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn of(text: &str) -> Self { Self::of_bytes(text.as_bytes()) }

    pub fn of_bytes(bytes: &[u8]) -> Self { Self(blake3::hash(bytes).to_hex().to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Full store key under the given namespace prefix, e.g. `embedding:<hex>`.
    pub fn store_key(&self, prefix: &str) -> String { format!("{}{}", prefix, self.0) }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A raw text document as read from disk (or handed in directly).
///
/// `source` is informational only; identity comes from the content. The key
/// is taken over the bytes as read, so files that differ only in invalid
/// UTF-8 sequences keep distinct keys even though their decoded text matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: Option<PathBuf>,
    key: ContentKey,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = ContentKey::of(&text);
        Self { text, source: None, key }
    }

    /// Decodes `bytes` lossily for embedding; the key covers the raw bytes.
    pub fn from_file(path: PathBuf, bytes: Vec<u8>) -> Self {
        let key = ContentKey::of_bytes(&bytes);
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Self { text, source: Some(path), key }
    }

    pub fn key(&self) -> ContentKey { self.key.clone() }
}

/// One ranked query result. `score` is cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub text: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_is_stable_and_content_addressed() {
        let a = Document::new("cat").key();
        let b = Document::from_file(PathBuf::from("/tmp/other.txt"), b"cat".to_vec()).key();
        assert_eq!(a, b);
        assert_ne!(a, ContentKey::of("cat "));
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn store_key_carries_namespace() {
        let key = ContentKey::of("dog");
        let full = key.store_key("embedding:");
        assert!(full.starts_with("embedding:"));
        assert_eq!(&full["embedding:".len()..], key.as_str());
    }
}
