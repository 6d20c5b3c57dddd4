use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use docsim_core::{ContentKey, Document, Result, VectorStore};

use crate::embed_provider::EmbedProvider;
use crate::schema::{encode_embedding, DEFAULT_KEY_PREFIX, EMBEDDING_FIELD, TEXT_FIELD};

/// Embeds documents in one batch and writes `(text, embedding)` under each content key.
pub struct DocumentIndexer {
    store: Arc<dyn VectorStore>,
    provider: EmbedProvider,
    key_prefix: String,
}

impl DocumentIndexer {
    pub fn new(store: Arc<dyn VectorStore>, provider: EmbedProvider) -> Self {
        Self { store, provider, key_prefix: DEFAULT_KEY_PREFIX.to_string() }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn key_prefix(&self) -> &str { &self.key_prefix }

    pub fn index_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<usize> {
        let documents: Vec<Document> = texts.iter().map(|t| Document::new(t.as_ref())).collect();
        self.index(&documents)
    }

    /// Returns the number of distinct entries written.
    ///
    /// Embedding and serialisation both finish before the first write, so a
    /// backend failure leaves the store untouched.
    pub fn index(&self, documents: &[Document]) -> Result<usize> {
        let mut seen = HashSet::new();
        let unique: Vec<(ContentKey, &Document)> = documents
            .iter()
            .map(|d| (d.key(), d))
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect();
        if unique.len() < documents.len() {
            debug!(duplicates = documents.len() - unique.len(), "collapsed identical documents");
        }
        if unique.is_empty() {
            info!("No documents to index");
            return Ok(0);
        }

        let texts: Vec<String> = unique.iter().map(|(_, d)| d.text.clone()).collect();
        info!("Embedding {} documents", texts.len());
        let embeddings = self.provider.embed(&texts)?;

        let encoded = embeddings.iter().map(|v| encode_embedding(v)).collect::<Result<Vec<String>>>()?;

        for (i, (((key, doc), json), vector)) in unique.iter().zip(&encoded).zip(&embeddings).enumerate() {
            let store_key = key.store_key(&self.key_prefix);
            if vector.iter().all(|&x| x == 0.0) {
                warn!(key = %store_key, "provider returned an all-zero embedding; it will score 0 against every query");
            }
            self.store.set_fields(&store_key, &[(TEXT_FIELD, doc.text.as_str()), (EMBEDDING_FIELD, json.as_str())])?;
            match &doc.source {
                Some(path) => info!("Stored embedding for document {} ({}) with key {}", i, path.display(), store_key),
                None => info!("Stored embedding for document {} with key {}", i, store_key),
            }
        }
        Ok(unique.len())
    }
}
