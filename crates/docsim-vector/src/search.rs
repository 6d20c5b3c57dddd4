use std::sync::Arc;

use tracing::{debug, info, warn};

use docsim_core::{Error, Result, ScoredDocument, VectorStore};

use crate::embed_provider::EmbedProvider;
use crate::schema::{decode_embedding, DEFAULT_KEY_PREFIX, EMBEDDING_FIELD, TEXT_FIELD};
use crate::similarity::cosine_similarity;

/// An entry left out of the ranking, with the reason it could not be scored.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

/// Ranked results (descending score) plus the entries that were skipped.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub results: Vec<ScoredDocument>,
    pub skipped: Vec<SkippedEntry>,
}

impl QueryOutcome {
    pub fn best(&self) -> Option<&ScoredDocument> { self.results.first() }

    pub fn skipped_count(&self) -> usize { self.skipped.len() }
}

/// Exhaustive cosine search over every entry in the key namespace.
pub struct QueryEngine {
    store: Arc<dyn VectorStore>,
    provider: EmbedProvider,
    key_prefix: String,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn VectorStore>, provider: EmbedProvider) -> Self {
        Self { store, provider, key_prefix: DEFAULT_KEY_PREFIX.to_string() }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn count_entries(&self) -> Result<usize> { Ok(self.store.keys_with_prefix(&self.key_prefix)?.len()) }

    pub fn query(&self, text: &str) -> Result<QueryOutcome> {
        let query_vec = self.embed_query(text)?;
        self.rank(&query_vec)
    }

    pub fn query_top_k(&self, text: &str, k: usize) -> Result<QueryOutcome> {
        let mut outcome = self.query(text)?;
        outcome.results.truncate(k);
        Ok(outcome)
    }

    /// Score a precomputed query vector against every stored entry.
    ///
    /// Unreadable entries are skipped and reported, never fatal. A query
    /// vector of the wrong dimension is fatal.
    pub fn rank(&self, query_vec: &[f32]) -> Result<QueryOutcome> {
        let dim = self.provider.dim();
        if query_vec.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: query_vec.len() });
        }
        let keys = self.store.keys_with_prefix(&self.key_prefix)?;
        debug!(candidates = keys.len(), prefix = %self.key_prefix, "scoring entries");

        let mut outcome = QueryOutcome::default();
        for key in keys {
            match self.score_entry(&key, query_vec) {
                Ok(scored) => outcome.results.push(scored),
                Err(e) => {
                    warn!(%key, error = %e, "skipping entry");
                    outcome.skipped.push(SkippedEntry { key, reason: e.to_string() });
                }
            }
        }
        outcome.results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.text.cmp(&b.text)));

        if outcome.skipped.is_empty() {
            info!("Ranked {} documents", outcome.results.len());
        } else {
            warn!("Ranked {} documents, skipped {} unreadable entries", outcome.results.len(), outcome.skipped.len());
        }
        Ok(outcome)
    }

    fn score_entry(&self, key: &str, query_vec: &[f32]) -> Result<ScoredDocument> {
        let raw = self
            .store
            .get_field(key, EMBEDDING_FIELD)?
            .ok_or_else(|| Error::store(format!("missing '{}' field", EMBEDDING_FIELD)))?;
        let embedding = decode_embedding(&raw)?;
        let score = cosine_similarity(query_vec, &embedding)?;
        let text = self
            .store
            .get_field(key, TEXT_FIELD)?
            .ok_or_else(|| Error::store(format!("missing '{}' field", TEXT_FIELD)))?;
        Ok(ScoredDocument { text, score })
    }

    /// One retry when the first attempt times out.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let vectors = match self.provider.embed(&texts) {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "query embedding failed, retrying once");
                self.provider.embed(&texts)?
            }
            other => other?,
        };
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::query("embedding backend returned no vector for the query"))
    }
}
