use crate::error::Result;

/// Maps a batch of texts to fixed-dimension vectors.
///
/// Implementations must be deterministic, return exactly one vector per
/// input in input order, and every vector must have length `dim()`.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Hash-map style key/field store.
///
/// `set_fields` must apply all fields of one key as a single operation so a
/// reader never observes a partial record.
pub trait VectorStore: Send + Sync {
    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<()>;
    fn get_field(&self, key: &str, field: &str) -> Result<Option<String>>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
