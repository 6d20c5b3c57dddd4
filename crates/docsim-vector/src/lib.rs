//! The similarity-search engine: content-addressed indexing into a
//! [`VectorStore`](docsim_core::VectorStore) and exhaustive cosine ranking.

pub mod embed_provider;
pub mod indexer;
pub mod schema;
pub mod search;
pub mod similarity;

pub use embed_provider::EmbedProvider;
pub use indexer::DocumentIndexer;
pub use search::{QueryEngine, QueryOutcome, SkippedEntry};
pub use similarity::cosine_similarity;
