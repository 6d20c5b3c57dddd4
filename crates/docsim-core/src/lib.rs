#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Shared building blocks for docsim: domain types, the embedder and store
//! capabilities, the error taxonomy, configuration and corpus ingestion.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use traits::{Embedder, VectorStore};
pub use types::{ContentKey, Document, ScoredDocument};
