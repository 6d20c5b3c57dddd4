use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend could not be brought up (missing model artifacts, bad cache path).
    #[error("Embedding backend unavailable: {0}")]
    EmbedUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embed(String),

    #[error("Embedding call timed out after {0:?}")]
    EmbedTimeout(Duration),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query failed: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure class, one per process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Config,
    Ingestion,
    Embed,
    Store,
    Query,
}

impl ErrorClass {
    /// sysexits-style codes so scripts can tell the failing stage apart.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorClass::Config => 78,
            ErrorClass::Ingestion => 74,
            ErrorClass::Embed => 69,
            ErrorClass::Store => 75,
            ErrorClass::Query => 70,
        }
    }
}

impl Error {
    pub fn embed(msg: impl Into<String>) -> Self { Self::Embed(msg.into()) }

    pub fn store(msg: impl Into<String>) -> Self { Self::Store(msg.into()) }

    pub fn query(msg: impl Into<String>) -> Self { Self::Query(msg.into()) }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidConfig(_) => ErrorClass::Config,
            Error::Walk(_) | Error::Read { .. } => ErrorClass::Ingestion,
            Error::EmbedUnavailable(_)
            | Error::Embed(_)
            | Error::EmbedTimeout(_)
            | Error::DimensionMismatch { .. } => ErrorClass::Embed,
            Error::Store(_) | Error::Serialization(_) => ErrorClass::Store,
            Error::Query(_) => ErrorClass::Query,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool { matches!(self, Error::EmbedTimeout(_)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_distinct_nonzero_exit_code() {
        let classes = [ErrorClass::Config, ErrorClass::Ingestion, ErrorClass::Embed, ErrorClass::Store, ErrorClass::Query];
        let mut codes: Vec<u8> = classes.iter().map(|c| c.exit_code()).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), classes.len());
    }

    #[test]
    fn dimension_mismatch_is_an_embed_failure() {
        let err = Error::DimensionMismatch { expected: 384, actual: 2 };
        assert_eq!(err.class(), ErrorClass::Embed);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 2");
    }

    #[test]
    fn only_timeouts_are_transient() {
        assert!(Error::EmbedTimeout(Duration::from_secs(1)).is_transient());
        assert!(!Error::embed("boom").is_transient());
        assert!(!Error::store("down").is_transient());
    }
}
