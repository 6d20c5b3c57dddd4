//! Boundary around the embedding backend.
//!
//! Enforces the batch contract (one vector per input, in order, each of
//! dimension D, all values finite) and the call deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;

use docsim_core::{Embedder, Error, Result};

#[derive(Clone)]
struct Deadline {
    runtime: Arc<Runtime>,
    timeout: Duration,
    /// One backend call at a time, including calls whose caller gave up.
    gate: Arc<Semaphore>,
}

#[derive(Clone)]
pub struct EmbedProvider {
    inner: Arc<dyn Embedder>,
    deadline: Option<Deadline>,
}

impl EmbedProvider {
    pub fn new(inner: Arc<dyn Embedder>) -> Self { Self { inner, deadline: None } }

    /// A call that misses the deadline returns [`Error::EmbedTimeout`]. The
    /// abandoned backend call keeps the gate until it returns, so the next
    /// call waits for it (within its own deadline) rather than running alongside.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
        self.deadline = match timeout {
            None => None,
            Some(timeout) => {
                let runtime = Builder::new_current_thread()
                    .enable_time()
                    .thread_name("docsim-embed")
                    .build()
                    .map_err(|e| Error::embed(format!("failed to start embedding runtime: {}", e)))?;
                Some(Deadline { runtime: Arc::new(runtime), timeout, gate: Arc::new(Semaphore::new(1)) })
            }
        };
        Ok(self)
    }

    /// Embedding dimensionality (D).
    pub fn dim(&self) -> usize { self.inner.dim() }

    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(vec![]); }
        let vectors = self.call(texts)?;
        self.validate(texts.len(), &vectors)?;
        Ok(vectors)
    }

    fn call(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let Some(deadline) = &self.deadline else { return self.inner.embed_batch(texts) };
        let inner = Arc::clone(&self.inner);
        let gate = Arc::clone(&deadline.gate);
        let owned = texts.to_vec();
        let timeout = deadline.timeout;

        deadline.runtime.block_on(async move {
            let work = async move {
                let permit = gate
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::embed("embedding gate closed"))?;
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    inner.embed_batch(&owned)
                })
                .await
                .map_err(|e| Error::embed(format!("embedding worker failed: {}", e)))?
            };
            tokio::time::timeout(timeout, work).await.map_err(|_| Error::EmbedTimeout(timeout))?
        })
    }

    fn validate(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != expected {
            return Err(Error::embed(format!("backend returned {} vectors for {} texts", vectors.len(), expected)));
        }
        let dim = self.dim();
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim { return Err(Error::DimensionMismatch { expected: dim, actual: v.len() }); }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(Error::embed(format!("backend returned non-finite values for input {}", i)));
            }
        }
        Ok(())
    }
}
