use docsim_core::{Error, Result};

/// Cosine similarity of two equal-length vectors.
///
/// Single pass with three `f64` accumulators. A zero-magnitude argument
/// scores 0 instead of NaN; unequal lengths are an error, never truncated.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 { return Ok(0.0); }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() { return Ok(0.0); }
    Ok(score.clamp(-1.0, 1.0) as f32)
}
