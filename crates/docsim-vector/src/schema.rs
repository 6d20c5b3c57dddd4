//! Layout of one stored entry: a hash under `<prefix><content key>` with a
//! `text` field and an `embedding` field holding `{"values":[...]}`.

use serde::{Deserialize, Serialize};

use docsim_core::{Error, Result};

pub const DEFAULT_KEY_PREFIX: &str = "embedding:";
pub const TEXT_FIELD: &str = "text";
pub const EMBEDDING_FIELD: &str = "embedding";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub values: Vec<f32>,
}

/// JSON floats are written in shortest round-trip form, so decoding returns the same `f32` bits.
pub fn encode_embedding(values: &[f32]) -> Result<String> {
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(Error::embed(format!("embedding has non-finite value at index {}", pos)));
    }
    Ok(serde_json::to_string(&StoredEmbeddingRef { values })?)
}

pub fn decode_embedding(raw: &str) -> Result<Vec<f32>> {
    let stored: StoredEmbedding = serde_json::from_str(raw)?;
    Ok(stored.values)
}

#[derive(Serialize)]
struct StoredEmbeddingRef<'a> {
    values: &'a [f32],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_round_trips_bit_for_bit() {
        let original = vec![0.1f32, -1.0 / 3.0, 2.5e-8, f32::MIN_POSITIVE, f32::MAX, -0.0, 0.993_883_7];
        let decoded = decode_embedding(&encode_embedding(&original).unwrap()).unwrap();
        assert_eq!(original.len(), decoded.len());
        for (a, b) in original.iter().zip(&decoded) { assert_eq!(a.to_bits(), b.to_bits(), "{a} vs {b}"); }
    }

    #[test]
    fn wire_format_is_values_object() {
        assert_eq!(encode_embedding(&[1.0, 0.0]).unwrap(), r#"{"values":[1.0,0.0]}"#);
        assert_eq!(decode_embedding(r#"{"values":[0.9,0.1]}"#).unwrap(), vec![0.9f32, 0.1]);
    }

    #[test]
    fn non_finite_values_are_refused() {
        assert!(encode_embedding(&[1.0, f32::NAN]).is_err());
        assert!(encode_embedding(&[f32::INFINITY]).is_err());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(decode_embedding("not json"), Err(Error::Serialization(_))));
        assert!(decode_embedding(r#"{"vals":[1.0]}"#).is_err());
    }
}
