use docsim_core::config::EmbeddingSettings;
use docsim_embed::{get_default_embedder, HashingEmbedder};
use docsim_core::Embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { fake: true, fake_dim: 384, ..Default::default() };

    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(embedder.dim(), 384);
    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hashing_embedder_preserves_order_and_count() {
    let embedder = HashingEmbedder::new(16);
    let texts: Vec<String> = ["alpha", "bravo charlie", "alpha"].iter().map(|s| s.to_string()).collect();
    let embs = embedder.embed_batch(&texts).expect("embed");
    assert_eq!(embs.len(), 3);
    assert_eq!(embs[0], embs[2]);
    assert_ne!(embs[0], embs[1]);
}

#[test]
fn blank_text_maps_to_zero_vector() {
    let embs = HashingEmbedder::new(8).embed_batch(&["   ".to_string()]).expect("embed");
    assert!(embs[0].iter().all(|&x| x == 0.0));
}

#[test]
fn zero_dimension_is_clamped_to_one() {
    let embedder = HashingEmbedder::new(0);
    assert_eq!(embedder.dim(), 1);
    let embs = embedder.embed_batch(&["some words here".to_string()]).expect("embed");
    assert_eq!(embs[0].len(), 1);
    assert!((embs[0][0] - 1.0).abs() <= 1e-6);
}
