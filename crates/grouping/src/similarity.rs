//! The single comparison primitive used by the similarity grouper.

/// Cosine similarity between two embedding vectors.
///
/// Returns `dot(a, b) / (|a| * |b|)`. A zero-norm vector, or a dimensionality
/// mismatch, yields 0.0: an all-zero embedding is treated as maximally
/// dissimilar to everything rather than a hard error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
