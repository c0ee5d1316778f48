//! Cosine similarity and brute-force top-K ranking.

use std::cmp::Ordering;

use crate::document::{EmbeddedChunk, ScoredChunk};
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors of equal length.
///
/// Returns 0.0 if either vector has zero magnitude. The result is clamped to
/// `[-1, 1]` to absorb rounding error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Score every candidate against `query` and return the `top_k` best.
///
/// Results are sorted by descending score. The sort is stable, so candidates
/// with equal scores keep their original relative order. The result length
/// is `min(top_k, candidates.len())`.
///
/// # Errors
///
/// - [`RagError::InputError`] if `top_k` is zero.
/// - [`RagError::DimensionMismatchError`] if any candidate's embedding length
///   differs from the query's. Checked before any scoring happens.
pub fn rank(query: &[f32], candidates: &[EmbeddedChunk], top_k: usize) -> Result<Vec<ScoredChunk>> {
    if top_k == 0 {
        return Err(RagError::InputError("top_k must be greater than zero".to_string()));
    }

    if let Some(bad) = candidates.iter().find(|c| c.embedding.len() != query.len()) {
        return Err(RagError::DimensionMismatchError {
            chunk_id: bad.chunk.id.clone(),
            expected: query.len(),
            actual: bad.embedding.len(),
        });
    }

    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| (position, cosine_similarity(query, &candidate.embedding)))
        .collect();

    // NaN can only come from non-finite inputs; treat it as equal so order is kept.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(position, score)| ScoredChunk { chunk: candidates[position].clone(), score })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn candidate(index: usize, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk::new(Chunk::new("doc.txt", index, format!("chunk {index}")), embedding)
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_orthogonal_vectors() {
        let candidates = vec![
            candidate(0, vec![1.0, 0.0, 0.0]),
            candidate(1, vec![0.0, 1.0, 0.0]),
            candidate(2, vec![0.0, 0.0, 1.0]),
        ];
        let results = rank(&[1.0, 0.0, 0.0], &candidates, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id(), "doc.txt-0");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].id(), "doc.txt-1");
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_rank_ties_keep_original_order() {
        let candidates: Vec<_> = (0..5).map(|i| candidate(i, vec![0.6, 0.8])).collect();
        let results = rank(&[0.6, 0.8], &candidates, 5).unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.chunk.chunk.sequence_index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_rank_truncates_to_candidate_count() {
        let candidates = vec![candidate(0, vec![1.0, 0.0])];
        assert_eq!(rank(&[1.0, 0.0], &candidates, 10).unwrap().len(), 1);
        assert!(rank(&[1.0, 0.0], &[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_rank_rejects_bad_input() {
        let candidates = vec![candidate(0, vec![1.0, 0.0]), candidate(1, vec![1.0, 0.0, 0.0])];
        assert!(matches!(rank(&[1.0, 0.0], &candidates, 0), Err(RagError::InputError(_))));
        match rank(&[1.0, 0.0], &candidates, 1) {
            Err(RagError::DimensionMismatchError { chunk_id, expected, actual }) => {
                assert_eq!(chunk_id, "doc.txt-1");
                assert_eq!((expected, actual), (2, 3));
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }
}
