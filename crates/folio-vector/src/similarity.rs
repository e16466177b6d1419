//! Vector math for retrieval
//!
//! Author: hephaex@gmail.com

use folio_core::{Chunk, FolioError, Result, ScoredChunk};

/// Scale a vector to unit length; the zero vector is returned unchanged
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Cosine similarity of two equal-length vectors
///
/// A zero-norm operand scores 0.0 instead of producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(FolioError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Score every chunk against `query` and keep the best `k`
///
/// Ties keep index order.
pub fn top_k<'a, I>(query: &[f32], chunks: I, k: usize) -> Result<Vec<ScoredChunk>>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut scored = chunks
        .into_iter()
        .map(|chunk| {
            cosine_similarity(query, &chunk.embedding).map(|score| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}
