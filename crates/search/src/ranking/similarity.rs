//! Query/abstract similarity via embeddings

use scholarrank_common::{
    embeddings::Embedder,
    errors::{AppError, Result},
    metrics,
};
use std::sync::Arc;
use std::time::Instant;

/// Scores documents against a query by cosine similarity of embeddings
#[derive(Clone)]
pub struct SimilarityScorer {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Score every document against `query`.
    ///
    /// The query and all documents go to the embedder in one batch call, and
    /// `result[i]` belongs to `documents[i]`. An empty document list returns
    /// immediately without calling the embedder. Embedder errors are passed
    /// through unchanged.
    pub async fn score_all(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut texts = Vec::with_capacity(documents.len() + 1);
        texts.push(query.to_string());
        texts.extend_from_slice(documents);

        let start = Instant::now();
        let result = self.embedder.embed_batch(&texts).await;
        metrics::record_embedding(
            start.elapsed().as_secs_f64(),
            self.embedder.model_name(),
            texts.len(),
            result.is_ok(),
        );
        let embeddings = result?;

        if embeddings.len() != texts.len() {
            return Err(AppError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let (query_vec, doc_vecs) = embeddings
            .split_first()
            .ok_or_else(|| AppError::embedding("empty embedding batch"))?;

        doc_vecs
            .iter()
            .map(|doc_vec| {
                if doc_vec.len() != query_vec.len() {
                    return Err(AppError::embedding(format!(
                        "dimension mismatch: query {} vs document {}",
                        query_vec.len(),
                        doc_vec.len()
                    )));
                }
                Ok(cosine_similarity(query_vec, doc_vec))
            })
            .collect()
    }
}

/// Cosine similarity in [-1, 1]; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}
