//! Hybrid ranking combining similarity, citation, and recency scores
//!
//! `final = w_sim * similarity + w_cite * citation_norm + w_rec * recency`,
//! rounded once to 3 decimals and sorted descending with a stable sort so
//! ties keep their input order (input order reflects source priority).

use super::{
    citation::normalize_citations, recency::recency_score, similarity::SimilarityScorer,
    RankingWeights,
};
use scholarrank_common::{
    embeddings::Embedder,
    errors::{AppError, Result},
    metrics,
    models::{Paper, RankedPaper},
};
use std::sync::Arc;

/// Hybrid ranker over an injected embedding capability
#[derive(Clone)]
pub struct HybridRanker {
    scorer: SimilarityScorer,
}

impl HybridRanker {
    /// Create a new hybrid ranker
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            scorer: SimilarityScorer::new(embedder),
        }
    }

    pub fn model_name(&self) -> &str {
        self.scorer.model_name()
    }

    /// Rank `papers` for `query`, most relevant first.
    ///
    /// Undated papers are scored as if published in `reference_year`. The
    /// embedder is called once for the whole batch, and not at all for an
    /// empty batch. Embedder errors propagate; no partial ranking is
    /// produced.
    pub async fn rank(
        &self,
        query: &str,
        papers: Vec<Paper>,
        weights: &RankingWeights,
        reference_year: i32,
    ) -> Result<Vec<RankedPaper>> {
        if papers.is_empty() {
            return Ok(Vec::new());
        }

        let abstracts: Vec<String> = papers
            .iter()
            .map(|paper| paper.abstract_text().to_string())
            .collect();

        let similarities = self.scorer.score_all(query, &abstracts).await?;
        metrics::record_ranking(papers.len());

        tracing::debug!(
            papers = papers.len(),
            model = self.scorer.model_name(),
            "Blending ranking signals"
        );

        blend(papers, &similarities, weights, reference_year)
    }
}

/// Combine precomputed similarities with citation and recency scores.
///
/// `similarities[i]` belongs to `papers[i]`; a length mismatch is an error
/// rather than a silently shortened ranking.
pub(crate) fn blend(
    papers: Vec<Paper>,
    similarities: &[f32],
    weights: &RankingWeights,
    reference_year: i32,
) -> Result<Vec<RankedPaper>> {
    if papers.len() != similarities.len() {
        return Err(AppError::embedding(format!(
            "{} similarity scores for {} papers",
            similarities.len(),
            papers.len()
        )));
    }

    let counts: Vec<u64> = papers.iter().map(Paper::citation_count).collect();
    let citation_scores = normalize_citations(&counts);

    let mut ranked: Vec<RankedPaper> = papers
        .into_iter()
        .zip(similarities.iter().zip(citation_scores))
        .map(|(paper, (&similarity, citation))| {
            let similarity = f64::from(similarity);
            let recency = recency_score(paper.year_or(reference_year), reference_year);

            let final_score = weights.similarity * similarity
                + weights.citation * citation
                + weights.recency * recency;

            RankedPaper {
                paper,
                similarity: round3(similarity),
                final_score: round3(final_score),
            }
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    Ok(ranked)
}

/// Round to 3 decimal places, folding negative zero into zero
pub fn round3(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
