//! Hybrid ranking engine
//!
//! Re-ranks a batch of papers by a weighted blend of three signals:
//! - Semantic similarity between the query and each abstract (embeddings)
//! - Citation count, normalized against the batch maximum
//! - Recency of the publication year
//!
//! The engine keeps no state between calls; the only shared resource is the
//! embedder handed to [`HybridRanker::new`].

mod citation;
mod hybrid;
mod recency;
mod similarity;

pub use citation::normalize_citations;
pub(crate) use hybrid::blend;
pub use hybrid::{round3, HybridRanker};
pub use recency::{current_year, recency_score};
pub use similarity::{cosine_similarity, SimilarityScorer};

use scholarrank_common::config::RankingConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-request weights for the three ranking signals.
///
/// Weights are meant to sum to 1 but nothing enforces it; the final score is
/// a plain linear combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RankingWeights {
    #[validate(range(min = 0.0))]
    pub similarity: f64,

    #[validate(range(min = 0.0))]
    pub citation: f64,

    #[validate(range(min = 0.0))]
    pub recency: f64,
}

impl RankingWeights {
    pub fn new(similarity: f64, citation: f64, recency: f64) -> Self {
        Self {
            similarity,
            citation,
            recency,
        }
    }

    /// Service-wide defaults from configuration
    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(
            config.similarity_weight,
            config.citation_weight,
            config.recency_weight,
        )
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self::new(0.6, 0.3, 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = RankingWeights::default();
        assert_eq!(weights, RankingWeights::from_config(&RankingConfig::default()));
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_is_invalid() {
        let weights = RankingWeights::new(0.6, -0.3, 0.1);
        let errors = weights.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("citation"));
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        assert!(RankingWeights::new(2.0, 5.0, 0.0).validate().is_ok());
    }
}
