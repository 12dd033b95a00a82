//! Search handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::ranking::RankingWeights;
use crate::service::SearchQuery;
use crate::AppState;
use scholarrank_common::{
    errors::{AppError, Result},
    models::RankedPaper,
};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Subject code filter, e.g. `cs` or `cs.CL`; `all` disables it
    #[serde(default)]
    #[validate(length(max = 64))]
    pub subject: Option<String>,

    /// Overrides the configured ranking weights
    #[serde(default)]
    #[validate(nested)]
    pub weights: Option<RankingWeights>,
}

/// Search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub weights: RankingWeights,
    pub total_results: usize,
    pub fetched: usize,
    pub filtered: usize,
    pub results: Vec<RankedPaper>,
    pub processing_time_ms: u64,
}

impl SearchRequest {
    /// Validate and resolve against the service defaults
    fn into_query(self, defaults: RankingWeights) -> Result<SearchQuery> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: None,
        })?;

        if self.query.trim().is_empty() {
            return Err(AppError::Validation {
                message: "query must not be blank".to_string(),
                field: Some("query".to_string()),
            });
        }

        let weights = self.weights.unwrap_or(defaults);
        if ![weights.similarity, weights.citation, weights.recency]
            .iter()
            .all(|w| w.is_finite())
        {
            return Err(AppError::Validation {
                message: "weights must be finite numbers".to_string(),
                field: Some("weights".to_string()),
            });
        }

        Ok(SearchQuery {
            query: self.query.trim().to_string(),
            subject: self.subject,
            weights,
        })
    }
}

/// Fetch, filter, and rank papers for a query
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    let defaults = RankingWeights::from_config(&state.config.ranking);
    let query = request.into_query(defaults)?;

    let outcome = state.service.search(&query).await?;

    Ok(Json(SearchResponse {
        query: query.query,
        subject: query.subject,
        weights: query.weights,
        total_results: outcome.results.len(),
        fetched: outcome.fetched,
        filtered: outcome.filtered,
        results: outcome.results,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> SearchRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_defaults_apply_without_weights() {
        let query = request(r#"{"query": " transformers "}"#)
            .into_query(RankingWeights::new(0.5, 0.25, 0.25))
            .unwrap();
        assert_eq!(query.query, "transformers");
        assert_eq!(query.weights, RankingWeights::new(0.5, 0.25, 0.25));
        assert!(query.subject.is_none());
    }

    #[test]
    fn test_request_weights_override_defaults() {
        let query = request(
            r#"{"query": "q", "subject": "cs", "weights": {"similarity": 1.0, "citation": 0.0, "recency": 0.0}}"#,
        )
        .into_query(RankingWeights::default())
        .unwrap();
        assert_eq!(query.weights, RankingWeights::new(1.0, 0.0, 0.0));
        assert_eq!(query.subject.as_deref(), Some("cs"));
    }

    #[test]
    fn test_empty_and_blank_queries_rejected() {
        for body in [r#"{"query": ""}"#, r#"{"query": "   "}"#] {
            let err = request(body).into_query(RankingWeights::default()).unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }
    }

    #[test]
    fn test_overlong_query_rejected() {
        let body = serde_json::json!({ "query": "a".repeat(1001) }).to_string();
        let err = request(&body).into_query(RankingWeights::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = request(
            r#"{"query": "q", "weights": {"similarity": 0.6, "citation": -1.0, "recency": 0.1}}"#,
        )
        .into_query(RankingWeights::default())
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_overlong_subject_rejected() {
        let body = serde_json::json!({ "query": "q", "subject": "x".repeat(65) }).to_string();
        let err = request(&body).into_query(RankingWeights::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let body = serde_json::json!({ "query": "q", "subject": "astro-ph.CO" }).to_string();
        assert!(request(&body).into_query(RankingWeights::default()).is_ok());
    }

    #[test]
    fn test_non_finite_default_weight_rejected() {
        let err = request(r#"{"query": "q"}"#)
            .into_query(RankingWeights::new(f64::INFINITY, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
