//! Search orchestration: fetch from every source, filter, rank

use crate::ranking::{current_year, HybridRanker, RankingWeights};
use crate::sources::PaperSource;
use futures::future::join_all;
use scholarrank_common::{
    errors::Result,
    metrics,
    models::{Paper, RankedPaper},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A single search request after validation
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub subject: Option<String>,
    pub weights: RankingWeights,
}

/// Ranked results plus how many papers survived each stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RankedPaper>,
    /// Papers returned by all sources together
    pub fetched: usize,
    /// Papers left after the subject filter
    pub filtered: usize,
}

#[derive(Clone)]
pub struct SearchService {
    sources: Vec<Arc<dyn PaperSource>>,
    ranker: HybridRanker,
}

impl SearchService {
    pub fn new(sources: Vec<Arc<dyn PaperSource>>, ranker: HybridRanker) -> Self {
        Self { sources, ranker }
    }

    pub fn ranker(&self) -> &HybridRanker {
        &self.ranker
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query every source concurrently and concatenate in source order.
    ///
    /// A failing source is logged and contributes nothing.
    pub async fn fetch_all(&self, query: &str) -> Vec<Paper> {
        let fetches = self.sources.iter().map(|source| async move {
            let start = Instant::now();
            let result = source.search(query).await;
            metrics::record_source_fetch(
                source.name(),
                start.elapsed().as_secs_f64(),
                result.is_ok(),
            );
            (source.name(), result)
        });

        let mut papers = Vec::new();
        for (name, result) in join_all(fetches).await {
            match result {
                Ok(found) => papers.extend(found),
                Err(e) => warn!(source = name, error = %e, "Source fetch failed, skipping"),
            }
        }
        papers
    }

    /// Search using the current calendar year as the recency reference
    pub async fn search(&self, request: &SearchQuery) -> Result<SearchOutcome> {
        self.search_at(request, current_year()).await
    }

    pub async fn search_at(
        &self,
        request: &SearchQuery,
        reference_year: i32,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();

        let papers = self.fetch_all(&request.query).await;
        let fetched = papers.len();

        let papers = filter_by_subject(papers, request.subject.as_deref());
        let filtered = papers.len();

        let results = if papers.is_empty() {
            Vec::new()
        } else {
            self.ranker
                .rank(&request.query, papers, &request.weights, reference_year)
                .await?
        };

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            subject_label(request.subject.as_deref()),
            results.len(),
        );
        info!(
            query = %request.query,
            subject = request.subject.as_deref().unwrap_or("all"),
            fetched,
            filtered,
            returned = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(SearchOutcome {
            results,
            fetched,
            filtered,
        })
    }
}

fn is_unfiltered(subject: Option<&str>) -> bool {
    match subject.map(str::trim) {
        None | Some("") => true,
        Some(s) => s.eq_ignore_ascii_case("all"),
    }
}

/// Metric label for a subject filter; one of two fixed values so client
/// input never becomes a time series
pub fn subject_label(subject: Option<&str>) -> &'static str {
    if is_unfiltered(subject) {
        "all"
    } else {
        "filtered"
    }
}

/// Keep papers whose subject code contains `subject`.
///
/// `None`, an empty string, or `"all"` disables the filter.
pub fn filter_by_subject(papers: Vec<Paper>, subject: Option<&str>) -> Vec<Paper> {
    match subject.map(str::trim) {
        Some(s) if !is_unfiltered(Some(s)) => papers
            .into_iter()
            .filter(|paper| paper.subject_code().contains(s))
            .collect(),
        _ => papers,
    }
}
