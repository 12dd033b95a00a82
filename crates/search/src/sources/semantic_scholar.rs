//! Semantic Scholar Graph API client

use super::PaperSource;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use scholarrank_common::{
    config::SemanticScholarConfig,
    errors::{AppError, Result},
    models::{Paper, Source},
};
use serde::Deserialize;
use std::num::NonZeroU32;

const SOURCE_NAME: &str = "semantic";
const FIELDS: &str = "title,abstract,year,citationCount,url";

pub struct SemanticScholarSource {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
    api_key: Option<String>,
    /// Paces outbound calls; the public API throttles unauthenticated clients
    limiter: Option<DefaultDirectRateLimiter>,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<ApiPaper>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPaper {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    citation_count: Option<u64>,
    url: Option<String>,
}

impl From<ApiPaper> for Paper {
    fn from(item: ApiPaper) -> Self {
        Paper {
            title: item.title.unwrap_or_default(),
            summary: item.abstract_text,
            year: item.year,
            citations: Some(item.citation_count.unwrap_or(0)),
            subject: None,
            source: Source::Semantic,
            pdf: item.url,
            ..Default::default()
        }
    }
}

impl SemanticScholarSource {
    pub fn new(client: reqwest::Client, config: &SemanticScholarConfig) -> Self {
        let limiter = NonZeroU32::new(config.requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
            api_key: config.api_key.clone(),
            limiter,
        }
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let url = format!("{}/paper/search", self.base_url);
        let limit = self.limit.to_string();

        let mut request = self.client.get(&url).query(&[
            ("query", query),
            ("limit", limit.as_str()),
            ("fields", FIELDS),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::source_failure(SOURCE_NAME, format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let papers = parse_response(&body)?;

        tracing::debug!(source = SOURCE_NAME, count = papers.len(), "Parsed Semantic Scholar page");
        Ok(papers)
    }
}

/// Parse a `/paper/search` response body
pub(crate) fn parse_response(body: &str) -> Result<Vec<Paper>> {
    let page: SearchPage = serde_json::from_str(body)
        .map_err(|e| AppError::source_failure(SOURCE_NAME, format!("invalid response: {}", e)))?;
    Ok(page.data.into_iter().map(Paper::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "total": 2,
            "offset": 0,
            "data": [
                {
                    "paperId": "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
                    "title": "Attention is All you Need",
                    "abstract": "The dominant sequence transduction models...",
                    "year": 2017,
                    "citationCount": 120000,
                    "url": "https://www.semanticscholar.org/paper/204e3073"
                },
                {
                    "paperId": "x",
                    "title": "Preprint without metadata",
                    "abstract": null,
                    "year": null,
                    "citationCount": null,
                    "url": null
                }
            ]
        }"#;

        let papers = parse_response(body).unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].title, "Attention is All you Need");
        assert_eq!(papers[0].year, Some(2017));
        assert_eq!(papers[0].citations, Some(120000));
        assert_eq!(papers[0].source, Source::Semantic);
        assert_eq!(
            papers[0].pdf.as_deref(),
            Some("https://www.semanticscholar.org/paper/204e3073")
        );

        assert_eq!(papers[1].abstract_text(), "");
        assert_eq!(papers[1].year, None);
        assert_eq!(papers[1].citations, Some(0));
        assert_eq!(papers[1].subject_code(), "");
    }

    #[test]
    fn test_no_results_page() {
        let papers = parse_response(r#"{"total": 0, "offset": 0}"#).unwrap();
        assert!(papers.is_empty());
    }

    #[test]
    fn test_invalid_body_is_source_error() {
        let err = parse_response("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, AppError::Source { .. }));
    }

    #[test]
    fn test_zero_rps_disables_limiter() {
        let config = SemanticScholarConfig {
            requests_per_second: 0,
            ..Default::default()
        };
        let source = SemanticScholarSource::new(reqwest::Client::new(), &config);
        assert!(source.limiter.is_none());
    }
}
