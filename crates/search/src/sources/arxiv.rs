//! arXiv Atom API client

use super::{clean_text, PaperSource};
use async_trait::async_trait;
use regex_lite::Regex;
use scholarrank_common::{
    config::ArxivConfig,
    errors::{AppError, Result},
    models::{Paper, Source},
};
use std::sync::OnceLock;

const SOURCE_NAME: &str = "arxiv";

pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl ArxivSource {
    pub fn new(client: reqwest::Client, config: &ArxivConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        }
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let url = format!("{}/query", self.base_url);
        let search_query = format!("all:{}", query);
        let max_results = self.max_results.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::source_failure(SOURCE_NAME, format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let papers = parse_feed(&body);

        tracing::debug!(source = SOURCE_NAME, count = papers.len(), "Parsed arXiv feed");
        Ok(papers)
    }
}

struct FeedPatterns {
    entry: Regex,
    title: Regex,
    summary: Regex,
    published: Regex,
    link: Regex,
    href: Regex,
    category: Regex,
}

fn patterns() -> &'static FeedPatterns {
    static PATTERNS: OnceLock<FeedPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FeedPatterns {
        entry: Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").expect("valid entry pattern"),
        title: Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").expect("valid title pattern"),
        summary: Regex::new(r"(?s)<summary\b[^>]*>(.*?)</summary>").expect("valid summary pattern"),
        published: Regex::new(r"<published>\s*(\d{4})").expect("valid published pattern"),
        link: Regex::new(r"<link\b[^>]*>").expect("valid link pattern"),
        href: Regex::new(r#"href="([^"]*)""#).expect("valid href pattern"),
        category: Regex::new(r#"<arxiv:primary_category\b[^>]*\bterm="([^"]*)""#)
            .expect("valid category pattern"),
    })
}

/// Parse an arXiv Atom feed into papers.
///
/// arXiv has no citation data, so `citations` is always `Some(0)`.
pub(crate) fn parse_feed(xml: &str) -> Vec<Paper> {
    let p = patterns();

    p.entry
        .captures_iter(xml)
        .filter_map(|entry| entry.get(1))
        .map(|entry| {
            let entry = entry.as_str();
            let capture = |re: &Regex| {
                re.captures(entry)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
            };

            let pdf = p
                .link
                .find_iter(entry)
                .map(|m| m.as_str())
                .find(|tag| tag.contains(r#"type="application/pdf""#))
                .and_then(|tag| p.href.captures(tag))
                .and_then(|c| c.get(1))
                .map(|m| clean_text(m.as_str()));

            Paper {
                title: capture(&p.title).map(clean_text).unwrap_or_default(),
                summary: capture(&p.summary).map(clean_text),
                year: capture(&p.published).and_then(|y| y.parse().ok()),
                citations: Some(0),
                subject: capture(&p.category).map(str::to_string),
                source: Source::Arxiv,
                pdf,
                ..Default::default()
            }
        })
        .collect()
}
