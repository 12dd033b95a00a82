//! Upstream paper sources
//!
//! Each source turns a free-text query into a list of [`Paper`] records with
//! missing fields left as `None`, which the ranker then reads through the
//! explicit defaults on `Paper`. Provided sources:
//! - arXiv (Atom API)
//! - Semantic Scholar (Graph API)
//! - A Redis-backed caching decorator for either

mod arxiv;
mod cached;
mod semantic_scholar;

pub use arxiv::ArxivSource;
pub use cached::CachedSource;
pub use semantic_scholar::SemanticScholarSource;

use async_trait::async_trait;
use scholarrank_common::{
    cache::Cache,
    config::SourcesConfig,
    errors::{AppError, Result},
    models::Paper,
};
use regex_lite::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// A searchable collection of papers
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Short identifier used in logs, metrics, and cache keys
    fn name(&self) -> &str;

    /// Search for papers matching `query`
    async fn search(&self, query: &str) -> Result<Vec<Paper>>;
}

/// Build the enabled sources in priority order (arXiv first).
///
/// When a cache is given every source is wrapped so repeated queries are
/// served from Redis.
pub fn build_sources(
    config: &SourcesConfig,
    cache: Option<Arc<Cache>>,
) -> Result<Vec<Arc<dyn PaperSource>>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("scholarrank/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

    let mut sources: Vec<Arc<dyn PaperSource>> = Vec::new();

    if config.arxiv.enabled {
        sources.push(Arc::new(ArxivSource::new(client.clone(), &config.arxiv)));
    }
    if config.semantic_scholar.enabled {
        sources.push(Arc::new(SemanticScholarSource::new(
            client,
            &config.semantic_scholar,
        )));
    }

    if let Some(cache) = cache {
        sources = sources
            .into_iter()
            .map(|source| {
                let ttl_secs = cache.default_ttl_secs();
                Arc::new(CachedSource::new(source, cache.clone(), ttl_secs)) as Arc<dyn PaperSource>
            })
            .collect();
    }

    Ok(sources)
}

/// Decode XML entities (named and numeric) and collapse runs of whitespace
pub(crate) fn clean_text(raw: &str) -> String {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    let numeric = NUMERIC.get_or_init(|| {
        Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid entity pattern")
    });

    // Numeric references first so an escaped `&amp;#233;` stays literal
    let decoded = numeric.replace_all(raw, |caps: &regex_lite::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let decoded = decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
