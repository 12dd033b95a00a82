//! Configuration management for ScholarRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Upstream paper sources
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Default ranking weights
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Redis cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: http, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL of an OpenAI-compatible embeddings endpoint
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Per-request timeout for upstream APIs in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub arxiv: ArxivConfig,

    #[serde(default)]
    pub semantic_scholar: SemanticScholarConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArxivConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_arxiv_base")]
    pub base_url: String,

    #[serde(default = "default_arxiv_max_results")]
    pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticScholarConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_semantic_base")]
    pub base_url: String,

    #[serde(default = "default_semantic_limit")]
    pub limit: u32,

    /// Optional partner API key (sent as `x-api-key`)
    pub api_key: Option<String>,

    /// Outbound request budget
    #[serde(default = "default_semantic_rps")]
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,

    #[serde(default = "default_citation_weight")]
    pub citation_weight: f64,

    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Redis URL; caching is disabled when unset
    pub redis_url: Option<String>,

    /// TTL for cached source results in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_cache_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_embedding_provider() -> String { "http".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 64 }
fn default_source_timeout() -> u64 { 10 }
fn default_enabled() -> bool { true }
fn default_arxiv_base() -> String { "http://export.arxiv.org/api".to_string() }
fn default_arxiv_max_results() -> u32 { 20 }
fn default_semantic_base() -> String { "https://api.semanticscholar.org/graph/v1".to_string() }
fn default_semantic_limit() -> u32 { 10 }
fn default_semantic_rps() -> u32 { 1 }
fn default_similarity_weight() -> f64 { 0.6 }
fn default_citation_weight() -> f64 { 0.3 }
fn default_recency_weight() -> f64 { 0.1 }
fn default_cache_ttl() -> u64 { 3600 }
fn default_cache_prefix() -> String { "scholarrank".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "scholarrank-search".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_source_timeout(),
            arxiv: ArxivConfig::default(),
            semantic_scholar: SemanticScholarConfig::default(),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_arxiv_base(),
            max_results: default_arxiv_max_results(),
        }
    }
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_semantic_base(),
            limit: default_semantic_limit(),
            api_key: None,
            requests_per_second: default_semantic_rps(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            similarity_weight: default_similarity_weight(),
            citation_weight: default_citation_weight(),
            recency_weight: default_recency_weight(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            key_prefix: default_cache_prefix(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.sources.arxiv.max_results, 20);
        assert_eq!(config.sources.semantic_scholar.limit, 10);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.cache.redis_url.is_none());
    }

    #[test]
    fn test_default_ranking_weights() {
        let ranking = RankingConfig::default();
        assert_eq!(ranking.similarity_weight, 0.6);
        assert_eq!(ranking.citation_weight, 0.3);
        assert_eq!(ranking.recency_weight, 0.1);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let toml = r#"
            [server]
            port = 9000

            [embedding]
            provider = "mock"

            [sources.semantic_scholar]
            enabled = false
        "#;

        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.embedding.provider, "mock");
        assert!(!config.sources.semantic_scholar.enabled);
        assert!(config.sources.arxiv.enabled);
        assert_eq!(config.ranking.similarity_weight, 0.6);
    }

    #[test]
    fn test_shipped_default_file_requires_a_real_model() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                include_str!("../../../../config/default.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.embedding.provider, "http");
        assert!(config.embedding.api_base.is_none());
        assert!(crate::embeddings::create_embedder(&config.embedding).is_err());
    }

    #[test]
    fn test_timeouts() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
