//! ScholarRank Search Service
//!
//! HTTP entry point:
//! - Multi-source paper retrieval (arXiv, Semantic Scholar)
//! - Hybrid re-ranking (similarity, citations, recency)
//! - Source result caching via Redis
//! - Prometheus metrics on a separate port

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use scholarrank_common::{
    cache::{Cache, CacheConfig},
    config::{AppConfig, ObservabilityConfig},
    embeddings::create_embedder,
    metrics, VERSION,
};
use scholarrank_search::{
    create_router, ranking::HybridRanker, service::SearchService, sources::build_sources, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting ScholarRank Search Service v{}", VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_prometheus(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Embedding model is required; refuse to start without it
    let embedder = create_embedder(&config.embedding).context("Failed to create embedder")?;
    embedder
        .verify()
        .await
        .context("Embedding model failed its startup check")?;
    info!(
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "Embedder ready"
    );

    // Initialize Redis cache (optional)
    let cache = match CacheConfig::from_settings(&config.cache) {
        Some(cache_config) => {
            info!("Connecting to Redis at {}", cache_config.url);
            match Cache::new(cache_config).await {
                Ok(cache) => {
                    info!("Redis cache connected");
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    warn!("Failed to connect to Redis, caching disabled: {}", e);
                    None
                }
            }
        }
        None => {
            info!("No Redis URL configured, caching disabled");
            None
        }
    };

    let sources = build_sources(&config.sources, cache.clone())
        .context("Failed to build paper sources")?;
    if sources.is_empty() {
        warn!("All paper sources are disabled; searches will return no results");
    }

    let service = SearchService::new(sources, HybridRanker::new(embedder.clone()));
    info!(sources = ?service.source_names(), "Search service initialized");

    let state = AppState {
        config: config.clone(),
        service,
        embedder,
        cache,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Search service shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let mut builder = PrometheusBuilder::new().with_http_listener(addr);
    for name in ["request", "search", "source"] {
        builder = builder.set_buckets_for_metric(
            Matcher::Full(format!("{}_{}_duration_seconds", metrics::METRICS_PREFIX, name)),
            metrics::LATENCY_BUCKETS,
        )?;
    }
    builder
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_embedding_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::EMBEDDING_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics on {}", addr);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
