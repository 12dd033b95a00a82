//! ScholarRank Common Library
//!
//! Shared code for the ScholarRank search service including:
//! - Paper record model
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Redis result caching
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use models::{Paper, RankedPaper, Source};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
