//! Read-through Redis caching for paper sources

use super::PaperSource;
use async_trait::async_trait;
use scholarrank_common::{
    cache::{keys, Cache},
    errors::Result,
    models::Paper,
};
use std::sync::Arc;

/// Serves repeated queries for a source from Redis.
///
/// Only successful fetches are cached; a failing source is retried on the
/// next request.
pub struct CachedSource {
    inner: Arc<dyn PaperSource>,
    cache: Arc<Cache>,
    ttl_secs: u64,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn PaperSource>, cache: Arc<Cache>, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache,
            ttl_secs,
        }
    }
}

#[async_trait]
impl PaperSource for CachedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let key = keys::source_query(self.inner.name(), query);
        self.cache
            .get_or_load(&key, self.ttl_secs, || self.inner.search(query))
            .await
    }
}
