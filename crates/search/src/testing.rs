//! Test doubles for embedders and paper sources

use crate::sources::PaperSource;
use async_trait::async_trait;
use scholarrank_common::{
    embeddings::Embedder,
    errors::{AppError, Result},
    models::Paper,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder whose cosine similarity to the query is fixed per document.
///
/// The query embeds to `[1, 0]`, a scripted document with score `s` embeds
/// to `[s, sqrt(1 - s^2)]`, and any other text embeds to `[0, 1]`.
pub struct ScriptedEmbedder {
    query: String,
    scores: HashMap<String, f32>,
    drop_last: bool,
    batch_calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            scores: HashMap::new(),
            drop_last: false,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_score(mut self, text: &str, score: f32) -> Self {
        self.scores.insert(text.to_string(), score);
        self
    }

    /// Return one vector fewer than requested
    pub fn dropping_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        if text == self.query {
            return vec![1.0, 0.0];
        }
        match self.scores.get(text) {
            Some(&s) => vec![s, (1.0 - s * s).max(0.0).sqrt()],
            None => vec![0.0, 1.0],
        }
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector(t)).collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Embedder that always fails, standing in for an unavailable model
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::embedding("model not loaded"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::embedding("model not loaded"))
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Source returning a fixed list of papers
pub struct StaticSource {
    name: String,
    papers: Vec<Paper>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &str, papers: Vec<Paper>) -> Self {
        Self {
            name: name.to_string(),
            papers,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaperSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<Paper>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.papers.clone())
    }
}

/// Source that answers only after `delay`
pub struct SlowSource(pub std::time::Duration);

#[async_trait]
impl PaperSource for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }

    async fn search(&self, _query: &str) -> Result<Vec<Paper>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

/// Source that is always down
pub struct FailingSource(pub &'static str);

#[async_trait]
impl PaperSource for FailingSource {
    fn name(&self) -> &str {
        self.0
    }

    async fn search(&self, _query: &str) -> Result<Vec<Paper>> {
        Err(AppError::source_failure(self.0, "HTTP 503 Service Unavailable"))
    }
}

/// Paper with the fields the ranker reads
pub fn paper(title: &str, summary: &str, year: i32, citations: u64, subject: &str) -> Paper {
    Paper {
        title: title.to_string(),
        summary: Some(summary.to_string()),
        year: Some(year),
        citations: Some(citations),
        subject: Some(subject.to_string()),
        ..Default::default()
    }
}
