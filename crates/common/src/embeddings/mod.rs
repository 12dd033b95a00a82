//! Embedding service abstraction
//!
//! Provides a unified interface for embedding providers:
//! - Any OpenAI-compatible `/embeddings` endpoint (hosted or a local
//!   sentence-transformers server running e.g. all-MiniLM-L6-v2)
//! - A deterministic hashing embedder for development and tests

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
///
/// Implementations are created once per process and shared across
/// concurrent requests, so they must be safe for concurrent inference.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch), one vector per text
    /// in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Embed a short sample text and check the vector shape.
    async fn verify(&self) -> Result<()> {
        let vector = self.embed("health check").await?;
        if vector.len() != self.dimension() {
            return Err(AppError::embedding(format!(
                "model {} returned dimension {}, expected {}",
                self.model_name(),
                vector.len(),
                self.dimension()
            )));
        }
        Ok(())
    }
}

/// Client for OpenAI-compatible embedding endpoints
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new client from configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config.api_base.clone().ok_or_else(|| AppError::Configuration {
            message: "embedding.api_base is required for the http provider".to_string(),
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: config.max_retries,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Make request with exponential backoff on transient failures
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let max_retries = self.max_retries;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(self.timeout * (max_retries + 1)))
            .build();

        retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            match self.make_request(texts).await {
                Ok(embeddings) => Ok(embeddings),
                Err(backoff::Error::Transient { err, .. }) if attempt < max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        error = %err,
                        "Embedding request failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err(backoff::Error::Transient { err, .. }) => Err(backoff::Error::permanent(err)),
                Err(permanent) => Err(permanent),
            }
        })
        .await
    }

    async fn make_request(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, backoff::Error<AppError>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                backoff::Error::transient(AppError::EmbeddingTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            } else {
                backoff::Error::transient(AppError::embedding(format!("Request failed: {}", e)))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::embedding(format!("API error {}: {}", status, body));
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let mut result: EmbeddingResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::embedding(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        if result.data.len() != texts.len() {
            return Err(backoff::Error::permanent(AppError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            ))));
        }

        result.data.sort_by_key(|item| item.index);
        Ok(result.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_with_retry(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::embedding("Empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let embeddings = self.request_with_retry(chunk).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder hashing lowercase word tokens into signed buckets.
///
/// Texts sharing vocabulary get positive cosine similarity; the empty string
/// embeds to the zero vector.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hash_embed(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.hash_embed(text)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "http" | "openai" => Ok(Arc::new(HttpEmbedder::new(config)?)),
        "mock" => {
            tracing::warn!("Using mock embedder, similarity scores are lexical only");
            Ok(Arc::new(MockEmbedder::new(config.dimension)))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::new(384);
        let embedding = embedder.embed("graph neural networks").await.unwrap();
        assert_eq!(embedding.len(), 384);

        let norm = dot(&embedding, &embedding).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("Transformers for Vision").await.unwrap();
        let b = embedder.embed("transformers for vision").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_empty_text_is_zero_vector() {
        let embedder = MockEmbedder::new(32);
        let embedding = embedder.embed("").await.unwrap();
        assert!(embedding.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_mock_batch() {
        let embedder = MockEmbedder::new(128);
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 128);
        assert_eq!(embeddings[0], embedder.embed("text1").await.unwrap());
    }

    #[test]
    fn test_mock_verify() {
        assert!(tokio_test::block_on(MockEmbedder::new(16).verify()).is_ok());
    }

    mod http {
        use super::*;
        use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
        use serde_json::{json, Value};
        use std::sync::atomic::AtomicUsize;

        /// Maps (call number, request input) to the stub's reply
        type Reply = fn(usize, &[String]) -> (StatusCode, Value);

        struct Stub {
            calls: AtomicUsize,
            reply: Reply,
        }

        impl Stub {
            fn calls(&self) -> usize {
                self.calls.load(Ordering::SeqCst)
            }
        }

        async fn embeddings(
            State(stub): State<Arc<Stub>>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            let call = stub.calls.fetch_add(1, Ordering::SeqCst);
            let input: Vec<String> =
                serde_json::from_value(body["input"].clone()).unwrap_or_default();
            let (status, payload) = (stub.reply)(call, &input);
            (status, Json(payload))
        }

        async fn serve(reply: Reply) -> (String, Arc<Stub>) {
            let stub = Arc::new(Stub {
                calls: AtomicUsize::new(0),
                reply,
            });
            let app = Router::new()
                .route("/v1/embeddings", post(embeddings))
                .with_state(stub.clone());

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            (format!("http://{}/v1", addr), stub)
        }

        fn embedder(api_base: String, max_retries: u32, batch_size: usize) -> HttpEmbedder {
            HttpEmbedder::new(&EmbeddingConfig {
                api_base: Some(api_base),
                dimension: 2,
                timeout_secs: 5,
                max_retries,
                batch_size,
                ..Default::default()
            })
            .unwrap()
        }

        /// One item per input, `[position in request, input parsed as a number]`
        fn items(input: &[String]) -> Vec<Value> {
            input
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let value: f32 = text.parse().unwrap_or(-1.0);
                    json!({ "index": i, "embedding": [i as f32, value] })
                })
                .collect()
        }

        fn ok(input: &[String]) -> (StatusCode, Value) {
            (StatusCode::OK, json!({ "data": items(input) }))
        }

        fn texts(n: usize) -> Vec<String> {
            (0..n).map(|i| i.to_string()).collect()
        }

        #[tokio::test]
        async fn test_server_error_is_retried() {
            let (base, stub) = serve(|call, input| {
                if call == 0 {
                    (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "warming up" }))
                } else {
                    ok(input)
                }
            })
            .await;

            let vector = embedder(base, 3, 64).embed("7").await.unwrap();
            assert_eq!(vector, vec![0.0, 7.0]);
            assert_eq!(stub.calls(), 2);
        }

        #[tokio::test]
        async fn test_rate_limit_is_retried() {
            let (base, stub) = serve(|call, input| {
                if call < 2 {
                    (StatusCode::TOO_MANY_REQUESTS, json!({ "error": "slow down" }))
                } else {
                    ok(input)
                }
            })
            .await;

            assert!(embedder(base, 3, 64).embed("1").await.is_ok());
            assert_eq!(stub.calls(), 3);
        }

        #[tokio::test]
        async fn test_retries_stop_at_max_retries() {
            let (base, stub) =
                serve(|_, _| (StatusCode::BAD_GATEWAY, json!({ "error": "down" }))).await;

            let err = embedder(base, 2, 64).embed("1").await.unwrap_err();
            assert!(matches!(err, AppError::EmbeddingError { .. }));
            assert_eq!(stub.calls(), 3);
        }

        #[tokio::test]
        async fn test_client_error_is_not_retried() {
            let (base, stub) =
                serve(|_, _| (StatusCode::BAD_REQUEST, json!({ "error": "bad model" }))).await;

            let err = embedder(base, 3, 64).embed("1").await.unwrap_err();
            assert!(err.to_string().contains("400"));
            assert_eq!(stub.calls(), 1);
        }

        #[tokio::test]
        async fn test_items_are_reordered_by_index() {
            let (base, stub) = serve(|_, input| {
                let mut data = items(input);
                data.reverse();
                (StatusCode::OK, json!({ "data": data }))
            })
            .await;

            let vectors = embedder(base, 0, 64).embed_batch(&texts(3)).await.unwrap();
            assert_eq!(vectors, vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]]);
            assert_eq!(stub.calls(), 1);
        }

        #[tokio::test]
        async fn test_short_response_is_rejected() {
            let (base, stub) = serve(|_, input| {
                let mut data = items(input);
                data.pop();
                (StatusCode::OK, json!({ "data": data }))
            })
            .await;

            let err = embedder(base, 3, 64).embed_batch(&texts(2)).await.unwrap_err();
            assert!(err.to_string().contains("expected 2 embeddings, got 1"));
            assert_eq!(stub.calls(), 1);
        }

        #[tokio::test]
        async fn test_large_input_is_split_into_batches() {
            let (base, stub) = serve(|_, input| ok(input)).await;

            let vectors = embedder(base, 0, 2).embed_batch(&texts(5)).await.unwrap();
            let values: Vec<f32> = vectors.iter().map(|v| v[1]).collect();
            assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
            assert_eq!(stub.calls(), 3);
        }
    }

    #[test]
    fn test_create_embedder_mock() {
        let config = EmbeddingConfig {
            provider: "mock".to_string(),
            dimension: 48,
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 48);
        assert_eq!(embedder.model_name(), "mock-embedding");
    }

    #[test]
    fn test_http_provider_requires_base_url() {
        let config = EmbeddingConfig::default();
        let err = create_embedder(&config).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(create_embedder(&config).is_err());
    }
}
