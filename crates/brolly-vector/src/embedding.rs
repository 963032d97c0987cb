//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` loads a sentence-transformer ONNX model (e.g.
//!   all-MiniLM-L6-v2) via ort and tokenizes with the HuggingFace tokenizers
//!   crate. This is the production embedding backend.
//! - `MockEmbedding` provides deterministic hash-based vectors, used in tests
//!   and as the default backend when no model is configured.
//!
//! The same service instance must be used at index-build time and query time;
//! vectors from different services do not share an embedding space.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use brolly_core::error::BrollyError;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors that capture
/// semantic meaning. Used for both indexing (chunks) and search (queries).
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, BrollyError>> + Send;

    /// Embed a batch of texts, preserving order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, BrollyError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// Because `EmbeddingService::embed` returns `impl Future` it is not
/// object-safe. This trait uses boxed futures instead, allowing
/// `Box<dyn DynEmbeddingService>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `EmbeddingService`
/// automatically implements `DynEmbeddingService`.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, BrollyError>> + Send + 'a>,
    >;

    /// Embed a batch of texts, preserving order (boxed future).
    fn embed_batch_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>, BrollyError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Blanket impl: any `EmbeddingService` automatically implements `DynEmbeddingService`.
impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, BrollyError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn embed_batch_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>, BrollyError>> + Send + 'a>,
    > {
        Box::pin(self.embed_batch(texts))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

/// L2-normalize a vector in place. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector {
            *val /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - real ONNX Runtime inference
// ---------------------------------------------------------------------------

/// ONNX Runtime-backed embedding service using a sentence-transformer model.
///
/// Expects a model directory containing:
/// - `model.onnx`: the sentence-transformer ONNX export
/// - `tokenizer.json`: the HuggingFace fast-tokenizer file
///
/// The model should accept `input_ids`, `attention_mask`, and optionally
/// `token_type_ids` as i64 inputs and produce token-level embeddings.
/// Mean pooling (masked) is applied to produce a single vector per input.
pub struct OnnxEmbeddingService {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimensions: usize,
}

// ort::Session is Send + Sync internally (uses Arc<SharedSessionInner>).
unsafe impl Send for OnnxEmbeddingService {}
unsafe impl Sync for OnnxEmbeddingService {}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load a sentence-transformer model from the given directory.
    ///
    /// The directory must contain `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path) -> Result<Self, BrollyError> {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )
    }

    /// Load from explicit model and tokenizer file paths.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, BrollyError> {
        if !model_path.exists() {
            return Err(BrollyError::Embedding(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(BrollyError::Embedding(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| BrollyError::Embedding(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| BrollyError::Embedding(format!("ONNX set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| BrollyError::Embedding(format!("ONNX load model: {}", e)))?;

        // Detect output dimensions from the model output type.
        // Sentence-transformer output is typically [batch, seq_len, hidden_dim].
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 384 })
            .unwrap_or(384);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| BrollyError::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimensions,
        })
    }

    fn clone_handles(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            tokenizer: Arc::clone(&self.tokenizer),
            dimensions: self.dimensions,
        }
    }

    /// Tokenize, run inference, and mean-pool the output.
    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, BrollyError> {
        if text.is_empty() {
            return Err(BrollyError::Embedding("Cannot embed empty text".to_string()));
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| BrollyError::Embedding(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();

        // Create ndarray views with shape [1, seq_len] for batch size 1.
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| BrollyError::Embedding(format!("input_ids array: {}", e)))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| BrollyError::Embedding(format!("attention_mask array: {}", e)))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| BrollyError::Embedding(format!("token_type_ids array: {}", e)))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| BrollyError::Embedding(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| BrollyError::Embedding(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| BrollyError::Embedding(format!("TensorRef token_type_ids: {}", e)))?;

        // Run inference: input_ids, attention_mask, token_type_ids
        let mut session = self
            .session
            .lock()
            .map_err(|e| BrollyError::Embedding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| BrollyError::Embedding(format!("ONNX inference failed: {}", e)))?;

        // Extract token embeddings as flat slice: [1, seq_len, hidden_dim].
        // ort 2.0 try_extract_tensor returns (&Shape, &[f32]).
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| BrollyError::Embedding(format!("Extract embeddings: {}", e)))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        let hidden_dim = match shape_dims.last() {
            Some(&dim) if shape_dims.len() >= 2 => dim as usize,
            _ => {
                return Err(BrollyError::Embedding(format!(
                    "Unexpected output shape: {:?}",
                    shape_dims
                )))
            }
        };

        // Mean pooling over the sequence dimension, masked by attention_mask.
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;

        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for dim in 0..hidden_dim {
                    pooled[dim] += data[offset + dim];
                }
                count += 1.0;
            }
        }

        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        l2_normalize(&mut pooled);

        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BrollyError> {
        // ONNX Runtime inference is CPU-bound; run on a blocking thread.
        let svc = self.clone_handles();
        let text_owned = text.to_string();

        tokio::task::spawn_blocking(move || svc.embed_sync(&text_owned))
            .await
            .map_err(|e| BrollyError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BrollyError> {
        // One blocking task for the whole batch; the session lock serializes
        // inference anyway.
        let svc = self.clone_handles();
        let texts_owned: Vec<String> = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut vectors = Vec::with_capacity(texts_owned.len());
            for text in &texts_owned {
                vectors.push(svc.embed_sync(text)?);
            }
            Ok(vectors)
        })
        .await
        .map_err(|e| BrollyError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs and an index built with this service is
/// queryable through it. There is no semantic signal; only exact-text matches
/// score high.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(384);
        for i in 0..384 {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        // Unit vectors, matching OnnxEmbeddingService: the distance-to-
        // similarity conversion at query time assumes normalized inputs.
        l2_normalize(&mut result);

        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BrollyError> {
        if text.is_empty() {
            return Err(BrollyError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        384
    }
}
