//! Brolly Vector crate - chunking, embedding, flat index, and retrieval.
//!
//! Provides the offline ingestion pipeline (chunk, embed, index, persist)
//! and the online similarity retriever with metadata filtering, plus an
//! embedding service trait with ONNX and deterministic mock backends.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod retrieval;

pub use chunker::{chunk_text, classify_clause};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use index::{PolicyIndex, SearchHit};
pub use pipeline::{build_index, load_artifacts, load_documents, save_artifacts, IndexBuild};
pub use retrieval::{PolicyRetriever, RetrieverInit};
