//! Online similarity retrieval over the persisted policy index.
//!
//! The retriever never fails its caller: malformed queries, embedding
//! failures, and search errors all degrade to an empty result with a log
//! line. Initialization happens exactly once, producing either a ready
//! retriever or an `Unavailable` handle that serves empty results without
//! retrying the load.

use std::path::Path;

use tracing::{debug, info, warn};

use brolly_core::error::{BrollyError, Result};
use brolly_core::{ChunkRecord, PolicyType, RetrievedChunk};

use crate::embedding::{l2_normalize, DynEmbeddingService};
use crate::index::PolicyIndex;
use crate::pipeline::{self, IndexBuild};

/// Similarity retriever over an immutable index/metadata pair.
pub struct PolicyRetriever {
    index: PolicyIndex,
    records: Vec<ChunkRecord>,
    embedding: Box<dyn DynEmbeddingService>,
}

impl std::fmt::Debug for PolicyRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRetriever")
            .field("chunks", &self.records.len())
            .field("dimensions", &self.index.dimensions())
            .finish()
    }
}

impl PolicyRetriever {
    /// Wrap a built index and the embedding service that produced it.
    ///
    /// The pairing is validated up front: vector and record counts must
    /// match, and the index dimensionality must match the service.
    pub fn new(build: IndexBuild, embedding: Box<dyn DynEmbeddingService>) -> Result<Self> {
        if build.index.len() != build.records.len() {
            return Err(BrollyError::Retrieval(format!(
                "Index has {} vectors but {} metadata records",
                build.index.len(),
                build.records.len()
            )));
        }
        if build.index.dimensions() != embedding.dimensions() {
            return Err(BrollyError::Retrieval(format!(
                "Index dimension {} does not match embedding dimension {}",
                build.index.dimensions(),
                embedding.dimensions()
            )));
        }
        Ok(Self {
            index: build.index,
            records: build.records,
            embedding,
        })
    }

    /// Number of chunks available for retrieval.
    pub fn chunk_count(&self) -> usize {
        self.records.len()
    }

    /// Retrieve up to `k` chunks relevant to the query, best first.
    ///
    /// Optional filters restrict results to an exact document type or region
    /// match. The search over-fetches (x4 with a filter active, x2 without,
    /// capped at the index size) so that post-filtering can still fill `k`.
    /// Never fails: every internal error degrades to an empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        type_filter: Option<PolicyType>,
        region_filter: Option<&str>,
        k: usize,
    ) -> Vec<RetrievedChunk> {
        if query.trim().is_empty() {
            debug!("Empty query, returning no chunks");
            return Vec::new();
        }
        if k == 0 || self.index.is_empty() {
            return Vec::new();
        }

        let mut vector = match self.embedding.embed_boxed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, returning no chunks");
                return Vec::new();
            }
        };
        l2_normalize(&mut vector);

        let has_filter = type_filter.is_some() || region_filter.is_some();
        let over_fetch = if has_filter {
            k.saturating_mul(4)
        } else {
            k.saturating_mul(2)
        };
        let search_k = over_fetch.min(self.index.len().max(1));

        let hits = match self.index.search(&vector, search_k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "Index search failed, returning no chunks");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(k);
        for hit in hits {
            // Skip entries whose metadata is missing or unusable rather
            // than aborting the search.
            let Some(record) = self.records.get(hit.ordinal) else {
                continue;
            };
            if record.text.trim().is_empty() {
                continue;
            }
            if let Some(wanted) = type_filter {
                if record.document_type != wanted {
                    continue;
                }
            }
            if let Some(wanted) = region_filter {
                if record.region != wanted {
                    continue;
                }
            }

            // Squared-Euclidean distance over unit vectors lies in [0, 4]
            // and equals 2 - 2*cos; distances beyond 2 map to zero.
            let similarity = if hit.distance <= 2.0 {
                1.0 - hit.distance / 2.0
            } else {
                0.0
            };

            results.push(RetrievedChunk {
                record: record.clone(),
                similarity,
            });
            if results.len() >= k {
                break;
            }
        }

        debug!(
            requested = k,
            returned = results.len(),
            filtered = has_filter,
            "Retrieved chunks"
        );
        results
    }
}

/// Outcome of the one-time retriever initialization.
///
/// `Unavailable` is terminal for the process: callers get empty results and
/// the load is not retried. Recovery requires rebuilding the artifacts and
/// restarting.
#[derive(Debug)]
pub enum RetrieverInit {
    Ready(PolicyRetriever),
    Unavailable { reason: String },
}

impl RetrieverInit {
    /// Load the artifact pair and wrap it, recording failure instead of
    /// propagating it.
    pub fn load(dir: &Path, name: &str, embedding: Box<dyn DynEmbeddingService>) -> Self {
        match pipeline::load_artifacts(dir, name)
            .and_then(|build| PolicyRetriever::new(build, embedding))
        {
            Ok(retriever) => {
                info!(chunks = retriever.chunk_count(), "Retriever ready");
                RetrieverInit::Ready(retriever)
            }
            Err(e) => {
                warn!(error = %e, "Retrieval unavailable, queries will get no context");
                RetrieverInit::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Retrieve through the handle; an unavailable retriever always yields
    /// an empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        type_filter: Option<PolicyType>,
        region_filter: Option<&str>,
        k: usize,
    ) -> Vec<RetrievedChunk> {
        match self {
            RetrieverInit::Ready(retriever) => {
                retriever.retrieve(query, type_filter, region_filter, k).await
            }
            RetrieverInit::Unavailable { .. } => {
                debug!("Retriever unavailable, returning no chunks");
                Vec::new()
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RetrieverInit::Ready(_))
    }

    /// Failure reason when unavailable.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            RetrieverInit::Ready(_) => None,
            RetrieverInit::Unavailable { reason } => Some(reason),
        }
    }
}
