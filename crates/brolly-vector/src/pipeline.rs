//! Offline ingestion: document loading, index building, artifact persistence.
//!
//! The build is a single-writer batch job. It produces two artifacts that are
//! only meaningful together: the binary vector index and a JSON list of chunk
//! metadata records in the same ordinal order. `load_artifacts` refuses to
//! load one without the other or a pair whose counts disagree.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use brolly_core::error::{BrollyError, Result};
use brolly_core::{ChunkRecord, PolicyDocument, PolicyType};

use crate::chunker;
use crate::embedding::{l2_normalize, DynEmbeddingService};
use crate::index::PolicyIndex;

/// Raw on-disk shape of one policy document file.
#[derive(Debug, Deserialize)]
struct RawPolicyFile {
    #[serde(default)]
    policy_id: Option<String>,
    #[serde(default)]
    policy_type: Option<String>,
    #[serde(default = "default_region")]
    region: String,
    #[serde(default = "default_title")]
    title: String,
    #[serde(default)]
    terms_and_conditions: String,
}

fn default_region() -> String {
    "global".to_string()
}

fn default_title() -> String {
    "Untitled Policy".to_string()
}

/// A built index together with its metadata records.
///
/// Invariant: `index.len() == records.len()`, position for position.
#[derive(Debug)]
pub struct IndexBuild {
    pub index: PolicyIndex,
    pub records: Vec<ChunkRecord>,
}

/// Load every `*.json` policy document from a directory.
///
/// Files are read in file-name order so repeated builds assign the same
/// ordinals. A file with a missing or unknown `policy_type` is an ingest
/// error naming the file; other fields fall back to defaults
/// (`policy_id` = file stem, `region` = "global", `title` = "Untitled
/// Policy", empty body).
pub fn load_documents(dir: &Path) -> Result<Vec<PolicyDocument>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let content = std::fs::read_to_string(path)?;
        let raw: RawPolicyFile = serde_json::from_str(&content)
            .map_err(|e| BrollyError::Ingest(format!("{}: {}", path.display(), e)))?;

        let id = raw.policy_id.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let policy_type: PolicyType = raw
            .policy_type
            .ok_or_else(|| {
                BrollyError::Ingest(format!("{}: missing policy_type", path.display()))
            })?
            .parse()
            .map_err(|e| BrollyError::Ingest(format!("{}: {}", path.display(), e)))?;

        documents.push(PolicyDocument {
            id,
            policy_type,
            region: raw.region,
            title: raw.title,
            body: raw.terms_and_conditions,
        });
    }

    info!(
        directory = %dir.display(),
        documents = documents.len(),
        "Loaded policy documents"
    );
    Ok(documents)
}

/// Chunk and embed every document, producing an index whose vectors sit at
/// the same ordinals as their metadata records.
///
/// Vectors are L2-normalized before insertion, so squared-Euclidean search
/// over the index is equivalent to cosine ranking.
pub async fn build_index(
    documents: &[PolicyDocument],
    embedding: &dyn DynEmbeddingService,
    chunk_size: usize,
    overlap: usize,
) -> Result<IndexBuild> {
    let mut records = Vec::new();
    for doc in documents {
        let chunks = chunker::chunk_text(&doc.body, chunk_size, overlap);
        debug!(document_id = %doc.id, chunks = chunks.len(), "Chunked document");
        for (i, chunk) in chunks.into_iter().enumerate() {
            records.push(ChunkRecord {
                document_id: doc.id.clone(),
                document_type: doc.policy_type,
                region: doc.region.clone(),
                title: doc.title.clone(),
                clause_category: chunk.clause_category,
                chunk_id: format!("{}_chunk_{}", doc.id, i),
                text: chunk.text,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
            });
        }
    }

    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let mut vectors = embedding.embed_batch_boxed(&texts).await?;
    for vector in &mut vectors {
        l2_normalize(vector);
    }

    let mut index = PolicyIndex::new(embedding.dimensions());
    for vector in vectors {
        index.add(vector)?;
    }

    info!(
        documents = documents.len(),
        chunks = records.len(),
        "Built policy index"
    );
    Ok(IndexBuild { index, records })
}

/// Path of the binary index artifact for a given index name.
pub fn index_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.index", name))
}

/// Path of the JSON metadata artifact for a given index name.
pub fn metadata_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}_metadata.json", name))
}

/// Persist the artifact pair. Whole-file writes; rebuilds overwrite.
pub fn save_artifacts(build: &IndexBuild, dir: &Path, name: &str) -> Result<()> {
    if build.index.len() != build.records.len() {
        return Err(BrollyError::Index(format!(
            "Refusing to save: {} vectors but {} metadata records",
            build.index.len(),
            build.records.len()
        )));
    }

    std::fs::create_dir_all(dir)?;
    build.index.save(&index_path(dir, name))?;
    let json = serde_json::to_string_pretty(&build.records)?;
    std::fs::write(metadata_path(dir, name), json)?;

    info!(
        directory = %dir.display(),
        name,
        chunks = build.records.len(),
        "Saved index artifacts"
    );
    Ok(())
}

/// Load the artifact pair written by [`save_artifacts`].
///
/// Both files must be present and their counts must agree; anything else is
/// an `Index` error.
pub fn load_artifacts(dir: &Path, name: &str) -> Result<IndexBuild> {
    let ipath = index_path(dir, name);
    let mpath = metadata_path(dir, name);

    if !ipath.exists() {
        return Err(BrollyError::Index(format!(
            "Missing index artifact {}",
            ipath.display()
        )));
    }
    if !mpath.exists() {
        return Err(BrollyError::Index(format!(
            "Missing metadata artifact {}",
            mpath.display()
        )));
    }

    let index = PolicyIndex::load(&ipath)?;
    let content = std::fs::read_to_string(&mpath)?;
    let records: Vec<ChunkRecord> = serde_json::from_str(&content)
        .map_err(|e| BrollyError::Index(format!("{}: {}", mpath.display(), e)))?;

    if index.len() != records.len() {
        return Err(BrollyError::Index(format!(
            "Artifact mismatch: {} vectors but {} metadata records",
            index.len(),
            records.len()
        )));
    }

    info!(
        directory = %dir.display(),
        name,
        chunks = records.len(),
        "Loaded index artifacts"
    );
    Ok(IndexBuild { index, records })
}
