//! Flat vector index with brute-force squared-Euclidean search.
//!
//! Vectors live at stable ordinal positions so that the chunk metadata list
//! persisted alongside the index corresponds 1:1 by position. The index is
//! built offline by a single writer and is read-only at query time, so no
//! interior locking is needed. Search is O(n), which is fine for a corpus of
//! policy documents.
//!
//! Over L2-normalized vectors, squared-Euclidean distance equals
//! `2 - 2 * cosine_similarity`; the retriever relies on this when converting
//! distances to similarity scores.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use brolly_core::error::{BrollyError, Result};

const INDEX_MAGIC: &[u8; 4] = b"BRIX";
const INDEX_VERSION: u32 = 1;

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Ordinal position of the matching vector (and its metadata record).
    pub ordinal: usize,
    /// Squared-Euclidean distance to the query; lower is closer.
    pub distance: f32,
}

/// Flat in-memory vector index.
#[derive(Debug, Clone)]
pub struct PolicyIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl PolicyIndex {
    /// Create a new empty index for vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    /// Append a vector at the next ordinal position.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(BrollyError::Index(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Search for the k nearest vectors to the query.
    ///
    /// Returns hits sorted by ascending distance (best first).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(BrollyError::Index(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(ordinal, vector)| SearchHit {
                ordinal,
                distance: squared_l2(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Return the number of vectors stored in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Return true if the index contains no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Return the dimensionality this index expects.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Write the index to a binary artifact file.
    ///
    /// Layout: magic, format version, dimension, vector count (all u32
    /// little-endian after the 4-byte magic), then the vector data as
    /// little-endian f32 in ordinal order.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(INDEX_MAGIC)?;
        writer.write_all(&INDEX_VERSION.to_le_bytes())?;
        writer.write_all(&(self.dimensions as u32).to_le_bytes())?;
        writer.write_all(&(self.vectors.len() as u32).to_le_bytes())?;
        for vector in &self.vectors {
            for value in vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Read an index from a binary artifact file.
    ///
    /// Any framing mismatch (bad magic, unsupported version, truncated data)
    /// is an `Index` error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| BrollyError::Index(format!("{}: not an index file", path.display())))?;
        if &magic != INDEX_MAGIC {
            return Err(BrollyError::Index(format!(
                "{}: not an index file",
                path.display()
            )));
        }

        let version = read_u32(&mut reader, path)?;
        if version != INDEX_VERSION {
            return Err(BrollyError::Index(format!(
                "{}: unsupported index version {}",
                path.display(),
                version
            )));
        }

        let dimensions = read_u32(&mut reader, path)? as usize;
        if dimensions == 0 {
            return Err(BrollyError::Index(format!(
                "{}: zero-dimension index",
                path.display()
            )));
        }
        let count = read_u32(&mut reader, path)? as usize;

        let mut vectors = Vec::with_capacity(count);
        let mut buf = vec![0u8; dimensions * 4];
        for _ in 0..count {
            reader.read_exact(&mut buf).map_err(|_| {
                BrollyError::Index(format!("{}: truncated vector data", path.display()))
            })?;
            let vector: Vec<f32> = buf
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            vectors.push(vector);
        }

        Ok(Self {
            dimensions,
            vectors,
        })
    }
}

fn read_u32(reader: &mut impl Read, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| BrollyError::Index(format!("{}: truncated header", path.display())))?;
    Ok(u32::from_le_bytes(buf))
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
