use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BrollyError, Result};

/// Top-level configuration for the Brolly application.
///
/// Loaded from `brolly.toml` by default. Each section corresponds to one
/// pipeline stage or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrollyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for BrollyConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl BrollyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BrollyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BrollyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for index artifacts and other generated data.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Document chunking configuration (character-based windows).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    pub model_name: String,
    /// Embedding dimension.
    pub dimension: usize,
    /// Path to an ONNX model file. When unset, the deterministic mock
    /// backend is used.
    pub model_path: Option<String>,
    /// Path to the matching tokenizer.json.
    pub tokenizer_path: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            model_path: None,
            tokenizer_path: None,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per query.
    pub k: usize,
    /// Base name for the persisted index artifact pair.
    pub index_name: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            index_name: "policy_index".to_string(),
        }
    }
}

/// Language-model invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model selector; "mock" wires the deterministic built-in backend.
    pub model: String,
    /// Additional attempts after the first failure (transient errors only).
    pub max_retries: u32,
    /// Base backoff delay in seconds; scales linearly with the attempt number.
    pub retry_delay_secs: u64,
    /// Answers shorter than this are rejected by the quality gate.
    pub min_answer_len: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "mock".to_string(),
            max_retries: 2,
            retry_delay_secs: 2,
            min_answer_len: 20,
        }
    }
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of most recent turns included in the prompt transcript.
    pub max_recent: usize,
    /// Sessions idle longer than this are removed by the sweep.
    pub expiry_hours: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_recent: 10,
            expiry_hours: 24,
        }
    }
}
