//! Configuration management for docqa
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Relative paths in `[storage]` resolve against the directory holding the
//! config file.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Corpus and index locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Question generation and evaluation
    #[serde(default)]
    pub questions: QuestionsConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Corpus and index locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory scanned for documents (non-recursive)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding persisted index versions
    #[serde(default = "default_index_dir")]
    pub index_dir: String,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of fragments per question
    #[serde(default = "default_retrieval_k")]
    pub k: usize,

    /// Maximum k a caller may request
    #[serde(default = "default_retrieval_max_k")]
    pub max_k: usize,

    /// Distance threshold. Accepted for compatibility, never applied.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

/// Language model configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_top_p")]
    pub top_p: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

/// Question generation and evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsConfig {
    /// Output file for generated questions
    #[serde(default = "default_questions_output")]
    pub output: String,

    #[serde(default = "default_questions_factual")]
    pub factual: usize,

    #[serde(default = "default_questions_applied")]
    pub applied: usize,

    #[serde(default = "default_questions_reasoning")]
    pub reasoning: usize,

    /// Directory for evaluation results and report
    #[serde(default = "default_eval_output_dir")]
    pub eval_output_dir: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for docqa data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            questions: QuestionsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_dir: default_index_dir(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_retrieval_k(),
            max_k: default_retrieval_max_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            top_p: default_llm_top_p(),
            timeout_secs: default_llm_timeout(),
            retries: default_llm_retries(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
        }
    }
}

impl Default for QuestionsConfig {
    fn default() -> Self {
        Self {
            output: default_questions_output(),
            factual: default_questions_factual(),
            applied: default_questions_applied(),
            reasoning: default_questions_reasoning(),
            eval_output_dir: default_eval_output_dir(),
        }
    }
}

impl Config {
    /// Get the default base directory for docqa (~/.docqa)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docqa")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.paths.base_dir.join(path)
        }
    }

    /// Directory scanned for documents
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.storage.data_dir)
    }

    /// Directory holding persisted index versions
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.storage.index_dir)
    }

    pub fn questions_file(&self) -> PathBuf {
        self.resolve(&self.questions.output)
    }

    pub fn eval_output_dir(&self) -> PathBuf {
        self.resolve(&self.questions.eval_output_dir)
    }

    /// Get the language model API key from environment
    pub fn llm_api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Clamp a caller-supplied k to the configured bounds
    pub fn resolve_k(&self, k: Option<usize>) -> usize {
        k.unwrap_or(self.retrieval.k).clamp(1, self.retrieval.max_k)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(Error::Config(
                "chunk.chunk_size must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        if self.retrieval.k == 0 {
            return Err(Error::Config("retrieval.k must be positive".to_string()));
        }

        if self.retrieval.k > self.retrieval.max_k {
            return Err(Error::Config(
                "retrieval.k must be <= retrieval.max_k".to_string(),
            ));
        }

        if self.retrieval.score_threshold < 0.0 {
            return Err(Error::Config(
                "retrieval.score_threshold must not be negative".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(Error::Config(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }

        url::Url::parse(&self.llm.base_url)
            .map_err(|e| Error::Config(format!("llm.base_url is invalid: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk.chunk_size, 800);
        assert_eq!(config.chunk.overlap, 100);
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.llm.model, "openai/gpt-oss-120b");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.chunk.chunk_size = 400;
        config.llm.model = "local-model".to_string();

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.chunk.chunk_size, 400);
        assert_eq!(loaded.llm.model, "local-model");

        let loaded = Config::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(loaded.paths.base_dir, tmp.path());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[chunk]\nchunk_size = 500\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk.chunk_size, 500);
        assert_eq!(config.chunk.overlap, 100);
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_missing_config_file() {
        let tmp = TempDir::new().unwrap();
        assert!(Config::load(&tmp.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.chunk.chunk_size = 0;
        assert!(config.validate().is_err());
        config.chunk.chunk_size = 800;

        config.retrieval.k = config.retrieval.max_k + 1;
        assert!(config.validate().is_err());
        config.retrieval.k = 5;

        config.llm.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.llm.base_url = default_llm_base_url();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let mut config = Config::default();
        config.init_paths(Some(PathBuf::from("/srv/docqa")));
        assert_eq!(config.data_dir(), PathBuf::from("/srv/docqa/data"));

        config.storage.index_dir = "/var/lib/docqa".to_string();
        assert_eq!(config.index_dir(), PathBuf::from("/var/lib/docqa"));
    }

    #[test]
    fn test_resolve_k_clamps() {
        let config = Config::default();
        assert_eq!(config.resolve_k(None), 5);
        assert_eq!(config.resolve_k(Some(0)), 1);
        assert_eq!(config.resolve_k(Some(1000)), 50);
    }
}
