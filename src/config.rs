//! Pipeline configuration
//!
//! Loaded from TOML. Every field is optional and falls back to its default:
//!
//! ```toml
//! words_per_minute = 200
//! excerpt_length = 150
//! conversion_timeout_ms = 0      # 0 = no timeout
//! max_nesting_depth = 1000
//!
//! [storage]
//! key = "editor_documents"
//! legacy_key = "documents"
//! directory = "data/documents"   # omit to keep documents in memory
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::converter::{BlockConverter, ConverterOptions};
use crate::error::ContentError;
use crate::storage::{
    DOCUMENTS_KEY, DocumentStore, FileBackend, LEGACY_DOCUMENTS_KEY, StorageBackend,
};

/// Storage section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub key: String,
    pub legacy_key: String,
    pub directory: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: DOCUMENTS_KEY.to_string(),
            legacy_key: LEGACY_DOCUMENTS_KEY.to_string(),
            directory: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub words_per_minute: u32,
    pub excerpt_length: usize,
    pub conversion_timeout_ms: u64,
    pub max_nesting_depth: usize,
    pub storage: StorageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            words_per_minute: crate::metrics::DEFAULT_WORDS_PER_MINUTE,
            excerpt_length: crate::metrics::DEFAULT_EXCERPT_LENGTH,
            conversion_timeout_ms: 0,
            max_nesting_depth: 1000,
            storage: StorageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse configuration from TOML text
    ///
    /// ```rust
    /// use content_pipeline::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::from_toml_str("words_per_minute = 250").unwrap();
    /// assert_eq!(config.words_per_minute, 250);
    /// assert_eq!(config.excerpt_length, 150);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ContentError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ContentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContentError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ContentError> {
        if self.words_per_minute == 0 {
            return Err(ContentError::Config(
                "words_per_minute must be greater than zero".to_string(),
            ));
        }
        if self.max_nesting_depth == 0 {
            return Err(ContentError::Config(
                "max_nesting_depth must be greater than zero".to_string(),
            ));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ContentError::Config("storage.key must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn converter_options(&self) -> ConverterOptions {
        ConverterOptions {
            words_per_minute: self.words_per_minute,
            excerpt_length: self.excerpt_length,
            max_nesting_depth: self.max_nesting_depth,
            timeout: Duration::from_millis(self.conversion_timeout_ms),
            ..ConverterOptions::default()
        }
    }

    pub fn converter(&self) -> BlockConverter {
        BlockConverter::with_options(self.converter_options())
    }

    /// Document store over `backend` with the configured keys
    pub fn store<B: StorageBackend>(&self, backend: B) -> DocumentStore<B> {
        DocumentStore::with_keys(backend, &self.storage.key, &self.storage.legacy_key)
            .with_converter(self.converter())
    }

    /// File-backed store in `storage.directory`
    ///
    /// # Errors
    ///
    /// [`ContentError::Config`] when no directory is configured.
    pub fn file_store(&self) -> Result<DocumentStore<FileBackend>, ContentError> {
        let directory = self.storage.directory.as_ref().ok_or_else(|| {
            ContentError::Config("storage.directory is not configured".to_string())
        })?;
        Ok(self.store(FileBackend::open(directory)?))
    }
}
