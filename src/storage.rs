//! Local document persistence
//!
//! Documents are kept as one JSON array under a single key of a key/value
//! backend. [`MemoryBackend`] serves tests and short-lived sessions,
//! [`FileBackend`] keeps one `<key>.json` file per key in a directory.
//!
//! ## Keys
//!
//! - [`DOCUMENTS_KEY`]: the current collection
//! - [`LEGACY_DOCUMENTS_KEY`]: where older releases kept it; copied over
//!   once by [`DocumentStore::migrate`]
//!
//! ## Concurrency
//!
//! Plain writes are last-write-wins: two stores over the same backend
//! overwrite each other's changes. Writers that care use
//! [`DocumentStore::etag`] with [`DocumentStore::update_if_match`], which
//! refuses to write when the collection changed since the ETag was taken.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::Page;
use crate::blocks::EditorDocument;
use crate::converter::BlockConverter;
use crate::error::ContentError;
use crate::etag::ETagGenerator;
use crate::metrics::DocumentMetrics;

/// Key of the current document collection
pub const DOCUMENTS_KEY: &str = "editor_documents";

/// Key older releases stored documents under
pub const LEGACY_DOCUMENTS_KEY: &str = "documents";

/// `type` of documents whose content is HTML
pub const DOCUMENT_TYPE_HTML: &str = "html";

/// `type` of documents whose content is block JSON
pub const DOCUMENT_TYPE_BLOCKS: &str = "blocks";

/// Key/value storage the document store writes through
pub trait StorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>, ContentError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), ContentError>;
    fn remove(&mut self, key: &str) -> Result<(), ContentError>;
}

/// In-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, ContentError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), ContentError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ContentError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory of JSON files, one per key
#[derive(Debug, Clone)]
pub struct FileBackend {
    directory: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a storage directory
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, ContentError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_stem}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, ContentError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), ContentError> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ContentError> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

fn default_kind() -> String {
    DOCUMENT_TYPE_HTML.to_string()
}

/// One persisted document
///
/// Fields this library does not know about are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: StoredMetrics,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metrics saved alongside a document
///
/// Missing figures default to zero. Keys other than the computed figures
/// are kept in `extra` and survive recomputation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredMetrics {
    #[serde(flatten)]
    pub counts: DocumentMetrics,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<DocumentMetrics> for StoredMetrics {
    fn from(counts: DocumentMetrics) -> Self {
        Self {
            counts,
            extra: Map::new(),
        }
    }
}

/// Input of [`DocumentStore::create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
    pub kind: String,
}

impl NewDocument {
    pub fn html(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            kind: DOCUMENT_TYPE_HTML.to_string(),
        }
    }

    pub fn blocks(name: impl Into<String>, document: &EditorDocument) -> Result<Self, ContentError> {
        Ok(Self {
            name: name.into(),
            content: document.to_json()?,
            kind: DOCUMENT_TYPE_BLOCKS.to_string(),
        })
    }
}

/// Partial update; `None` fields stay as they are
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub favorite: Option<bool>,
}

/// Result of [`DocumentStore::export`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    /// `documents-export-YYYYMMDD-HHMMSS.json`
    pub file_name: String,
    /// Pretty-printed JSON array of documents
    pub contents: String,
}

/// Document collection over a storage backend
pub struct DocumentStore<B> {
    backend: B,
    key: String,
    legacy_key: String,
    converter: BlockConverter,
    etags: ETagGenerator,
}

impl<B: StorageBackend> DocumentStore<B> {
    /// Store using the default keys
    pub fn new(backend: B) -> Self {
        Self::with_keys(backend, DOCUMENTS_KEY, LEGACY_DOCUMENTS_KEY)
    }

    pub fn with_keys(backend: B, key: impl Into<String>, legacy_key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            legacy_key: legacy_key.into(),
            converter: BlockConverter::new(),
            etags: ETagGenerator::new(),
        }
    }

    /// Converter used to compute document metrics
    pub fn with_converter(mut self, converter: BlockConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All documents in stored order
    ///
    /// # Errors
    ///
    /// [`ContentError::Serialization`] when the stored collection is corrupt.
    pub fn list(&self) -> Result<Vec<StoredDocument>, ContentError> {
        match self.backend.read(&self.key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// One page of documents, most recently updated first
    pub fn list_page(&self, page: usize, size: usize) -> Result<Page<StoredDocument>, ContentError> {
        let mut documents = self.list()?;
        documents.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(Page::paginate(documents, page, size))
    }

    pub fn get(&self, id: &str) -> Result<StoredDocument, ContentError> {
        self.list()?
            .into_iter()
            .find(|document| document.id == id)
            .ok_or_else(|| ContentError::NotFound(id.to_string()))
    }

    /// Add a document with a fresh id, timestamps and metrics
    pub fn create(&mut self, new: NewDocument) -> Result<StoredDocument, ContentError> {
        let mut documents = self.list()?;
        let now = Utc::now();

        let document = StoredDocument {
            id: Uuid::new_v4().to_string(),
            metadata: self.compute_metrics(&new.kind, &new.content).into(),
            name: new.name,
            content: new.content,
            kind: new.kind,
            favorite: false,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        };

        documents.push(document.clone());
        self.save(&documents)?;
        debug!(id = %document.id, "Created document");
        Ok(document)
    }

    /// Apply a patch, recomputing metrics when the content changes
    pub fn update(&mut self, id: &str, patch: DocumentPatch) -> Result<StoredDocument, ContentError> {
        let mut documents = self.list()?;
        let updated = self.apply_patch(&mut documents, id, patch)?;
        self.save(&documents)?;
        Ok(updated)
    }

    /// Apply a patch only if the collection still has ETag `expected`
    ///
    /// # Errors
    ///
    /// [`ContentError::Conflict`] when another writer changed the collection.
    pub fn update_if_match(
        &mut self,
        id: &str,
        patch: DocumentPatch,
        expected: &str,
    ) -> Result<StoredDocument, ContentError> {
        let raw = self.backend.read(&self.key)?;
        let actual = self.etag_of(raw.as_deref());
        if !self.etags.matches(&actual, expected) {
            warn!(id, expected, actual = %actual, "Rejecting write to a changed collection");
            return Err(ContentError::Conflict {
                expected: expected.to_string(),
                actual,
            });
        }
        self.update(id, patch)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), ContentError> {
        let mut documents = self.list()?;
        let before = documents.len();
        documents.retain(|document| document.id != id);
        if documents.len() == before {
            return Err(ContentError::NotFound(id.to_string()));
        }
        self.save(&documents)?;
        debug!(id, "Deleted document");
        Ok(())
    }

    /// Flip the favorite flag and return its new value
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool, ContentError> {
        let mut documents = self.list()?;
        let document = documents
            .iter_mut()
            .find(|document| document.id == id)
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;
        document.favorite = !document.favorite;
        let favorite = document.favorite;
        self.save(&documents)?;
        Ok(favorite)
    }

    /// ETag of the stored collection
    pub fn etag(&self) -> Result<String, ContentError> {
        let raw = self.backend.read(&self.key)?;
        Ok(self.etag_of(raw.as_deref()))
    }

    /// Serialize every document for download
    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportBundle, ContentError> {
        let documents = self.list()?;
        let contents = serde_json::to_string_pretty(&documents)?;
        info!(count = documents.len(), "Exported documents");
        Ok(ExportBundle {
            file_name: format!("documents-export-{}.json", now.format("%Y%m%d-%H%M%S")),
            contents,
        })
    }

    /// Replace the whole collection with an exported file
    ///
    /// Nothing is written unless the file parses as a document array with
    /// non-blank, unique ids.
    ///
    /// # Errors
    ///
    /// [`ContentError::Import`] describing why the file was rejected.
    pub fn import(&mut self, bytes: &[u8]) -> Result<usize, ContentError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ContentError::Import(format!("File is not UTF-8: {e}")))?;
        let documents: Vec<StoredDocument> = serde_json::from_str(text)
            .map_err(|e| ContentError::Import(format!("Not a document export: {e}")))?;

        let mut seen = std::collections::HashSet::new();
        for document in &documents {
            if document.id.trim().is_empty() {
                return Err(ContentError::Import("Document without an id".to_string()));
            }
            if !seen.insert(document.id.as_str()) {
                return Err(ContentError::Import(format!(
                    "Duplicate document id '{}'",
                    document.id
                )));
            }
        }

        self.save(&documents)?;
        info!(count = documents.len(), "Imported documents");
        Ok(documents.len())
    }

    /// Copy documents from the legacy key when the current key is empty
    ///
    /// Returns the number of documents copied. The legacy entry is left in
    /// place.
    pub fn migrate(&mut self) -> Result<usize, ContentError> {
        if !self.list()?.is_empty() {
            return Ok(0);
        }

        let Some(raw) = self.backend.read(&self.legacy_key)? else {
            return Ok(0);
        };
        let documents: Vec<StoredDocument> = serde_json::from_str(&raw)?;
        if documents.is_empty() {
            return Ok(0);
        }

        self.save(&documents)?;
        info!(
            count = documents.len(),
            from = %self.legacy_key,
            to = %self.key,
            "Migrated documents from legacy storage"
        );
        Ok(documents.len())
    }

    fn apply_patch(
        &self,
        documents: &mut [StoredDocument],
        id: &str,
        patch: DocumentPatch,
    ) -> Result<StoredDocument, ContentError> {
        let document = documents
            .iter_mut()
            .find(|document| document.id == id)
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            document.name = name;
        }
        if let Some(content) = patch.content {
            document.metadata.counts = self.compute_metrics(&document.kind, &content);
            document.content = content;
        }
        if let Some(favorite) = patch.favorite {
            document.favorite = favorite;
        }
        document.updated_at = Utc::now();

        Ok(document.clone())
    }

    fn compute_metrics(&self, kind: &str, content: &str) -> DocumentMetrics {
        if kind == DOCUMENT_TYPE_BLOCKS {
            let value = serde_json::from_str(content).unwrap_or(Value::Null);
            self.converter
                .metrics(&EditorDocument::from_value_lenient(&value))
        } else {
            DocumentMetrics::from_html(
                content,
                &crate::metrics::ReadingTimeEstimator::with_words_per_minute(
                    self.converter.options().words_per_minute,
                ),
            )
        }
    }

    fn etag_of(&self, raw: Option<&str>) -> String {
        self.etags.generate(raw.unwrap_or("").as_bytes())
    }

    fn save(&mut self, documents: &[StoredDocument]) -> Result<(), ContentError> {
        let started = Instant::now();
        let json = serde_json::to_string(documents)?;
        self.backend.write(&self.key, &json)?;
        debug!(
            key = %self.key,
            count = documents.len(),
            bytes = json.len(),
            write_ms = started.elapsed().as_millis() as u64,
            "Saved document collection"
        );
        Ok(())
    }
}
