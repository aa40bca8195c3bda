//! Editor adapter
//!
//! Glue between a host page and the block-editing runtime. The adapter owns
//! the live document: the runtime reports every change through
//! [`EditorAdapter::on_change`] and gets back the normalized document, its
//! HTML rendering, its plain text and its metrics in one [`EditorOutput`].
//! Image uploads go through an injected [`ImageUploader`], so the adapter
//! never talks to the network itself.
//!
//! Legacy content stored as HTML is converted to blocks once, when the
//! adapter is created.
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::api::{ApiError, UploadedImage};
//! use content_pipeline::editor::{EditorAdapter, InitialContent, UploadRequest};
//!
//! let uploader = |request: &UploadRequest| -> Result<UploadedImage, ApiError> {
//!     Ok(UploadedImage {
//!         url: format!("https://cdn.example.com/{}/{}", request.folder, request.file.name),
//!         filename: None,
//!         size: None,
//!         content_type: None,
//!     })
//! };
//!
//! let editor = EditorAdapter::new(InitialContent::Html("<p>Draft text</p>".into()), uploader);
//! let output = editor.snapshot();
//! assert_eq!(output.html, "<p>Draft text</p>");
//! assert_eq!(output.metrics.words, 2);
//! ```

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiError, UploadedImage};
use crate::blocks::{Block, EditorDocument};
use crate::converter::BlockConverter;
use crate::error::ContentError;
use crate::metrics::DocumentMetrics;
use crate::security::SecurityValidator;

/// Folder uploads are filed under unless the host picks another one
pub const DEFAULT_UPLOAD_FOLDER: &str = "editor";

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart upload request: `file` plus the target `folder`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: UploadFile,
    pub folder: String,
}

/// Sends images to media storage
pub trait ImageUploader {
    fn upload(&self, request: &UploadRequest) -> Result<UploadedImage, ApiError>;
}

impl<F> ImageUploader for F
where
    F: Fn(&UploadRequest) -> Result<UploadedImage, ApiError>,
{
    fn upload(&self, request: &UploadRequest) -> Result<UploadedImage, ApiError> {
        self(request)
    }
}

/// What the editor starts with
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialContent {
    #[default]
    Empty,
    Blocks(EditorDocument),
    /// Legacy HTML, converted to blocks on load
    Html(String),
}

/// Everything the host needs after a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorOutput {
    pub document: EditorDocument,
    pub html: String,
    pub plain_text: String,
    pub metrics: DocumentMetrics,
}

/// Live editor state for one host page
pub struct EditorAdapter<U> {
    converter: BlockConverter,
    uploader: U,
    folder: String,
    document: EditorDocument,
}

impl<U: ImageUploader> EditorAdapter<U> {
    pub fn new(initial: InitialContent, uploader: U) -> Self {
        Self::with_converter(initial, uploader, BlockConverter::new())
    }

    pub fn with_converter(initial: InitialContent, uploader: U, converter: BlockConverter) -> Self {
        let document = match initial {
            InitialContent::Empty => EditorDocument::new(),
            InitialContent::Blocks(document) => document,
            InitialContent::Html(html) => converter.from_html(&html),
        };

        Self {
            converter,
            uploader,
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
            document,
        }
    }

    /// Upload folder for images inserted through this editor
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn document(&self) -> &EditorDocument {
        &self.document
    }

    pub fn converter(&self) -> &BlockConverter {
        &self.converter
    }

    /// Replace the live document with the runtime's latest state
    pub fn on_change(&mut self, document: EditorDocument) -> EditorOutput {
        debug!(blocks = document.blocks.len(), "Editor content changed");
        self.document = document;
        self.snapshot()
    }

    /// Like [`EditorAdapter::on_change`], for raw runtime JSON
    ///
    /// Malformed payloads load as an empty document.
    pub fn on_change_value(&mut self, value: &Value) -> EditorOutput {
        self.on_change(EditorDocument::from_value_lenient(value))
    }

    /// Rendering of the current document
    pub fn snapshot(&self) -> EditorOutput {
        let plain_text = self.converter.extract_plain_text(&self.document);
        EditorOutput {
            document: self.document.clone(),
            html: self.converter.to_html(&self.document),
            metrics: self.converter.metrics(&self.document),
            plain_text,
        }
    }

    /// Upload an image and return the block that displays it
    ///
    /// # Errors
    ///
    /// - [`ContentError::InvalidInput`]: empty file, non-image content type,
    ///   or an uploaded URL with a dangerous scheme
    /// - [`ContentError::Upload`]: the uploader failed
    pub fn upload_image(&self, file: UploadFile) -> Result<Block, ContentError> {
        if file.bytes.is_empty() {
            return Err(ContentError::InvalidInput(format!(
                "Image '{}' is empty",
                file.name
            )));
        }
        if !file.content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(ContentError::InvalidInput(format!(
                "'{}' is not an image ({})",
                file.name, file.content_type
            )));
        }

        let request = UploadRequest {
            file,
            folder: self.folder.clone(),
        };
        let uploaded = self.uploader.upload(&request).map_err(|err| {
            warn!(file = %request.file.name, error = %err, "Image upload failed");
            ContentError::Upload(err)
        })?;

        if SecurityValidator::new().is_dangerous_url(&uploaded.url) {
            return Err(ContentError::InvalidInput(format!(
                "Upload returned an unsafe URL for '{}'",
                request.file.name
            )));
        }

        debug!(url = %uploaded.url, "Image uploaded");
        Ok(Block::image(uploaded.url, ""))
    }

    /// Upload an image and append its block to the document
    pub fn insert_image(&mut self, file: UploadFile) -> Result<EditorOutput, ContentError> {
        let block = self.upload_image(file)?;
        self.document.blocks.push(block);
        Ok(self.snapshot())
    }

    /// Reset to an empty document
    pub fn clear(&mut self) -> EditorOutput {
        self.document = EditorDocument::new();
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct RecordingUploader {
        requests: RefCell<Vec<UploadRequest>>,
        response: Result<UploadedImage, ApiError>,
    }

    impl RecordingUploader {
        fn returning(url: &str) -> Self {
            Self {
                requests: RefCell::new(Vec::new()),
                response: Ok(UploadedImage {
                    url: url.to_string(),
                    filename: None,
                    size: None,
                    content_type: None,
                }),
            }
        }

        fn failing(err: ApiError) -> Self {
            Self {
                requests: RefCell::new(Vec::new()),
                response: Err(err),
            }
        }
    }

    impl ImageUploader for RecordingUploader {
        fn upload(&self, request: &UploadRequest) -> Result<UploadedImage, ApiError> {
            self.requests.borrow_mut().push(request.clone());
            self.response.clone()
        }
    }

    fn png(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_initial_content_variants() {
        let empty = EditorAdapter::new(InitialContent::Empty, RecordingUploader::returning("/x"));
        assert!(empty.document().is_empty());
        assert_eq!(empty.snapshot().html, "");

        let doc = EditorDocument::with_blocks(vec![Block::paragraph("kept")]);
        let blocks = EditorAdapter::new(
            InitialContent::Blocks(doc.clone()),
            RecordingUploader::returning("/x"),
        );
        assert_eq!(blocks.document(), &doc);

        let html = EditorAdapter::new(
            InitialContent::Html("<h1>Old</h1><p>post</p>".into()),
            RecordingUploader::returning("/x"),
        );
        assert_eq!(
            html.document().blocks,
            vec![Block::header("Old", 1), Block::paragraph("post")]
        );
    }

    #[test]
    fn test_on_change_produces_all_outputs() {
        let mut editor = EditorAdapter::new(InitialContent::Empty, RecordingUploader::returning("/x"));
        let output = editor.on_change(EditorDocument::with_blocks(vec![
            Block::header("Title", 2),
            Block::paragraph("Some <i>body</i> text"),
        ]));

        assert_eq!(output.html, "<h2>Title</h2>\n<p>Some <i>body</i> text</p>");
        assert_eq!(output.plain_text, "Title Some body text");
        assert_eq!(output.metrics.words, 4);
        assert_eq!(output.metrics.reading_time, 1);
        assert_eq!(editor.document().blocks.len(), 2);
    }

    #[test]
    fn test_on_change_value_is_lenient() {
        let mut editor = EditorAdapter::new(InitialContent::Empty, RecordingUploader::returning("/x"));
        let output = editor.on_change_value(&serde_json::json!({"blocks": "oops"}));
        assert!(output.document.is_empty());
    }

    #[test]
    fn test_upload_sends_file_and_folder() {
        let editor = EditorAdapter::new(
            InitialContent::Empty,
            RecordingUploader::returning("https://cdn.example.com/posts/cat.png"),
        )
        .with_folder("posts");

        let block = editor.upload_image(png("cat.png")).expect("upload succeeds");
        assert_eq!(block, Block::image("https://cdn.example.com/posts/cat.png", ""));

        let requests = editor.uploader.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].folder, "posts");
        assert_eq!(requests[0].file.name, "cat.png");
    }

    #[test]
    fn test_upload_rejects_non_images_without_calling_uploader() {
        let editor = EditorAdapter::new(InitialContent::Empty, RecordingUploader::returning("/x"));

        let pdf = UploadFile {
            content_type: "application/pdf".to_string(),
            ..png("doc.pdf")
        };
        assert!(matches!(editor.upload_image(pdf), Err(ContentError::InvalidInput(_))));

        let empty = UploadFile {
            bytes: Vec::new(),
            ..png("empty.png")
        };
        assert!(matches!(editor.upload_image(empty), Err(ContentError::InvalidInput(_))));
        assert!(editor.uploader.requests.borrow().is_empty());
    }

    #[test]
    fn test_upload_failure_is_reported() {
        let editor = EditorAdapter::new(
            InitialContent::Empty,
            RecordingUploader::failing(ApiError::Status(413)),
        );
        match editor.upload_image(png("huge.png")) {
            Err(ContentError::Upload(err)) => {
                assert_eq!(err.user_message(), "The file is too large to upload.")
            }
            other => panic!("Expected upload error, got {other:?}"),
        }
    }

    #[test]
    fn test_upload_rejects_unsafe_url() {
        let editor = EditorAdapter::new(
            InitialContent::Empty,
            RecordingUploader::returning("javascript:alert(1)"),
        );
        assert!(matches!(
            editor.upload_image(png("x.png")),
            Err(ContentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_insert_image_and_clear() {
        let mut editor = EditorAdapter::new(
            InitialContent::Blocks(EditorDocument::with_blocks(vec![Block::paragraph("Intro")])),
            |request: &UploadRequest| -> Result<UploadedImage, ApiError> {
                Ok(UploadedImage {
                    url: format!("/media/{}", request.file.name),
                    filename: Some(request.file.name.clone()),
                    size: Some(request.file.bytes.len() as u64),
                    content_type: Some(request.file.content_type.clone()),
                })
            },
        );

        let output = editor.insert_image(png("a.png")).expect("inserted");
        assert_eq!(output.document.blocks.len(), 2);
        assert!(output.html.ends_with("<figure><img src=\"/media/a.png\" alt=\"\"></figure>"));

        let cleared = editor.clear();
        assert!(cleared.document.is_empty());
        assert_eq!(cleared.plain_text, "");
        assert_eq!(cleared.metrics.reading_time, 1);
    }
}
