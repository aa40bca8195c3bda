//! Content Pipeline
//!
//! The editor-content layer of the content platform: a typed block document
//! model, conversion between blocks and HTML, text metrics, role-gated
//! navigation menus, an editor adapter, the auto-save indicator and a local
//! document store.
//!
//! # Architecture
//!
//! - `blocks`: block document model and its JSON form
//! - `parser`: HTML5 parsing using html5ever
//! - `charset`: character encoding detection for uploaded HTML
//! - `security`: element, attribute and URL sanitization rules
//! - `converter`: blocks to HTML and HTML to blocks
//! - `metrics`: word counts, reading time, excerpts, slugs, date labels
//! - `menu`: role hierarchy and menu filtering
//! - `editor`: editor adapter and image upload seam
//! - `save_status`: auto-save state machine and labels
//! - `storage`: document store over a key/value backend
//! - `etag`: BLAKE3 ETags for rendered content and stored collections
//! - `api`: REST error model, pagination and upload responses
//! - `config`: TOML configuration
//! - `ffi`: C ABI for rendering documents from other languages
//!
//! # Safety
//!
//! All FFI functions are marked `unsafe` where they dereference caller
//! pointers. Memory allocated by Rust must be freed by Rust via the
//! provided cleanup functions.

pub mod api;
pub mod blocks;
pub mod charset;
pub mod config;
pub mod converter;
pub mod editor;
pub mod error;
pub mod etag;
pub mod ffi;
pub mod menu;
pub mod metrics;
pub mod parser;
pub mod save_status;
pub mod security;
pub mod storage;

pub use api::{ApiError, Page};
pub use blocks::{Block, EditorDocument};
pub use config::PipelineConfig;
pub use converter::{BlockConverter, ConverterOptions};
pub use editor::{EditorAdapter, ImageUploader};
pub use error::ContentError;
pub use menu::{MenuItem, filter_menu_by_role, has_role};
pub use save_status::{SaveIndicator, SaveStatus};
pub use storage::{DocumentStore, StoredDocument, StoredMetrics};
