//! Block document model
//!
//! An [`EditorDocument`] is the structured form the block editor produces: a
//! timestamp, a format version and an ordered list of [`Block`]s. The JSON
//! shape matches the EditorJS output format:
//!
//! ```json
//! {
//!   "time": 1700000000000,
//!   "version": "2.28.0",
//!   "blocks": [
//!     { "type": "header", "data": { "text": "Title", "level": 2 } },
//!     { "type": "paragraph", "data": { "text": "Hello <b>world</b>" } }
//!   ]
//! }
//! ```
//!
//! Blocks whose `type` is unknown, or whose `data` does not fit their type,
//! are kept as [`Block::Unsupported`] with the raw payload so that a
//! load/save cycle never loses them.
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::blocks::{Block, EditorDocument};
//!
//! let doc = EditorDocument::from_json(
//!     r#"{"blocks":[{"type":"paragraph","data":{"text":"Hi"}}]}"#,
//! ).expect("valid document");
//! assert_eq!(doc.blocks, vec![Block::paragraph("Hi")]);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ContentError;

/// Format version written into documents created by this library
pub const DOCUMENT_VERSION: &str = "2.28.0";

/// Structured editor document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorDocument {
    /// Creation/modification time in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Editor format version
    #[serde(default)]
    pub version: String,
    /// Ordered blocks
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl EditorDocument {
    /// Create an empty document stamped with the current time
    pub fn new() -> Self {
        Self {
            time: Some(chrono::Utc::now().timestamp_millis()),
            version: DOCUMENT_VERSION.to_string(),
            blocks: Vec::new(),
        }
    }

    /// Create a document from blocks, stamped with the current time
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::new()
        }
    }

    /// Parse a document from JSON
    ///
    /// Malformed JSON, a `blocks` field that is not an array, or an entry
    /// that is not an object with a string `type` is reported as
    /// [`ContentError::Serialization`]. A block with an unknown `type` or a
    /// mistyped `data` payload becomes [`Block::Unsupported`] instead.
    /// Use [`EditorDocument::from_value_lenient`] to skip bad entries.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a document from an arbitrary JSON value
    ///
    /// Anything that is not a well-formed document (missing object, `blocks`
    /// absent or not an array) yields an empty document instead of an error.
    /// `time` and `version` are kept when they are usable.
    pub fn from_value_lenient(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let time = object.get("time").and_then(Value::as_i64);
        let version = object
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let blocks = object
            .get("blocks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<RawBlock>(item.clone()).ok())
                    .map(Block::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            time,
            version,
            blocks,
        }
    }

    /// Serialize the document to compact JSON
    pub fn to_json(&self) -> Result<String, ContentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns `true` if the document has no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Heading block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderData {
    /// Heading text, may contain inline HTML
    pub text: String,
    /// Heading level 1-6
    pub level: u8,
}

/// Paragraph block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphData {
    /// Paragraph text, may contain inline HTML
    pub text: String,
}

/// List style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    Ordered,
    #[default]
    Unordered,
}

/// List block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListData {
    #[serde(default)]
    pub style: ListStyle,
    /// Items in order, each may contain inline HTML
    #[serde(default)]
    pub items: Vec<String>,
}

/// Quote block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    pub text: String,
    #[serde(default)]
    pub caption: String,
}

/// Code block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeData {
    /// Raw, unescaped source
    pub code: String,
}

/// Uploaded file reference inside an image block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageFile {
    #[serde(default)]
    pub url: String,
}

/// Image block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub file: ImageFile,
    #[serde(default)]
    pub caption: String,
}

/// Embed block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedData {
    /// Embedding service name (youtube, vimeo, ...)
    #[serde(default)]
    pub service: String,
    /// Embeddable URL
    #[serde(default)]
    pub embed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// One block of an editor document
///
/// Serialized as `{"id"?, "type", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub enum Block {
    Header {
        id: Option<String>,
        data: HeaderData,
    },
    Paragraph {
        id: Option<String>,
        data: ParagraphData,
    },
    List {
        id: Option<String>,
        data: ListData,
    },
    Quote {
        id: Option<String>,
        data: QuoteData,
    },
    Code {
        id: Option<String>,
        data: CodeData,
    },
    Image {
        id: Option<String>,
        data: ImageData,
    },
    Delimiter {
        id: Option<String>,
    },
    Embed {
        id: Option<String>,
        data: EmbedData,
    },
    /// Block type outside the supported set, or a payload that does not
    /// match its type. Kept verbatim.
    Unsupported {
        id: Option<String>,
        kind: String,
        data: Value,
    },
}

impl Block {
    pub fn header(text: impl Into<String>, level: u8) -> Self {
        Block::Header {
            id: None,
            data: HeaderData {
                text: text.into(),
                level,
            },
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            id: None,
            data: ParagraphData { text: text.into() },
        }
    }

    pub fn list(style: ListStyle, items: Vec<String>) -> Self {
        Block::List {
            id: None,
            data: ListData { style, items },
        }
    }

    pub fn quote(text: impl Into<String>, caption: impl Into<String>) -> Self {
        Block::Quote {
            id: None,
            data: QuoteData {
                text: text.into(),
                caption: caption.into(),
            },
        }
    }

    pub fn code(code: impl Into<String>) -> Self {
        Block::Code {
            id: None,
            data: CodeData { code: code.into() },
        }
    }

    pub fn image(url: impl Into<String>, caption: impl Into<String>) -> Self {
        Block::Image {
            id: None,
            data: ImageData {
                file: ImageFile { url: url.into() },
                caption: caption.into(),
            },
        }
    }

    pub fn delimiter() -> Self {
        Block::Delimiter { id: None }
    }

    pub fn embed(service: impl Into<String>, embed: impl Into<String>) -> Self {
        Block::Embed {
            id: None,
            data: EmbedData {
                service: service.into(),
                embed: embed.into(),
                source: None,
                width: None,
                height: None,
                caption: None,
            },
        }
    }

    /// The block's `type` string
    pub fn kind(&self) -> &str {
        match self {
            Block::Header { .. } => "header",
            Block::Paragraph { .. } => "paragraph",
            Block::List { .. } => "list",
            Block::Quote { .. } => "quote",
            Block::Code { .. } => "code",
            Block::Image { .. } => "image",
            Block::Delimiter { .. } => "delimiter",
            Block::Embed { .. } => "embed",
            Block::Unsupported { kind, .. } => kind,
        }
    }

    /// The editor-assigned block id, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Block::Header { id, .. }
            | Block::Paragraph { id, .. }
            | Block::List { id, .. }
            | Block::Quote { id, .. }
            | Block::Code { id, .. }
            | Block::Image { id, .. }
            | Block::Delimiter { id }
            | Block::Embed { id, .. }
            | Block::Unsupported { id, .. } => id.as_deref(),
        }
    }

    /// Returns `true` if the block carries no semantic content
    ///
    /// Delimiters and unsupported blocks are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Block::Header { data, .. } => is_blank(&data.text),
            Block::Paragraph { data, .. } => is_blank(&data.text),
            Block::List { data, .. } => data.items.iter().all(|item| is_blank(item)),
            Block::Quote { data, .. } => is_blank(&data.text),
            Block::Code { data, .. } => data.code.trim().is_empty(),
            Block::Image { data, .. } => data.file.url.trim().is_empty(),
            Block::Embed { data, .. } => data.embed.trim().is_empty(),
            Block::Delimiter { .. } | Block::Unsupported { .. } => false,
        }
    }
}

fn is_blank(text: &str) -> bool {
    crate::metrics::strip_tags(text).is_empty()
}

/// Wire form of a block
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

fn payload<T: DeserializeOwned>(data: &Value) -> Option<T> {
    serde_json::from_value(data.clone()).ok()
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let RawBlock { id, kind, data } = raw;
        let typed = match kind.as_str() {
            "header" => payload(&data).map(|data| Block::Header {
                id: id.clone(),
                data,
            }),
            "paragraph" => payload(&data).map(|data| Block::Paragraph {
                id: id.clone(),
                data,
            }),
            "list" => payload(&data).map(|data| Block::List {
                id: id.clone(),
                data,
            }),
            "quote" => payload(&data).map(|data| Block::Quote {
                id: id.clone(),
                data,
            }),
            "code" => payload(&data).map(|data| Block::Code {
                id: id.clone(),
                data,
            }),
            "image" => payload(&data).map(|data| Block::Image {
                id: id.clone(),
                data,
            }),
            "delimiter" => Some(Block::Delimiter { id: id.clone() }),
            "embed" => payload(&data).map(|data| Block::Embed {
                id: id.clone(),
                data,
            }),
            _ => None,
        };

        typed.unwrap_or(Block::Unsupported { id, kind, data })
    }
}

fn to_value<T: Serialize>(data: T) -> Value {
    serde_json::to_value(data).unwrap_or(Value::Null)
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let kind = block.kind().to_string();
        match block {
            Block::Header { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Paragraph { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::List { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Quote { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Code { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Image { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Delimiter { id } => RawBlock {
                id,
                kind,
                data: Value::Object(Map::new()),
            },
            Block::Embed { id, data } => RawBlock {
                id,
                kind,
                data: to_value(data),
            },
            Block::Unsupported { id, data, .. } => RawBlock { id, kind, data },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_all_block_types() {
        let doc = EditorDocument::from_json(
            r#"{
                "time": 1700000000000,
                "version": "2.28.0",
                "blocks": [
                    {"id": "a1", "type": "header", "data": {"text": "Title", "level": 2}},
                    {"type": "paragraph", "data": {"text": "Body"}},
                    {"type": "list", "data": {"style": "ordered", "items": ["one", "two"]}},
                    {"type": "quote", "data": {"text": "Quoted", "caption": "Someone"}},
                    {"type": "code", "data": {"code": "let x = 1;"}},
                    {"type": "image", "data": {"file": {"url": "/a.png"}, "caption": "Pic"}},
                    {"type": "delimiter", "data": {}},
                    {"type": "embed", "data": {"service": "youtube", "embed": "https://www.youtube.com/embed/x"}}
                ]
            }"#,
        )
        .expect("document parses");

        assert_eq!(doc.time, Some(1_700_000_000_000));
        assert_eq!(doc.blocks.len(), 8);
        assert_eq!(doc.blocks[0].id(), Some("a1"));
        let kinds: Vec<&str> = doc.blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "header",
                "paragraph",
                "list",
                "quote",
                "code",
                "image",
                "delimiter",
                "embed"
            ]
        );
        assert_eq!(
            doc.blocks[2],
            Block::list(ListStyle::Ordered, vec!["one".into(), "two".into()])
        );
    }

    #[test]
    fn test_unknown_block_is_preserved() {
        let json = r#"{"version":"2.28.0","blocks":[{"type":"table","data":{"content":[["a"]]}}]}"#;
        let doc = EditorDocument::from_json(json).expect("document parses");
        match &doc.blocks[0] {
            Block::Unsupported { kind, data, .. } => {
                assert_eq!(kind, "table");
                assert_eq!(data, &json!({"content": [["a"]]}));
            }
            other => panic!("Expected unsupported block, got {other:?}"),
        }

        let back = doc.to_json().expect("serializes");
        let reparsed = EditorDocument::from_json(&back).expect("reparses");
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_entries_without_block_shape_are_rejected() {
        for json in [r#"{"blocks":[42]}"#, r#"{"blocks":[{"data":{"text":"x"}}]}"#] {
            assert!(
                matches!(EditorDocument::from_json(json), Err(ContentError::Serialization(_))),
                "{json}"
            );
        }

        let value: Value = serde_json::from_str(
            r#"{"blocks":[42,{"type":"paragraph","data":{"text":"kept"}}]}"#,
        )
        .expect("json");
        let doc = EditorDocument::from_value_lenient(&value);
        assert_eq!(doc.blocks, vec![Block::paragraph("kept")]);
    }

    #[test]
    fn test_mistyped_payload_becomes_unsupported() {
        let doc = EditorDocument::from_json(
            r#"{"blocks":[{"type":"header","data":{"text":5}}]}"#,
        )
        .expect("document parses");
        assert!(matches!(&doc.blocks[0], Block::Unsupported { kind, .. } if kind == "header"));
    }

    #[test]
    fn test_missing_blocks_defaults_to_empty() {
        let doc = EditorDocument::from_json(r#"{"version":"1"}"#).expect("parses");
        assert!(doc.is_empty());
        assert_eq!(doc.version, "1");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            EditorDocument::from_json("{not json"),
            Err(ContentError::Serialization(_))
        ));
        assert!(EditorDocument::from_json(r#"{"blocks": "nope"}"#).is_err());
    }

    #[test]
    fn test_lenient_parse_never_fails() {
        assert_eq!(
            EditorDocument::from_value_lenient(&json!(null)),
            EditorDocument::default()
        );
        assert_eq!(
            EditorDocument::from_value_lenient(&json!({"blocks": "nope"})).blocks,
            vec![]
        );

        let doc = EditorDocument::from_value_lenient(&json!({
            "time": 5,
            "blocks": [{"type": "paragraph", "data": {"text": "ok"}}, 42]
        }));
        assert_eq!(doc.time, Some(5));
        assert_eq!(doc.blocks, vec![Block::paragraph("ok")]);
    }

    #[test]
    fn test_delimiter_serializes_with_empty_data() {
        let value = serde_json::to_value(Block::delimiter()).expect("serializes");
        assert_eq!(value, json!({"type": "delimiter", "data": {}}));
    }

    #[test]
    fn test_emptiness_predicate() {
        assert!(Block::paragraph("   ").is_empty());
        assert!(Block::paragraph("<b> </b>").is_empty());
        assert!(!Block::paragraph("x").is_empty());
        assert!(Block::header("", 1).is_empty());
        assert!(Block::list(ListStyle::Unordered, vec![]).is_empty());
        assert!(Block::list(ListStyle::Unordered, vec![" ".into()]).is_empty());
        assert!(Block::code("\n").is_empty());
        assert!(Block::image("", "caption").is_empty());
        assert!(Block::embed("youtube", "").is_empty());
        assert!(!Block::delimiter().is_empty());
    }

    #[test]
    fn test_new_document_is_stamped() {
        let doc = EditorDocument::new();
        assert!(doc.time.is_some());
        assert_eq!(doc.version, DOCUMENT_VERSION);
    }
}
