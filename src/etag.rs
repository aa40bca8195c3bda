//! Content ETags using BLAKE3
//!
//! ETags identify one version of rendered content or of the stored document
//! collection. They serve HTTP caching of rendered HTML and optimistic
//! concurrency in [`crate::storage::DocumentStore::update_if_match`].
//!
//! # Algorithm
//!
//! 1. Hash the bytes with BLAKE3
//! 2. Keep the first 128 bits
//! 3. Hex-encode and wrap in double quotes (RFC 9110 strong ETag)
//!
//! Document ETags hash the JSON of the blocks only, so re-saving identical
//! content with a new timestamp keeps the same ETag.
//!
//! # Example
//!
//! ```
//! use content_pipeline::etag::ETagGenerator;
//!
//! let generator = ETagGenerator::new();
//! let etag = generator.generate(b"<p>Hello</p>");
//! assert_eq!(etag.len(), 34);
//! assert!(generator.matches(&etag, &format!("W/{etag}")));
//! ```

use crate::blocks::EditorDocument;
use crate::error::ContentError;

/// BLAKE3-based ETag generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ETagGenerator;

impl ETagGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Strong ETag of raw bytes
    pub fn generate(&self, content: &[u8]) -> String {
        let hash = blake3::hash(content);
        format!("\"{}\"", hex::encode(&hash.as_bytes()[..16]))
    }

    /// Weak ETag of raw bytes
    pub fn generate_weak(&self, content: &[u8]) -> String {
        format!("W/{}", self.generate(content))
    }

    /// Strong ETag of a document's blocks, ignoring `time` and `version`
    pub fn for_document(&self, document: &EditorDocument) -> Result<String, ContentError> {
        let blocks = serde_json::to_vec(&document.blocks)?;
        Ok(self.generate(&blocks))
    }

    /// Weak comparison of two ETags (the `W/` prefix is ignored)
    pub fn matches(&self, a: &str, b: &str) -> bool {
        fn opaque(tag: &str) -> &str {
            let tag = tag.trim();
            tag.strip_prefix("W/").unwrap_or(tag)
        }
        opaque(a) == opaque(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Block;
    use proptest::prelude::*;

    #[test]
    fn test_etag_format() {
        let etag = ETagGenerator::new().generate(b"test content");
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(etag.len(), 34);
        assert!(etag[1..33].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_etag_empty_content() {
        assert_eq!(ETagGenerator::new().generate(b"").len(), 34);
    }

    #[test]
    fn test_weak_etag() {
        let generator = ETagGenerator::new();
        let weak = generator.generate_weak(b"x");
        assert!(weak.starts_with("W/\""));
        assert!(generator.matches(&weak, &generator.generate(b"x")));
        assert!(!generator.matches(&weak, &generator.generate(b"y")));
    }

    #[test]
    fn test_document_etag_ignores_timestamp() {
        let generator = ETagGenerator::new();
        let mut a = EditorDocument::with_blocks(vec![Block::paragraph("same")]);
        let mut b = a.clone();
        a.time = Some(1);
        b.time = Some(2);
        assert_eq!(
            generator.for_document(&a).expect("etag"),
            generator.for_document(&b).expect("etag")
        );

        b.blocks.push(Block::delimiter());
        assert_ne!(
            generator.for_document(&a).expect("etag"),
            generator.for_document(&b).expect("etag")
        );
    }

    proptest! {
        #[test]
        fn prop_etag_is_deterministic(content in prop::collection::vec(any::<u8>(), 0..512)) {
            let generator = ETagGenerator::new();
            prop_assert_eq!(generator.generate(&content), generator.generate(&content));
        }

        #[test]
        fn prop_etag_differs_for_different_content(
            a in prop::collection::vec(any::<u8>(), 0..128),
            b in prop::collection::vec(any::<u8>(), 0..128),
        ) {
            prop_assume!(a != b);
            let generator = ETagGenerator::new();
            prop_assert_ne!(generator.generate(&a), generator.generate(&b));
        }
    }
}
