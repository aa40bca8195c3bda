//! Character encoding detection for uploaded HTML
//!
//! Imported HTML files do not always arrive as UTF-8. Before the converter
//! sees them they are decoded with the first encoding found by this cascade:
//!
//! 1. **Content-Type**: `charset` parameter of the upload's Content-Type
//! 2. **Byte order mark**: UTF-8 / UTF-16LE / UTF-16BE BOM
//! 3. **Meta tag**: `<meta charset>` or `<meta http-equiv="Content-Type">`
//!    within the first 1024 bytes
//! 4. **Default**: UTF-8
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::charset::{decode_html, detect_encoding};
//!
//! let encoding = detect_encoding(Some("text/html; charset=ISO-8859-1"), b"<p>x</p>");
//! assert_eq!(encoding.name(), "windows-1252");
//!
//! let text = decode_html(b"<p>Caf\xE9</p>", Some("text/html; charset=latin1")).unwrap();
//! assert_eq!(text, "<p>Café</p>");
//! ```

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::error::ContentError;

/// Maximum bytes to scan for meta charset tags
const META_SCAN_LIMIT: usize = 1024;

static CONTENT_TYPE_CHARSET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok());

static META_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s[^>]*charset\s*=\s*["']?([A-Za-z0-9_:.+-]+)"#).ok()
});

/// Pick the encoding for an HTML upload
///
/// Unknown labels are skipped, so a bogus Content-Type charset falls through
/// to the next level of the cascade.
pub fn detect_encoding(content_type: Option<&str>, html: &[u8]) -> &'static Encoding {
    if let Some(encoding) = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }

    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return encoding;
    }

    charset_from_meta(html)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Extract the charset parameter from a Content-Type header value
///
/// ```rust
/// use content_pipeline::charset::charset_from_content_type;
///
/// assert_eq!(charset_from_content_type("text/html; charset=\"UTF-8\""), Some("UTF-8".to_string()));
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    CONTENT_TYPE_CHARSET
        .as_ref()?
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract a charset label from meta tags near the start of the document
pub fn charset_from_meta(html: &[u8]) -> Option<String> {
    let head = &html[..html.len().min(META_SCAN_LIMIT)];
    // Meta tags are ASCII in every encoding we accept, so a lossy view is enough.
    let head = String::from_utf8_lossy(head);

    META_CHARSET
        .as_ref()?
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode HTML bytes to UTF-8 text
///
/// # Errors
///
/// Returns [`ContentError::Encoding`] when the bytes are not valid in the
/// detected encoding.
pub fn decode_html<'a>(
    html: &'a [u8],
    content_type: Option<&str>,
) -> Result<Cow<'a, str>, ContentError> {
    let encoding = detect_encoding(content_type, html);

    if encoding == UTF_8 {
        let body = html.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(html);
        return std::str::from_utf8(body).map(Cow::Borrowed).map_err(|e| {
            ContentError::Encoding(format!(
                "Invalid UTF-8 at byte position {}: {}",
                e.valid_up_to(),
                e
            ))
        });
    }

    let (decoded, had_errors) = encoding.decode_with_bom_removal(html);
    if had_errors {
        return Err(ContentError::Encoding(format!(
            "Invalid byte sequence for charset '{}'",
            encoding.name()
        )));
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16LE, WINDOWS_1252};
    use proptest::prelude::*;

    #[test]
    fn test_content_type_charset_variants() {
        assert_eq!(
            charset_from_content_type("text/html; charset=UTF-8"),
            Some("UTF-8".to_string())
        );
        assert_eq!(
            charset_from_content_type("text/html;charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(
            charset_from_content_type("text/html; CHARSET=\"ISO-8859-1\"; boundary=x"),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(charset_from_content_type(""), None);
    }

    #[test]
    fn test_meta_charset_html5_and_html4() {
        assert_eq!(
            charset_from_meta(b"<html><head><meta charset=\"windows-1252\"></head>"),
            Some("windows-1252".to_string())
        );
        assert_eq!(
            charset_from_meta(
                b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\">"
            ),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(charset_from_meta(b"<p>no charset</p>"), None);
    }

    #[test]
    fn test_meta_beyond_scan_limit_is_ignored() {
        let mut html = vec![b' '; 2000];
        html.extend_from_slice(b"<meta charset=\"windows-1252\">");
        assert_eq!(charset_from_meta(&html), None);
    }

    #[test]
    fn test_cascade_order() {
        let html = b"<meta charset=\"windows-1252\"><p>x</p>";
        assert_eq!(detect_encoding(Some("text/html; charset=utf-8"), html), UTF_8);
        assert_eq!(detect_encoding(None, html), WINDOWS_1252);
        assert_eq!(detect_encoding(Some("text/html; charset=x-bogus"), html), WINDOWS_1252);
        assert_eq!(detect_encoding(None, b"\xFF\xFE<\x00p\x00>\x00"), UTF_16LE);
        assert_eq!(detect_encoding(None, b"<p>plain</p>"), UTF_8);
    }

    #[test]
    fn test_decode_windows_1252() {
        let decoded =
            decode_html(b"<p>Price \x80 10</p>", Some("text/html; charset=windows-1252"))
                .expect("decodes");
        assert_eq!(decoded, "<p>Price € 10</p>");
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let decoded = decode_html(b"\xEF\xBB\xBF<p>x</p>", None).expect("decodes");
        assert_eq!(decoded, "<p>x</p>");
    }

    #[test]
    fn test_decode_invalid_utf8_is_an_error() {
        let result = decode_html(b"<p>\xC3\x28</p>", None);
        assert!(matches!(result, Err(ContentError::Encoding(_))));
    }

    proptest! {
        #[test]
        fn prop_ascii_html_always_decodes_unchanged(body in "[a-zA-Z0-9 <>/=\"]{0,200}") {
            let decoded = decode_html(body.as_bytes(), None);
            prop_assert_eq!(decoded.ok().map(Cow::into_owned), Some(body));
        }
    }
}
