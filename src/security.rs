//! Security validation for HTML entering and leaving the block model
//!
//! Block text may carry inline HTML, and imported HTML comes from whatever
//! the user pasted or uploaded. Both directions go through the same rules:
//!
//! - **Element sanitization**: executable or embedding elements (`script`,
//!   `style`, `iframe`, `object`, ...) never produce content
//! - **Inline allowlist**: only simple formatting tags survive inside block
//!   text; any other tag is unwrapped to its children
//! - **Attribute sanitization**: event handlers (`on*`) are dropped and only
//!   a per-tag allowlist of attributes is kept
//! - **URL sanitization**: `javascript:`, `data:`, `vbscript:`, `file:` and
//!   `about:` URLs are never emitted
//! - **Depth limit**: block text nested deeper than the limit is rejected.
//!   DOM walks use explicit stacks, so depth alone never exhausts the
//!   call stack
//!
//! html5ever is an HTML5 parser, not an XML parser, so external entities
//! are never resolved.

use crate::error::ContentError;

/// Maximum allowed nesting depth for HTML elements
const MAX_NESTING_DEPTH: usize = 1000;

/// Elements that are dropped together with their children
const DANGEROUS_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "embed", "applet", "link", "base",
    "meta", "template", "form", "input", "button", "textarea", "select",
];

/// Inline formatting elements allowed inside block text
const INLINE_ELEMENTS: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "s", "mark", "code", "br", "sub", "sup", "span",
];

/// URL schemes that must never be emitted
const DANGEROUS_URL_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:", "about:"];

/// What to do with an element found in HTML input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeAction {
    /// Keep the element (with filtered attributes)
    Allow,
    /// Drop the element and all of its children
    Remove,
    /// Drop the element's tag but keep its children
    Unwrap,
}

/// Security validator for HTML content
///
/// ```
/// use content_pipeline::security::{SanitizeAction, SecurityValidator};
///
/// let validator = SecurityValidator::new();
/// assert_eq!(validator.check_element("script"), SanitizeAction::Remove);
/// assert_eq!(validator.check_element("strong"), SanitizeAction::Allow);
/// assert_eq!(validator.check_element("div"), SanitizeAction::Unwrap);
/// ```
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    max_depth: usize,
}

impl SecurityValidator {
    /// Create a validator with the default depth limit
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Create a validator with a custom depth limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Classify an element by tag name (lowercase)
    pub fn check_element(&self, tag_name: &str) -> SanitizeAction {
        if DANGEROUS_ELEMENTS.contains(&tag_name) {
            SanitizeAction::Remove
        } else if INLINE_ELEMENTS.contains(&tag_name) {
            SanitizeAction::Allow
        } else {
            SanitizeAction::Unwrap
        }
    }

    /// Returns `true` for event handler attributes (`onclick`, `onload`, ...)
    pub fn is_event_handler(&self, attr_name: &str) -> bool {
        attr_name.len() > 2
            && attr_name
                .get(..2)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
    }

    /// Attributes kept on an allowed inline element
    pub fn allowed_attributes(&self, tag_name: &str) -> &'static [&'static str] {
        match tag_name {
            "a" => &["href", "title", "target", "rel"],
            "span" | "mark" | "code" => &["class"],
            _ => &[],
        }
    }

    /// Returns `true` if an attribute may be emitted on `tag_name`
    pub fn is_allowed_attribute(&self, tag_name: &str, attr_name: &str) -> bool {
        !self.is_event_handler(attr_name) && self.allowed_attributes(tag_name).contains(&attr_name)
    }

    /// Returns `true` if the URL uses a dangerous scheme
    ///
    /// Leading whitespace and control characters are ignored, and the check
    /// is case-insensitive, matching how browsers resolve the scheme.
    ///
    /// ```
    /// use content_pipeline::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::new();
    /// assert!(validator.is_dangerous_url(" JavaScript:alert(1)"));
    /// assert!(!validator.is_dangerous_url("https://example.com/a.png"));
    /// ```
    pub fn is_dangerous_url(&self, url: &str) -> bool {
        let cleaned: String = url
            .trim_start_matches(|c: char| c.is_whitespace() || c.is_control())
            .chars()
            .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
            .take(16)
            .collect::<String>()
            .to_ascii_lowercase();
        DANGEROUS_URL_SCHEMES
            .iter()
            .any(|scheme| cleaned.starts_with(scheme))
    }

    /// `Some(url)` if the URL is safe to emit
    pub fn sanitize_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        if self.is_dangerous_url(url) {
            None
        } else {
            Some(url)
        }
    }

    /// Reject nesting deeper than the configured limit
    pub fn validate_depth(&self, depth: usize) -> Result<(), ContentError> {
        if depth > self.max_depth {
            Err(ContentError::InvalidInput(format!(
                "HTML nesting depth {} exceeds maximum allowed depth {}",
                depth, self.max_depth
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}
