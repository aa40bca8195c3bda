//! Plain-text metrics and display helpers
//!
//! Everything here works on strings that may contain HTML markup: tags are
//! stripped first (entities decoded, `script`/`style` content ignored) and
//! whitespace is collapsed, so `<p>Hello <b>world</b></p>` counts as two
//! words and eleven characters.
//!
//! The excerpt algorithm is the single canonical one used for both HTML
//! strings and block documents: it never cuts a word in half unless the
//! first word alone is longer than the limit.

use chrono::{DateTime, Utc};
use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};

use crate::parser::parse_html;
use crate::security::{SanitizeAction, SecurityValidator};

/// Default reading speed
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Default excerpt length in characters (before the ellipsis)
pub const DEFAULT_EXCERPT_LENGTH: usize = 150;

const ELLIPSIS: &str = "...";

/// Elements whose boundaries separate words
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "hr", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "pre", "figure", "figcaption", "cite", "table", "tr", "td", "th", "section", "article",
];

/// Returns `true` for elements whose boundaries separate words
pub(crate) fn is_block_element(tag_name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag_name)
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip HTML tags and return normalized plain text
///
/// ```rust
/// use content_pipeline::metrics::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>world</b> &amp; more</p>"), "Hello world & more");
/// assert_eq!(strip_tags("<p>one</p><p>two</p>"), "one two");
/// ```
pub fn strip_tags(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return normalize_whitespace(html);
    }

    let dom = parse_html(html);
    let validator = SecurityValidator::new();
    let mut output = String::with_capacity(html.len());
    collect_visible_text(&dom.document, &validator, &mut output);
    normalize_whitespace(&output)
}

enum TextStep {
    Visit(Handle),
    Separator,
}

fn collect_visible_text(root: &Handle, validator: &SecurityValidator, output: &mut String) {
    let mut stack = vec![TextStep::Visit(root.clone())];
    while let Some(step) = stack.pop() {
        let node = match step {
            TextStep::Separator => {
                output.push(' ');
                continue;
            }
            TextStep::Visit(node) => node,
        };
        match node.data {
            NodeData::Text { ref contents } => output.push_str(&contents.borrow()),
            NodeData::Element { ref name, .. } => {
                let tag = name.local.as_ref();
                if validator.check_element(tag) == SanitizeAction::Remove {
                    continue;
                }
                if is_block_element(tag) {
                    output.push(' ');
                    stack.push(TextStep::Separator);
                }
                stack.extend(node.children.borrow().iter().rev().cloned().map(TextStep::Visit));
            }
            NodeData::Document => {
                stack.extend(node.children.borrow().iter().rev().cloned().map(TextStep::Visit));
            }
            _ => {}
        }
    }
}

/// Count words in (possibly HTML) text
///
/// ```rust
/// use content_pipeline::metrics::count_words;
///
/// assert_eq!(count_words(Some("<p>Hello <b>world</b></p>")), 2);
/// assert_eq!(count_words(Some("")), 0);
/// assert_eq!(count_words(None), 0);
/// ```
pub fn count_words(html: Option<&str>) -> usize {
    html.map(|html| strip_tags(html).split_whitespace().count())
        .unwrap_or(0)
}

/// Count characters of the stripped, whitespace-collapsed text
pub fn count_characters(html: Option<&str>) -> usize {
    html.map(|html| strip_tags(html).chars().count())
        .unwrap_or(0)
}

/// Reading time in whole minutes, never less than one
///
/// ```rust
/// use content_pipeline::metrics::reading_time;
///
/// assert_eq!(reading_time(0, 200), 1);
/// assert_eq!(reading_time(201, 200), 2);
/// ```
pub fn reading_time(words: usize, words_per_minute: u32) -> u32 {
    let words_per_minute = words_per_minute.max(1) as usize;
    words.div_ceil(words_per_minute).max(1) as u32
}

/// Reading time estimator with a configurable reading speed
#[derive(Debug, Clone, Copy)]
pub struct ReadingTimeEstimator {
    words_per_minute: u32,
}

impl ReadingTimeEstimator {
    /// Estimator at the default 200 words per minute
    pub fn new() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }

    /// Estimator with a custom reading speed (0 is treated as 1)
    pub fn with_words_per_minute(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    pub fn words_per_minute(&self) -> u32 {
        self.words_per_minute
    }

    /// Minutes needed to read `words` words
    pub fn estimate(&self, words: usize) -> u32 {
        reading_time(words, self.words_per_minute)
    }

    /// Minutes needed to read (possibly HTML) text
    pub fn estimate_text(&self, html: &str) -> u32 {
        self.estimate(count_words(Some(html)))
    }
}

impl Default for ReadingTimeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Word, character and reading-time figures for a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetrics {
    pub words: usize,
    pub characters: usize,
    pub reading_time: u32,
}

impl DocumentMetrics {
    /// Metrics for (possibly HTML) text
    pub fn from_html(html: &str, estimator: &ReadingTimeEstimator) -> Self {
        Self::from_plain_text(&strip_tags(html), estimator)
    }

    /// Metrics for text that is already free of markup
    pub fn from_plain_text(text: &str, estimator: &ReadingTimeEstimator) -> Self {
        let text = normalize_whitespace(text);
        let words = text.split_whitespace().count();
        Self {
            words,
            characters: text.chars().count(),
            reading_time: estimator.estimate(words),
        }
    }
}

/// Truncate plain text at a word boundary and append an ellipsis
///
/// Text that fits within `max_length` characters (after whitespace
/// normalization) is returned unchanged. Otherwise the text is cut at
/// `max_length` characters and, unless the cut falls exactly on a word
/// boundary, backed up to the last space before it.
///
/// ```rust
/// use content_pipeline::metrics::truncate_text;
///
/// assert_eq!(truncate_text("short text", 20), "short text");
/// assert_eq!(truncate_text("the quick brown fox", 12), "the quick...");
/// ```
pub fn truncate_text(text: &str, max_length: usize) -> String {
    let normalized = normalize_whitespace(text);
    if normalized.chars().count() <= max_length {
        return normalized;
    }

    let cut_at = normalized
        .char_indices()
        .nth(max_length)
        .map(|(idx, _)| idx)
        .unwrap_or(normalized.len());
    let head = &normalized[..cut_at];
    let on_boundary = normalized[cut_at..].starts_with(' ');

    let head = if on_boundary {
        head
    } else {
        match head.rfind(' ') {
            Some(space) if space > 0 => &head[..space],
            _ => head,
        }
    };

    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Excerpt of (possibly HTML) text, truncated with [`truncate_text`]
pub fn generate_excerpt(html: &str, max_length: usize) -> String {
    truncate_text(&strip_tags(html), max_length)
}

/// URL slug for a title
///
/// Lowercases and trims, drops characters that are neither word characters,
/// whitespace nor hyphens, and joins the remaining words with single hyphens.
///
/// ```rust
/// use content_pipeline::metrics::slugify;
///
/// assert_eq!(slugify("Hello, World! 2024"), "hello-world-2024");
/// assert_eq!(slugify("  --Rust_and   WASM--  "), "rust-and-wasm");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for ch in text.trim().to_lowercase().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_separator = true;
        } else if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch);
        }
    }

    slug
}

/// Relative time label ("3 days ago"), "Just now" below one minute
///
/// Future timestamps also read "Just now".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const UNITS: &[(&str, i64)] = &[
        ("year", 31_536_000),
        ("month", 2_592_000),
        ("week", 604_800),
        ("day", 86_400),
        ("hour", 3_600),
        ("minute", 60),
    ];

    let seconds = (now - then).num_seconds();
    for (unit, unit_seconds) in UNITS {
        let count = seconds / unit_seconds;
        if count >= 1 {
            let plural = if count == 1 { "" } else { "s" };
            return format!("{count} {unit}{plural} ago");
        }
    }

    "Just now".to_string()
}

/// Display date, e.g. "Oct 19, 2026"
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}
