//! Block converter - maps block documents to HTML and back
//!
//! This module holds the conversion logic between the structured
//! [`EditorDocument`] produced by the block editor and the HTML stored by
//! legacy content and rendered by the public site. Both directions are
//! deterministic: identical input always produces identical output, which
//! keeps ETags and cached renders stable.
//!
//! # Block to HTML
//!
//! Each block renders to one HTML fragment and fragments are joined with a
//! newline in block order:
//!
//! | Block       | HTML                                                         |
//! |-------------|--------------------------------------------------------------|
//! | header      | `<h{level}>text</h{level}>` (level clamped to 1-6)           |
//! | paragraph   | `<p>text</p>`                                                |
//! | list        | `<ul><li>..</li></ul>` or `<ol>..</ol>`                      |
//! | quote       | `<blockquote>text<cite>caption</cite></blockquote>`          |
//! | code        | `<pre><code>escaped code</code></pre>`                       |
//! | image       | `<figure><img src alt><figcaption>..</figcaption></figure>`  |
//! | delimiter   | `<hr>`                                                       |
//! | embed       | `<div class="embed" data-service=..><iframe src=..>..</div>` |
//!
//! Unsupported blocks, and image/embed blocks whose URL is blank or uses a
//! dangerous scheme, render to nothing.
//!
//! # HTML to blocks
//!
//! The HTML is parsed with html5ever and each top-level node of the body is
//! mapped to at most one block. Runs of top-level text and inline elements
//! are grouped into a single paragraph. Elements without a dedicated mapping
//! become fallback paragraphs when they carry visible text. The mapping is
//! lossy by contract: attributes, classes and layout are not preserved.
//!
//! Inline markup kept in block text is re-serialized through the
//! [`SecurityValidator`] allowlist, so event handlers, dangerous URLs and
//! executable elements never reach the document.
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::blocks::Block;
//! use content_pipeline::converter::BlockConverter;
//!
//! let converter = BlockConverter::new();
//! let doc = converter.from_html("<h2>Title</h2><p>Hello <b onclick=\"x()\">world</b></p>");
//! assert_eq!(doc.blocks, vec![Block::header("Title", 2), Block::paragraph("Hello <b>world</b>")]);
//!
//! let html = converter.to_html(&doc);
//! assert_eq!(html, "<h2>Title</h2>\n<p>Hello <b>world</b></p>");
//! ```

use std::borrow::Cow;
use std::time::{Duration, Instant};

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::{debug, warn};

use crate::blocks::{Block, EditorDocument, EmbedData, ImageData, ImageFile, ListData, ListStyle};
use crate::error::ContentError;
use crate::metrics::{
    DocumentMetrics, ReadingTimeEstimator, is_block_element, normalize_whitespace, strip_tags,
    truncate_text,
};
use crate::parser::{attribute, body, find_element, parse_html, parse_html_with_charset, text_content};
use crate::security::{SanitizeAction, SecurityValidator};

/// Converter options
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Reading speed used for reading-time estimates
    pub words_per_minute: u32,
    /// Default excerpt length in characters
    pub excerpt_length: usize,
    /// Maximum element nesting depth accepted when importing HTML
    pub max_nesting_depth: usize,
    /// Timeout applied by [`BlockConverter::from_html_bytes`] (zero = none)
    pub timeout: Duration,
    /// Re-serialize inline markup of block text through the allowlist when
    /// rendering HTML
    pub sanitize_inline: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            words_per_minute: crate::metrics::DEFAULT_WORDS_PER_MINUTE,
            excerpt_length: crate::metrics::DEFAULT_EXCERPT_LENGTH,
            max_nesting_depth: 1000,
            timeout: Duration::ZERO,
            sanitize_inline: true,
        }
    }
}

/// Conversion context for tracking timeout and node count
///
/// The timeout is cooperative: conversion checks elapsed time after parsing,
/// every 100 DOM nodes, and once more when the document is assembled. A
/// conversion that never reaches a checkpoint cannot be interrupted.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use content_pipeline::converter::ConversionContext;
///
/// let mut ctx = ConversionContext::new(Duration::from_secs(5));
/// for _ in 0..1000 {
///     ctx.increment_and_check()?;
/// }
/// assert_eq!(ctx.node_count(), 1000);
/// # Ok::<(), content_pipeline::error::ContentError>(())
/// ```
#[derive(Debug)]
pub struct ConversionContext {
    /// Start time of conversion
    start_time: Instant,
    /// Timeout duration (0 means no timeout)
    timeout: Duration,
    /// Number of nodes processed (for checkpoint frequency)
    node_count: u32,
}

impl ConversionContext {
    /// Create a new conversion context with the specified timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum duration for conversion (`Duration::ZERO` means no timeout)
    pub fn new(timeout: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            node_count: 0,
        }
    }

    /// Check if timeout has been exceeded
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Conversion is within timeout limit
    /// - `Err(ContentError::Timeout)` - Timeout has been exceeded
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use content_pipeline::converter::ConversionContext;
    ///
    /// let ctx = ConversionContext::new(Duration::from_millis(10));
    /// std::thread::sleep(Duration::from_millis(20));
    ///
    /// assert!(ctx.check_timeout().is_err());
    /// ```
    pub fn check_timeout(&self) -> Result<(), ContentError> {
        if self.timeout.is_zero() {
            return Ok(());
        }

        if self.start_time.elapsed() > self.timeout {
            return Err(ContentError::Timeout);
        }

        Ok(())
    }

    /// Increment node count and check timeout every 100 nodes
    pub fn increment_and_check(&mut self) -> Result<(), ContentError> {
        self.node_count += 1;

        if self.node_count.is_multiple_of(100) {
            self.check_timeout()?;
        }

        Ok(())
    }

    /// Elapsed time since conversion started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of DOM nodes processed so far
    pub fn node_count(&self) -> u32 {
        self.node_count
    }
}

/// Bidirectional block/HTML converter
///
/// The converter holds no per-document state, so one instance can serve any
/// number of conversions.
///
/// # Usage
///
/// ```rust
/// use content_pipeline::blocks::{Block, EditorDocument};
/// use content_pipeline::converter::{BlockConverter, ConverterOptions};
///
/// let converter = BlockConverter::with_options(ConverterOptions {
///     words_per_minute: 100,
///     ..Default::default()
/// });
///
/// let doc = EditorDocument::with_blocks(vec![
///     Block::header("Notes", 1),
///     Block::paragraph("Three short words"),
/// ]);
/// assert_eq!(converter.extract_plain_text(&doc), "Notes Three short words");
/// assert_eq!(converter.word_count(&doc), 4);
/// assert_eq!(converter.reading_time(&doc), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BlockConverter {
    options: ConverterOptions,
    security_validator: SecurityValidator,
    estimator: ReadingTimeEstimator,
}

impl BlockConverter {
    /// Create a converter with default options
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    /// Create a converter with custom options
    pub fn with_options(options: ConverterOptions) -> Self {
        Self {
            security_validator: SecurityValidator::with_max_depth(options.max_nesting_depth),
            estimator: ReadingTimeEstimator::with_words_per_minute(options.words_per_minute),
            options,
        }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Render a document to HTML
    ///
    /// Fragments are joined with `\n` in block order. Blocks that render to
    /// nothing (unsupported types, unsafe or blank media URLs) leave no
    /// empty line behind.
    pub fn to_html(&self, document: &EditorDocument) -> String {
        document
            .blocks
            .iter()
            .map(|block| self.render_block(block))
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render one block to its HTML fragment
    pub fn render_block(&self, block: &Block) -> String {
        match block {
            Block::Header { data, .. } => {
                let level = data.level.clamp(1, 6);
                format!("<h{level}>{}</h{level}>", self.inline(&data.text))
            }
            Block::Paragraph { data, .. } => format!("<p>{}</p>", self.inline(&data.text)),
            Block::List { data, .. } => self.render_list(data),
            Block::Quote { data, .. } => {
                let mut html = format!("<blockquote>{}", self.inline(&data.text));
                if !data.caption.trim().is_empty() {
                    html.push_str("<cite>");
                    html.push_str(&self.inline(&data.caption));
                    html.push_str("</cite>");
                }
                html.push_str("</blockquote>");
                html
            }
            Block::Code { data, .. } => format!("<pre><code>{}</code></pre>", escape_text(&data.code)),
            Block::Image { data, .. } => self.render_image(data),
            Block::Delimiter { .. } => "<hr>".to_string(),
            Block::Embed { data, .. } => self.render_embed(data),
            Block::Unsupported { kind, .. } => {
                debug!(kind = %kind, "Skipping unsupported block");
                String::new()
            }
        }
    }

    fn render_list(&self, data: &ListData) -> String {
        let tag = match data.style {
            ListStyle::Ordered => "ol",
            ListStyle::Unordered => "ul",
        };

        let mut html = format!("<{tag}>");
        for item in &data.items {
            html.push_str("<li>");
            html.push_str(&self.inline(item));
            html.push_str("</li>");
        }
        html.push_str(&format!("</{tag}>"));
        html
    }

    fn render_image(&self, data: &ImageData) -> String {
        let Some(url) = self.safe_url(&data.file.url) else {
            return String::new();
        };

        let mut html = format!(
            "<figure><img src=\"{}\" alt=\"{}\">",
            escape_attr(url),
            escape_attr(&strip_tags(&data.caption))
        );
        if !data.caption.trim().is_empty() {
            html.push_str("<figcaption>");
            html.push_str(&self.inline(&data.caption));
            html.push_str("</figcaption>");
        }
        html.push_str("</figure>");
        html
    }

    fn render_embed(&self, data: &EmbedData) -> String {
        let Some(url) = self.safe_url(&data.embed) else {
            return String::new();
        };

        let mut iframe = format!("<iframe src=\"{}\"", escape_attr(url));
        if let Some(width) = data.width {
            iframe.push_str(&format!(" width=\"{width}\""));
        }
        if let Some(height) = data.height {
            iframe.push_str(&format!(" height=\"{height}\""));
        }
        iframe.push_str(" frameborder=\"0\" allowfullscreen></iframe>");

        format!(
            "<div class=\"embed\" data-service=\"{}\">{iframe}</div>",
            escape_attr(&data.service)
        )
    }

    /// Trimmed URL when it is non-blank and uses a safe scheme
    fn safe_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let safe = self.security_validator.sanitize_url(url);
        if safe.is_none() {
            warn!(url, "Refusing to emit URL with a dangerous scheme");
        }
        safe
    }

    fn inline<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.options.sanitize_inline {
            Cow::Owned(self.sanitize_inline_html(text))
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Re-serialize inline HTML through the allowlist
    ///
    /// Text without markup is returned unchanged. Markup nested beyond the
    /// depth limit is flattened to escaped plain text.
    ///
    /// ```rust
    /// use content_pipeline::converter::BlockConverter;
    ///
    /// let converter = BlockConverter::new();
    /// assert_eq!(
    ///     converter.sanitize_inline_html(r#"<a href="javascript:x()" onclick="y()">hi</a><script>z()</script>"#),
    ///     "<a>hi</a>"
    /// );
    /// ```
    pub fn sanitize_inline_html(&self, html: &str) -> String {
        if !html.contains('<') {
            return html.to_string();
        }

        let dom = parse_html(html);
        let Some(body) = body(&dom) else {
            return String::new();
        };

        let mut ctx = ConversionContext::new(Duration::ZERO);
        let mut output = String::with_capacity(html.len());
        match self.write_inline_nodes(&body.children.borrow(), &mut output, 1, &mut ctx, &[]) {
            Ok(()) => output,
            Err(err) => {
                warn!(error = %err, "Inline markup rejected, keeping plain text");
                escape_text(&strip_tags(html))
            }
        }
    }

    /// Convert HTML to a block document
    ///
    /// Never fails: markup that exceeds the nesting limit yields an empty
    /// document.
    pub fn from_html(&self, html: &str) -> EditorDocument {
        let mut ctx = ConversionContext::new(Duration::ZERO);
        match self.from_html_with_context(html, &mut ctx) {
            Ok(document) => document,
            Err(err) => {
                warn!(error = %err, "HTML import failed, returning an empty document");
                EditorDocument::new()
            }
        }
    }

    /// Convert uploaded HTML bytes to a block document
    ///
    /// The bytes are decoded with the charset cascade in
    /// [`crate::charset`] and converted under the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`ContentError::InvalidInput`]: empty input or nesting too deep
    /// - [`ContentError::Encoding`]: undecodable bytes
    /// - [`ContentError::Timeout`]: the configured timeout was exceeded
    pub fn from_html_bytes(
        &self,
        html: &[u8],
        content_type: Option<&str>,
    ) -> Result<EditorDocument, ContentError> {
        let mut ctx = ConversionContext::new(self.options.timeout);
        let dom = parse_html_with_charset(html, content_type)?;
        self.convert_dom(&dom, &mut ctx)
    }

    /// Convert HTML to a block document with timeout and depth enforcement
    ///
    /// # Errors
    ///
    /// - [`ContentError::Timeout`]: `ctx` timed out
    /// - [`ContentError::InvalidInput`]: nesting deeper than the configured limit
    pub fn from_html_with_context(
        &self,
        html: &str,
        ctx: &mut ConversionContext,
    ) -> Result<EditorDocument, ContentError> {
        let dom = parse_html(html);
        self.convert_dom(&dom, ctx)
    }

    fn convert_dom(
        &self,
        dom: &RcDom,
        ctx: &mut ConversionContext,
    ) -> Result<EditorDocument, ContentError> {
        ctx.check_timeout()?;

        let mut blocks = Vec::new();
        let mut pending_inline = String::new();

        if let Some(body) = body(dom) {
            for node in body.children.borrow().iter() {
                ctx.increment_and_check()?;

                match node.data {
                    NodeData::Text { .. } => {
                        self.write_inline_nodes(
                            std::slice::from_ref(node),
                            &mut pending_inline,
                            1,
                            ctx,
                            &[],
                        )?;
                    }
                    NodeData::Element { ref name, .. } => {
                        let tag_name = name.local.as_ref();
                        if self.security_validator.check_element(tag_name) == SanitizeAction::Allow {
                            self.write_inline_nodes(
                                std::slice::from_ref(node),
                                &mut pending_inline,
                                1,
                                ctx,
                                &[],
                            )?;
                            continue;
                        }

                        self.flush_inline(&mut pending_inline, &mut blocks);
                        if let Some(block) = self.handle_element(node, tag_name, ctx)? {
                            blocks.push(block);
                        }
                    }
                    _ => {}
                }
            }
        }
        self.flush_inline(&mut pending_inline, &mut blocks);

        ctx.check_timeout()?;

        Ok(EditorDocument::with_blocks(blocks))
    }

    fn flush_inline(&self, pending: &mut String, blocks: &mut Vec<Block>) {
        if pending.is_empty() {
            return;
        }
        let text = normalize_whitespace(pending);
        pending.clear();
        if !strip_tags(&text).is_empty() {
            blocks.push(Block::paragraph(text));
        }
    }

    /// Map one top-level element to a block
    fn handle_element(
        &self,
        node: &Handle,
        tag_name: &str,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Block>, ContentError> {
        if self.security_validator.check_element(tag_name) == SanitizeAction::Remove {
            debug!(tag = tag_name, "Dropping non-content element");
            return Ok(None);
        }

        self.security_validator.validate_depth(1)?;

        let block = match tag_name {
            "h1" => Some(self.handle_heading(node, 1, ctx)?),
            "h2" => Some(self.handle_heading(node, 2, ctx)?),
            "h3" => Some(self.handle_heading(node, 3, ctx)?),
            "h4" => Some(self.handle_heading(node, 4, ctx)?),
            "h5" => Some(self.handle_heading(node, 5, ctx)?),
            "h6" => Some(self.handle_heading(node, 6, ctx)?),
            "p" => self.handle_paragraph(node, ctx)?,
            "ul" => Some(self.handle_list(node, ListStyle::Unordered, ctx)?),
            "ol" => Some(self.handle_list(node, ListStyle::Ordered, ctx)?),
            "blockquote" => Some(self.handle_quote(node, ctx)?),
            "pre" => Some(self.handle_code_block(node)),
            "hr" => Some(Block::delimiter()),
            "img" => self.handle_image(node, None, ctx)?,
            "figure" => match self.handle_figure(node, ctx)? {
                Some(block) => Some(block),
                None => self.handle_fallback(node, tag_name, ctx)?,
            },
            "div" => match self.handle_embed(node) {
                Some(block) => Some(block),
                None => self.handle_fallback(node, tag_name, ctx)?,
            },
            _ => self.handle_fallback(node, tag_name, ctx)?,
        };

        Ok(block)
    }

    fn handle_heading(
        &self,
        node: &Handle,
        level: u8,
        ctx: &mut ConversionContext,
    ) -> Result<Block, ContentError> {
        let text = self.inline_content(node, ctx, &[])?;
        Ok(Block::header(text, level))
    }

    fn handle_paragraph(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Block>, ContentError> {
        let text = self.inline_content(node, ctx, &[])?;
        if strip_tags(&text).is_empty() {
            debug!("Skipping blank paragraph");
            return Ok(None);
        }
        Ok(Some(Block::paragraph(text)))
    }

    fn handle_list(
        &self,
        node: &Handle,
        style: ListStyle,
        ctx: &mut ConversionContext,
    ) -> Result<Block, ContentError> {
        let mut items = Vec::new();
        for child in node.children.borrow().iter() {
            ctx.increment_and_check()?;
            if crate::parser::element_name(child) == Some("li") {
                items.push(self.inline_content(child, ctx, &[])?);
            }
        }
        Ok(Block::list(style, items))
    }

    fn handle_quote(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
    ) -> Result<Block, ContentError> {
        let caption = match find_element(node, "cite") {
            Some(cite) => self.inline_content(&cite, ctx, &[])?,
            None => String::new(),
        };
        let text = self.inline_content(node, ctx, &["cite"])?;
        Ok(Block::quote(text, caption))
    }

    fn handle_code_block(&self, node: &Handle) -> Block {
        Block::code(text_content(node))
    }

    /// Image block from an `img` element, `None` when its `src` is unusable
    fn handle_image(
        &self,
        img: &Handle,
        caption: Option<String>,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Block>, ContentError> {
        ctx.increment_and_check()?;

        let src = attribute(img, "src").unwrap_or_default();
        let Some(url) = self.safe_url(&src) else {
            debug!("Skipping image without a usable src");
            return Ok(None);
        };

        let caption = caption.unwrap_or_else(|| {
            escape_text(&normalize_whitespace(&attribute(img, "alt").unwrap_or_default()))
        });

        Ok(Some(Block::Image {
            id: None,
            data: ImageData {
                file: ImageFile {
                    url: url.to_string(),
                },
                caption,
            },
        }))
    }

    fn handle_figure(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Block>, ContentError> {
        let Some(img) = find_element(node, "img") else {
            return Ok(None);
        };

        let caption = match find_element(node, "figcaption") {
            Some(figcaption) => Some(self.inline_content(&figcaption, ctx, &[])?),
            None => None,
        };
        self.handle_image(&img, caption, ctx)
    }

    /// Embed block from a `div` wrapping an `iframe` with a safe `src`
    fn handle_embed(&self, node: &Handle) -> Option<Block> {
        let iframe = find_element(node, "iframe")?;
        let src = attribute(&iframe, "src")?;
        let url = self.safe_url(&src)?;

        let service = attribute(node, "data-service")
            .map(|service| service.trim().to_string())
            .filter(|service| !service.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        Some(Block::Embed {
            id: None,
            data: EmbedData {
                service,
                embed: url.to_string(),
                source: None,
                width: attribute(&iframe, "width").and_then(|w| w.trim().parse().ok()),
                height: attribute(&iframe, "height").and_then(|h| h.trim().parse().ok()),
                caption: None,
            },
        })
    }

    /// Paragraph from the visible text of an element without a block mapping
    ///
    /// Wrappers holding nothing but an image still become image blocks.
    fn handle_fallback(
        &self,
        node: &Handle,
        tag_name: &str,
        ctx: &mut ConversionContext,
    ) -> Result<Option<Block>, ContentError> {
        let text = self.inline_content(node, ctx, &[])?;
        if !strip_tags(&text).is_empty() {
            debug!(tag = tag_name, "Converting element to fallback paragraph");
            return Ok(Some(Block::paragraph(text)));
        }

        match find_element(node, "img") {
            Some(img) => self.handle_image(&img, None, ctx),
            None => {
                debug!(tag = tag_name, "Skipping element without visible text");
                Ok(None)
            }
        }
    }

    /// Sanitized inline HTML of an element's children, whitespace collapsed
    fn inline_content(
        &self,
        node: &Handle,
        ctx: &mut ConversionContext,
        exclude: &[&str],
    ) -> Result<String, ContentError> {
        let mut output = String::new();
        self.write_inline_nodes(&node.children.borrow(), &mut output, 2, ctx, exclude)?;
        Ok(normalize_whitespace(&output))
    }

    /// Writes sanitized inline HTML for `nodes` in document order
    ///
    /// Uses an explicit stack: closing tags and block separators are queued
    /// as `Emit` steps behind the children they follow.
    fn write_inline_nodes(
        &self,
        nodes: &[Handle],
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
        exclude: &[&str],
    ) -> Result<(), ContentError> {
        let mut stack: Vec<InlineStep> = nodes
            .iter()
            .rev()
            .map(|node| InlineStep::Visit(node.clone(), depth))
            .collect();

        while let Some(step) = stack.pop() {
            let (node, depth) = match step {
                InlineStep::Emit(text) => {
                    output.push_str(&text);
                    continue;
                }
                InlineStep::Visit(node, depth) => (node, depth),
            };
            ctx.increment_and_check()?;

            match node.data {
                NodeData::Text { ref contents } => output.push_str(&escape_text(&contents.borrow())),
                NodeData::Element {
                    ref name,
                    ref attrs,
                    ..
                } => {
                    self.security_validator.validate_depth(depth)?;

                    let tag_name = name.local.as_ref();
                    if exclude.contains(&tag_name) {
                        continue;
                    }

                    match self.security_validator.check_element(tag_name) {
                        SanitizeAction::Remove => {
                            debug!(tag = tag_name, "Dropping element from inline content");
                            continue;
                        }
                        SanitizeAction::Unwrap => {
                            if is_block_element(tag_name) {
                                output.push(' ');
                                stack.push(InlineStep::Emit(Cow::Borrowed(" ")));
                            }
                        }
                        SanitizeAction::Allow => {
                            output.push('<');
                            output.push_str(tag_name);
                            for attr in attrs.borrow().iter() {
                                let attr_name = attr.name.local.as_ref();
                                if !self.security_validator.is_allowed_attribute(tag_name, attr_name) {
                                    continue;
                                }
                                if attr_name == "href"
                                    && self.security_validator.is_dangerous_url(&attr.value)
                                {
                                    debug!("Dropping link with a dangerous scheme");
                                    continue;
                                }
                                output.push_str(&format!(
                                    " {attr_name}=\"{}\"",
                                    escape_attr(&attr.value)
                                ));
                            }
                            output.push('>');

                            if tag_name == "br" {
                                continue;
                            }
                            stack.push(InlineStep::Emit(Cow::Owned(format!("</{tag_name}>"))));
                        }
                    }

                    stack.extend(
                        node.children
                            .borrow()
                            .iter()
                            .rev()
                            .map(|child| InlineStep::Visit(child.clone(), depth + 1)),
                    );
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Plain text of a document
    ///
    /// Headers, paragraphs and quotes contribute their tag-stripped text,
    /// lists their stripped items and code blocks their raw code. Other
    /// block types contribute nothing. Parts are joined with single spaces.
    pub fn extract_plain_text(&self, document: &EditorDocument) -> String {
        let mut parts = Vec::with_capacity(document.blocks.len());

        for block in &document.blocks {
            let part = match block {
                Block::Header { data, .. } => strip_tags(&data.text),
                Block::Paragraph { data, .. } => strip_tags(&data.text),
                Block::Quote { data, .. } => strip_tags(&data.text),
                Block::List { data, .. } => data
                    .items
                    .iter()
                    .map(|item| strip_tags(item))
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
                Block::Code { data, .. } => data.code.clone(),
                _ => continue,
            };
            if !part.is_empty() {
                parts.push(part);
            }
        }

        parts.join(" ")
    }

    /// Drop empty blocks, keeping `time` and `version`
    ///
    /// Idempotent: sanitizing a sanitized document returns it unchanged.
    pub fn sanitize(&self, document: &EditorDocument) -> EditorDocument {
        EditorDocument {
            time: document.time,
            version: document.version.clone(),
            blocks: document
                .blocks
                .iter()
                .filter(|block| !block.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Excerpt of the first paragraph block, `""` when there is none
    pub fn generate_excerpt(&self, document: &EditorDocument, max_length: usize) -> String {
        document
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Paragraph { data, .. } => Some(truncate_text(&strip_tags(&data.text), max_length)),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Excerpt with the configured default length
    pub fn excerpt(&self, document: &EditorDocument) -> String {
        self.generate_excerpt(document, self.options.excerpt_length)
    }

    /// Number of whitespace-separated tokens in the plain text
    pub fn word_count(&self, document: &EditorDocument) -> usize {
        self.extract_plain_text(document).split_whitespace().count()
    }

    /// Reading time in minutes (at least one)
    pub fn reading_time(&self, document: &EditorDocument) -> u32 {
        self.estimator.estimate(self.word_count(document))
    }

    /// Word, character and reading-time figures of a document
    pub fn metrics(&self, document: &EditorDocument) -> DocumentMetrics {
        DocumentMetrics::from_plain_text(&self.extract_plain_text(document), &self.estimator)
    }
}

impl Default for BlockConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending work for the inline writer
enum InlineStep {
    /// Node to write, with its nesting depth
    Visit(Handle, usize),
    /// Literal output queued behind a node's children
    Emit(Cow<'static, str>),
}

/// Escape text for use as HTML element content
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape text for use inside a double-quoted attribute value
pub fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
