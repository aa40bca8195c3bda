//! Security validation tests
//!
//! Verify that HTML imported into blocks, and block text rendered back to
//! HTML, never carries executable markup, event handlers or dangerous URLs.

use content_pipeline::blocks::{Block, EditorDocument};
use content_pipeline::converter::{BlockConverter, ConversionContext, ConverterOptions};
use content_pipeline::error::ContentError;
use std::time::Duration;

fn import(html: &str) -> EditorDocument {
    BlockConverter::new().from_html(html)
}

/// Script elements are removed together with their content
#[test]
fn test_xss_script_tag_removal() {
    let html = r#"<html><body>
        <p>Before dangerous element</p>
        <script>alert('xss')</script>
        <p>After dangerous element</p>
    </body></html>"#;

    let doc = import(html);

    assert_eq!(
        doc.blocks,
        vec![
            Block::paragraph("Before dangerous element"),
            Block::paragraph("After dangerous element"),
        ]
    );
}

#[test]
fn test_xss_inline_script_removal() {
    let doc = import("<p>Text <script>malicious()</script> more text</p>");

    assert_eq!(doc.blocks, vec![Block::paragraph("Text more text")]);
}

#[test]
fn test_xss_event_handler_removal() {
    let doc = import(r#"<p onclick="evil()"><a href="https://example.com" onmouseover="evil()">link</a></p>"#);

    assert_eq!(
        doc.blocks,
        vec![Block::paragraph(r#"<a href="https://example.com">link</a>"#)]
    );
}

#[test]
fn test_xss_javascript_link_removal() {
    for href in ["javascript:alert(1)", " JaVaScRiPt:alert(1)", "vbscript:msgbox(1)", "data:text/html,x"] {
        let html = format!(r#"<p><a href="{href}">click</a></p>"#);
        let doc = import(&html);
        assert_eq!(doc.blocks, vec![Block::paragraph("<a>click</a>")], "{href}");
    }
}

#[test]
fn test_dangerous_image_source_is_dropped() {
    let doc = import(r#"<img src="javascript:alert(1)" alt="x"><p>kept</p>"#);

    assert_eq!(doc.blocks, vec![Block::paragraph("kept")]);
}

#[test]
fn test_dangerous_embed_is_dropped() {
    let doc = import(r#"<div class="embed"><iframe src="javascript:alert(1)"></iframe></div>"#);

    assert!(doc.blocks.is_empty());
}

#[test]
fn test_top_level_executable_elements_are_dropped() {
    let html = r#"<style>p { color: red }</style>
        <iframe src="https://evil.example"></iframe>
        <object data="x.swf"></object>
        <form><input value="secret"><button>Go</button></form>
        <p>Visible</p>"#;

    let doc = import(html);

    assert_eq!(doc.blocks, vec![Block::paragraph("Visible")]);
}

#[test]
fn test_multiple_xss_vectors() {
    let html = r#"<html><body>
        <script>alert('xss1')</script>
        <p onclick="alert('xss2')">Click</p>
        <p><a href="javascript:alert('xss3')">Link</a></p>
        <img src="javascript:alert('xss4')" alt="Image">
        <iframe src="javascript:alert('xss5')"></iframe>
    </body></html>"#;

    let converter = BlockConverter::new();
    let html_out = converter.to_html(&converter.from_html(html));

    for needle in ["script", "onclick", "javascript", "iframe", "alert"] {
        assert!(!html_out.contains(needle), "{needle} leaked into {html_out}");
    }
    assert!(html_out.contains("Click"));
    assert!(html_out.contains("Link"));
}

/// Hand-edited block JSON is sanitized again on render
#[test]
fn test_render_sanitizes_block_text() {
    let converter = BlockConverter::new();
    let doc = EditorDocument::with_blocks(vec![
        Block::paragraph(r#"<img src=x onerror="alert(1)">hi<script>steal()</script>"#),
        Block::header(r#"<b onclick="x()">Bold</b>"#, 2),
    ]);

    assert_eq!(converter.to_html(&doc), "<p>hi</p>\n<h2><b>Bold</b></h2>");
}

#[test]
fn test_render_drops_dangerous_media() {
    let converter = BlockConverter::new();
    let doc = EditorDocument::with_blocks(vec![
        Block::image("javascript:alert(1)", "caption"),
        Block::embed("youtube", "data:text/html,<script>x</script>"),
        Block::paragraph("safe"),
    ]);

    assert_eq!(converter.to_html(&doc), "<p>safe</p>");
}

#[test]
fn test_code_blocks_are_escaped() {
    let converter = BlockConverter::new();
    let doc = EditorDocument::with_blocks(vec![Block::code("<script>alert(\"x\") && y</script>")]);

    assert_eq!(
        converter.to_html(&doc),
        "<pre><code>&lt;script&gt;alert(\"x\") &amp;&amp; y&lt;/script&gt;</code></pre>"
    );
}

#[test]
fn test_image_caption_cannot_break_attribute() {
    let converter = BlockConverter::new();
    let doc = EditorDocument::with_blocks(vec![Block::image(
        "https://cdn.example/a.png",
        r#"" onerror="alert(1)"#,
    )]);

    let html = converter.to_html(&doc);

    assert!(html.contains(r#"alt="&quot; onerror=&quot;alert(1)""#), "{html}");
}

/// Reasonable nesting converts normally
#[test]
fn test_deeply_nested_html() {
    let mut html = String::from("<html><body>");
    for _ in 0..100 {
        html.push_str("<div>");
    }
    html.push_str("<p>Deep content</p>");
    for _ in 0..100 {
        html.push_str("</div>");
    }
    html.push_str("</body></html>");

    let doc = import(&html);

    assert_eq!(doc.blocks, vec![Block::paragraph("Deep content")]);
}

/// Nesting beyond the configured limit is rejected, not recursed into
#[test]
fn test_nesting_limit_enforced() {
    let converter = BlockConverter::with_options(ConverterOptions {
        max_nesting_depth: 20,
        ..Default::default()
    });

    let mut html = String::new();
    for _ in 0..50 {
        html.push_str("<div>");
    }
    html.push_str("too deep");
    for _ in 0..50 {
        html.push_str("</div>");
    }

    let mut ctx = ConversionContext::new(Duration::ZERO);
    let result = converter.from_html_with_context(&html, &mut ctx);
    assert!(matches!(result, Err(ContentError::InvalidInput(_))));

    // The infallible entry point degrades to an empty document
    assert!(converter.from_html(&html).blocks.is_empty());
}

#[test]
fn test_external_entities_are_not_resolved() {
    let html = r#"<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
        <p>&xxe;</p>"#;

    let doc = import(html);
    let text = BlockConverter::new().extract_plain_text(&doc);

    assert!(!text.contains("root:"));
}

const EXTREME_DEPTH: usize = 100_000;

fn nested_spans(inner: &str) -> String {
    format!(
        "{}{inner}{}",
        "<span>".repeat(EXTREME_DEPTH),
        "</span>".repeat(EXTREME_DEPTH)
    )
}

/// Runs `f` on a thread with a 2 MiB stack, failing if it overflows
fn on_small_stack<F: FnOnce() + Send + 'static>(f: F) {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .expect("spawn thread")
        .join()
        .expect("conversion overflowed a 2 MiB stack");
}

#[test]
fn test_extreme_nesting_in_code_block() {
    on_small_stack(|| {
        let doc = import(&format!("<pre>{}</pre>", nested_spans("x")));
        assert_eq!(doc.blocks, vec![Block::code("x")]);
    });
}

#[test]
fn test_extreme_nesting_in_wrappers() {
    on_small_stack(|| {
        let html = format!(
            "<blockquote>{}<cite>c</cite></blockquote><figure>{}</figure>",
            nested_spans("quoted"),
            nested_spans("<figcaption>caption</figcaption>")
        );

        let mut ctx = ConversionContext::new(Duration::ZERO);
        let result = BlockConverter::new().from_html_with_context(&html, &mut ctx);
        assert!(matches!(result, Err(ContentError::InvalidInput(_))));

        assert!(import(&html).blocks.is_empty());
    });
}

#[test]
fn test_extreme_nesting_in_block_text() {
    on_small_stack(|| {
        let converter = BlockConverter::new();
        let doc = EditorDocument::with_blocks(vec![Block::paragraph(nested_spans("deep"))]);

        assert_eq!(converter.to_html(&doc), "<p>deep</p>");
        assert_eq!(converter.extract_plain_text(&doc), "deep");
        assert_eq!(converter.word_count(&doc), 1);
        assert!(!doc.blocks[0].is_empty());
        assert_eq!(converter.sanitize(&doc), doc);
    });
}

/// With the limit raised, deep inline markup is written out in full
#[test]
fn test_raised_nesting_limit_keeps_deep_markup() {
    on_small_stack(|| {
        let converter = BlockConverter::with_options(ConverterOptions {
            max_nesting_depth: EXTREME_DEPTH * 2,
            ..Default::default()
        });
        let text = nested_spans("deep");
        let doc = EditorDocument::with_blocks(vec![Block::paragraph(text.clone())]);

        assert_eq!(converter.to_html(&doc), format!("<p>{text}</p>"));
        assert_eq!(
            converter.from_html(&format!("<p>{text}</p>")).blocks,
            vec![Block::paragraph(text)]
        );
    });
}
