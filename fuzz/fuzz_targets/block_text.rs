#![no_main]

use content_pipeline::blocks::{Block, EditorDocument};
use content_pipeline::converter::BlockConverter;
use content_pipeline::metrics::{count_words, strip_tags, truncate_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let converter = BlockConverter::new();

    let sanitized = converter.sanitize_inline_html(text);
    assert!(!sanitized.contains("<script"));

    let _ = count_words(Some(text));
    let _ = truncate_text(&strip_tags(text), 40);

    let doc = EditorDocument::with_blocks(vec![
        Block::paragraph(text),
        Block::quote(text, text),
        Block::code(text),
    ]);
    let _ = converter.to_html(&doc);
    let _ = converter.sanitize(&doc);
});
