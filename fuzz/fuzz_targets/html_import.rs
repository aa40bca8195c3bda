#![no_main]

use content_pipeline::converter::BlockConverter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let converter = BlockConverter::new();
    let Ok(doc) = converter.from_html_bytes(data, None) else {
        return;
    };

    let html = converter.to_html(&doc);
    let again = converter.from_html(&html);
    let _ = converter.extract_plain_text(&again);
});
