#![no_main]

use content_pipeline::ffi::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let handle = content_pipeline_new();
    let options = ContentOptions {
        sanitize: data.first().map_or(1, |b| b & 1),
        generate_etag: 1,
        words_per_minute: 0,
    };
    let mut result = ContentResult::empty();

    unsafe {
        content_render(handle, data.as_ptr(), data.len(), &options, &mut result);
        content_result_free(&mut result);
        content_pipeline_free(handle);
    }
});
