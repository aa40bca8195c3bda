//! C ABI for rendering block documents
//!
//! Hosts that cannot link Rust directly (the publishing worker, the legacy
//! page renderer) call into the pipeline through these functions.
//!
//! # String Representation
//!
//! **All strings are UTF-8 bytes + length, never NUL-terminated.**
//!
//! Every string field is a pointer (`*mut u8`) paired with a `_len` field
//! holding the exact byte count. Rust may or may not place a NUL after the
//! bytes; callers must not rely on it and must not call `strlen()`.
//!
//! ```c
//! fwrite(result.html, 1, result.html_len, out);   /* correct */
//! puts((char *)result.html);                       /* WRONG */
//! ```
//!
//! # Memory Management
//!
//! - Rust allocates every output buffer as a `Box<[u8]>`
//! - The caller reads the buffers but does not own them
//! - The caller releases them with [`content_result_free`] exactly once
//! - After the free call every pointer in the result is NULL
//!
//! ```rust
//! use content_pipeline::ffi::{ContentResult, content_result_free};
//!
//! let html = String::from("<p>Hello</p>");
//! let html_len = html.len();
//! let mut result = ContentResult::empty();
//! result.html = Box::into_raw(html.into_bytes().into_boxed_slice()) as *mut u8;
//! result.html_len = html_len;
//!
//! unsafe { content_result_free(&mut result) };
//! assert!(result.html.is_null());
//! assert_eq!(result.html_len, 0);
//! ```
//!
//! # Error Contract
//!
//! On success `error_code` is [`ERROR_SUCCESS`] and `error_message` is NULL.
//! On failure `error_code` is one of the `ERROR_*` constants (the same
//! numbers as [`ContentError::code`]), `error_message` holds a UTF-8
//! description and every output buffer is NULL.
//!
//! Panics are caught with `catch_unwind` and reported as [`ERROR_INTERNAL`];
//! unwinding never crosses the boundary.
//!
//! # Thread Safety
//!
//! A [`ContentPipelineHandle`] holds no mutable state, but callers should
//! still keep one handle per thread. Separate handles are independent.

use std::panic;
use std::ptr;
use std::slice;

use crate::blocks::EditorDocument;
use crate::converter::BlockConverter;
use crate::error::ContentError;
use crate::etag::ETagGenerator;
use crate::metrics::{DocumentMetrics, ReadingTimeEstimator};

/// Success
pub const ERROR_SUCCESS: u32 = 0;

/// HTML parsing failed
pub const ERROR_PARSE: u32 = 1;

/// Input bytes are not valid UTF-8
pub const ERROR_ENCODING: u32 = 2;

/// Conversion took longer than allowed
pub const ERROR_TIMEOUT: u32 = 3;

/// NULL pointer or inconsistent pointer/length pair
pub const ERROR_INVALID_INPUT: u32 = 5;

/// Input is not a block document
pub const ERROR_SERIALIZATION: u32 = 6;

/// Internal error or caught panic
pub const ERROR_INTERNAL: u32 = 99;

/// Render options
///
/// `u8` flags are booleans: zero is off, anything else is on.
///
/// ```c
/// ContentOptions options = {
///     .sanitize = 1,
///     .generate_etag = 1,
///     .words_per_minute = 0,   /* 0 = default (200) */
/// };
/// ```
#[repr(C)]
pub struct ContentOptions {
    /// Drop empty blocks before rendering
    pub sanitize: u8,
    /// Compute a strong ETag over the rendered HTML
    pub generate_etag: u8,
    /// Reading speed for `reading_time`; 0 selects the default
    pub words_per_minute: u32,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            sanitize: 1,
            generate_etag: 0,
            words_per_minute: 0,
        }
    }
}

/// Render result
///
/// Filled by [`content_render`], released by [`content_result_free`].
#[repr(C)]
pub struct ContentResult {
    /// Rendered HTML (UTF-8, NOT NUL-terminated)
    pub html: *mut u8,
    pub html_len: usize,

    /// Plain text of the text blocks, space-joined (UTF-8)
    pub plain_text: *mut u8,
    pub plain_text_len: usize,

    pub word_count: u32,

    /// Minutes, at least 1
    pub reading_time: u32,

    /// Quoted strong ETag, NULL unless `generate_etag` was set
    pub etag: *mut u8,
    pub etag_len: usize,

    pub error_code: u32,

    /// Error description (UTF-8), NULL on success
    pub error_message: *mut u8,
    pub error_len: usize,
}

impl ContentResult {
    /// A result with every pointer NULL and every count zero
    pub fn empty() -> Self {
        Self {
            html: ptr::null_mut(),
            html_len: 0,
            plain_text: ptr::null_mut(),
            plain_text_len: 0,
            word_count: 0,
            reading_time: 0,
            etag: ptr::null_mut(),
            etag_len: 0,
            error_code: ERROR_SUCCESS,
            error_message: ptr::null_mut(),
            error_len: 0,
        }
    }
}

/// Opaque pipeline handle
pub struct ContentPipelineHandle {
    converter: BlockConverter,
    etag_generator: ETagGenerator,
}

struct RenderOutput {
    html: Box<[u8]>,
    plain_text: Box<[u8]>,
    metrics: DocumentMetrics,
    etag: Option<Box<[u8]>>,
}

fn reset_result(result: &mut ContentResult) {
    *result = ContentResult::empty();
}

fn set_error_result(result: &mut ContentResult, error_code: u32, error_message: String) {
    let error_bytes = error_message.into_bytes().into_boxed_slice();
    result.error_code = error_code;
    result.error_len = error_bytes.len();
    result.error_message = Box::into_raw(error_bytes) as *mut u8;
}

fn set_success_result(result: &mut ContentResult, output: RenderOutput) {
    result.html_len = output.html.len();
    result.html = Box::into_raw(output.html) as *mut u8;
    result.plain_text_len = output.plain_text.len();
    result.plain_text = Box::into_raw(output.plain_text) as *mut u8;
    result.word_count = u32::try_from(output.metrics.words).unwrap_or(u32::MAX);
    result.reading_time = output.metrics.reading_time;
    result.error_code = ERROR_SUCCESS;
    result.error_message = ptr::null_mut();
    result.error_len = 0;

    if let Some(etag_bytes) = output.etag {
        result.etag_len = etag_bytes.len();
        result.etag = Box::into_raw(etag_bytes) as *mut u8;
    } else {
        result.etag = ptr::null_mut();
        result.etag_len = 0;
    }
}

fn required_ref<'a, T>(ptr: *const T, name: &str) -> Result<&'a T, ContentError> {
    if ptr.is_null() {
        return Err(ContentError::InvalidInput(format!("{name} pointer is NULL")));
    }

    // SAFETY: non-NULL; the caller guarantees it points to a live value.
    Ok(unsafe { &*ptr })
}

fn required_bytes<'a>(ptr: *const u8, len: usize, name: &str) -> Result<&'a [u8], ContentError> {
    if len == 0 {
        return Ok(&[]);
    }

    if ptr.is_null() {
        return Err(ContentError::InvalidInput(format!(
            "{name}_len > 0 with NULL {name} pointer"
        )));
    }

    // SAFETY: non-NULL; the caller guarantees `len` readable bytes.
    Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

fn render_inner(
    handle: &ContentPipelineHandle,
    json: &[u8],
    options: &ContentOptions,
) -> Result<RenderOutput, ContentError> {
    let json = std::str::from_utf8(json)
        .map_err(|e| ContentError::Encoding(format!("document is not valid UTF-8: {e}")))?;

    let document = if json.trim().is_empty() {
        EditorDocument::new()
    } else {
        EditorDocument::from_json(json)?
    };
    let document = if options.sanitize != 0 {
        handle.converter.sanitize(&document)
    } else {
        document
    };

    let estimator = match options.words_per_minute {
        0 => ReadingTimeEstimator::new(),
        wpm => ReadingTimeEstimator::with_words_per_minute(wpm),
    };

    let html = handle.converter.to_html(&document);
    let plain_text = handle.converter.extract_plain_text(&document);
    let metrics = DocumentMetrics::from_plain_text(&plain_text, &estimator);

    let etag = (options.generate_etag != 0).then(|| {
        handle
            .etag_generator
            .generate(html.as_bytes())
            .into_bytes()
            .into_boxed_slice()
    });

    Ok(RenderOutput {
        html: html.into_bytes().into_boxed_slice(),
        plain_text: plain_text.into_bytes().into_boxed_slice(),
        metrics,
        etag,
    })
}

fn free_buffer(ptr_field: &mut *mut u8, len_field: &mut usize) {
    if (*ptr_field).is_null() {
        return;
    }

    let raw = ptr::slice_from_raw_parts_mut(*ptr_field, *len_field);
    // SAFETY: every non-NULL buffer in a result came from Box<[u8]>::into_raw
    // with exactly this length.
    let _ = unsafe { Box::from_raw(raw) };
    *ptr_field = ptr::null_mut();
    *len_field = 0;
}

/// Create a pipeline handle
///
/// Returns NULL if construction panicked. Release with
/// [`content_pipeline_free`].
#[unsafe(no_mangle)]
pub extern "C" fn content_pipeline_new() -> *mut ContentPipelineHandle {
    let result = panic::catch_unwind(|| {
        let handle = ContentPipelineHandle {
            converter: BlockConverter::new(),
            etag_generator: ETagGenerator::new(),
        };
        Box::into_raw(Box::new(handle))
    });

    result.unwrap_or(ptr::null_mut())
}

/// Render a JSON block document to HTML
///
/// Empty input renders an empty document. Malformed JSON fails with
/// [`ERROR_SERIALIZATION`], non-UTF-8 input with [`ERROR_ENCODING`].
///
/// # Safety
///
/// - `handle` must come from [`content_pipeline_new`] and not be freed
/// - `json` must point to `json_len` readable bytes (may be NULL when
///   `json_len` is 0)
/// - `options` must point to a valid [`ContentOptions`]
/// - `result` must point to writable memory for a [`ContentResult`]; any
///   buffers it already holds are overwritten, not freed
#[unsafe(no_mangle)]
pub unsafe extern "C" fn content_render(
    handle: *mut ContentPipelineHandle,
    json: *const u8,
    json_len: usize,
    options: *const ContentOptions,
    result: *mut ContentResult,
) {
    if result.is_null() {
        return;
    }

    // SAFETY: non-NULL; the caller guarantees it is writable.
    let result_ref = unsafe { &mut *result };
    reset_result(result_ref);

    let panic_result = panic::catch_unwind(|| -> Result<RenderOutput, ContentError> {
        let handle_ref = required_ref(handle.cast_const(), "Pipeline handle")?;
        let options_ref = required_ref(options, "Options")?;
        let json_slice = required_bytes(json, json_len, "json")?;
        render_inner(handle_ref, json_slice, options_ref)
    });

    match panic_result {
        Ok(Ok(output)) => set_success_result(result_ref, output),
        Ok(Err(e)) => set_error_result(result_ref, e.code(), e.to_string()),
        Err(_) => set_error_result(
            result_ref,
            ERROR_INTERNAL,
            "Internal panic during rendering".to_string(),
        ),
    }
}

/// Release every buffer held by a result
///
/// Safe to call twice; the second call finds only NULL pointers.
///
/// # Safety
///
/// `result` must be NULL or point to a [`ContentResult`] filled by
/// [`content_render`] (or zeroed).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn content_result_free(result: *mut ContentResult) {
    if result.is_null() {
        return;
    }

    // SAFETY: non-NULL; the caller guarantees it is a valid result.
    let result_ref = unsafe { &mut *result };
    free_buffer(&mut result_ref.html, &mut result_ref.html_len);
    free_buffer(&mut result_ref.plain_text, &mut result_ref.plain_text_len);
    free_buffer(&mut result_ref.etag, &mut result_ref.etag_len);
    free_buffer(&mut result_ref.error_message, &mut result_ref.error_len);
    result_ref.word_count = 0;
    result_ref.reading_time = 0;
    result_ref.error_code = ERROR_SUCCESS;
}

/// Release a pipeline handle
///
/// # Safety
///
/// `handle` must be NULL or come from [`content_pipeline_new`], and must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn content_pipeline_free(handle: *mut ContentPipelineHandle) {
    if handle.is_null() {
        return;
    }

    // SAFETY: the handle came from Box::into_raw in content_pipeline_new.
    unsafe { drop(Box::from_raw(handle)) };
}
