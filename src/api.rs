//! REST error taxonomy and response envelopes
//!
//! The backend reports failures in two JSON shapes:
//!
//! - validation errors: `{"detail": [{"loc": ["body", "email"], "msg": "..."}]}`
//! - business errors: `{"detail": "Email already registered"}`
//!
//! Anything else is classified by status code alone. Transport failures
//! (no response at all) are [`ApiError::Network`]. Nothing here retries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One entry of a validation error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Location path, e.g. `["body", "email"]`
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
}

impl FieldError {
    pub fn new(field: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec![Value::from("body"), Value::from(field)],
            msg: msg.into(),
        }
    }

    /// Dotted field path without the leading request section
    ///
    /// ```rust
    /// use content_pipeline::api::FieldError;
    ///
    /// assert_eq!(FieldError::new("email", "invalid").field(), "email");
    /// ```
    pub fn field(&self) -> String {
        self.loc
            .iter()
            .enumerate()
            .filter(|(idx, part)| {
                !(*idx == 0 && matches!(part.as_str(), Some("body" | "query" | "path")))
            })
            .map(|(_, part)| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn describe_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| {
            let field = error.field();
            if field.is_empty() {
                error.msg.clone()
            } else {
                format!("{field}: {}", error.msg)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of a REST call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never got a response
    #[error("Network error: {0}")]
    Network(String),
    /// The request was rejected field by field
    #[error("Validation failed: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),
    /// The request was understood but refused
    #[error("{0}")]
    Business(String),
    /// Error status without a recognizable body
    #[error("Request failed with status {0}")]
    Status(u16),
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

impl ApiError {
    /// Classify an error response
    ///
    /// ```rust
    /// use content_pipeline::api::ApiError;
    ///
    /// let err = ApiError::from_response(400, r#"{"detail":"Email already registered"}"#);
    /// assert_eq!(err, ApiError::Business("Email already registered".to_string()));
    /// assert_eq!(ApiError::from_response(502, "<html>Bad gateway</html>"), ApiError::Status(502));
    /// ```
    pub fn from_response(status: u16, body: &str) -> Self {
        let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
            return ApiError::Status(status);
        };

        match parsed.detail {
            Value::String(detail) if !detail.trim().is_empty() => ApiError::Business(detail),
            Value::Array(entries) => {
                let errors: Vec<FieldError> = entries
                    .into_iter()
                    .filter_map(|entry| serde_json::from_value(entry).ok())
                    .collect();
                if errors.is_empty() {
                    ApiError::Status(status)
                } else {
                    ApiError::Validation(errors)
                }
            }
            _ => ApiError::Status(status),
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Validation(errors) => describe_fields(errors),
            ApiError::Business(detail) => friendly_detail(detail),
            ApiError::Status(401) => "Your session has expired. Please sign in again.".to_string(),
            ApiError::Status(403) => {
                "You do not have permission to perform this action.".to_string()
            }
            ApiError::Status(404) => "The requested item could not be found.".to_string(),
            ApiError::Status(413) => "The file is too large to upload.".to_string(),
            ApiError::Status(code) if *code >= 500 => {
                "The server encountered an error. Please try again later.".to_string()
            }
            ApiError::Status(code) => format!("Request failed with status {code}"),
        }
    }
}

fn friendly_detail(detail: &str) -> String {
    let lowered = detail.to_lowercase();
    if lowered.contains("already registered") {
        "An account with this email already exists.".to_string()
    } else if lowered.contains("incorrect email or password") {
        "The email or password you entered is incorrect.".to_string()
    } else if lowered.contains("not found") {
        "The requested item could not be found.".to_string()
    } else {
        detail.to_string()
    }
}

/// Paginated list envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    pub size: usize,
    pub pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Slice one page out of a full result list
    ///
    /// `page` is 1-based; page 0 is treated as page 1 and a size of 0 as 1.
    ///
    /// ```rust
    /// use content_pipeline::api::Page;
    ///
    /// let page = Page::paginate((1..=25).collect::<Vec<_>>(), 3, 10);
    /// assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    /// assert_eq!(page.pages, 3);
    /// assert!(page.has_prev && !page.has_next);
    /// ```
    pub fn paginate(items: Vec<T>, page: usize, size: usize) -> Self {
        let page = page.max(1);
        let size = size.max(1);
        let total = items.len();
        let pages = total.div_ceil(size);

        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(size))
            .take(size)
            .collect();

        Self {
            items,
            total,
            page,
            size,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

/// Successful media upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Interpret the response of an image upload
///
/// Success is a 2xx status with a JSON body carrying a non-blank `url`.
pub fn parse_upload_response(status: u16, body: &str) -> Result<UploadedImage, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::from_response(status, body));
    }

    let uploaded: UploadedImage = serde_json::from_str(body)
        .map_err(|e| ApiError::Business(format!("Malformed upload response: {e}")))?;

    if uploaded.url.trim().is_empty() {
        return Err(ApiError::Business(
            "Upload response did not include a URL".to_string(),
        ));
    }

    Ok(uploaded)
}
