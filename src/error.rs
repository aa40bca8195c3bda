//! Error types for content pipeline operations

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur while converting, storing or rendering content
#[derive(Debug, Error)]
pub enum ContentError {
    /// HTML or document parsing failed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Character encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Conversion timeout exceeded
    #[error("Conversion timeout exceeded")]
    Timeout,
    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    /// No stored document with this id
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Conditional write rejected because the collection changed
    #[error("Document collection changed (expected {expected}, found {actual})")]
    Conflict { expected: String, actual: String },
    /// Imported file could not be used
    #[error("Import failed: {0}")]
    Import(String),
    /// Media upload failed
    #[error("Upload failed: {0}")]
    Upload(#[from] ApiError),
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContentError {
    /// Get numeric error code for FFI
    pub fn code(&self) -> u32 {
        match self {
            ContentError::Parse(_) => 1,
            ContentError::Encoding(_) => 2,
            ContentError::Timeout => 3,
            ContentError::InvalidInput(_) => 5,
            ContentError::Serialization(_) => 6,
            ContentError::Storage(_) => 7,
            ContentError::NotFound(_) => 8,
            ContentError::Conflict { .. } => 9,
            ContentError::Import(_) => 10,
            ContentError::Upload(_) => 11,
            ContentError::Config(_) => 12,
            ContentError::Internal(_) => 99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ContentError::Parse(String::new()),
            ContentError::Encoding(String::new()),
            ContentError::Timeout,
            ContentError::InvalidInput(String::new()),
            ContentError::Storage(std::io::Error::other("disk")),
            ContentError::NotFound(String::new()),
            ContentError::Conflict {
                expected: String::new(),
                actual: String::new(),
            },
            ContentError::Import(String::new()),
            ContentError::Upload(ApiError::Network("offline".to_string())),
            ContentError::Config(String::new()),
            ContentError::Internal(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(ContentError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ContentError::Timeout.to_string(),
            "Conversion timeout exceeded"
        );
        assert_eq!(
            ContentError::NotFound("abc".to_string()).to_string(),
            "Document not found: abc"
        );
    }
}
