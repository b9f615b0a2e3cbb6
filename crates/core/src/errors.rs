use std::str::Utf8Error;

use thiserror::Error;

/// Failures raised by canvas mutations.
///
/// Read-only queries never produce these; unknown filenames and unknown
/// revision numbers resolve to empty strings or empty collections so that
/// probing callers need no error handling.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("file not found in canvas: `{filename}`")]
    FileNotFound { filename: String },
    #[error("invalid patch format: {0}")]
    InvalidPatchFormat(String),
    #[error("content is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] Utf8Error),
}

impl CanvasError {
    pub fn file_not_found(filename: impl Into<String>) -> Self {
        Self::FileNotFound { filename: filename.into() }
    }

    pub fn invalid_patch(message: impl Into<String>) -> Self {
        Self::InvalidPatchFormat(message.into())
    }
}
