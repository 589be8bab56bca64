//! File loading for the CLI.
//!
//! Schemas and the form data resolved or validated against them arrive
//! through the same path: both are plain JSON documents, so loading only
//! distinguishes missing files, unreadable files, and unparsable content.

use std::path::Path;

use serde_json::Value;

use crate::error::ResolveError;

/// Load a schema or form-data document from a file.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist,
/// `ResolveError::ReadError` if it can't be read, or
/// `ResolveError::InvalidJson` if the contents don't parse.
pub fn load_document(path: &Path) -> Result<Value, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    load_document_str(&content)
}

/// Parse a schema or form-data document from a string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })
}
