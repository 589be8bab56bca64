//! Error types for schema resolution and form state recomputation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during schema resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("could not resolve reference \"{pointer}\"")]
    UnresolvedReference { pointer: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::FileNotFound {
            path: PathBuf::from("form.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::UnresolvedReference {
            pointer: "#/definitions/missing".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ResolveError::InvalidSchema {
            message: "oneOf must be an array".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unresolved_reference_display() {
        let err = ResolveError::UnresolvedReference {
            pointer: "#/definitions/address".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not resolve reference \"#/definitions/address\""
        );
    }
}
