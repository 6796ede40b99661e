//! Error types for the prediction service.
//!
//! Artifact errors are fatal at startup. Payload, schema and prediction
//! errors reject a single request and leave the service untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for serving operations.
pub type ServingResult<T> = Result<T, ServingError>;

/// Errors raised while loading an artifact or answering a request.
#[derive(Debug, Error)]
pub enum ServingError {
    /// The artifact path does not resolve to a readable file.
    #[error("Model artifact not found at {path}: {reason}")]
    ArtifactNotFound { path: PathBuf, reason: String },

    /// The artifact could not be decoded or failed structural validation.
    #[error("Model artifact is corrupt: {0}")]
    ArtifactCorrupt(String),

    /// The request payload is not a single JSON object.
    #[error("Malformed payload: {0}")]
    PayloadMalformed(String),

    /// The record does not conform to the feature schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The predictor rejected the record or produced an unusable result.
    #[error("Prediction failed: {0}")]
    PredictionError(String),
}

impl ServingError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::ArtifactCorrupt(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::PayloadMalformed(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::PredictionError(msg.into())
    }

    /// Whether the error aborts process initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServingError::ArtifactNotFound { .. } | ServingError::ArtifactCorrupt(_)
        )
    }
}

impl From<bincode::Error> for ServingError {
    fn from(error: bincode::Error) -> Self {
        ServingError::ArtifactCorrupt(format!("failed to decode artifact: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let not_found = ServingError::ArtifactNotFound {
            path: PathBuf::from("/nope.lsfa"),
            reason: "No such file or directory".to_string(),
        };
        assert!(not_found.is_fatal());
        assert!(ServingError::corrupt("bad magic").is_fatal());
        assert!(!ServingError::malformed("eof").is_fatal());
        assert!(!ServingError::schema("missing").is_fatal());
        assert!(!ServingError::prediction("nan").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let error = ServingError::schema("missing required field `Seville_pressure`");
        assert_eq!(
            error.to_string(),
            "Schema mismatch: missing required field `Seville_pressure`"
        );
    }
}
