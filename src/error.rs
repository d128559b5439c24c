//! Error types for ddl-registry
//!
//! The DDL extractor itself never fails; these errors cover the I/O, storage
//! and serialization layers wrapped around it.

use thiserror::Error;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Input rejected before extraction (size budget, unreadable source)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Registry build errors
    #[error("Registry error: {0}")]
    Registry(String),

    /// Enrichment errors
    #[error("Enrichment error: {0}")]
    Enrichment(String),

    /// Database/storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage did not produce what the next stage needs
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// A required artifact is absent
    #[error("File not found: {0}")]
    MissingFile(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(String),
}

impl RegistryError {
    /// Process exit code reported by the CLI when this error ends a pipeline run
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::Config(_) => 2,
            RegistryError::Extraction(_) => 3,
            RegistryError::Registry(_) | RegistryError::Storage(_) | RegistryError::Database(_) => 4,
            RegistryError::Enrichment(_) => 5,
            RegistryError::MissingFile(_) | RegistryError::Pipeline(_) => 1,
            RegistryError::Io(_) | RegistryError::Json(_) | RegistryError::Generic(_) => 1,
        }
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl From<anyhow::Error> for RegistryError {
    fn from(err: anyhow::Error) -> Self {
        RegistryError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RegistryError::Extraction("input too large".to_string());
        assert_eq!(error.to_string(), "Extraction error: input too large");
    }

    #[test]
    fn test_error_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let registry_error = RegistryError::from(io_error);

        match registry_error {
            RegistryError::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_exit_codes_are_nonzero() {
        let errors = [
            RegistryError::Config("x".into()),
            RegistryError::MissingFile("registry.db".into()),
            RegistryError::Enrichment("x".into()),
        ];
        for error in errors {
            assert_ne!(error.exit_code(), 0);
        }
    }
}
