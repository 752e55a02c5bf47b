//! Error types for vector_mcl

use thiserror::Error;

/// Main error type for the localization core
#[derive(Debug, Error)]
pub enum LocalizationError {
    /// Invalid configuration parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Laser scan violates the input contract
    #[error("Invalid scan: {0}")]
    InvalidScan(String),
    /// The filter has no map or no population yet
    #[error("Filter is not initialized")]
    NotInitialized,
    /// Importance weights could not be normalized
    #[error("Weight normalization failed: {0}")]
    WeightNormalization(String),
    /// Malformed line in a map file
    #[error("Map parse error at line {line}: {message}")]
    MapParse { line: usize, message: String },
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be deserialized
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type alias for localization operations
pub type LocalizationResult<T> = Result<T, LocalizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LocalizationError::InvalidScan("empty ranges".to_string());
        assert_eq!(format!("{}", err), "Invalid scan: empty ranges");

        let err = LocalizationError::MapParse { line: 3, message: "expected 4 fields".to_string() };
        assert_eq!(format!("{}", err), "Map parse error at line 3: expected 4 fields");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LocalizationError = io_err.into();
        assert!(matches!(err, LocalizationError::Io(_)));
    }
}
