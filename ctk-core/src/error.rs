//! Error types for the CrateDB toolkit

use thiserror::Error;

/// Core error type for toolkit operations
#[derive(Error, Debug)]
pub enum CtkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed database, table, or resource address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource type or operation is not supported
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Errors raised while reading from a data source
    #[error("Source error: {0}")]
    Source(String),

    /// Error reported by the database server
    #[error("Database error {code}: {message}")]
    Database { code: i64, message: String },

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A multi-step operation did not complete successfully
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Table not found on the source or target side
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for toolkit operations
pub type Result<T> = std::result::Result<T, CtkError>;

impl From<serde_json::Error> for CtkError {
    fn from(err: serde_json::Error) -> Self {
        CtkError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for CtkError {
    fn from(err: url::ParseError) -> Self {
        CtkError::InvalidAddress(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let ctk_err: CtkError = json_err.into();

        match ctk_err {
            CtkError::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let ctk_err: CtkError = io_err.into();

        match ctk_err {
            CtkError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_url_error_conversion() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let ctk_err: CtkError = url_err.into();
        assert!(matches!(ctk_err, CtkError::InvalidAddress(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CtkError::Config("test config error".to_string());
        assert_eq!(format!("{}", err), "Configuration error: test config error");

        let err = CtkError::Database {
            code: 4043,
            message: "Relation 'doc.foo' unknown".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Database error 4043: Relation 'doc.foo' unknown"
        );

        let err = CtkError::OperationFailed("Data loading failed".to_string());
        assert_eq!(format!("{}", err), "Operation failed: Data loading failed");

        let err = CtkError::NotImplemented("Importing resource not implemented yet".to_string());
        assert_eq!(
            format!("{}", err),
            "Not implemented: Importing resource not implemented yet"
        );
    }
}
