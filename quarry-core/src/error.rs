//! Error types for Quarry

use thiserror::Error;

/// Errors a builder captures while it is being configured.
///
/// These are held inside the builder and only handed to the caller by a
/// terminal call (`to_sql`, `exec`, `query_to`, ...), so they must be
/// cloneable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Required statement parts are missing or inconsistent
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// A record could not be mapped to columns and values
    #[error("Mapping error: {message}")]
    Mapping { message: String },

    /// A condition is malformed
    #[error("Composition error: {message}")]
    Composition { message: String },
}

impl BuildError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Create a new composition error
    pub fn composition(message: impl Into<String>) -> Self {
        Self::Composition {
            message: message.into(),
        }
    }
}

/// The main error type for Quarry operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error captured by a builder before generation
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Execution error reported by a non-sqlx executor
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A connection with this name is already registered
    #[error("Connection '{name}' is already registered")]
    DuplicateConnection { name: String },

    /// No connection with this name is registered
    #[error("Connection '{name}' is not registered")]
    UnknownConnection { name: String },
}

/// Convenience Result type for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Build(BuildError::configuration(message))
    }

    /// Create a new mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Build(BuildError::mapping(message))
    }

    /// Create a new execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a new duplicate connection error
    pub fn duplicate_connection(name: impl Into<String>) -> Self {
        Self::DuplicateConnection { name: name.into() }
    }

    /// Create a new unknown connection error
    pub fn unknown_connection(name: impl Into<String>) -> Self {
        Self::UnknownConnection { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let err = Error::configuration("no table specified");
        assert!(matches!(
            err,
            Error::Build(BuildError::Configuration { .. })
        ));
        assert_eq!(err.to_string(), "Invalid configuration: no table specified");
    }

    #[test]
    fn test_mapping_error() {
        let err = BuildError::mapping("column 'x' not found in record");
        assert_eq!(
            err.to_string(),
            "Mapping error: column 'x' not found in record"
        );
    }

    #[test]
    fn test_composition_error_is_transparent() {
        let err: Error = BuildError::composition("IN requires at least one value").into();
        assert_eq!(
            err.to_string(),
            "Composition error: IN requires at least one value"
        );
    }

    #[test]
    fn test_duplicate_connection_error() {
        let err = Error::duplicate_connection("main");
        assert!(matches!(err, Error::DuplicateConnection { .. }));
        assert_eq!(err.to_string(), "Connection 'main' is already registered");
    }

    #[test]
    fn test_unknown_connection_error() {
        let err = Error::unknown_connection("replica");
        assert_eq!(err.to_string(), "Connection 'replica' is not registered");
    }
}
