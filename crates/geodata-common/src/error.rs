//! Error types shared by the geodata crates

use thiserror::Error;

/// Result type alias for geodata operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors raised outside the import pipeline itself (configuration, bootstrap)
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GeoError {
    /// Configuration error for a single offending setting
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Parse error for a setting that could not be interpreted
    pub fn invalid_value(name: &str, value: &str) -> Self {
        Self::Parse(format!("{} has an invalid value: '{}'", name, value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = GeoError::invalid_value("GEODATA_HTTP_TIMEOUT", "soon");
        assert_eq!(
            err.to_string(),
            "Parse error: GEODATA_HTTP_TIMEOUT has an invalid value: 'soon'"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GeoError = io.into();
        assert!(matches!(err, GeoError::Io(_)));
    }
}
