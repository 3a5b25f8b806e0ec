//! Error types for the Synapse visualization engine and server.

use thiserror::Error;

/// A specialized `Result` type for visualization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `synapse_viz` crate.
///
/// Degenerate geometry (no layers, empty layers) is never an error: the engine
/// renders an empty scene instead. Errors are reserved for I/O, parsing and the
/// outer server surface.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to the web server (e.g., binding to a port).
    #[error("Server error: {0}")]
    Server(String),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML configuration document could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An error related to the engine or server configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The vector scene could not be rasterized or encoded.
    #[error("Render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (Error::Server("bind failed".into()), "Server error: bind failed"),
            (Error::NotFound("layer".into()), "Not found: layer"),
            (Error::Config("invalid port".into()), "Configuration error: invalid port"),
            (Error::Render("empty pixmap".into()), "Render error: empty pixmap"),
        ];

        for (error, expected) in errors {
            assert_eq!(format!("{}", error), expected);
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let error: Error = io_err.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(format!("{}", error).contains("IO error"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let error: Error = json_result.unwrap_err().into();
        assert!(matches!(error, Error::Serialization(_)));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_result: std::result::Result<toml::Table, _> = toml::from_str("= broken");
        let error: Error = toml_result.unwrap_err().into();
        assert!(matches!(error, Error::Toml(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(Error::NotFound("test".into()))
        }
        assert!(returns_error().is_err());
    }
}
