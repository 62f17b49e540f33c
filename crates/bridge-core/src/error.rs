//! Error types for the bridge facade

use bridge_rewrite::ConfigurationError;
use std::path::PathBuf;

/// Top-level bridge error
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration could not be parsed
    #[error("invalid bridge configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Logging could not be initialized
    #[error("logging initialization failed: {0}")]
    Logging(String),

    /// Legacy metadata rejected while processing a type
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_meta::ClassName;

    #[test]
    fn configuration_errors_pass_through_unchanged() {
        let err = BridgeError::from(ConfigurationError::UnknownInterceptor {
            intercepted: ClassName::new("demo.Service"),
            interceptor: ClassName::new("demo.Missing"),
        });
        assert_eq!(
            err.to_string(),
            "interceptor demo.Missing declared on demo.Service is not a known type"
        );
    }
}
