//! Bridge configuration
//!
//! Loaded from TOML. Every key is optional and unknown keys are rejected:
//!
//! ```toml
//! [extension]
//! promote_session_components = true
//! rewrite_interceptor_types = true
//!
//! [dispatch]
//! transactions = true
//!
//! [logging]
//! filter = "info,bridge_dispatch=debug"
//! json = false
//! ```

use crate::error::{BridgeError, Result};
use bridge_rewrite::HookOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Load-time rewriting
    pub extension: ExtensionConfig,
    /// Call-time dispatch
    pub dispatch: DispatchConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Load-time hook switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Session components gain `Transactional` and `RequestScoped`
    pub promote_session_components: bool,
    /// Rewrite injection points of modern interceptor types
    pub rewrite_interceptor_types: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            promote_session_components: true,
            rewrite_interceptor_types: true,
        }
    }
}

impl From<ExtensionConfig> for HookOptions {
    fn from(config: ExtensionConfig) -> Self {
        Self {
            promote_session_components: config.promote_session_components,
            rewrite_interceptor_types: config.rewrite_interceptor_types,
        }
    }
}

/// Call-time switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Wrap transactional calls in a unit of work
    pub transactions: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { transactions: true }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl BridgeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns `BridgeError::Config` on malformed TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file
    ///
    /// # Errors
    /// - `BridgeError::Io` if the file cannot be read
    /// - `BridgeError::Config` if its contents are invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded bridge configuration");
        Ok(config)
    }

    /// With session component promotion
    #[inline]
    #[must_use]
    pub fn with_promote_session_components(mut self, enabled: bool) -> Self {
        self.extension.promote_session_components = enabled;
        self
    }

    /// With interceptor type rewriting
    #[inline]
    #[must_use]
    pub fn with_rewrite_interceptor_types(mut self, enabled: bool) -> Self {
        self.extension.rewrite_interceptor_types = enabled;
        self
    }

    /// With unit-of-work wrapping
    #[inline]
    #[must_use]
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.dispatch.transactions = enabled;
        self
    }

    /// With log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.logging.filter = filter.into();
        self
    }

    /// With JSON log output
    #[inline]
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.logging.json = json;
        self
    }

    /// Hook pipeline options derived from the extension section
    #[inline]
    #[must_use]
    pub fn hook_options(&self) -> HookOptions {
        self.extension.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(BridgeConfig::from_toml_str("").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [dispatch]
            transactions = false

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert!(!config.dispatch.transactions);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.extension, ExtensionConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = BridgeConfig::from_toml_str("[dispatch]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn builders_map_onto_hook_options() {
        let config = BridgeConfig::new()
            .with_promote_session_components(false)
            .with_rewrite_interceptor_types(false);
        assert_eq!(
            config.hook_options(),
            HookOptions {
                promote_session_components: false,
                rewrite_interceptor_types: false,
            }
        );
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = BridgeConfig::new()
            .with_transactions(false)
            .with_log_filter("debug")
            .with_json_logs(true);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(BridgeConfig::from_toml_str(&text).unwrap(), config);
    }
}
