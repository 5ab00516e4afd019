#![forbid(unsafe_code)]

//! Dispatcher configuration.
//!
//! Defaults describe an unbounded dispatcher with listener panic isolation
//! on. With the `config` feature the same struct loads from TOML or JSON:
//!
//! ```toml
//! history_limit = 100
//! ledger_limit = 1000
//! isolate_listener_panics = true
//! ```
//!
//! ```rust,ignore
//! let config = DispatcherConfig::from_toml_file("cmdx.toml")?;
//! let dispatcher = Dispatcher::with_config(config);
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DispatcherConfig {
    /// Maximum history entries kept (0 = unlimited). Oldest entries go first.
    pub history_limit: usize,

    /// Maximum ledger entries kept (0 = unlimited). Oldest entries go first.
    pub ledger_limit: usize,

    /// Catch listener panics instead of unwinding into the caller.
    pub isolate_listener_panics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            history_limit: 0,
            ledger_limit: 0,
            isolate_listener_panics: true,
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_ledger_limit(mut self, limit: usize) -> Self {
        self.ledger_limit = limit;
        self
    }

    #[must_use]
    pub fn with_listener_panic_isolation(mut self, isolate: bool) -> Self {
        self.isolate_listener_panics = isolate;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.checked()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.checked()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check the settings for combinations that cannot work.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        // A bounded ledger must still cover every step the history can replay.
        if self.ledger_limit > 0 && (self.history_limit == 0 || self.ledger_limit < self.history_limit) {
            let history = if self.history_limit == 0 {
                "unlimited".to_string()
            } else {
                self.history_limit.to_string()
            };
            errors.push(format!(
                "ledger_limit ({}) must be >= history_limit ({history})",
                self.ledger_limit
            ));
        }
        errors
    }

    #[cfg(feature = "config")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a dispatcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error.
    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
