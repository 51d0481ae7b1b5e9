//! Named options consumed at construction.
//!
//! A config file is TOML with optional `[service]` and `[checker]` tables:
//!
//! ```toml
//! [service]
//! sketch_name = "Bounce"
//!
//! [checker]
//! debounce_millis = 400
//! warnings_enabled = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Quiet period before the checker publishes problems.
pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 650;

/// How long `when_done_blocking` waits unless told otherwise.
pub const DEFAULT_BLOCKING_TIMEOUT_MILLIS: u64 = 3000;

pub const DEFAULT_SKETCH_NAME: &str = "sketch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    pub debounce_millis: u64,
    pub warnings_enabled: bool,
    pub import_suggest_enabled: bool,
    /// When off the checker detaches from the service and shows nothing
    pub error_check_enabled: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            debounce_millis: DEFAULT_DEBOUNCE_MILLIS,
            warnings_enabled: false,
            import_suggest_enabled: true,
            error_check_enabled: true,
        }
    }
}

impl CheckerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name of the generated top-level class
    pub sketch_name: String,
    pub blocking_timeout_millis: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sketch_name: DEFAULT_SKETCH_NAME.to_string(),
            blocking_timeout_millis: DEFAULT_BLOCKING_TIMEOUT_MILLIS,
        }
    }
}

impl ServiceConfig {
    pub fn with_sketch_name(mut self, name: impl Into<String>) -> Self {
        self.sketch_name = name.into();
        self
    }

    pub fn blocking_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_timeout_millis)
    }

    /// `sketch_name` made safe to use as a Java class name.
    pub fn class_name(&self) -> String {
        let mut name: String = self
            .sketch_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        if name.is_empty() {
            name.push_str(DEFAULT_SKETCH_NAME);
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        name
    }
}

/// Both tables of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub service: ServiceConfig,
    pub checker: CheckerConfig,
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(650));
        assert!(!config.warnings_enabled);
        assert!(config.import_suggest_enabled);
        assert!(config.error_check_enabled);
    }

    #[test]
    fn test_partial_checker_config() {
        let config = CheckerConfig::from_toml_str("warnings_enabled = true\n").unwrap();
        assert!(config.warnings_enabled);
        assert_eq!(config.debounce_millis, DEFAULT_DEBOUNCE_MILLIS);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = CheckerConfig::from_toml_str("debounce = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_session_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sketchsync.toml");
        std::fs::write(
            &path,
            "[service]\nsketch_name = \"Bounce\"\n\n[checker]\ndebounce_millis = 10\n",
        )
        .unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.service.sketch_name, "Bounce");
        assert_eq!(config.checker.debounce_millis, 10);
        assert_eq!(config.service.blocking_timeout_millis, DEFAULT_BLOCKING_TIMEOUT_MILLIS);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_class_name_sanitized() {
        let config = ServiceConfig::default().with_sketch_name("2d bounce");
        assert_eq!(config.class_name(), "_2d_bounce");
        assert_eq!(ServiceConfig::default().class_name(), "sketch");
    }
}
