//! Configuration structures for the partialgen generators
//!
//! This module provides the options that control text emission, which
//! drivers run, how analysis is scheduled and where the debug log goes. The
//! configuration is usually read from a `partialgen.toml` file.

use partialgen_core::error::PartialGenError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Conflicting settings: {0}")]
    ConflictingSettings(String),
}

impl ConfigError {
    fn invalid<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for PartialGenError {
    fn from(error: ConfigError) -> Self {
        match &error {
            ConfigError::InvalidValue { field, .. } => {
                PartialGenError::configuration_with_field(error.to_string(), field.clone())
            }
            _ => PartialGenError::configuration(error.to_string()),
        }
    }
}

/// Top-level generator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Text emission options shared by every driver
    pub emit: EmitOptions,

    /// Which generation drivers run
    pub drivers: DriverSettings,

    /// Analyzer scheduling
    pub analysis: AnalysisSettings,

    /// Development-time pipeline log
    pub debug_log: DebugLogSettings,
}

impl GeneratorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file {:?}: {}", path.as_ref(), e)))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.emit.validate()?;
        self.analysis.validate()?;
        self.debug_log.validate()?;

        if !self.drivers.any_enabled() {
            log::warn!("All generation drivers are disabled; only analyzers will run");
        }

        Ok(())
    }
}

/// Options that shape emitted text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Spaces per indentation level
    pub indent_width: usize,

    /// Extension of generated files, without the dot
    pub file_extension: String,

    /// Tool name written into the provenance header
    pub tool_name: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            file_extension: "cs".to_string(),
            tool_name: "partialgen".to_string(),
        }
    }
}

impl EmitOptions {
    /// Validate emission options
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indent_width == 0 || self.indent_width > 16 {
            return Err(ConfigError::invalid(
                "emit.indent_width",
                format!("must be between 1 and 16, got {}", self.indent_width),
            ));
        }

        if self.file_extension.is_empty() || !self.file_extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::invalid(
                "emit.file_extension",
                format!("must be a non-empty alphanumeric extension, got '{}'", self.file_extension),
            ));
        }

        if self.tool_name.trim().is_empty() || self.tool_name.contains(|c| c == '\n' || c == '\r') {
            return Err(ConfigError::invalid("emit.tool_name", "must be a non-empty single line"));
        }

        Ok(())
    }
}

/// Enable flags for the generation drivers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub asset_loader: bool,
    pub subscriptions: bool,
    pub input_callbacks: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            asset_loader: true,
            subscriptions: true,
            input_callbacks: true,
        }
    }
}

impl DriverSettings {
    pub fn any_enabled(&self) -> bool {
        self.asset_loader || self.subscriptions || self.input_callbacks
    }
}

/// Analyzer scheduling settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Analyze declarations on scoped worker threads
    pub parallel: bool,

    /// Upper bound on worker threads, defaults to the available parallelism
    pub max_threads: Option<usize>,
}

impl AnalysisSettings {
    /// Validate analysis settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.max_threads {
            if threads == 0 {
                return Err(ConfigError::invalid("analysis.max_threads", "must be greater than 0"));
            }
            if threads > 64 {
                return Err(ConfigError::invalid("analysis.max_threads", "should not exceed 64"));
            }
            if !self.parallel {
                return Err(ConfigError::ConflictingSettings(
                    "analysis.max_threads is set but analysis.parallel is false".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Number of worker threads to use for a parallel run
    pub fn worker_threads(&self) -> usize {
        self.max_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Debug log sink settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugLogSettings {
    /// Only honoured in builds with debug assertions
    pub enabled: bool,

    /// Overrides the default per-user log location
    pub path: Option<PathBuf>,
}

impl DebugLogSettings {
    /// Validate debug log settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid("debug_log.path", "cannot be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.emit.indent_width, 4);
        assert!(config.drivers.any_enabled());
        assert!(!config.debug_log.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GeneratorConfig::from_str(
            r#"
            [emit]
            indent_width = 2

            [drivers]
            input_callbacks = false
            "#,
        )
        .unwrap();

        assert_eq!(config.emit.indent_width, 2);
        assert_eq!(config.emit.file_extension, "cs");
        assert!(config.drivers.asset_loader);
        assert!(!config.drivers.input_callbacks);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = GeneratorConfig::default();
        config.analysis.parallel = true;
        config.analysis.max_threads = Some(4);
        config.debug_log.path = Some(PathBuf::from("/tmp/partialgen.log"));

        let text = config.to_toml_string().unwrap();
        let parsed = GeneratorConfig::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            GeneratorConfig::from_str("[emit]\nindent_width = 0"),
            Err(ConfigError::InvalidValue { field, .. }) if field == "emit.indent_width"
        ));
        assert!(matches!(
            GeneratorConfig::from_str("[emit]\nfile_extension = \".cs\""),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            GeneratorConfig::from_str("[analysis]\nmax_threads = 2"),
            Err(ConfigError::ConflictingSettings(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_str("[emit\nindent_width = 2"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_invalid_value_keeps_its_field() {
        let error: PartialGenError = GeneratorConfig::from_str("[analysis]\nparallel = true\nmax_threads = 0")
            .unwrap_err()
            .into();
        assert!(matches!(
            &error,
            PartialGenError::Configuration { field: Some(field), .. } if field == "analysis.max_threads"
        ));
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid value for analysis.max_threads: must be greater than 0"
        );

        let error: PartialGenError = GeneratorConfig::from_str("[analysis]\nmax_threads = 2").unwrap_err().into();
        assert!(matches!(error, PartialGenError::Configuration { field: None, .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partialgen.toml");
        std::fs::write(&path, "[analysis]\nparallel = true\n").unwrap();

        let config = GeneratorConfig::from_file(&path).unwrap();
        assert!(config.analysis.parallel);

        assert!(matches!(
            GeneratorConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
