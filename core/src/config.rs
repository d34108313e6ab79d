//! Configuration Management Module
//!
//! Layered configuration for audits, flows, probe tools and the HTTP surface.
//! Sources, lowest precedence first: built-in defaults, an optional TOML or
//! JSON file, then `WEBAUDIT__`-prefixed environment variables where `__`
//! separates nested keys (`WEBAUDIT__SERVER__PORT=8080`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::browser::Viewport;
use crate::flows::FlowRunnerConfig;

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "webaudit.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "WEBAUDIT";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration file format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") | None => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn file_format(self) -> config::FileFormat {
        match self {
            ConfigFormat::Toml => config::FileFormat::Toml,
            ConfigFormat::Json => config::FileFormat::Json,
        }
    }
}

/// Time budgets in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutSettings {
    pub probe_ms: u64,
    pub navigation_ms: u64,
    pub intra_flow_navigation_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            probe_ms: 120_000,
            navigation_ms: 120_000,
            intra_flow_navigation_ms: 30_000,
        }
    }
}

impl TimeoutSettings {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn intra_flow_navigation(&self) -> Duration {
        Duration::from_millis(self.intra_flow_navigation_ms)
    }
}

/// Out-of-process browser driver command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DriverSettings {
    pub command: String,
    pub args: Vec<String>,
    pub headless: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["driver/browser-driver.mjs".to_string()],
            headless: true,
        }
    }
}

/// Synthetic audit tool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LighthouseSettings {
    pub command: String,
    pub categories: Vec<String>,
    pub chrome_flags: String,
    pub extra_args: Vec<String>,
}

impl Default for LighthouseSettings {
    fn default() -> Self {
        Self {
            command: "lighthouse".to_string(),
            categories: ["performance", "accessibility", "best-practices", "seo", "pwa"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            chrome_flags: "--headless --no-sandbox".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// Accessibility scanner settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Pa11ySettings {
    pub command: String,
    pub standard: String,
    pub extra_args: Vec<String>,
}

impl Default for Pa11ySettings {
    fn default() -> Self {
        Self {
            command: "pa11y".to_string(),
            standard: "WCAG2AA".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    pub flows_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    pub history_path: PathBuf,
    pub report_path: PathBuf,
    pub timeouts: TimeoutSettings,
    pub viewport: Viewport,
    pub driver: DriverSettings,
    pub lighthouse: LighthouseSettings,
    pub pa11y: Pa11ySettings,
    pub server: ServerSettings,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            flows_dir: PathBuf::from("tests/flows"),
            screenshots_dir: PathBuf::from("screenshots"),
            history_path: PathBuf::from("data/results.json"),
            report_path: PathBuf::from("report.html"),
            timeouts: TimeoutSettings::default(),
            viewport: Viewport::default(),
            driver: DriverSettings::default(),
            lighthouse: LighthouseSettings::default(),
            pa11y: Pa11ySettings::default(),
            server: ServerSettings::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AuditConfig {
    /// Load configuration
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_FILE`] is
    /// used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                let format = ConfigFormat::from_path(path)?;
                builder = builder.add_source(
                    config::File::new(&path.to_string_lossy(), format.file_format())
                        .required(true),
                );
                info!("Loading configuration from {}", path.display());
            }
            None => {
                builder = builder.add_source(
                    config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: AuditConfig = builder.build()?.try_deserialize()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Render as TOML, in the shape [`AuditConfig::load`] accepts
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Flow runner settings derived from this configuration
    pub fn flow_runner(&self) -> FlowRunnerConfig {
        FlowRunnerConfig {
            flows_dir: Some(self.flows_dir.clone()),
            screenshots_dir: self.screenshots_dir.clone(),
            viewport: self.viewport,
            navigation_timeout: self.timeouts.navigation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.timeouts.probe(), Duration::from_secs(120));
        assert_eq!(config.timeouts.intra_flow_navigation(), Duration::from_secs(30));
        assert_eq!(config.viewport, Viewport { width: 1366, height: 900 });
        assert_eq!(config.pa11y.standard, "WCAG2AA");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.lighthouse.categories.len(), 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AuditConfig::from_toml_str(
            r#"
            flows_dir = "e2e/flows"

            [server]
            port = 8080

            [timeouts]
            probe_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.flows_dir, PathBuf::from("e2e/flows"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.timeouts.probe_ms, 5000);
        assert_eq!(config.timeouts.navigation_ms, 120_000);
        assert_eq!(config.history_path, PathBuf::from("data/results.json"));
    }

    #[test]
    fn test_toml_output_loads_back() {
        let mut config = AuditConfig::default();
        config.server.port = 9090;
        config.pa11y.standard = "WCAG2AAA".to_string();

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[server]"));
        assert_eq!(AuditConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("audit.toml");
        std::fs::write(&path, "report_path = \"out/report.html\"\n").unwrap();

        let config = AuditConfig::load(Some(&path)).unwrap();
        assert_eq!(config.report_path, PathBuf::from("out/report.html"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = AuditConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("a.yaml")).is_err());
    }

    #[test]
    fn test_flow_runner_settings() {
        let config = AuditConfig::default();
        let runner = config.flow_runner();
        assert_eq!(runner.flows_dir, Some(PathBuf::from("tests/flows")));
        assert_eq!(runner.navigation_timeout, Duration::from_secs(120));
    }
}
