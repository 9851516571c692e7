//! Layered configuration: built-in defaults, then a TOML file, then
//! `COURSEFETCH_*` environment variables.

use std::path::Path;
use std::path::PathBuf;

use config::Config;
use config::Environment;
use config::File;
use coursefetch_retry::RetryConfig;
use coursefetch_retry::config::InvalidConfig;
use serde::Deserialize;
use serde::Serialize;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "coursefetch.toml";

/// Prefix for environment overrides, e.g. `COURSEFETCH_RETRY__MAX_DELAY_MS`.
pub const ENV_PREFIX: &str = "COURSEFETCH";

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found at path: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<InvalidConfig> for ConfigError {
    fn from(err: InvalidConfig) -> Self {
        ConfigError::ValidationError(err.0)
    }
}

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Where the backend proxy lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the proxy API, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8787/V2/api".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |why: String| {
            ConfigError::ValidationError(format!(
                "portal.base_url must be an http(s) URL, got `{}`: {why}",
                self.portal.base_url
            ))
        };
        let url = reqwest::Url::parse(self.portal.base_url.trim())
            .map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        self.retry.validate()?;
        Ok(())
    }
}

/// Configuration loader with layered merging support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Defaults
    /// 2. Config file, if one was given
    /// 3. Environment variables (`COURSEFETCH_` prefix, `__` for nesting)
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        let defaults_json = serde_json::to_string(&AppConfig::default())?;
        builder = builder.add_source(File::from_str(&defaults_json, config::FileFormat::Json));

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path.as_path()));
        }

        // Example: COURSEFETCH_PORTAL__BASE_URL=https://proxy.example/V2/api
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Locate the config file in standard locations:
    /// 1. `./coursefetch.toml`
    /// 2. `~/.config/coursefetch/config.toml`
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from(".").join(CONFIG_FILE_NAME);
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        let xdg_config = dirs::config_dir()?.join("coursefetch").join("config.toml");
        xdg_config.exists().then_some(xdg_config)
    }

    /// Load from an explicit path when given, otherwise from the first
    /// standard location that exists.
    pub fn load_default(explicit: Option<&Path>) -> Result<AppConfig> {
        let loader = match explicit.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(path) => ConfigLoader::new().with_file(path),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("coursefetch.toml");
        std::fs::write(&path, contents).expect("Failed to write temp file");
        (dir, path)
    }

    #[test]
    #[serial]
    fn defaults_only() {
        let config = ConfigLoader::new().load().expect("defaults should load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.portal.base_url, "http://localhost:8787/V2/api");
    }

    #[test]
    #[serial]
    fn toml_file_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"
[portal]
base_url = "https://proxy.example/V2/api"

[retry]
max_delay_ms = 5000
show_progress_after_attempt = 1
success_status_values = ["success", "ok"]
"#,
        );

        let config = ConfigLoader::new().with_file(&path).load().unwrap();

        assert_eq!(config.portal.base_url, "https://proxy.example/V2/api");
        assert_eq!(config.retry.max_delay_ms, 5_000);
        assert_eq!(config.retry.show_progress_after_attempt, 1);
        assert!(config.retry.is_success_status("ok"));
        assert_eq!(config.retry.initial_delay_ms, 1_000);
    }

    #[test]
    #[serial]
    fn env_wins_over_file() {
        let (_dir, path) = write_config(
            r#"
[retry]
initial_delay_ms = 2000
max_delay_ms = 8000
"#,
        );
        unsafe {
            env::set_var("COURSEFETCH_RETRY__INITIAL_DELAY_MS", "500");
        }

        let config = ConfigLoader::new().with_file(&path).load();

        unsafe {
            env::remove_var("COURSEFETCH_RETRY__INITIAL_DELAY_MS");
        }
        let config = config.unwrap();
        assert_eq!(config.retry.initial_delay_ms, 500);
        assert_eq!(config.retry.max_delay_ms, 8_000);
    }

    #[test]
    #[serial]
    fn invalid_values_fail_validation() {
        let (_dir, path) = write_config(
            r#"
[retry]
backoff_multiplier = 0.9
"#,
        );

        let err = ConfigLoader::new().with_file(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)), "{err}");
    }

    #[test]
    #[serial]
    fn non_http_base_url_is_rejected() {
        let (_dir, path) = write_config(
            r#"
[portal]
base_url = "localhost:8787"
"#,
        );

        let err = ConfigLoader::new().with_file(&path).load().unwrap_err();
        assert!(err.to_string().contains("portal.base_url"), "{err}");
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let mut config = AppConfig::default();
        config.portal.base_url = "http://exa mple/V2/api".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)), "{err}");

        config.portal.base_url = "https://portal.example.edu/V2/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_error() {
        let result = ConfigLoader::new().with_file("/nonexistent/coursefetch.toml").load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
