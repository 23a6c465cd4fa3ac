use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

const APP_DIR: &str = "lotto-store";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read lotto-store config '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in lotto-store config '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("bad lotto-store config: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            message: message.into(),
        }
    }
}

impl Config {
    /// `<config dir>/lotto-store/config.toml`, or `./lotto-store/config.toml`
    /// on platforms without a config dir.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(FILE_NAME)
    }

    /// Config for the CLI. A missing file means "use the built-in API
    /// defaults"; any other read failure is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                Ok(Config::default())
            }
            Err(source) => Err(ConfigError::ReadError { path, source }),
        }
    }

    /// Read an explicit `--config` file. Unlike [`Config::load`], the file
    /// must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the API client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        let scheme_ok = base_url.starts_with("http://") || base_url.starts_with("https://");
        if !scheme_ok {
            return Err(ConfigError::invalid(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        if self.api.timeout_seconds == 0 || self.api.connect_timeout_seconds == 0 {
            return Err(ConfigError::invalid("api timeouts must be greater than zero"));
        }

        // An empty token would be sent as "Bearer " and rejected by the API.
        if matches!(self.api.token.as_deref(), Some(token) if token.trim().is_empty()) {
            return Err(ConfigError::invalid("api.token must not be empty when set"));
        }

        Ok(())
    }
}
