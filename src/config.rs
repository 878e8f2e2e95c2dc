//! Invocation configuration.
//!
//! Loaded once in `main` from the platform config directory plus
//! environment overrides, then passed down explicitly. Nothing below this
//! layer reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "AISH_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key configured; set {ENV_API_KEY} or add api_key to {}", .path.display())]
    MissingApiKey { path: PathBuf },

    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine a home directory for config and data paths")]
    NoProjectDirs,
}

/// On-disk configuration file shape. Every field is optional; environment
/// variables override file values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved configuration handed to the client and controller.
///
/// The API key stays optional here so key-less invocations (listing chats)
/// work; anything about to talk to the service calls [`Config::api_key`].
#[derive(Debug, Clone)]
pub struct Config {
    api_key: Option<String>,
    config_path: PathBuf,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Option<Duration>,
    pub chats_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("", "", "aish").ok_or(ConfigError::NoProjectDirs)?;
        let config_path = dirs.config_dir().join("config.toml");
        let file = ConfigFile::load_from_path(&config_path)?;

        Self::resolve(
            file,
            &config_path,
            dirs.data_dir(),
            dirs.cache_dir(),
            &|name| std::env::var(name).ok(),
        )
    }

    /// Merge file values with environment overrides. Split out so tests can
    /// inject both sides.
    pub fn resolve(
        file: ConfigFile,
        config_path: &Path,
        data_dir: &Path,
        cache_dir: &Path,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = non_blank(env(ENV_API_KEY)).or_else(|| non_blank(file.api_key));

        let base_url = non_blank(env(ENV_BASE_URL))
            .or_else(|| non_blank(file.base_url))
            .unwrap_or_else(|| openai_api::DEFAULT_OPENAI_BASE_URL.to_string());

        let model = non_blank(env(ENV_MODEL))
            .or_else(|| non_blank(file.model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            config_path: config_path.to_path_buf(),
            base_url,
            model,
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
            chats_dir: chat_store::chats_root(data_dir),
            cache_dir: cache_dir.join("completions"),
        })
    }

    /// The configured API key, required before any completion request.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey {
                path: self.config_path.clone(),
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
