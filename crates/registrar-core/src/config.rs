//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the backend base URL, request timeout, search debounce interval
//! and the last user id entered on the login screen.
//!
//! Configuration is stored at `~/.config/registrar/config.json`. A handful
//! of environment variables override the file (see [`Config::apply_env`]).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "registrar";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_CACHE_KEEP_UNUSED_SECS: u64 = 60;

/// Environment variable overriding [`Config::api_base_url`].
pub const ENV_API_URL: &str = "REGISTRAR_API_URL";

/// How the access token is placed in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: <token>`
    #[default]
    Raw,
    /// `Authorization: Bearer <token>`
    Bearer,
}

impl AuthScheme {
    pub fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Raw => token.to_string(),
            AuthScheme::Bearer => format!("Bearer {}", token),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub search_debounce_ms: u64,
    pub page_size: u32,
    /// Seconds a read with no subscribers stays cached.
    pub cache_keep_unused_secs: u64,
    pub auth_scheme: AuthScheme,
    pub last_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            page_size: DEFAULT_PAGE_SIZE,
            cache_keep_unused_secs: DEFAULT_CACHE_KEEP_UNUSED_SECS,
            auth_scheme: AuthScheme::default(),
            last_user_id: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn cache_keep_unused(&self) -> Duration {
        Duration::from_secs(self.cache_keep_unused_secs)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(config.auth_scheme, AuthScheme::Raw);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.cache_keep_unused(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"api_base_url": "https://example.edu/api/"}"#)
            .expect("partial config should parse");
        assert_eq!(config.base_url(), "https://example.edu/api");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_auth_scheme_header_value() {
        assert_eq!(AuthScheme::Raw.header_value("abc"), "abc");
        assert_eq!(AuthScheme::Bearer.header_value("abc"), "Bearer abc");
        let scheme: AuthScheme = serde_json::from_str("\"bearer\"").unwrap();
        assert_eq!(scheme, AuthScheme::Bearer);
    }
}
