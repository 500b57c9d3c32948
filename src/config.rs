//! Configuration module for feedline

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::paths;
use crate::session::SessionConfig;

/// Environment variable that overrides the configured base URL
pub const BASE_URL_ENV: &str = "FEEDLINE_BASE_URL";

/// Build mode the backend URL is chosen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local backend on the development machine
    #[default]
    Development,
    /// Deployed backend
    Production,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which backend to talk to
    #[serde(default)]
    pub environment: Environment,

    /// Explicit base URL; takes precedence over `environment`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Host of the development backend (LAN IP when testing on a device)
    #[serde(default = "default_dev_host")]
    pub dev_host: String,

    /// Port of the development backend
    #[serde(default = "default_dev_port")]
    pub dev_port: u16,

    /// Base URL of the production backend
    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Renew the access token this many seconds before it expires
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,

    /// How many times a request is replayed after a successful refresh
    #[serde(default = "default_max_auth_retries")]
    pub max_auth_retries: u32,
}

fn default_dev_host() -> String {
    "localhost".to_string()
}

const fn default_dev_port() -> u16 {
    8080
}

fn default_production_url() -> String {
    "https://api.example.com/v1".to_string()
}

const fn default_timeout() -> u64 {
    10
}

const fn default_refresh_margin() -> u64 {
    60
}

const fn default_max_auth_retries() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            dev_host: default_dev_host(),
            dev_port: default_dev_port(),
            production_url: default_production_url(),
            timeout_secs: default_timeout(),
            refresh_margin_secs: default_refresh_margin(),
            max_auth_retries: default_max_auth_retries(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Resolve the backend base URL
    ///
    /// `FEEDLINE_BASE_URL` wins, then `base_url`, then the environment default.
    pub fn base_url(&self) -> String {
        let env_override = std::env::var(BASE_URL_ENV).ok().filter(|v| !v.is_empty());
        self.resolve_base_url(env_override.as_deref())
    }

    fn resolve_base_url(&self, env_override: Option<&str>) -> String {
        let url = match (env_override, &self.base_url) {
            (Some(url), _) => url.to_string(),
            (None, Some(url)) => url.clone(),
            (None, None) => match self.environment {
                Environment::Development => format!("http://{}:{}", self.dev_host, self.dev_port),
                Environment::Production => self.production_url.clone(),
            },
        };
        url.trim_end_matches('/').to_string()
    }

    /// Per-request timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Session tunables derived from this config
    pub const fn session(&self) -> SessionConfig {
        SessionConfig {
            refresh_margin: Duration::from_secs(self.refresh_margin_secs),
            max_auth_retries: self.max_auth_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resolve_base_url(None), "http://localhost:8080");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.session().refresh_margin, Duration::from_secs(60));
        assert_eq!(config.session().max_auth_retries, 1);
    }

    #[test]
    fn test_base_url_precedence() {
        let mut config = Config {
            environment: Environment::Production,
            ..Config::default()
        };
        assert_eq!(config.resolve_base_url(None), "https://api.example.com/v1");

        config.base_url = Some("http://10.0.2.2:8080/".to_string());
        assert_eq!(config.resolve_base_url(None), "http://10.0.2.2:8080");

        assert_eq!(
            config.resolve_base_url(Some("http://override:1")),
            "http://override:1"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            dev_host: "192.168.0.101".to_string(),
            refresh_margin_secs: 30,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.dev_host, "192.168.0.101");
        assert_eq!(loaded.refresh_margin_secs, 30);
        assert_eq!(loaded.resolve_base_url(None), "http://192.168.0.101:8080");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "environment = \"production\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.environment, Environment::Production);
        assert_eq!(loaded.timeout_secs, 10);
    }
}
