//! Configuration
//!
//! Settings come from an optional `config.toml` in the platform config
//! directory, overlaid by `BNET_*` environment variables. Everything is
//! validated once at startup.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::api::DEFAULT_API_BASE;

pub const ENV_API_KEY: &str = "BNET_API_KEY";
pub const ENV_CLIENT_ID: &str = "BNET_OAUTH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "BNET_OAUTH_CLIENT_SECRET";
pub const ENV_TOKEN_EXCHANGE_URL: &str = "BNET_TOKEN_EXCHANGE_URL";
pub const ENV_API_BASE_URL: &str = "BNET_API_BASE_URL";
pub const ENV_MANIFEST_LANGUAGE: &str = "BNET_MANIFEST_LANGUAGE";

const DEFAULT_LANGUAGE: &str = "en";

/// Raw configuration as found on disk and in the environment
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application API key, sent as `X-API-Key`
    pub api_key: Option<String>,
    /// Public OAuth client ID (numeric)
    pub oauth_client_id: Option<String>,
    /// OAuth client secret. Only the token exchange service uses it.
    pub oauth_client_secret: Option<String>,
    /// Base URL of the token exchange service
    pub token_exchange_url: Option<String>,
    /// Platform API origin
    pub api_base_url: Option<String>,
    /// Manifest content language
    pub manifest_language: Option<String>,
}

/// Configuration that passed validation
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Always ends in `/` so relative paths join under it
    pub token_exchange_url: Url,
    /// No trailing `/`
    pub api_base_url: String,
    pub manifest_language: String,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("net", "guardian-cli", "guardian-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (if any) and apply the process environment.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let content = if path.exists() {
            Some(fs::read_to_string(&path).context("Failed to read config file")?)
        } else {
            None
        };
        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from file contents and an environment lookup.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config: Config = match file {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };
        config.overlay_env(env);
        Ok(config)
    }

    fn overlay_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut Option<String>); 6] = [
            (ENV_API_KEY, &mut self.api_key),
            (ENV_CLIENT_ID, &mut self.oauth_client_id),
            (ENV_CLIENT_SECRET, &mut self.oauth_client_secret),
            (ENV_TOKEN_EXCHANGE_URL, &mut self.token_exchange_url),
            (ENV_API_BASE_URL, &mut self.api_base_url),
            (ENV_MANIFEST_LANGUAGE, &mut self.manifest_language),
        ];
        for (key, field) in fields {
            if let Some(value) = env(key) {
                *field = Some(value);
            }
        }
    }

    /// Check every value and produce usable settings.
    pub fn validate(&self) -> Result<Settings> {
        let api_key = required(&self.api_key, ENV_API_KEY)?;
        if api_key.chars().any(char::is_whitespace) {
            bail!("{} must not contain whitespace", ENV_API_KEY);
        }

        let client_id = required(&self.oauth_client_id, ENV_CLIENT_ID)?;
        if !client_id.chars().all(|c| c.is_ascii_digit()) {
            bail!("{} must be numeric, got '{}'", ENV_CLIENT_ID, client_id);
        }

        let client_secret = match &self.oauth_client_secret {
            Some(secret) if secret.trim().is_empty() => {
                bail!("{} is set but empty", ENV_CLIENT_SECRET)
            }
            other => other.clone(),
        };

        let exchange = required(&self.token_exchange_url, ENV_TOKEN_EXCHANGE_URL)?;
        let mut token_exchange_url = http_url(&exchange, ENV_TOKEN_EXCHANGE_URL)?;
        if !token_exchange_url.path().ends_with('/') {
            let path = format!("{}/", token_exchange_url.path());
            token_exchange_url.set_path(&path);
        }

        let base = self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE);
        let api_base_url = http_url(base, ENV_API_BASE_URL)?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        let manifest_language = self
            .manifest_language
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if manifest_language.trim().is_empty() {
            bail!("{} must not be empty", ENV_MANIFEST_LANGUAGE);
        }

        Ok(Settings {
            api_key,
            client_id,
            client_secret,
            token_exchange_url,
            api_base_url,
            manifest_language,
        })
    }
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => bail!("{} is not set", key),
    }
}

fn http_url(value: &str, key: &str) -> Result<Url> {
    let url = Url::parse(value.trim()).with_context(|| format!("{} is not a valid URL", key))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{} must be an http or https URL, got '{}'", key, value);
    }
    Ok(url)
}
