//! Process configuration.
//!
//! Built once at startup from built-in defaults, an optional TOML file and
//! the environment (highest precedence), then shared read-only.

use reqwest::Url;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::trigger::TriggerSelection;

pub const DEFAULT_CONFIG_PATH: &str = "mr_trigger.toml";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DEDUP_WINDOW_SECS: u64 = 60;

/// Optional TOML config file. Every field can be overridden from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub private_token: Option<SecretString>,
    pub port: Option<u16>,
    pub bind_host: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub dedup_window_secs: Option<u64>,
    pub trigger_selection: Option<TriggerSelection>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub webhook_secret: Option<SecretString>,
    pub log_dir: Option<PathBuf>,
}

fn optional_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

#[derive(Debug)]
pub struct BridgeConfig {
    /// Root of the GitLab instance, e.g. `https://gitlab.example.com`.
    pub base_url: Url,
    /// Default access token; a `private_token` query parameter overrides it per request.
    pub private_token: Option<SecretString>,
    pub port: u16,
    pub bind_host: String,
    pub request_timeout: Duration,
    /// Zero disables the in-process duplicate claim.
    pub dedup_window: Duration,
    pub trigger_selection: TriggerSelection,
    pub webhook_secret: Option<SecretString>,
    pub log_dir: Option<PathBuf>,
}

impl BridgeConfig {
    /// Load the config file at `path` (if it exists) and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if path.exists() {
            read_config_file(path)?
        } else {
            FileConfig::default()
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_parts(file, &env)
    }

    /// Merge file values with an environment map. Environment wins.
    pub fn from_parts(file: FileConfig, env: &HashMap<String, String>) -> Result<Self> {
        let var = |key: &str| {
            env.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let base_url = var("GITLAB_URL")
            .map(str::to_owned)
            .or(file.base_url)
            .ok_or_else(|| {
                BridgeError::ConfigError(
                    "base URL is required (set GITLAB_URL or base_url)".to_string(),
                )
            })?;
        let base_url = parse_base_url(&base_url)?;

        let private_token = var("GITLAB_PRIVATE_TOKEN")
            .map(|t| SecretString::from(t.to_owned()))
            .or(file.private_token);

        let port = match var("PORT") {
            Some(v) => parse_value("PORT", v)?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let bind_host = var("BIND_HOST")
            .map(str::to_owned)
            .or(file.bind_host)
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let request_timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(v) => parse_value("REQUEST_TIMEOUT_SECS", v)?,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if request_timeout_secs == 0 {
            return Err(BridgeError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let dedup_window_secs = match var("DEDUP_WINDOW_SECS") {
            Some(v) => parse_value("DEDUP_WINDOW_SECS", v)?,
            None => file.dedup_window_secs.unwrap_or(DEFAULT_DEDUP_WINDOW_SECS),
        };

        let trigger_selection = match var("TRIGGER_SELECTION") {
            Some(v) => parse_value("TRIGGER_SELECTION", v)?,
            None => file.trigger_selection.unwrap_or_default(),
        };

        let webhook_secret = var("WEBHOOK_SECRET")
            .map(|s| SecretString::from(s.to_owned()))
            .or(file.webhook_secret);

        let log_dir = var("LOG_DIR").map(PathBuf::from).or(file.log_dir);

        Ok(Self {
            base_url,
            private_token,
            port,
            bind_host,
            request_timeout: Duration::from_secs(request_timeout_secs),
            dedup_window: Duration::from_secs(dedup_window_secs),
            trigger_selection,
            webhook_secret,
            log_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        BridgeError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(toml::from_str(&config_str)?)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| BridgeError::ConfigError(format!("invalid base URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(BridgeError::ConfigError(format!(
            "base URL '{}' must be an http or https URL",
            raw
        )));
    }
    Ok(url)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| BridgeError::ConfigError(format!("invalid {} '{}': {}", key, raw, e)))
}
